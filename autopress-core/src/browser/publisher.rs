use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use crate::config::Settings;
use crate::content::PostDraft;

use super::error::{BrowserError, BrowserResult};
use super::session::{url_has_suffix, AdminSession};

/// How the post editor was reached. The routes are tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorRoute {
    CreateButton,
    FallbackLink,
    DirectUrl,
}

impl fmt::Display for EditorRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EditorRoute::CreateButton => "create_button",
            EditorRoute::FallbackLink => "fallback_link",
            EditorRoute::DirectUrl => "direct_url",
        };
        f.write_str(label)
    }
}

/// Drives the admin pages of the blog: login, duplicate inspection, editor
/// navigation and form submission. Screenshot checkpoints are taken at each
/// stage and never fail the run.
pub struct PostPublisher {
    settings: Arc<Settings>,
    screenshots: Vec<PathBuf>,
}

impl PostPublisher {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            screenshots: Vec::new(),
        }
    }

    /// Opens the admin page and signs in unless the site already redirected
    /// to the listing, which means the session is still authenticated.
    pub async fn login(
        &mut self,
        session: &mut dyn AdminSession,
        email: &str,
        password: &str,
    ) -> BrowserResult<()> {
        let settings = Arc::clone(&self.settings);
        session.goto(&settings.site.admin_url()).await?;

        let url = session.current_url().await?;
        if url.contains(&settings.site.listing_path) {
            info!(url = %url, "already authenticated, login skipped");
        } else {
            session
                .fill(
                    &settings.selectors.email_field,
                    email,
                    settings.timeouts.form_ready(),
                )
                .await?;
            session
                .fill(
                    &settings.selectors.password_field,
                    password,
                    settings.timeouts.form_ready(),
                )
                .await?;
            self.checkpoint(session, "before_login").await;
            session
                .click(
                    &settings.selectors.login_submit,
                    settings.timeouts.form_ready(),
                )
                .await?;
            session
                .wait_for_url_suffix(
                    &settings.site.listing_path,
                    settings.timeouts.login_redirect(),
                )
                .await?;
            info!("login completed");
        }

        self.checkpoint(session, "blog_dashboard").await;
        Ok(())
    }

    /// Visible text of the post listing, navigating there first when the
    /// session is on another page.
    pub async fn listing_text(&mut self, session: &mut dyn AdminSession) -> BrowserResult<String> {
        let settings = Arc::clone(&self.settings);
        let url = session.current_url().await?;
        if !url_has_suffix(&url, &settings.site.listing_path) {
            session.goto(&settings.site.listing_url()).await?;
        }
        session.page_text().await
    }

    /// Tries each editor route in order and reports the one that worked.
    pub async fn open_editor(
        &mut self,
        session: &mut dyn AdminSession,
    ) -> BrowserResult<EditorRoute> {
        let settings = Arc::clone(&self.settings);
        let mut last_error: Option<BrowserError> = None;

        for route in [
            EditorRoute::CreateButton,
            EditorRoute::FallbackLink,
            EditorRoute::DirectUrl,
        ] {
            let outcome = match route {
                EditorRoute::CreateButton => {
                    session
                        .click_text(
                            &settings.selectors.create_post_text,
                            settings.timeouts.create_primary(),
                        )
                        .await
                }
                EditorRoute::FallbackLink => {
                    session
                        .click(
                            &settings.selectors.create_post_fallback,
                            settings.timeouts.create_fallback(),
                        )
                        .await
                }
                EditorRoute::DirectUrl => session.goto(&settings.site.new_post_url()).await,
            };
            match outcome {
                Ok(()) => {
                    info!(route = %route, "editor opened");
                    return Ok(route);
                }
                Err(err) => {
                    warn!(route = %route, error = %err, "editor route failed");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| BrowserError::Unexpected("no editor route succeeded".to_string())))
    }

    /// Fills the editor form and submits it, waiting for the redirect back
    /// to the listing. Empty excerpt and tags leave their fields untouched.
    pub async fn submit(
        &mut self,
        session: &mut dyn AdminSession,
        draft: &PostDraft,
    ) -> BrowserResult<()> {
        let settings = Arc::clone(&self.settings);
        let selectors = &settings.selectors;
        let timeouts = &settings.timeouts;

        session
            .wait_for_selector(&selectors.title_field, timeouts.form_ready())
            .await?;
        session
            .fill(&selectors.title_field, &draft.title, timeouts.form_ready())
            .await?;
        if !draft.excerpt.is_empty() {
            session
                .fill(
                    &selectors.excerpt_field,
                    &draft.excerpt,
                    timeouts.form_ready(),
                )
                .await?;
        }
        session
            .fill(
                &selectors.content_field,
                &draft.content,
                timeouts.form_ready(),
            )
            .await?;
        if !draft.tags.is_empty() {
            session
                .fill(&selectors.tags_field, &draft.tags, timeouts.form_ready())
                .await?;
        }

        self.checkpoint(session, "before_submission").await;
        session
            .click(&selectors.post_submit, timeouts.form_ready())
            .await?;
        session
            .wait_for_url_suffix(&settings.site.listing_path, timeouts.post_submit())
            .await?;
        self.checkpoint(session, "post_created").await;
        info!(title = %draft.title, "post submitted");
        Ok(())
    }

    pub async fn capture_failure(&mut self, session: &mut dyn AdminSession) {
        self.checkpoint(session, "error_state").await;
    }

    pub fn screenshots(&self) -> &[PathBuf] {
        &self.screenshots
    }

    async fn checkpoint(&mut self, session: &mut dyn AdminSession, name: &str) {
        let bytes = match session.screenshot().await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(name, error = %err, "screenshot capture failed");
                return;
            }
        };
        match self.write_screenshot(name, &bytes) {
            Ok(path) => {
                info!(name, path = %path.display(), "screenshot saved");
                self.screenshots.push(path);
            }
            Err(err) => {
                warn!(name, error = %err, "screenshot write failed");
            }
        }
    }

    fn write_screenshot(&self, name: &str, bytes: &[u8]) -> BrowserResult<PathBuf> {
        let dir = Path::new(&self.settings.paths.screenshots_dir);
        std::fs::create_dir_all(dir)?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("{name}_{stamp}.png"));
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}
