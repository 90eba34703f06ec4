use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analytics::AnalyticsLog;
use crate::browser::{
    AdminSession, AdminSessionFactory, BrowserError, BrowserResult, EditorRoute, PostPublisher,
};
use crate::config::Settings;
use crate::content::{ContentGenerator, ContentSource, PostDraft};
use crate::credentials::Credentials;
use crate::duplicate::{versioned_title, DuplicatePolicy};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("missing credential: {0}")]
    MissingCredentials(&'static str),
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

pub type RunResult<T> = std::result::Result<T, RunError>;

/// Outcome of one publishing run, suitable for structured logging or JSON
/// output.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub title: String,
    pub source: ContentSource,
    pub duplicate_adjusted: bool,
    pub editor_route: Option<String>,
    pub screenshots: Vec<PathBuf>,
    pub duration_secs: u64,
    pub dry_run: bool,
}

/// One end-to-end publish: generate a post, sign in, adjust the title if a
/// similar one is already live, submit it and record analytics.
pub struct PublishRun {
    settings: Arc<Settings>,
    generator: ContentGenerator,
    analytics: AnalyticsLog,
    dry_run: bool,
}

impl PublishRun {
    pub fn new(
        settings: Arc<Settings>,
        generator: ContentGenerator,
        analytics: AnalyticsLog,
        dry_run: bool,
    ) -> Self {
        Self {
            settings,
            generator,
            analytics,
            dry_run,
        }
    }

    pub async fn execute<R: Rng + ?Sized>(
        &self,
        sessions: &dyn AdminSessionFactory,
        credentials: &Credentials,
        rng: &mut R,
    ) -> RunResult<RunReport> {
        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        let email = credentials
            .email
            .as_deref()
            .ok_or(RunError::MissingCredentials("email"))?;
        let password = credentials
            .password
            .as_deref()
            .ok_or(RunError::MissingCredentials("password"))?;

        let generated = self.generator.generate(rng).await;
        let source = generated.source;
        let mut draft = generated.draft;
        info!(run_id = %run_id, source = %source, title = %draft.title, "content prepared");

        if self.dry_run {
            info!(run_id = %run_id, "dry run, browser not launched");
            return Ok(RunReport {
                run_id,
                title: draft.title,
                source,
                duplicate_adjusted: false,
                editor_route: None,
                screenshots: Vec::new(),
                duration_secs: started.elapsed().as_secs(),
                dry_run: true,
            });
        }

        let mut session = sessions.open().await?;
        let mut publisher = PostPublisher::new(Arc::clone(&self.settings));

        match self
            .drive(
                session.as_mut(),
                &mut publisher,
                email,
                password,
                &mut draft,
                rng,
            )
            .await
        {
            Ok((duplicate_adjusted, route)) => {
                self.analytics.record_best_effort(&draft.title).await;
                if let Err(err) = session.close().await {
                    warn!(error = %err, "session close failed");
                }
                info!(
                    run_id = %run_id,
                    title = %draft.title,
                    route = %route,
                    elapsed_secs = started.elapsed().as_secs(),
                    "publish run completed"
                );
                Ok(RunReport {
                    run_id,
                    title: draft.title,
                    source,
                    duplicate_adjusted,
                    editor_route: Some(route.to_string()),
                    screenshots: publisher.screenshots().to_vec(),
                    duration_secs: started.elapsed().as_secs(),
                    dry_run: false,
                })
            }
            Err(err) => {
                error!(run_id = %run_id, error = %err, "publish run failed");
                publisher.capture_failure(session.as_mut()).await;
                if let Err(close_err) = session.close().await {
                    warn!(error = %close_err, "session close failed");
                }
                Err(err.into())
            }
        }
    }

    async fn drive<R: Rng + ?Sized>(
        &self,
        session: &mut dyn AdminSession,
        publisher: &mut PostPublisher,
        email: &str,
        password: &str,
        draft: &mut PostDraft,
        rng: &mut R,
    ) -> BrowserResult<(bool, EditorRoute)> {
        publisher.login(session, email, password).await?;

        // An unreadable listing never blocks the run; the post goes out
        // without the duplicate check.
        let policy = DuplicatePolicy::from(&self.settings.duplicate);
        let duplicate_adjusted = match publisher.listing_text(session).await {
            Ok(text) => {
                if policy.is_duplicate(&draft.title, &text) {
                    let adjusted = versioned_title(&draft.title, rng);
                    warn!(
                        original = %draft.title,
                        adjusted = %adjusted,
                        "similar title already published, renaming"
                    );
                    draft.title = adjusted;
                    true
                } else {
                    false
                }
            }
            Err(err) => {
                warn!(error = %err, "duplicate check skipped");
                false
            }
        };

        let route = publisher.open_editor(session).await?;
        publisher.submit(session, draft).await?;
        Ok((duplicate_adjusted, route))
    }
}
