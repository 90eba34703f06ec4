use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::cdp::browser_protocol::target::CreateTargetParams;
use chromiumoxide::element::Element;
use chromiumoxide::handler::viewport::Viewport as ChromiumViewport;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{ChromiumSection, TimeoutSection};

use super::error::{BrowserError, BrowserResult};

/// One admin browser tab, abstracted so the publishing flow can run against
/// a scripted session in tests.
#[async_trait(?Send)]
pub trait AdminSession {
    async fn goto(&mut self, url: &str) -> BrowserResult<()>;
    async fn current_url(&mut self) -> BrowserResult<String>;
    async fn fill(&mut self, selector: &str, value: &str, timeout: Duration) -> BrowserResult<()>;
    async fn click(&mut self, selector: &str, timeout: Duration) -> BrowserResult<()>;
    async fn click_text(&mut self, text: &str, timeout: Duration) -> BrowserResult<()>;
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> BrowserResult<()>;
    async fn wait_for_url_suffix(&mut self, suffix: &str, timeout: Duration) -> BrowserResult<()>;
    async fn page_text(&mut self) -> BrowserResult<String>;
    async fn screenshot(&mut self) -> BrowserResult<Vec<u8>>;
    async fn close(&mut self) -> BrowserResult<()>;
}

#[async_trait(?Send)]
pub trait AdminSessionFactory: Send + Sync {
    async fn open(&self) -> BrowserResult<Box<dyn AdminSession>>;
}

pub struct ChromiumSessionFactory {
    chromium: ChromiumSection,
    poll_interval: Duration,
}

impl ChromiumSessionFactory {
    pub fn new(chromium: ChromiumSection, timeouts: &TimeoutSection) -> Self {
        Self {
            chromium,
            poll_interval: timeouts.poll_interval(),
        }
    }

    fn build_chromium_config(&self) -> BrowserResult<ChromiumConfig> {
        let mut builder = ChromiumConfig::builder().viewport(ChromiumViewport {
            width: self.chromium.window_width,
            height: self.chromium.window_height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: self.chromium.window_width >= self.chromium.window_height,
            has_touch: false,
        });

        if let Some(executable) = &self.chromium.executable {
            builder = builder.chrome_executable(executable);
        }
        if !self.chromium.headless {
            builder = builder.with_head();
        }
        if !self.chromium.sandbox {
            builder = builder.no_sandbox();
        }

        builder = builder.args(vec![format!(
            "--window-size={},{}",
            self.chromium.window_width, self.chromium.window_height
        )]);

        builder.build().map_err(BrowserError::Configuration)
    }
}

#[async_trait(?Send)]
impl AdminSessionFactory for ChromiumSessionFactory {
    async fn open(&self) -> BrowserResult<Box<dyn AdminSession>> {
        let config = self.build_chromium_config()?;
        info!(
            headless = self.chromium.headless,
            width = self.chromium.window_width,
            height = self.chromium.window_height,
            "Launching Chromium instance"
        );

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| BrowserError::Launch(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "Chromium handler reported error");
                }
            }
        });

        let params = CreateTargetParams::new("about:blank");
        let page = browser.new_page(params).await?;

        Ok(Box::new(ChromiumSession {
            browser: Some(browser),
            page,
            handler_task: Some(handler_task),
            poll_interval: self.poll_interval,
        }))
    }
}

pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Page,
    handler_task: Option<JoinHandle<()>>,
    poll_interval: Duration,
}

impl ChromiumSession {
    async fn find_within(&self, selector: &str, timeout: Duration) -> BrowserResult<Element> {
        let attempts = attempts_for(timeout, self.poll_interval);
        for _ in 0..attempts {
            if let Ok(element) = self.page.find_element(selector).await {
                return Ok(element);
            }
            sleep(self.poll_interval).await;
        }
        Err(BrowserError::ElementMissing(format!(
            "{selector} after {timeout:?}"
        )))
    }

    async fn read_url(&self) -> BrowserResult<String> {
        self.page
            .evaluate("window.location.href")
            .await?
            .into_value()
            .map_err(|err| {
                BrowserError::Unexpected(format!("failed to decode current url: {err}"))
            })
    }
}

#[async_trait(?Send)]
impl AdminSession for ChromiumSession {
    async fn goto(&mut self, url: &str) -> BrowserResult<()> {
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(BrowserError::Configuration)?;
        self.page.goto(params).await?;
        self.page.wait_for_navigation().await?;
        Ok(())
    }

    async fn current_url(&mut self) -> BrowserResult<String> {
        self.read_url().await
    }

    async fn fill(&mut self, selector: &str, value: &str, timeout: Duration) -> BrowserResult<()> {
        let element = self.find_within(selector, timeout).await?;
        element.click().await.map_err(|err| {
            BrowserError::Unexpected(format!("failed to focus {selector}: {err}"))
        })?;
        element.type_str(value).await.map_err(|err| {
            BrowserError::Unexpected(format!("failed to type into {selector}: {err}"))
        })?;
        Ok(())
    }

    async fn click(&mut self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        let element = self.find_within(selector, timeout).await?;
        element
            .click()
            .await
            .map_err(|err| BrowserError::Unexpected(format!("failed to click {selector}: {err}")))?;
        Ok(())
    }

    async fn click_text(&mut self, text: &str, timeout: Duration) -> BrowserResult<()> {
        let needle = serde_json::to_string(text)
            .map_err(|err| BrowserError::Unexpected(format!("failed to encode link text: {err}")))?;
        let script = format!(
            "(() => {{
    const needle = {needle};
    const nodes = document.querySelectorAll('a, button');
    for (const node of nodes) {{
        if ((node.innerText || '').trim() === needle) {{
            node.click();
            return true;
        }}
    }}
    return false;
}})()"
        );

        let attempts = attempts_for(timeout, self.poll_interval);
        for _ in 0..attempts {
            let clicked: bool = self
                .page
                .evaluate(script.as_str())
                .await?
                .into_value()
                .map_err(|err| {
                    BrowserError::Unexpected(format!("failed to decode text click result: {err}"))
                })?;
            if clicked {
                return Ok(());
            }
            sleep(self.poll_interval).await;
        }
        Err(BrowserError::ElementMissing(format!(
            "clickable element with text {text:?} after {timeout:?}"
        )))
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        self.find_within(selector, timeout).await.map(|_| ())
    }

    async fn wait_for_url_suffix(&mut self, suffix: &str, timeout: Duration) -> BrowserResult<()> {
        let attempts = attempts_for(timeout, self.poll_interval);
        for _ in 0..attempts {
            let url = self.read_url().await?;
            if url_has_suffix(&url, suffix) {
                return Ok(());
            }
            sleep(self.poll_interval).await;
        }
        Err(BrowserError::Timeout(format!("url ending in {suffix}")))
    }

    async fn page_text(&mut self) -> BrowserResult<String> {
        self.page
            .evaluate("document.body ? document.body.innerText : ''")
            .await?
            .into_value()
            .map_err(|err| BrowserError::Unexpected(format!("failed to decode page text: {err}")))
    }

    async fn screenshot(&mut self) -> BrowserResult<Vec<u8>> {
        let params = ScreenshotParams::builder().build();
        Ok(self.page.screenshot(params).await?)
    }

    async fn close(&mut self) -> BrowserResult<()> {
        if let Some(mut browser) = self.browser.take() {
            if let Err(err) = browser.close().await {
                warn!(error = %err, "Failed to close browser gracefully");
            }
        }
        if let Some(handle) = self.handler_task.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "Browser handler join error");
            }
        }
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if let Some(handle) = &self.handler_task {
            if !handle.is_finished() {
                warn!("admin session dropped without explicit close");
            }
        }
    }
}

fn attempts_for(timeout: Duration, poll: Duration) -> u64 {
    let poll_ms = poll.as_millis().max(1);
    ((timeout.as_millis() / poll_ms) as u64).max(1)
}

/// Trailing slashes are ignored so `/blog` and `/blog/` compare equal.
pub fn url_has_suffix(url: &str, suffix: &str) -> bool {
    url.trim_end_matches('/').ends_with(suffix)
}
