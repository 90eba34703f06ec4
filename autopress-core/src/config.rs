use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse settings {path}: {source}")]
    Parse {
        source: toml::de::Error,
        path: PathBuf,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Runtime settings for one publishing run. Every section carries defaults
/// that match the production blog, so a missing settings file is usable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub site: SiteSection,
    pub chromium: ChromiumSection,
    pub selectors: SelectorSection,
    pub timeouts: TimeoutSection,
    pub duplicate: DuplicateSection,
    pub generator: GeneratorSection,
    pub paths: PathsSection,
}

impl Settings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            source,
            path: path.to_path_buf(),
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Loads the settings file, falling back to defaults when it cannot be
    /// used. The error is handed back so the caller can log it once logging
    /// is up; nothing here writes to the log.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> (Self, Option<ConfigError>) {
        match Self::load(path) {
            Ok(settings) => (settings, None),
            Err(err) => (Self::default(), Some(err)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    pub base_url: String,
    pub admin_path: String,
    pub listing_path: String,
    pub new_post_path: String,
}

impl SiteSection {
    pub fn admin_url(&self) -> String {
        format!("{}{}", self.base_url, self.admin_path)
    }

    pub fn listing_url(&self) -> String {
        format!("{}{}", self.base_url, self.listing_path)
    }

    pub fn new_post_url(&self) -> String {
        format!("{}{}", self.base_url, self.new_post_path)
    }
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            base_url: "https://www.bibekbhattarai14.com.np".to_string(),
            admin_path: "/admin".to_string(),
            listing_path: "/blog".to_string(),
            new_post_path: "/blog/new".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChromiumSection {
    pub executable: Option<String>,
    pub headless: bool,
    pub sandbox: bool,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for ChromiumSection {
    fn default() -> Self {
        Self {
            executable: None,
            headless: false,
            sandbox: true,
            window_width: 1280,
            window_height: 720,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorSection {
    pub email_field: String,
    pub password_field: String,
    pub login_submit: String,
    pub create_post_text: String,
    pub create_post_fallback: String,
    pub title_field: String,
    pub excerpt_field: String,
    pub content_field: String,
    pub tags_field: String,
    pub post_submit: String,
}

impl Default for SelectorSection {
    fn default() -> Self {
        Self {
            email_field: "input[type=\"email\"]".to_string(),
            password_field: "input[type=\"password\"]".to_string(),
            login_submit: "button[type=\"submit\"]".to_string(),
            create_post_text: "Create New Post".to_string(),
            create_post_fallback: "a.bg-blue-600".to_string(),
            title_field: "#title".to_string(),
            excerpt_field: "#excerpt".to_string(),
            content_field: "#content".to_string(),
            tags_field: "#tags".to_string(),
            post_submit: "button[type=\"submit\"]".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutSection {
    pub login_redirect_ms: u64,
    pub form_ready_ms: u64,
    pub post_submit_ms: u64,
    pub create_primary_ms: u64,
    pub create_fallback_ms: u64,
    pub poll_interval_ms: u64,
}

impl TimeoutSection {
    pub fn login_redirect(&self) -> Duration {
        Duration::from_millis(self.login_redirect_ms)
    }

    pub fn form_ready(&self) -> Duration {
        Duration::from_millis(self.form_ready_ms)
    }

    pub fn post_submit(&self) -> Duration {
        Duration::from_millis(self.post_submit_ms)
    }

    pub fn create_primary(&self) -> Duration {
        Duration::from_millis(self.create_primary_ms)
    }

    pub fn create_fallback(&self) -> Duration {
        Duration::from_millis(self.create_fallback_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            login_redirect_ms: 15_000,
            form_ready_ms: 10_000,
            post_submit_ms: 15_000,
            create_primary_ms: 10_000,
            create_fallback_ms: 5_000,
            poll_interval_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DuplicateSection {
    pub match_threshold: f64,
    pub min_word_len: usize,
}

impl Default for DuplicateSection {
    fn default() -> Self {
        Self {
            match_threshold: 0.7,
            min_word_len: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorSection {
    pub model: String,
    pub api_base_url: String,
    pub request_timeout_ms: u64,
}

impl GeneratorSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub screenshots_dir: String,
    pub logs_dir: String,
    pub templates_file: String,
    pub analytics_file: String,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            screenshots_dir: "screenshots".to_string(),
            logs_dir: "logs".to_string(),
            templates_file: "content_templates.json".to_string(),
            analytics_file: "post_analytics.json".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_production_blog() {
        let settings = Settings::default();
        assert_eq!(
            settings.site.admin_url(),
            "https://www.bibekbhattarai14.com.np/admin"
        );
        assert_eq!(
            settings.site.new_post_url(),
            "https://www.bibekbhattarai14.com.np/blog/new"
        );
        assert_eq!(settings.selectors.title_field, "#title");
        assert_eq!(settings.timeouts.login_redirect(), Duration::from_secs(15));
        assert_eq!(settings.timeouts.create_fallback(), Duration::from_secs(5));
        assert!((settings.duplicate.match_threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(settings.duplicate.min_word_len, 3);
        assert_eq!(settings.generator.model, "gemini-1.5-flash");
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[site]\nbase_url = \"https://blog.example.org\"\n\n[duplicate]\nmatch_threshold = 0.5\n"
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.site.base_url, "https://blog.example.org");
        assert_eq!(settings.site.listing_path, "/blog");
        assert!((settings.duplicate.match_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(settings.timeouts.form_ready_ms, 10_000);
    }

    #[test]
    fn load_fixture_settings() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../configs/autopress.toml");
        let settings = Settings::load(path).expect("fixture settings should parse");
        assert_eq!(settings.selectors.create_post_text, "Create New Post");
        assert_eq!(settings.timeouts.post_submit_ms, 15_000);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let (settings, issue) = Settings::load_or_default("does-not-exist.toml");
        assert_eq!(settings.site.listing_path, "/blog");
        assert!(matches!(issue, Some(ConfigError::Io { .. })));
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "site = \"not a table\"").unwrap();

        let (settings, issue) = Settings::load_or_default(file.path());
        assert_eq!(settings.site.admin_path, "/admin");
        assert!(matches!(issue, Some(ConfigError::Parse { .. })));
    }
}
