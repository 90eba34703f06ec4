use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

pub const EMAIL_ENV: &str = "BLOG_EMAIL";
pub const PASSWORD_ENV: &str = "BLOG_PASSWORD";
pub const API_KEY_ENV: &str = "GOOGLE_AI_API_KEY";

/// Login and API credentials resolved from the environment and an optional
/// JSON file. Environment variables win per field; the file only fills gaps.
#[derive(Clone, Default)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
}

impl Credentials {
    /// Resolves credentials from process environment variables and the given
    /// file path. A `.env` file next to the binary is loaded first so local
    /// runs behave like deployed ones.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        dotenvy::dotenv().ok();
        Self::resolve(path.as_ref(), |key| std::env::var(key).ok())
    }

    /// Same as [`Credentials::load`] but with an injectable environment
    /// lookup, so resolution order can be exercised without mutating the
    /// process environment.
    pub fn resolve<F>(path: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = Self {
            email: lookup(EMAIL_ENV),
            password: lookup(PASSWORD_ENV),
            api_key: lookup(API_KEY_ENV),
        };
        if from_env.is_complete() {
            debug!("credentials resolved from environment");
            return from_env;
        }

        let file = CredentialFile::read(path).unwrap_or_default();
        Self {
            email: from_env.email.or(file.email),
            password: from_env.password.or(file.password),
            api_key: from_env
                .api_key
                .or(file.google_ai.and_then(|section| section.api_key)),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.email.is_some() && self.password.is_some() && self.api_key.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CredentialFile {
    email: Option<String>,
    password: Option<String>,
    google_ai: Option<GoogleAiSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GoogleAiSection {
    api_key: Option<String>,
}

impl CredentialFile {
    fn read(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "credential file unavailable");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(file) => Some(file),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "credential file malformed");
                None
            }
        }
    }
}
