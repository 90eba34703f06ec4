pub mod analytics;
pub mod browser;
pub mod config;
pub mod content;
pub mod credentials;
pub mod duplicate;
pub mod run;

pub use analytics::{AnalyticsError, AnalyticsLog, PostRecord};
pub use browser::{
    AdminSession, AdminSessionFactory, BrowserError, BrowserResult, ChromiumSession,
    ChromiumSessionFactory, EditorRoute, PostPublisher,
};
pub use config::{ConfigError, Settings};
pub use content::{
    ContentGenerator, ContentSource, GeminiModel, GeneratedPost, PostDraft, TemplateStore,
    TextModel, TextModelError, TECH_TOPICS,
};
pub use credentials::Credentials;
pub use duplicate::{versioned_title, DuplicatePolicy};
pub use run::{PublishRun, RunError, RunReport, RunResult};
