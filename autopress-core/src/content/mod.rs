mod gemini;
mod generator;
mod template;

use serde::{Deserialize, Serialize};

pub use gemini::{GeminiModel, TextModel, TextModelError};
pub use generator::{ContentGenerator, ContentSource, GeneratedPost, TECH_TOPICS};
pub use template::TemplateStore;

/// A blog post ready for the admin form. Excerpt and tags may be empty, in
/// which case their form fields are left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    pub content: String,
    #[serde(default)]
    pub tags: String,
}
