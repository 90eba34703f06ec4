use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::GeneratorSection;

#[derive(Debug, Error)]
pub enum TextModelError {
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model request returned status {0}")]
    Status(u16),
    #[error("model reply contained no text")]
    EmptyReply,
    #[error("model request timed out after {0:?}")]
    Timeout(Duration),
}

/// Text generation backend. The production implementation talks to Gemini;
/// tests substitute canned replies.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, TextModelError>;
}

/// Client for the Gemini `generateContent` REST endpoint. The API key is
/// sent in a request header, never in the URL, so transport errors that
/// echo the request URL cannot reveal it.
pub struct GeminiModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    request_timeout: Duration,
}

impl GeminiModel {
    pub fn new(settings: &GeneratorSection, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: api_key.into(),
            request_timeout: settings.request_timeout(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn request(&self, prompt: &str) -> Result<String, TextModelError> {
        debug!(model = %self.model, "requesting generated post");
        let body = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
        };
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TextModelError::Status(status.as_u16()));
        }

        let reply = response.json::<GenerateResponse>().await?;
        extract_text(reply)
    }
}

#[async_trait]
impl TextModel for GeminiModel {
    async fn generate(&self, prompt: &str) -> Result<String, TextModelError> {
        match tokio::time::timeout(self.request_timeout, self.request(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(TextModelError::Timeout(self.request_timeout)),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ReplyCandidate>,
}

#[derive(Debug, Default, Deserialize)]
struct ReplyCandidate {
    #[serde(default)]
    content: ReplyContent,
}

#[derive(Debug, Default, Deserialize)]
struct ReplyContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Default, Deserialize)]
struct ReplyPart {
    #[serde(default)]
    text: String,
}

fn extract_text(reply: GenerateResponse) -> Result<String, TextModelError> {
    let text = reply
        .candidates
        .into_iter()
        .next()
        .map(|candidate| {
            candidate
                .content
                .parts
                .into_iter()
                .map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(TextModelError::EmptyReply);
    }
    Ok(text)
}
