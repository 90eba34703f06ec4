use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("analytics io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("analytics file malformed: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub views: i64,
    pub comments: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AnalyticsFile {
    #[serde(default)]
    posts: Vec<PostRecord>,
}

/// Append-only log of published posts, kept as pretty-printed JSON next to
/// the binary. A malformed file is never overwritten; the update is skipped
/// instead.
#[derive(Debug, Clone)]
pub struct AnalyticsLog {
    path: PathBuf,
}

impl AnalyticsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn record(&self, title: &str) -> Result<(), AnalyticsError> {
        let mut file = self.load().await?;
        file.posts.push(PostRecord {
            title: title.to_string(),
            created_at: Utc::now(),
            views: 0,
            comments: 0,
        });
        let serialized = serde_json::to_string_pretty(&file)?;
        tokio::fs::write(&self.path, serialized).await?;
        info!(path = %self.path.display(), posts = file.posts.len(), "analytics updated");
        Ok(())
    }

    /// Analytics are bookkeeping, not part of publishing. Failures are
    /// logged and swallowed.
    pub async fn record_best_effort(&self, title: &str) {
        if let Err(err) = self.record(title).await {
            warn!(path = %self.path.display(), error = %err, "analytics update skipped");
        }
    }

    async fn load(&self) -> Result<AnalyticsFile, AnalyticsError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(AnalyticsFile::default());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_posts_in_publish_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = AnalyticsLog::new(dir.path().join("post_analytics.json"));

        log.record("First Post").await.unwrap();
        log.record("Second Post").await.unwrap();

        let content = tokio::fs::read_to_string(dir.path().join("post_analytics.json"))
            .await
            .unwrap();
        let file: AnalyticsFile = serde_json::from_str(&content).unwrap();
        assert_eq!(file.posts.len(), 2);
        assert_eq!(file.posts[0].title, "First Post");
        assert_eq!(file.posts[1].title, "Second Post");
        assert!(file.posts.iter().all(|post| post.views == 0));
        assert!(file.posts.iter().all(|post| post.comments == 0));
        assert!(file.posts[0].created_at <= file.posts[1].created_at);
    }

    #[tokio::test]
    async fn missing_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.json");
        let log = AnalyticsLog::new(&path);

        log.record("Only Post").await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn malformed_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        tokio::fs::write(&path, "{not json").await.unwrap();
        let log = AnalyticsLog::new(&path);

        assert!(matches!(
            log.record("Post").await,
            Err(AnalyticsError::Serde(_))
        ));
        log.record_best_effort("Post").await;

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "{not json");
    }
}
