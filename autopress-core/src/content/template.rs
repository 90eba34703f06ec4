use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use super::PostDraft;

/// Pre-written drafts loaded from a JSON file. The store is optional: a
/// missing or unreadable file just leaves it empty.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: Vec<PostDraft>,
}

impl TemplateStore {
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "template file unavailable");
                return Self::default();
            }
        };
        match serde_json::from_str::<Vec<PostDraft>>(&content) {
            Ok(templates) => {
                debug!(path = %path.display(), count = templates.len(), "templates loaded");
                Self { templates }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "template file malformed");
                Self::default()
            }
        }
    }

    pub fn from_templates(templates: Vec<PostDraft>) -> Self {
        Self { templates }
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&PostDraft> {
        self.templates.choose(rng)
    }
}
