use std::fmt;
use std::sync::Arc;

use chrono::Local;
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use super::{PostDraft, TemplateStore, TextModel};

/// Topic pool for model-generated posts, matching the categories the blog
/// already covers.
pub const TECH_TOPICS: [&str; 20] = [
    "Cloud Native Architecture",
    "DevOps Best Practices",
    "Machine Learning Ethics",
    "Kubernetes in Production",
    "Serverless Computing",
    "Python Development Tips",
    "Web3 Technology",
    "Cybersecurity Trends",
    "GitHub Copilot and AI Programming",
    "Tech Industry Humor",
    "Docker Optimization",
    "API Design Principles",
    "Frontend Framework Comparison",
    "Infrastructure as Code",
    "Database Performance Tuning",
    "Tech Career Development",
    "Open Source Contributions",
    "Mobile App Development Trends",
    "Microservices Architecture",
    "AI and ML in DevOps",
];

/// Where the published draft ultimately came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    Ai,
    Template,
    Default,
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ContentSource::Ai => "ai",
            ContentSource::Template => "template",
            ContentSource::Default => "default",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedPost {
    pub draft: PostDraft,
    pub source: ContentSource,
}

/// Produces the next post to publish. Tries the text model first, then a
/// stored template, then a built-in fallback, so generation never fails.
pub struct ContentGenerator {
    templates: TemplateStore,
    model: Option<Arc<dyn TextModel>>,
}

impl ContentGenerator {
    pub fn new(templates: TemplateStore, model: Option<Arc<dyn TextModel>>) -> Self {
        Self { templates, model }
    }

    pub async fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> GeneratedPost {
        if let Some(model) = &self.model {
            let topic = self.pick_topic(rng);
            match model.generate(&build_prompt(&topic)).await {
                Ok(reply) => {
                    let draft = parse_model_reply(&reply, &topic);
                    info!(topic = %topic, title = %draft.title, "post generated by model");
                    return GeneratedPost {
                        draft,
                        source: ContentSource::Ai,
                    };
                }
                Err(err) => {
                    warn!(topic = %topic, error = %err, "model generation failed, falling back");
                }
            }
        }

        if let Some(template) = self.templates.choose(rng) {
            let mut draft = template.clone();
            draft.title = format!("{} - {}", draft.title, current_date());
            info!(title = %draft.title, "post taken from template");
            return GeneratedPost {
                draft,
                source: ContentSource::Template,
            };
        }

        let draft = default_post();
        info!(title = %draft.title, "post built from fallback content");
        GeneratedPost {
            draft,
            source: ContentSource::Default,
        }
    }

    /// Half the time a stored template title seeds the model, otherwise a
    /// topic from the fixed pool.
    fn pick_topic<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        if !self.templates.is_empty() && rng.gen_bool(0.5) {
            if let Some(template) = self.templates.choose(rng) {
                return template.title.clone();
            }
        }
        TECH_TOPICS[rng.gen_range(0..TECH_TOPICS.len())].to_string()
    }
}

fn build_prompt(topic: &str) -> String {
    format!(
        "Create a blog post about \"{topic}\". The post should:\n\
         - Be written in a slightly humorous but professional tech voice\n\
         - Include practical insights and examples\n\
         - Have clear sections with markdown formatting\n\
         - Be around 500-800 words\n\
         - Include a title, introduction, 2-4 main sections, and conclusion\n\
         - Be related to software development, DevOps, or modern tech trends\n\
         \n\
         Format the post using markdown, with a # heading for the title and ## for sections.\n\
         Also suggest 3-6 relevant tags as a comma-separated list."
    )
}

/// Splits a markdown reply into the form fields. The full reply becomes the
/// post body; title, excerpt and tags are pulled from its lines.
fn parse_model_reply(reply: &str, topic: &str) -> PostDraft {
    let lines: Vec<&str> = reply.lines().collect();

    let title = lines
        .first()
        .and_then(|line| line.strip_prefix("# "))
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| topic.to_string());

    let tags = extract_tags(&lines).unwrap_or_else(|| fallback_tags(topic));
    let excerpt = extract_excerpt(&lines);

    PostDraft {
        title,
        excerpt,
        content: reply.to_string(),
        tags,
    }
}

/// First `Tags:` or `**Tags:**` line wins; later ones are ignored even when
/// the first is empty.
fn extract_tags(lines: &[&str]) -> Option<String> {
    for line in lines {
        let lowered = line.to_lowercase();
        if lowered.starts_with("tags:") || lowered.starts_with("**tags:**") {
            let cleaned = line
                .splitn(2, ':')
                .nth(1)
                .unwrap_or("")
                .trim()
                .trim_start_matches('*')
                .trim()
                .to_string();
            return (!cleaned.is_empty()).then_some(cleaned);
        }
    }
    None
}

fn fallback_tags(topic: &str) -> String {
    let lowered = topic.to_lowercase();
    let mut tags = lowered
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(",");
    tags.push_str(",tech,blog");
    tags
}

/// Walks the body lines looking for a paragraph to use as the excerpt. Each
/// candidate replaces the previous one until a line of at least 100
/// characters is found.
fn extract_excerpt(lines: &[&str]) -> String {
    let mut excerpt = String::new();
    for line in lines.iter().skip(1) {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        excerpt = truncate_chars(trimmed, 150);
        if excerpt.chars().count() >= 100 {
            break;
        }
    }
    excerpt
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn current_date() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

fn default_post() -> PostDraft {
    let date = current_date();
    PostDraft {
        title: format!("Tech Update - {date}"),
        excerpt: format!("Latest thoughts on technology trends for {date}"),
        content: format!(
            "# Tech Update\n\nThis is the content for {date}.\n\n## Key Points\n\n\
             - Technology is constantly evolving\n- DevOps practices improve efficiency\n\
             - Automation saves time\n\n## Conclusion\n\n\
             Stay updated with the latest tech trends!"
        ),
        tags: "tech,update,devops".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use crate::content::TextModelError;

    use super::*;

    struct StaticModel {
        reply: String,
    }

    #[async_trait]
    impl TextModel for StaticModel {
        async fn generate(&self, _prompt: &str) -> Result<String, TextModelError> {
            Ok(self.reply.clone())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl TextModel for FailingModel {
        async fn generate(&self, _prompt: &str) -> Result<String, TextModelError> {
            Err(TextModelError::Status(503))
        }
    }

    struct RecordingModel {
        prompts: Mutex<Vec<String>>,
        reply: String,
    }

    #[async_trait]
    impl TextModel for RecordingModel {
        async fn generate(&self, prompt: &str) -> Result<String, TextModelError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    fn template(title: &str) -> PostDraft {
        PostDraft {
            title: title.to_string(),
            excerpt: "A stored excerpt".to_string(),
            content: format!("# {title}\n\nStored body."),
            tags: "stored".to_string(),
        }
    }

    #[test]
    fn parse_uses_heading_as_title() {
        let draft = parse_model_reply("# Taming Docker\n\nSome body text.", "Docker Optimization");
        assert_eq!(draft.title, "Taming Docker");
        assert_eq!(draft.content, "# Taming Docker\n\nSome body text.");
    }

    #[test]
    fn parse_falls_back_to_topic_without_heading() {
        let draft = parse_model_reply("No heading here.\n\nBody.", "Docker Optimization");
        assert_eq!(draft.title, "Docker Optimization");
    }

    #[test]
    fn parse_reads_plain_tags_line() {
        let draft = parse_model_reply("# T\n\nBody.\n\nTags: docker, rust, ci", "T");
        assert_eq!(draft.tags, "docker, rust, ci");
    }

    #[test]
    fn parse_reads_bold_tags_line() {
        let draft = parse_model_reply("# T\n\nBody.\n\n**Tags:** docker, rust", "T");
        assert_eq!(draft.tags, "docker, rust");
    }

    #[test]
    fn missing_tags_fall_back_to_topic_words() {
        let draft = parse_model_reply("# T\n\nBody.", "Kubernetes in Production");
        assert_eq!(draft.tags, "kubernetes,in,production,tech,blog");
    }

    #[test]
    fn empty_tags_line_falls_back_and_stops_scanning() {
        let reply = "# T\n\nBody.\n\nTags:\nTags: real, ones";
        let draft = parse_model_reply(reply, "Serverless Computing");
        assert_eq!(draft.tags, "serverless,computing,tech,blog");
    }

    #[test]
    fn fallback_tags_for_empty_topic_keep_suffix() {
        assert_eq!(fallback_tags(""), ",tech,blog");
    }

    #[test]
    fn excerpt_prefers_first_long_paragraph() {
        let long = "x".repeat(120);
        let reply = format!("# T\n\nShort intro.\n\n{long}\n\nIgnored tail.");
        let draft = parse_model_reply(&reply, "T");
        assert_eq!(draft.excerpt, long);
    }

    #[test]
    fn excerpt_keeps_last_short_paragraph_when_nothing_is_long() {
        let draft = parse_model_reply("# T\n\nFirst short.\n\nSecond short.", "T");
        assert_eq!(draft.excerpt, "Second short.");
    }

    #[test]
    fn excerpt_is_truncated_to_150_chars() {
        let long = "y".repeat(400);
        let reply = format!("# T\n\n{long}");
        let draft = parse_model_reply(&reply, "T");
        assert_eq!(draft.excerpt.chars().count(), 150);
    }

    #[test]
    fn excerpt_skips_headings() {
        let draft = parse_model_reply("# T\n\n## Section\n\nActual text.", "T");
        assert_eq!(draft.excerpt, "Actual text.");
    }

    #[test]
    fn default_post_embeds_current_date() {
        let date = current_date();
        let draft = default_post();
        assert_eq!(draft.title, format!("Tech Update - {date}"));
        assert!(draft.content.contains(&date));
        assert_eq!(draft.tags, "tech,update,devops");
    }

    #[tokio::test]
    async fn generates_default_post_without_model_or_templates() {
        let generator = ContentGenerator::new(TemplateStore::default(), None);
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        let post = generator.generate(&mut rng).await;
        assert_eq!(post.source, ContentSource::Default);
        assert!(post.draft.title.starts_with("Tech Update - "));
        assert!(!post.draft.content.is_empty());
    }

    #[tokio::test]
    async fn template_title_gets_date_suffix() {
        let store = TemplateStore::from_templates(vec![template("Stored Post")]);
        let generator = ContentGenerator::new(store, None);
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        let post = generator.generate(&mut rng).await;
        assert_eq!(post.source, ContentSource::Template);
        assert_eq!(post.draft.title, format!("Stored Post - {}", current_date()));
    }

    #[tokio::test]
    async fn model_failure_falls_back_to_template() {
        let store = TemplateStore::from_templates(vec![template("Stored Post")]);
        let generator = ContentGenerator::new(store, Some(Arc::new(FailingModel)));
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        let post = generator.generate(&mut rng).await;
        assert_eq!(post.source, ContentSource::Template);
    }

    #[tokio::test]
    async fn model_reply_becomes_the_draft() {
        let generator = ContentGenerator::new(
            TemplateStore::default(),
            Some(Arc::new(StaticModel {
                reply: "# Model Title\n\nBody text.\n\nTags: one, two".to_string(),
            })),
        );
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        let post = generator.generate(&mut rng).await;
        assert_eq!(post.source, ContentSource::Ai);
        assert_eq!(post.draft.title, "Model Title");
        assert_eq!(post.draft.tags, "one, two");
    }

    fn recording_generator(templates: Vec<PostDraft>) -> (ContentGenerator, Arc<RecordingModel>) {
        let model = Arc::new(RecordingModel {
            prompts: Mutex::new(Vec::new()),
            reply: "# Reply\n\nBody.".to_string(),
        });
        let generator =
            ContentGenerator::new(TemplateStore::from_templates(templates), Some(model.clone()));
        (generator, model)
    }

    // gen_bool(0.5) compares one u64 sample against 2^63, so a constant
    // all-zero stream always lands on the template-as-guide branch and a
    // constant all-ones stream always lands on the topic pool.
    #[tokio::test]
    async fn coin_landing_on_guide_seeds_the_prompt_with_a_template() {
        let (generator, model) = recording_generator(vec![template("Stored Post")]);
        let mut rng = StepRng::new(0, 0);

        generator.generate(&mut rng).await;

        let prompts = model.prompts.lock().unwrap();
        let prompt = prompts.first().expect("one prompt sent");
        assert!(prompt.contains("\"Stored Post\""));
        assert!(prompt.contains("500-800 words"));
    }

    #[tokio::test]
    async fn coin_landing_on_pool_ignores_the_templates() {
        let (generator, model) = recording_generator(vec![template("Stored Post")]);
        let mut rng = StepRng::new(u64::MAX, 0);

        generator.generate(&mut rng).await;

        let prompts = model.prompts.lock().unwrap();
        let prompt = prompts.first().expect("one prompt sent");
        assert!(!prompt.contains("\"Stored Post\""));
        assert!(TECH_TOPICS
            .iter()
            .any(|topic| prompt.contains(&format!("\"{topic}\""))));
    }

    #[tokio::test]
    async fn empty_store_always_draws_from_the_topic_pool() {
        let (generator, model) = recording_generator(Vec::new());
        let mut rng = ChaCha20Rng::seed_from_u64(9);

        generator.generate(&mut rng).await;

        let prompts = model.prompts.lock().unwrap();
        let prompt = prompts.first().expect("one prompt sent");
        assert!(TECH_TOPICS
            .iter()
            .any(|topic| prompt.contains(&format!("\"{topic}\""))));
    }
}
