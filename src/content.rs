//! Generates per-topic study notes: source extract plus model-written Q&A.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;
use tracing::{error, info};

use crate::completion::{CompletionClient, CompletionRequest};
use crate::error::{RagError, Result};
use crate::ingest::TopicFailure;
use crate::query::DEFAULT_COMPLETION_MODEL;
use crate::source::{DirectorySource, TextSource};

/// Topics fetched when none are given.
pub const DEFAULT_TOPICS: [&str; 7] = [
    "Literature",
    "Music",
    "Biology",
    "Chemistry",
    "Mathematics",
    "History",
    "Physics",
];
/// Questions requested per topic.
pub const DEFAULT_QUESTION_COUNT: usize = 5;
/// Q&A generation favours some variety over the grounded-answer setting.
pub const DEFAULT_QA_TEMPERATURE: f32 = 0.7;

/// Knobs for the Q&A generation call.
#[derive(Debug, Clone)]
pub struct ContentOptions {
    /// Completion model identifier.
    pub completion_model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Number of questions to request.
    pub question_count: usize,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            temperature: DEFAULT_QA_TEMPERATURE,
            question_count: DEFAULT_QUESTION_COUNT,
        }
    }
}

/// Files written and topics skipped by [`ContentGenerator::generate_all`].
#[derive(Debug, Default)]
pub struct GenerationSummary {
    /// Markdown files written, in topic order.
    pub written: Vec<PathBuf>,
    /// Topics that failed.
    pub failures: Vec<TopicFailure>,
}

/// Fetches extracts, asks for study questions and writes markdown under a content root.
pub struct ContentGenerator {
    source: Arc<dyn TextSource>,
    completer: Arc<dyn CompletionClient>,
    output: DirectorySource,
    options: ContentOptions,
}

impl ContentGenerator {
    /// Builds a generator writing into `output`'s root.
    pub fn new(
        source: Arc<dyn TextSource>,
        completer: Arc<dyn CompletionClient>,
        output: DirectorySource,
        options: ContentOptions,
    ) -> Self {
        Self {
            source,
            completer,
            output,
            options,
        }
    }

    /// Generates and writes one topic file, returning its path.
    pub async fn generate(&self, topic: &str) -> Result<PathBuf> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(RagError::Validation("topic must not be empty".into()));
        }
        let extract = self.source.fetch(topic).await?;
        let prompt = qa_prompt(topic, &extract, self.options.question_count);
        let qa = self
            .completer
            .complete(&CompletionRequest {
                prompt: &prompt,
                model: &self.options.completion_model,
                temperature: self.options.temperature,
                max_tokens: None,
            })
            .await?;
        let path = self.output.topic_path(topic);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, render_markdown(topic, &extract, &qa)).await?;
        info!(topic, path = %path.display(), "wrote topic content");
        Ok(path)
    }

    /// Generates every topic, logging and skipping failures.
    pub async fn generate_all(&self, topics: &[String]) -> GenerationSummary {
        let mut summary = GenerationSummary::default();
        for topic in topics {
            match self.generate(topic).await {
                Ok(path) => summary.written.push(path),
                Err(err) => {
                    error!(topic = %topic, error = %err, "failed to generate topic content");
                    summary.failures.push(TopicFailure {
                        topic: topic.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }
        summary
    }
}

/// Prompt asking for `count` common student questions with concise answers.
pub fn qa_prompt(topic: &str, text: &str, count: usize) -> String {
    format!(
        "You are an educational assistant. Based on the following content about {topic}, \
         generate {count} common student questions and their concise answers.\n\n\
         Content:\n\"\"\"\n{text}\n\"\"\"\n\n\
         Provide output in Markdown as:\n\n\
         ## Common Questions\n\
         1. **Question 1?** Answer.\n\
         2. **Question 2?** Answer.\n\
         ..."
    )
}

/// `# <Topic>`, the extract, then the generated Q&A section.
pub fn render_markdown(topic: &str, extract: &str, qa: &str) -> String {
    format!("# {}\n\n{}\n\n{}\n", topic, extract.trim(), qa.trim())
}
