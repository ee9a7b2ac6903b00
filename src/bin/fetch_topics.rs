use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use wikiqa::config::{CompletionArgs, OpenAiArgs};
use wikiqa::content::{
    ContentGenerator, ContentOptions, DEFAULT_QA_TEMPERATURE, DEFAULT_QUESTION_COUNT,
    DEFAULT_TOPICS,
};
use wikiqa::{DirectorySource, WikipediaSource};

#[derive(Parser, Debug)]
#[command(
    name = "wikiqa-fetch",
    about = "Fetch Wikipedia introductions and write study notes with generated Q&A"
)]
struct FetchCli {
    /// Topic to fetch (repeatable); defaults to the built-in subject list
    #[arg(long = "topic")]
    topics: Vec<String>,

    /// Directory receiving `<slug>/<slug>.md` files
    #[arg(long, env = "WIKIQA_CONTENT_DIR", default_value = "content")]
    content_dir: String,

    /// Wikipedia language edition
    #[arg(long, env = "WIKIQA_WIKIPEDIA_LANG", default_value = "en")]
    wikipedia_lang: String,

    /// Questions generated per topic
    #[arg(long, default_value_t = DEFAULT_QUESTION_COUNT)]
    questions: usize,

    /// Sampling temperature for question generation
    #[arg(long, default_value_t = DEFAULT_QA_TEMPERATURE)]
    temperature: f32,

    #[command(flatten)]
    openai: OpenAiArgs,

    #[command(flatten)]
    completion: CompletionArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    wikiqa::logging::init();
    let cli = FetchCli::parse();
    let topics = if cli.topics.is_empty() {
        DEFAULT_TOPICS.iter().map(|topic| topic.to_string()).collect()
    } else {
        cli.topics.clone()
    };

    let source = WikipediaSource::new(&cli.wikipedia_lang, cli.openai.timeout())
        .context("invalid Wikipedia settings")?;
    let completer = cli
        .completion
        .build(&cli.openai)
        .context("failed to configure completion provider")?;
    let generator = ContentGenerator::new(
        Arc::new(source),
        completer,
        DirectorySource::new(&cli.content_dir),
        ContentOptions {
            completion_model: cli.completion.model().to_string(),
            temperature: cli.temperature,
            question_count: cli.questions.max(1),
        },
    );

    let summary = generator.generate_all(&topics).await;
    for path in &summary.written {
        println!("wrote {}", path.display());
    }
    for failure in &summary.failures {
        eprintln!("skipped {}: {}", failure.topic, failure.error);
    }
    if summary.written.is_empty() && !summary.failures.is_empty() {
        bail!("no topics were written");
    }
    Ok(())
}
