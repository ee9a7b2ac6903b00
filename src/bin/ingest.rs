use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use wikiqa::config::{EmbeddingArgs, IndexArgs, IngestArgs, OpenAiArgs};
use wikiqa::content::DEFAULT_TOPICS;
use wikiqa::{DirectorySource, IngestionPipeline, WikipediaSource};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum SourceKind {
    /// Markdown files written by wikiqa-fetch
    Directory,
    /// Wikipedia introductions fetched live
    Wikipedia,
}

#[derive(Parser, Debug)]
#[command(
    name = "wikiqa-ingest",
    about = "Chunk topic text, embed each chunk and upsert it into the vector index"
)]
struct IngestCli {
    /// Topic to ingest (repeatable); defaults to every topic the source knows
    #[arg(long = "topic")]
    topics: Vec<String>,

    /// Where topic text comes from
    #[arg(long, env = "WIKIQA_SOURCE", value_enum, default_value_t = SourceKind::Directory)]
    source: SourceKind,

    /// Content root for the directory source
    #[arg(long, env = "WIKIQA_CONTENT_DIR", default_value = "content")]
    content_dir: String,

    /// Wikipedia language edition for the wikipedia source
    #[arg(long, env = "WIKIQA_WIKIPEDIA_LANG", default_value = "en")]
    wikipedia_lang: String,

    #[command(flatten)]
    ingest: IngestArgs,

    #[command(flatten)]
    openai: OpenAiArgs,

    #[command(flatten)]
    embedding: EmbeddingArgs,

    #[command(flatten)]
    index: IndexArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    wikiqa::logging::init();
    let cli = IngestCli::parse();
    let embedder = cli
        .embedding
        .build(&cli.openai)
        .context("failed to configure embedding client")?;
    let index = cli
        .index
        .build(cli.openai.timeout(), true)
        .await
        .context("failed to connect to vector index")?;
    let pipeline = IngestionPipeline::new(embedder, index, cli.ingest.options(&cli.embedding));

    let report = match cli.source {
        SourceKind::Directory => {
            let source = DirectorySource::new(&cli.content_dir);
            let topics = if cli.topics.is_empty() {
                source
                    .list_topics()
                    .await
                    .with_context(|| format!("failed to list topics under {}", cli.content_dir))?
            } else {
                cli.topics.clone()
            };
            pipeline.ingest(&source, &topics).await
        }
        SourceKind::Wikipedia => {
            let source = WikipediaSource::new(&cli.wikipedia_lang, cli.openai.timeout())?;
            let topics = if cli.topics.is_empty() {
                DEFAULT_TOPICS.iter().map(|topic| topic.to_string()).collect()
            } else {
                cli.topics.clone()
            };
            pipeline.ingest(&source, &topics).await
        }
    }
    .context("ingestion aborted")?;

    println!(
        "ingested {} documents ({} chunks upserted, {} failed)",
        report.documents_processed,
        report.chunks_upserted,
        report.failures.len()
    );
    for failure in &report.failures {
        eprintln!("  {}: {}", failure.topic, failure.error);
    }
    Ok(())
}
