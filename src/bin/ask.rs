use anyhow::{bail, Context, Result};
use clap::Parser;
use wikiqa::config::{CompletionArgs, EmbeddingArgs, IndexArgs, OpenAiArgs, QueryArgs};
use wikiqa::QueryService;

#[derive(Parser, Debug)]
#[command(
    name = "wikiqa-ask",
    about = "Answer one question from the terminal using the vector index"
)]
struct AskCli {
    /// Question to answer
    question: String,

    /// Only print the assembled prompt (skip the completion call)
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    #[command(flatten)]
    query: QueryArgs,

    #[command(flatten)]
    openai: OpenAiArgs,

    #[command(flatten)]
    embedding: EmbeddingArgs,

    #[command(flatten)]
    completion: CompletionArgs,

    #[command(flatten)]
    index: IndexArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    wikiqa::logging::init();
    let cli = AskCli::parse();
    if cli.question.trim().is_empty() {
        bail!("question must not be empty");
    }
    let embedder = cli
        .embedding
        .build(&cli.openai)
        .context("failed to configure embedding client")?;
    let completer = cli
        .completion
        .build(&cli.openai)
        .context("failed to configure completion provider")?;
    let index = cli
        .index
        .build(cli.openai.timeout(), false)
        .await
        .context("failed to connect to vector index")?;
    let service = QueryService::new(
        embedder,
        index,
        completer,
        cli.query.options(&cli.embedding, &cli.completion),
    );

    if cli.dry_run {
        let prompt = service.prompt_for(&cli.question).await?;
        println!("--- Prompt ---\n{prompt}");
        println!("dry-run enabled; skipping completion call.");
        return Ok(());
    }
    let answer = service.answer(&cli.question).await?;
    println!("--- Answer ---\n{answer}");
    Ok(())
}
