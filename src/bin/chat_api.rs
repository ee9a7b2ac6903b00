use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use wikiqa::config::{CompletionArgs, EmbeddingArgs, IndexArgs, OpenAiArgs, QueryArgs};
use wikiqa::QueryService;

#[derive(Parser, Debug)]
#[command(
    name = "wikiqa-server",
    about = "HTTP chat API answering student questions from the vector index"
)]
struct ServerCli {
    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "WIKIQA_BIND", default_value = "127.0.0.1:3001")]
    bind: String,

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
    let cli = ServerCli::parse();
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
    )
    .with_embedding_cache(cli.query.embedding_cache_size);

    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cli.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    wikiqa::server::serve(listener, Arc::new(service))
        .await
        .context("server shutdown")?;
    Ok(())
}
