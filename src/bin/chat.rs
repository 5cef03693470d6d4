use std::error::Error;

use clap::Parser;
use photo_chat_rs::{BackendKind, backend_from_env};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Chat with one of the interchangeable backends.
///
/// Prompts come from the command line, or from stdin one per line.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// echo, hosted or agent
    #[arg(long, default_value = "echo")]
    backend: BackendKind,

    /// Model id for the hosted and agent backends
    #[arg(long)]
    model: Option<String>,

    /// Single prompt; omit to read from stdin
    prompt: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let backend = backend_from_env(args.backend, args.model.as_deref())?;

    if !args.prompt.is_empty() {
        let reply = backend.chat(&args.prompt.join(" ")).await?;
        println!("{}: {}", reply.role, reply.response);
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        let reply = backend.chat(prompt).await?;
        println!("{}: {}", reply.role, reply.response);
    }

    Ok(())
}
