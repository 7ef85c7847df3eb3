use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ragline_core::config::RagConfig;
use ragline_core::types::BackendSlot;
use ragline_pipeline::{handle_chat, handle_direct_chat, handle_upload, ChatRequest, DirectChatRequest, RagSystem};
use tracing::info;

#[derive(Parser)]
#[command(name = "ragline", about = "Ingest documents and answer questions over them")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a file or every readable document under a directory
    Ingest { path: PathBuf },
    /// Answer a question from the ingested documents
    Ask {
        question: String,
        /// Call the fallback backend first
        #[arg(long)]
        alternate: bool,
    },
    /// Send a message straight to one backend, without retrieval
    Chat {
        message: String,
        /// primary or fallback
        #[arg(long, default_value = "primary")]
        backend: BackendSlot,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = RagConfig::load().map_err(|e| { eprintln!("Error loading config: {e:#}"); e })?;
    ragline_core::logging::init(&config.logging);
    let system = RagSystem::from_config(&config).await?;

    match cli.command {
        Command::Ingest { path } if path.is_dir() => {
            let summary = system.ingestor().ingest_dir(&path).await?;
            info!(files = summary.files_ingested, segments = summary.segments, failures = summary.failures.len(), "ingest complete");
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Ingest { path } => {
            let response = handle_upload(system.ingestor(), &path).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.success {
                std::process::exit(1);
            }
        }
        Command::Ask { question, alternate } => {
            let request = ChatRequest { message: question, use_alternate_backend: Some(alternate) };
            let answer = handle_chat(system.orchestrator(), &request).await;
            println!("{}", serde_json::to_string_pretty(&answer)?);
            if !answer.success {
                std::process::exit(1);
            }
        }
        Command::Chat { message, backend } => {
            let request = DirectChatRequest { message, backend: Some(backend) };
            let answer = handle_direct_chat(system.orchestrator(), &request).await;
            println!("{}", serde_json::to_string_pretty(&answer)?);
            if !answer.success {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
