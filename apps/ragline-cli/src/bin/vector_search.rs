use clap::Parser;
use ragline_core::config::RagConfig;
use ragline_pipeline::RagSystem;
use serde_json::json;

/// Query the segment store directly, without calling a model.
#[derive(Parser)]
#[command(name = "ragline-search")]
struct Args {
    query: String,
    /// Defaults to retrieval.top_n
    #[arg(long)]
    top_n: Option<usize>,
    /// Defaults to retrieval.distance_threshold
    #[arg(long)]
    threshold: Option<f32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = RagConfig::load().map_err(|e| { eprintln!("Error loading config: {e:#}"); e })?;
    ragline_core::logging::init(&config.logging);
    let system = RagSystem::from_config(&config).await?;
    let retriever = system.retriever();
    let top_n = args.top_n.unwrap_or(retriever.top_n());
    let threshold = args.threshold.unwrap_or(retriever.threshold());

    let result = retriever.retrieve(&args.query, top_n, threshold).await?;
    let hits: Vec<_> = result
        .iter()
        .enumerate()
        .map(|(rank, s)| json!({ "rank": rank + 1, "id": s.id, "distance": s.distance, "text": s.text }))
        .collect();
    println!("{}", serde_json::to_string_pretty(&json!({ "query": args.query, "topN": top_n, "threshold": threshold, "hits": hits }))?);
    Ok(())
}
