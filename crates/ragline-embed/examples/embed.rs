use ragline_core::config::RagConfig;
use ragline_core::traits::Embedder;
use ragline_embed::get_default_embedder;

fn main() -> anyhow::Result<()> {
    let config = RagConfig::load()?;
    let embedder = get_default_embedder(&config.embedding, config.store.dimension)?;
    let texts = vec!["hello world".to_string(), "rust embeddings".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("id={} B={} dim={}", embedder.id(), embs.len(), embedder.dim());
    Ok(())
}
