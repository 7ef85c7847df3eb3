use std::sync::Arc;
use tracing::{debug, instrument};

use ragline_core::config::RetrievalConfig;
use ragline_core::traits::{Embedder, VectorStore};
use ragline_core::types::RetrievalResult;
use ragline_core::{Error, Result};

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    top_n: usize,
    threshold: f32,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, config: &RetrievalConfig) -> Self {
        Self { embedder, store, top_n: config.top_n, threshold: config.distance_threshold }
    }

    /// Embeds `query` and returns up to `top_n` segments closer than `threshold`.
    /// An empty result is a normal outcome.
    #[instrument(skip(self, query), fields(query_chars = query.chars().count()))]
    pub async fn retrieve(&self, query: &str, top_n: usize, threshold: f32) -> Result<RetrievalResult> {
        if top_n == 0 {
            return Err(Error::Validation("top_n must be at least 1".to_string()));
        }
        if threshold.is_nan() || threshold <= 0.0 {
            return Err(Error::Validation(format!("distance threshold must be positive, got {threshold}")));
        }
        let vector = self.embedder.embed(query)?;
        let result = self.store.query_nearest(&vector, top_n, threshold).await?;
        debug!(hits = result.len(), "retrieved segments");
        Ok(result)
    }

    pub async fn retrieve_default(&self, query: &str) -> Result<RetrievalResult> {
        self.retrieve(query, self.top_n, self.threshold).await
    }

    pub fn top_n(&self) -> usize { self.top_n }
    pub fn threshold(&self) -> f32 { self.threshold }
}
