use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{CompletionParams, ModelResponse, NewSegment, RetrievalResult};

pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g. `minilm:all-MiniLM-L6-v2:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    /// Deterministic, fixed-length embedding. Blank input is a validation error.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Shared guard for embedder implementations.
pub fn reject_blank(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::Validation("cannot embed empty text".to_string()));
    }
    Ok(())
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    fn dim(&self) -> usize;
    /// Stores the whole batch or nothing.
    async fn insert_batch(&self, segments: Vec<NewSegment>) -> Result<usize>;
    /// Rows with `distance >= threshold` are excluded by the store itself.
    async fn query_nearest(&self, vector: &[f32], top_n: usize, threshold: f32) -> Result<RetrievalResult>;
    async fn count(&self) -> Result<usize>;
}

#[async_trait]
pub trait ModelGateway: Send + Sync {
    fn name(&self) -> &str;
    /// Never fails out-of-band: every problem is a `ModelResponse::Failure`.
    async fn complete(&self, prompt: &str, params: &CompletionParams) -> ModelResponse;
}
