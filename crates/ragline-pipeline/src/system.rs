//! Wiring: builds every component once from a validated `RagConfig`.
use std::sync::Arc;
use tracing::info;

use ragline_core::chunking::Chunker;
use ragline_core::config::RagConfig;
use ragline_core::traits::{Embedder, VectorStore};
use ragline_core::{Error, Result};
use ragline_embed::get_default_embedder;
use ragline_llm::GatewayRegistry;
use ragline_vector::LanceVectorStore;

use crate::ingest::Ingestor;
use crate::orchestrator::RagOrchestrator;
use crate::retrieve::Retriever;

pub struct RagSystem {
    ingestor: Ingestor,
    orchestrator: RagOrchestrator,
    store: Arc<dyn VectorStore>,
}

impl RagSystem {
    pub async fn from_config(config: &RagConfig) -> anyhow::Result<Self> {
        let embedder = get_default_embedder(&config.embedding, config.store.dimension)?;
        let store: Arc<dyn VectorStore> = Arc::new(LanceVectorStore::open(&config.store).await?);
        let registry = GatewayRegistry::from_config(&config.backends)?;
        info!(embedder = embedder.id(), store = %config.store.uri, table = %config.store.table, "rag system ready");
        Ok(Self::assemble(config, embedder, store, registry)?)
    }

    /// Builds the system from already constructed parts.
    pub fn assemble(config: &RagConfig, embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, registry: GatewayRegistry) -> Result<Self> {
        if embedder.dim() != store.dim() {
            return Err(Error::InvalidConfig(format!(
                "embedder {} produces {}-dim vectors but the store holds {}-dim vectors",
                embedder.id(),
                embedder.dim(),
                store.dim()
            )));
        }
        let chunker = Chunker::from_config(&config.chunking)?;
        let ingestor = Ingestor::new(chunker, embedder.clone(), store.clone());
        let retriever = Retriever::new(embedder, store.clone(), &config.retrieval);
        Ok(Self { ingestor, orchestrator: RagOrchestrator::new(retriever, registry), store })
    }

    pub fn ingestor(&self) -> &Ingestor { &self.ingestor }
    pub fn orchestrator(&self) -> &RagOrchestrator { &self.orchestrator }
    pub fn retriever(&self) -> &Retriever { self.orchestrator.retriever() }
    pub fn store(&self) -> &Arc<dyn VectorStore> { &self.store }
}
