//! Document ingestion: chunk, embed every chunk, store the batch.
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use ragline_core::chunking::Chunker;
use ragline_core::extract::{extract_text, list_documents};
use ragline_core::traits::{Embedder, VectorStore};
use ragline_core::types::NewSegment;
use ragline_core::{Error, Result};

pub struct Ingestor {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub files_seen: usize,
    pub files_ingested: usize,
    pub segments: usize,
    pub failures: Vec<IngestFailure>,
}

impl Ingestor {
    pub fn new(chunker: Chunker, embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { chunker, embedder, store }
    }

    pub fn chunker(&self) -> &Chunker { &self.chunker }

    /// Stores `text` as one atomic batch and returns the number of segments written.
    #[instrument(skip_all, fields(chars = text.chars().count()))]
    pub async fn ingest_text(&self, text: &str) -> Result<usize> {
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Err(Error::Validation("document has no text to ingest".to_string()));
        }
        let vectors = self.embedder.embed_batch(&chunks)?;
        let segments: Vec<NewSegment> = chunks.into_iter().zip(vectors).map(|(text, vector)| NewSegment { text, vector }).collect();
        let stored = self.store.insert_batch(segments).await?;
        info!(segments = stored, "ingested document");
        Ok(stored)
    }

    pub async fn ingest_file(&self, path: &Path) -> Result<usize> {
        let text = extract_text(path)?;
        self.ingest_text(&text).await
    }

    /// Ingests every readable document under `root`. A failing file is
    /// recorded in the summary and does not stop the walk.
    pub async fn ingest_dir(&self, root: &Path) -> Result<IngestSummary> {
        if !root.is_dir() {
            return Err(Error::Validation(format!("{} is not a directory", root.display())));
        }
        let files = list_documents(root);
        info!(root = %root.display(), files = files.len(), "ingesting directory");
        let pb = ProgressBar::new(files.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}") {
            pb.set_style(style.progress_chars("#>-"));
        }
        let mut summary = IngestSummary { files_seen: files.len(), ..IngestSummary::default() };
        for path in files {
            pb.set_message(path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default());
            match self.ingest_file(&path).await {
                Ok(n) => {
                    summary.files_ingested += 1;
                    summary.segments += n;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping file");
                    summary.failures.push(IngestFailure { path, error: e.to_string() });
                }
            }
            pb.inc(1);
        }
        pb.finish_with_message(format!("{} segments", summary.segments));
        Ok(summary)
    }
}
