//! Request/response shapes exchanged with callers (CLI, or an HTTP layer).
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use ragline_core::types::{BackendSlot, RagAnswer};

use crate::ingest::Ingestor;
use crate::orchestrator::RagOrchestrator;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub use_alternate_backend: Option<bool>,
}

/// A message for one backend, bypassing retrieval. `backend` defaults to
/// the primary slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectChatRequest {
    pub message: String,
    #[serde(default)]
    pub backend: Option<BackendSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub segment_count: usize,
}

pub async fn handle_chat(orchestrator: &RagOrchestrator, request: &ChatRequest) -> RagAnswer {
    orchestrator.answer(&request.message, request.use_alternate_backend.unwrap_or(false)).await
}

pub async fn handle_direct_chat(orchestrator: &RagOrchestrator, request: &DirectChatRequest) -> RagAnswer {
    orchestrator.chat_direct(&request.message, request.backend.unwrap_or(BackendSlot::Primary)).await
}

pub async fn handle_upload(ingestor: &Ingestor, path: &Path) -> UploadResponse {
    let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| path.display().to_string());
    match ingestor.ingest_file(path).await {
        Ok(n) => {
            info!(file = %name, segments = n, "upload ingested");
            UploadResponse { success: true, message: format!("ingested {n} segments from {name}"), segment_count: n }
        }
        Err(e) => UploadResponse { success: false, message: format!("failed to ingest {name}: {e}"), segment_count: 0 },
    }
}
