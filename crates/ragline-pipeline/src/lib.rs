//! Ingestion, retrieval and answer orchestration on top of the embedder,
//! vector store and model gateways.
pub mod boundary;
pub mod ingest;
pub mod orchestrator;
pub mod prompt;
pub mod retrieve;
pub mod system;

pub use boundary::{handle_chat, handle_direct_chat, handle_upload, ChatRequest, DirectChatRequest, UploadResponse};
pub use ingest::{IngestFailure, IngestSummary, Ingestor};
pub use orchestrator::RagOrchestrator;
pub use prompt::PromptBuilder;
pub use retrieve::Retriever;
pub use system::RagSystem;
