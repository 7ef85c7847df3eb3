//! Question answering: retrieve, build the prompt, call the first backend
//! and fall back to the other slot once on failure.
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{error, info, instrument, warn};

use ragline_core::types::{BackendSlot, ModelResponse, RagAnswer};
use ragline_core::{Error, ErrorKind};
use ragline_llm::GatewayRegistry;

use crate::prompt::PromptBuilder;
use crate::retrieve::Retriever;

pub struct RagOrchestrator {
    retriever: Retriever,
    registry: GatewayRegistry,
}

impl RagOrchestrator {
    pub fn new(retriever: Retriever, registry: GatewayRegistry) -> Self { Self { retriever, registry } }

    pub fn retriever(&self) -> &Retriever { &self.retriever }

    /// Never fails out-of-band; every outcome is a `RagAnswer`.
    #[instrument(skip(self, question))]
    pub async fn answer(&self, question: &str, use_alternate: bool) -> RagAnswer {
        let question = question.trim();
        if question.is_empty() {
            return RagAnswer::failed(Error::Validation("question must not be empty".to_string()).to_string(), None, Vec::new());
        }

        let retrieved = match self.retriever.retrieve_default(question).await {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "retrieval failed");
                return RagAnswer::failed(format!("document retrieval failed: {e}"), None, Vec::new());
            }
        };
        let sources = retrieved.texts();
        info!(retrieved = sources.len(), "context ready");
        let prompt = PromptBuilder::build(question, &sources);

        let first = if use_alternate { BackendSlot::Fallback } else { BackendSlot::Primary };
        match self.call(first, &prompt).await {
            ModelResponse::Success { text } => return RagAnswer::answered(text, first, sources),
            ModelResponse::Failure { kind, message } => {
                warn!(slot = %first, ?kind, %message, "first backend failed, falling back");
            }
        }

        let second = first.other();
        match self.call(second, &prompt).await {
            ModelResponse::Success { text } => RagAnswer::answered(text, second, sources),
            ModelResponse::Failure { kind, message } => {
                error!(slot = %second, ?kind, %message, "fallback backend failed");
                RagAnswer::failed(message, Some(second), sources)
            }
        }
    }

    /// Sends `message` to one slot as-is: no retrieval, no prompt template
    /// and no fallback.
    #[instrument(skip(self, message))]
    pub async fn chat_direct(&self, message: &str, slot: BackendSlot) -> RagAnswer {
        let message = message.trim();
        if message.is_empty() {
            return RagAnswer::failed(Error::Validation("message must not be empty".to_string()).to_string(), None, Vec::new());
        }
        match self.call(slot, message).await {
            ModelResponse::Success { text } => RagAnswer::answered(text, slot, Vec::new()),
            ModelResponse::Failure { kind, message } => {
                warn!(%slot, ?kind, %message, "direct chat failed");
                RagAnswer::failed(message, Some(slot), Vec::new())
            }
        }
    }

    async fn call(&self, slot: BackendSlot, prompt: &str) -> ModelResponse {
        let (gateway, params) = self.registry.get(slot);
        match AssertUnwindSafe(gateway.complete(prompt, params)).catch_unwind().await {
            Ok(response) => response,
            Err(panic) => ModelResponse::failure(
                ErrorKind::BackendError,
                format!("{} backend panicked: {}", gateway.name(), panic_message(panic.as_ref())),
            ),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
