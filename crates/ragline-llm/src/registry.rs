use std::sync::Arc;

use ragline_core::config::{BackendConfig, BackendsConfig};
use ragline_core::traits::ModelGateway;
use ragline_core::types::{BackendSlot, CompletionParams};
use ragline_core::Result;

use crate::openai::OpenAiCompatGateway;

pub type SlotEntry = (Arc<dyn ModelGateway>, CompletionParams);

/// Maps each `BackendSlot` to a gateway and the parameters it is called with.
pub struct GatewayRegistry {
    primary: SlotEntry,
    fallback: SlotEntry,
}

impl GatewayRegistry {
    pub fn new(primary: SlotEntry, fallback: SlotEntry) -> Self { Self { primary, fallback } }

    pub fn from_config(config: &BackendsConfig) -> Result<Self> {
        let build = |slot: BackendSlot, c: &BackendConfig| -> Result<SlotEntry> {
            let name = format!("{slot}:{}", c.provider.as_str());
            let gateway: Arc<dyn ModelGateway> = Arc::new(OpenAiCompatGateway::from_config(&name, c)?);
            Ok((gateway, params_for(c)))
        };
        Ok(Self::new(build(BackendSlot::Primary, &config.primary)?, build(BackendSlot::Fallback, &config.fallback)?))
    }

    pub fn get(&self, slot: BackendSlot) -> (&Arc<dyn ModelGateway>, &CompletionParams) {
        let (gateway, params) = match slot {
            BackendSlot::Primary => &self.primary,
            BackendSlot::Fallback => &self.fallback,
        };
        (gateway, params)
    }
}

pub fn params_for(config: &BackendConfig) -> CompletionParams {
    CompletionParams { model: config.model.clone(), temperature: config.temperature, max_tokens: config.max_tokens }
}
