//! Chat-completion backends behind the `ModelGateway` trait.
pub mod openai;
pub mod registry;

pub use openai::OpenAiCompatGateway;
pub use registry::GatewayRegistry;
