//! Gateway for any backend speaking the OpenAI `chat/completions` dialect
//! (DashScope compatible mode, Ollama's `/v1`, OpenAI itself).
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use ragline_core::config::{BackendConfig, Provider};
use ragline_core::traits::ModelGateway;
use ragline_core::types::{CompletionParams, ModelResponse};
use ragline_core::{Error, ErrorKind};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

pub struct OpenAiCompatGateway {
    name: String,
    provider: Provider,
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatGateway {
    pub fn new(name: &str, provider: Provider, base_url: &str, api_key: Option<String>, timeout: Duration) -> ragline_core::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("building HTTP client for {name}: {e}")))?;
        Ok(Self {
            name: name.to_string(),
            provider,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            client,
        })
    }

    pub fn from_config(name: &str, config: &BackendConfig) -> ragline_core::Result<Self> {
        Self::new(
            name,
            config.provider,
            &config.resolved_base_url(),
            config.resolved_api_key(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }

    fn bearer(&self) -> Result<String, ModelResponse> {
        match (&self.api_key, self.provider) {
            (Some(key), _) => Ok(key.clone()),
            (None, Provider::Ollama) => Ok("ollama".to_string()),
            (None, p) => {
                let var = p.default_api_key_env().unwrap_or("an API key");
                Err(ModelResponse::failure(
                    ErrorKind::ValidationError,
                    format!("{} backend has no API key; set {var}", p.as_str()),
                ))
            }
        }
    }

    async fn call(&self, prompt: &str, params: &CompletionParams) -> ModelResponse {
        let bearer = match self.bearer() {
            Ok(b) => b,
            Err(failure) => return failure,
        };
        let body = ChatRequest {
            model: &params.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };
        let response = match self.client.post(&self.endpoint).bearer_auth(bearer).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                let what = if e.is_timeout() { "timed out" } else { "unreachable" };
                return ModelResponse::failure(ErrorKind::Unavailable, format!("{} backend {what}: {e}", self.name));
            }
        };
        let status = response.status();
        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => return ModelResponse::failure(ErrorKind::Unavailable, format!("{} backend dropped the response: {e}", self.name)),
        };
        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&text).map(|e| e.error.message).unwrap_or(text);
            return ModelResponse::failure(ErrorKind::BackendError, format!("{} backend returned {}: {}", self.name, status.as_u16(), detail));
        }
        let parsed: ChatResponse = match serde_json::from_str(&text) {
            Ok(p) => p,
            Err(e) => return ModelResponse::failure(ErrorKind::BackendError, format!("{} backend sent an undecodable body: {e}", self.name)),
        };
        match parsed.choices.into_iter().next() {
            None => ModelResponse::failure(ErrorKind::BackendError, format!("{} backend returned no choices", self.name)),
            Some(choice) => match choice.message.content.filter(|c| !c.trim().is_empty()) {
                Some(content) => ModelResponse::success(content),
                None => ModelResponse::failure(ErrorKind::BackendError, format!("{} backend returned an empty answer", self.name)),
            },
        }
    }
}

#[async_trait]
impl ModelGateway for OpenAiCompatGateway {
    fn name(&self) -> &str { &self.name }

    async fn complete(&self, prompt: &str, params: &CompletionParams) -> ModelResponse {
        let start = Instant::now();
        let response = self.call(prompt, params).await;
        let ms = start.elapsed().as_millis() as u64;
        match &response {
            ModelResponse::Success { text } => debug!(backend = %self.name, model = %params.model, ms, chars = text.len(), "completion ok"),
            ModelResponse::Failure { kind, message } => warn!(backend = %self.name, model = %params.model, ms, ?kind, %message, "completion failed"),
        }
        response
    }
}
