//! Typed configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`,
//! `config.<env>.toml` and `APP_*` env vars (`__` separates sections, e.g.
//! `APP_RETRIEVAL__TOP_N=5`). The result is validated once and then passed
//! by reference into every constructor; nothing re-reads it mid-request.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub retrieval: RetrievalConfig,
    pub chunking: ChunkingConfig,
    pub store: StoreConfig,
    pub embedding: EmbeddingConfig,
    pub backends: BackendsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_n: usize,
    /// Calibrated for cosine distance; recalibrate when switching to `l2`.
    pub distance_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self { Self { top_n: 3, distance_threshold: 0.5 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self { Self { chunk_size: 500, chunk_overlap: 100 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    Cosine,
    L2,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::L2 => "l2",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub uri: String,
    pub table: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { uri: "data/lancedb".to_string(), table: "rag_documents".to_string(), dimension: 384, metric: DistanceMetric::Cosine }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model_dir: String,
    pub max_len: usize,
    pub use_hash_embedder: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { model_dir: "models/all-MiniLM-L6-v2".to_string(), max_len: 256, use_hash_embedder: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    DashScope,
    Ollama,
    OpenAi,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::DashScope => "https://dashscope.aliyuncs.com/compatible-mode/v1",
            Provider::Ollama => "http://localhost:11434/v1",
            Provider::OpenAi => "https://api.openai.com/v1",
        }
    }

    pub fn default_api_key_env(&self) -> Option<&'static str> {
        match self {
            Provider::DashScope => Some("DASHSCOPE_API_KEY"),
            Provider::Ollama => None,
            Provider::OpenAi => Some("OPENAI_API_KEY"),
        }
    }

    pub fn requires_api_key(&self) -> bool { !matches!(self, Provider::Ollama) }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::DashScope => "dashscope",
            Provider::Ollama => "ollama",
            Provider::OpenAi => "openai",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub provider: Provider,
    /// Falls back to the provider's default endpoint when unset.
    pub base_url: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
    /// Env var consulted at wiring time when `api_key` is unset.
    pub api_key_env: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: Provider::DashScope,
            base_url: None,
            model: "qwen-plus".to_string(),
            api_key: None,
            api_key_env: None,
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

impl BackendConfig {
    pub fn ollama(model: &str) -> Self {
        Self { provider: Provider::Ollama, model: model.to_string(), timeout_secs: 120, ..Self::default() }
    }

    pub fn resolved_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| self.provider.default_base_url().to_string())
    }

    /// Explicit key first, then the configured env var, then the provider's conventional one.
    pub fn resolved_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Some(key.clone());
        }
        let var = self.api_key_env.as_deref().or(self.provider.default_api_key_env())?;
        env::var(var).ok().filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    pub primary: BackendConfig,
    pub fallback: BackendConfig,
}

impl Default for BackendsConfig {
    fn default() -> Self { Self { primary: BackendConfig::default(), fallback: BackendConfig::ollama("qwen2.5:7b") } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self { Self { level: "info".to_string(), format: LogFormat::Compact } }
}

impl RagConfig {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        debug!(env = %env_name, "loading configuration");
        Self::from_figment(Self::figment_for_env(&env_name))
    }

    pub fn figment_for_env(env_name: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(RagConfig::default())).merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment.merge(Env::prefixed("APP_").split("__"))
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let mut config: RagConfig = figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
        config.store.uri = expand_path(&config.store.uri).to_string_lossy().to_string();
        config.embedding.model_dir = expand_path(&config.embedding.model_dir).to_string_lossy().to_string();
        config.validate()?;
        debug!(store = %config.store.uri, table = %config.store.table, "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.chunking;
        if c.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be positive".to_string()));
        }
        if c.chunk_overlap >= c.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                c.chunk_overlap, c.chunk_size
            )));
        }
        if self.retrieval.top_n == 0 {
            return Err(Error::InvalidConfig("retrieval.top_n must be at least 1".to_string()));
        }
        let t = self.retrieval.distance_threshold;
        if t.is_nan() || t <= 0.0 {
            return Err(Error::InvalidConfig(format!("retrieval.distance_threshold must be positive, got {t}")));
        }
        if self.store.dimension == 0 {
            return Err(Error::InvalidConfig("store.dimension must be positive".to_string()));
        }
        if self.store.table.trim().is_empty() {
            return Err(Error::InvalidConfig("store.table must not be empty".to_string()));
        }
        for (name, b) in [("primary", &self.backends.primary), ("fallback", &self.backends.fallback)] {
            if b.timeout_secs == 0 {
                return Err(Error::InvalidConfig(format!("backends.{name}.timeout_secs must be positive")));
            }
            if b.model.trim().is_empty() {
                return Err(Error::InvalidConfig(format!("backends.{name}.model must not be empty")));
            }
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
