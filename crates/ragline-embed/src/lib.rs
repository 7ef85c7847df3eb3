use anyhow::{anyhow, Context};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::{PostProcessor, Tokenizer, TruncationParams};
use tracing::{debug, info, warn};

use ragline_core::config::EmbeddingConfig;
use ragline_core::traits::{reject_blank, Embedder};
use ragline_core::{Error, Result};

mod device;
mod pool;
mod tokenize;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_on_device;

/// all-MiniLM-L6-v2 sentence embedder (BERT, mean pooled, L2-normalised).
pub struct MiniLmEmbedder { model: BertModel, tokenizer: Tokenizer, device: Device, dim: usize, max_len: usize, id: String }

impl MiniLmEmbedder {
    pub fn load(model_dir: &Path, max_len: usize) -> anyhow::Result<Self> {
        let device = select_device();
        info!(model_dir = %model_dir.display(), "loading MiniLM embedding model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let special = tokenizer.get_post_processor().map_or(0, |p| p.added_tokens(false));
        if max_len <= special {
            return Err(anyhow!("max_len {max_len} leaves no room for text after {special} special tokens"));
        }
        tokenizer
            .with_truncation(Some(TruncationParams { max_length: max_len, ..TruncationParams::default() }))
            .map_err(|e| anyhow!("invalid truncation for max_len {max_len}: {e}"))?;
        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw)?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw)?["hidden_size"]
            .as_u64()
            .and_then(|d| usize::try_from(d).ok())
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))?;
        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DTYPE, &device);
        let model = BertModel::load(vb, &config)?;
        let name = model_dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "minilm".to_string());
        info!(dim, max_len, "embedding model ready");
        Ok(Self { model, tokenizer, device, dim, max_len, id: format!("minilm:{name}:d{dim}") })
    }

    fn encode(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let v: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if v.len() != self.dim {
            return Err(anyhow!("model produced {} dims, expected {}", v.len(), self.dim));
        }
        if start.elapsed().as_millis() > 100 { debug!(ms = start.elapsed().as_millis() as u64, "slow embedding"); }
        Ok(v)
    }
}

impl Embedder for MiniLmEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        reject_blank(text)?;
        self.encode(text).map_err(|e| Error::Internal(format!("embedding failed: {e:#}")))
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> anyhow::Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let weights = candle_core::pickle::read_all(&pickle)?;
        return Ok(weights.into_iter().collect());
    }
    Err(anyhow!("no model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

/// Deterministic bag-of-tokens embedder for tests and offline development.
///
/// Each token is hashed into one of `dim` buckets; the result is
/// L2-normalised. Identical text gives identical vectors and texts that share
/// no token are orthogonal (up to bucket collisions).
pub struct HashEmbedder { dim: usize, id: String }

impl HashEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim, id: format!("hash:xxh64:d{dim}") } }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        reject_blank(text)?;
        let mut v = vec![0f32; self.dim];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            v[idx] += 0.5 + ((h >> 32) as u32 as f32) / (u32::MAX as f32);
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            return Err(Error::Validation("text has no embeddable tokens".to_string()));
        }
        for x in &mut v { *x /= norm; }
        Ok(v)
    }
}

/// Picks the hash embedder when configured (or `APP_USE_FAKE_EMBEDDINGS=1`),
/// otherwise loads MiniLM from `embedding.model_dir`.
pub fn get_default_embedder(config: &EmbeddingConfig, dim: usize) -> anyhow::Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if config.use_hash_embedder || use_fake {
        warn!(dim, "using HashEmbedder; similarity is lexical only");
        return Ok(Arc::new(HashEmbedder::new(dim)));
    }
    let model_dir = resolve_model_dir(&config.model_dir)?;
    Ok(Arc::new(MiniLmEmbedder::load(&model_dir, config.max_len)?))
}

fn resolve_model_dir(configured: &str) -> anyhow::Result<PathBuf> {
    let p = PathBuf::from(configured);
    if p.join("config.json").exists() { return Ok(p); }
    if let Ok(dir) = std::env::var("MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.join("config.json").exists() { info!(dir = %p.display(), "using MODEL_DIR"); return Ok(p); }
    }
    Err(anyhow!("Could not locate the embedding model directory (tried {configured} and $MODEL_DIR)"))
}
