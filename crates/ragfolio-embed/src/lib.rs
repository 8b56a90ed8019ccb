use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use ragfolio_core::traits::Embedder;
use ragfolio_core::{ProviderError, ProviderKind};

pub mod device;
mod hash;
pub mod pool;
pub mod tokenize;

pub use hash::HashEmbedder;
pub use pool::masked_mean_l2;

const DEFAULT_MAX_LEN: usize = 256;

/// Sentence-transformer (BERT family) running in-process on candle.
///
/// Expects a Hugging Face snapshot directory with `config.json`,
/// `tokenizer.json` and either `model.safetensors` or `pytorch_model.bin`.
pub struct LocalEmbedder {
    inner: Arc<LocalModel>,
    model_id: String,
    dim: usize,
}

struct LocalModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl LocalEmbedder {
    pub fn load(model_dir: &Path, model_id: impl Into<String>) -> Result<Self> {
        let device = device::select_device();
        let model_id = model_id.into();
        info!(model = %model_id, dir = %model_dir.display(), "loading local embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        tokenize::prepare_tokenizer(&mut tokenizer, DEFAULT_MAX_LEN)?;

        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(
            &std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?,
        )?;
        let dim = config.hidden_size;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;
        info!(model = %model_id, dim, "local embedding model ready");
        Ok(Self { inner: Arc::new(LocalModel { model, tokenizer, device }), model_id, dim })
    }

    /// Synchronous forward pass on the calling thread.
    pub fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.inner.embed(texts)
    }
}

impl LocalModel {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize::tokenize_batch(&self.tokenizer, texts, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 500 {
            warn!(batch = texts.len(), ?elapsed, "slow local embedding");
        } else {
            debug!(batch = texts.len(), ?elapsed, "local embedding");
        }
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let inner = Arc::clone(&self.inner);
        let texts = texts.to_vec();
        off_executor(move || inner.embed(&texts)).await
    }
}

/// Runs CPU-bound work on the blocking pool so executor timers keep firing.
async fn off_executor<T, F>(work: F) -> Result<T, ProviderError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let backend = |message: String| ProviderError::Backend { provider: ProviderKind::Embedding, message };
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| backend(format!("embedding task failed: {}", e)))?
        .map_err(|e| backend(format!("{:#}", e)))
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let tensors = candle_core::pickle::read_all(&pickle)?;
        return tensors
            .into_iter()
            .map(|(name, t)| Ok((name, t.to_device(device)?)))
            .collect();
    }
    Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

/// Locate the model snapshot: explicit setting, `APP_MODEL_DIR`, `MODEL_DIR`,
/// then `models/<last path segment of model_id>`.
pub fn resolve_model_dir(configured: Option<&Path>, model_id: &str) -> Result<PathBuf> {
    if let Some(dir) = configured {
        if dir.exists() {
            return Ok(dir.to_path_buf());
        }
        return Err(anyhow!("Configured model dir {} does not exist", dir.display()));
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() {
                info!(var, dir = %p.display(), "using model dir from environment");
                return Ok(p);
            }
        }
    }
    let short = model_id.rsplit('/').next().unwrap_or(model_id);
    let local = Path::new("models").join(short);
    if local.exists() {
        return Ok(local);
    }
    Err(anyhow!("Could not locate a model directory for {}", model_id))
}
