use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use ragfolio_core::traits::Embedder;
use ragfolio_core::{ProviderError, ProviderKind};

use crate::client::HfClient;

/// Remote sentence embeddings through the Inference API feature-extraction pipeline.
pub struct HfEmbedder {
    client: HfClient,
    base_url: String,
    model: String,
    dim: usize,
}

impl HfEmbedder {
    pub fn new(client: HfClient, base_url: impl Into<String>, model: impl Into<String>, dim: usize) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url, model: model.into(), dim }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}/pipeline/feature-extraction", self.base_url, self.model)
    }
}

#[async_trait]
impl Embedder for HfEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({ "inputs": texts, "options": { "wait_for_model": true } });
        let raw: Value = self.client.post_json(ProviderKind::Embedding, &self.endpoint(), &body).await?;
        let vectors = parse_feature_extraction(&raw, texts.len()).map_err(|message| {
            ProviderError::InvalidResponse { provider: ProviderKind::Embedding, message }
        })?;
        debug!(model = %self.model, batch = texts.len(), "remote embedding");
        Ok(vectors)
    }
}

/// Accepts one vector (`[f32]`), pooled vectors (`[[f32]]`) or token-level
/// vectors (`[[[f32]]]`, mean-pooled per input).
pub fn parse_feature_extraction(raw: &Value, expected: usize) -> Result<Vec<Vec<f32>>, String> {
    let vectors = match depth(raw) {
        1 => vec![as_vector(raw)?],
        2 => as_matrix(raw)?,
        3 => {
            let inputs = raw.as_array().ok_or("expected an array")?;
            inputs.iter().map(|tokens| as_matrix(tokens).and_then(mean_pool)).collect::<Result<Vec<_>, _>>()?
        }
        d => return Err(format!("unexpected feature-extraction nesting depth {}", d)),
    };
    if vectors.len() != expected {
        return Err(format!("expected {} embeddings, got {}", expected, vectors.len()));
    }
    Ok(vectors)
}

fn depth(v: &Value) -> usize {
    match v {
        Value::Array(items) => 1 + items.first().map(depth).unwrap_or(0),
        _ => 0,
    }
}

fn as_vector(v: &Value) -> Result<Vec<f32>, String> {
    let items = v.as_array().ok_or("expected an array of numbers")?;
    items
        .iter()
        .map(|x| x.as_f64().map(|f| f as f32).ok_or_else(|| format!("non-numeric component {}", x)))
        .collect()
}

fn as_matrix(v: &Value) -> Result<Vec<Vec<f32>>, String> {
    v.as_array().ok_or("expected an array of vectors")?.iter().map(as_vector).collect()
}

fn mean_pool(tokens: Vec<Vec<f32>>) -> Result<Vec<f32>, String> {
    let width = tokens.first().map(Vec::len).ok_or("empty token matrix")?;
    let mut mean = vec![0f32; width];
    for token in &tokens {
        if token.len() != width {
            return Err("ragged token matrix".to_string());
        }
        for (m, x) in mean.iter_mut().zip(token) {
            *m += x;
        }
    }
    let n = tokens.len() as f32;
    mean.iter_mut().for_each(|m| *m /= n);
    Ok(mean)
}
