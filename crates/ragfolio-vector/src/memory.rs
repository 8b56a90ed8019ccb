use async_trait::async_trait;
use std::sync::{PoisonError, RwLock};

use ragfolio_core::traits::VectorIndex;
use ragfolio_core::{Chunk, Predicate, ProviderError, ProviderKind, ScoredChunk};

/// Brute-force cosine index held in memory.
#[derive(Default)]
pub struct MemoryIndex {
    chunks: RwLock<Vec<Chunk>>,
}

impl MemoryIndex {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks: RwLock::new(chunks) }
    }

    pub fn replace_all(&self, chunks: Vec<Chunk>) {
        *self.chunks.write().unwrap_or_else(PoisonError::into_inner) = chunks;
    }

    pub fn len(&self) -> usize {
        self.chunks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Predicate>,
    ) -> Result<Vec<ScoredChunk>, ProviderError> {
        let chunks = self.chunks.read().unwrap_or_else(PoisonError::into_inner);
        let mut hits = Vec::new();
        for chunk in chunks.iter() {
            if filter.is_some_and(|p| !p.matches(&chunk.metadata)) {
                continue;
            }
            if chunk.embedding.len() != vector.len() {
                return Err(ProviderError::Backend {
                    provider: ProviderKind::Index,
                    message: format!(
                        "query dimension {} does not match chunk {} dimension {}",
                        vector.len(),
                        chunk.id,
                        chunk.embedding.len()
                    ),
                });
            }
            let score = cosine(vector, &chunk.embedding);
            hits.push(ScoredChunk::new(chunk.id.clone(), chunk.text.clone(), chunk.metadata.clone(), score));
        }
        // stable: equal scores keep insertion order
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }
}
