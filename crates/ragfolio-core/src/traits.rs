use async_trait::async_trait;

use crate::error::{ProviderError, ProviderKind};
use crate::language::Language;
use crate::types::{Predicate, ScoredChunk};

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model; query and corpus must share it.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: ProviderKind::Embedding,
                message: "empty embedding batch".into(),
            })
    }
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Nearest neighbours of `vector`, best first. No match is an empty list.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Predicate>,
    ) -> Result<Vec<ScoredChunk>, ProviderError>;
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String, ProviderError>;
}

/// Source of the static knowledge-base text used when retrieval is unavailable.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    async fn fetch(&self) -> Result<String, ProviderError>;
}
