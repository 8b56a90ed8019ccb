use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use ragfolio_core::traits::{Embedder, VectorIndex};
use ragfolio_core::{
    Category, Error, PolicyUpdate, Predicate, ProviderError, ProviderKind, Result, RetrievalPolicy, ScoredChunk,
};

use crate::classifier::CategoryClassifier;
use crate::filter::select;
use crate::format::{format_context, FormattedContext};

/// Query-to-context pipeline: normalize, classify, embed, search, re-rank,
/// filter, format.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    classifier: CategoryClassifier,
    policy: RwLock<RetrievalPolicy>,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        classifier: CategoryClassifier,
        policy: RetrievalPolicy,
    ) -> Result<Self> {
        policy.validate()?;
        Ok(Self { embedder, index, classifier, policy: RwLock::new(policy) })
    }

    pub fn policy(&self) -> RetrievalPolicy {
        self.policy.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Apply a partial update. An invalid update leaves the current policy in place.
    pub fn update_policy(&self, update: &PolicyUpdate) -> Result<RetrievalPolicy> {
        let mut guard = self.policy.write().unwrap_or_else(PoisonError::into_inner);
        let next = guard.apply(update)?;
        *guard = next.clone();
        info!(?next, "retrieval policy updated");
        Ok(next)
    }

    pub fn classifier(&self) -> &CategoryClassifier {
        &self.classifier
    }

    pub async fn retrieve_within(&self, query: &str, timeout: Duration) -> Result<FormattedContext> {
        tokio::time::timeout(timeout, self.retrieve(query)).await.map_err(|_| Error::Timeout(timeout))?
    }

    pub async fn retrieve(&self, query: &str) -> Result<FormattedContext> {
        let policy = self.policy();
        if query.trim().is_empty() {
            debug!("blank query, skipping retrieval");
            return Ok(FormattedContext::empty(None));
        }
        let started = Instant::now();

        let normalized = self.classifier.normalizer().normalize(query).await;
        let category = self.classifier.match_category(normalized.text());

        let vector = self.embedder.embed(normalized.text()).await?;
        if vector.len() != self.embedder.dim() {
            return Err(ProviderError::InvalidResponse {
                provider: ProviderKind::Embedding,
                message: format!("expected {} dimensions, got {}", self.embedder.dim(), vector.len()),
            }
            .into());
        }

        let predicate = category.map(Predicate::CategoryEq);
        let mut candidates = self.index.query(&vector, policy.max_chunks, predicate.as_ref()).await?;
        let mut unfiltered_fallback = false;
        if candidates.is_empty() && predicate.is_some() {
            warn!(category = ?category, "category filter matched nothing, retrying unfiltered");
            candidates = self.index.query(&vector, policy.max_chunks, None).await?;
            unfiltered_fallback = true;
        }
        if let Some(category) = category {
            rerank_by_category(&mut candidates, category);
        }

        let selection = select(&candidates, &policy);
        let context = format_context(selection, category, unfiltered_fallback, &policy);
        info!(
            query_len = query.len(),
            category = ?category,
            translated = normalized.is_translated(),
            candidates = candidates.len(),
            selected = context.sources.len(),
            path = context.path.as_str(),
            unfiltered_fallback,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "retrieval complete"
        );
        Ok(context)
    }
}

/// Stable: matching category first, then score descending.
pub fn rerank_by_category(candidates: &mut [ScoredChunk], category: Category) {
    candidates.sort_by(|a, b| {
        let a_match = a.category() == Some(category);
        let b_match = b.category() == Some(category);
        b_match.cmp(&a_match).then_with(|| b.score.total_cmp(&a.score))
    });
}
