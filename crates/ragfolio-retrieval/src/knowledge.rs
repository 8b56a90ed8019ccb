//! TTL cache in front of the static knowledge base.

use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, error, warn};

use ragfolio_core::traits::KnowledgeSource;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedKnowledge {
    pub text: String,
    pub fetched_at: DateTime<Utc>,
}

/// Returns the cached text while younger than the TTL, otherwise refetches.
///
/// The lock is only held to read or swap the `Arc`; concurrent refetches
/// may race and the last writer wins. A failed fetch returns the fallback
/// text and leaves the cache untouched.
pub struct KnowledgeBaseCache {
    source: Option<Arc<dyn KnowledgeSource>>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    fallback_text: String,
    slot: RwLock<Option<Arc<CachedKnowledge>>>,
}

impl KnowledgeBaseCache {
    pub fn new(source: Option<Arc<dyn KnowledgeSource>>, ttl: Duration, fallback_text: impl Into<String>) -> Self {
        Self::with_clock(source, ttl, fallback_text, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Option<Arc<dyn KnowledgeSource>>,
        ttl: Duration,
        fallback_text: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365));
        Self { source, clock, ttl, fallback_text: fallback_text.into(), slot: RwLock::new(None) }
    }

    pub async fn get(&self) -> String {
        if let Some(cached) = self.fresh() {
            return cached.text.clone();
        }
        let Some(source) = &self.source else {
            return self.fallback_text.clone();
        };
        match source.fetch().await {
            Ok(text) => {
                let entry = Arc::new(CachedKnowledge { text, fetched_at: self.clock.now() });
                *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(entry.clone());
                debug!(len = entry.text.len(), "knowledge base cached");
                entry.text.clone()
            }
            Err(e) => {
                if e.is_quota_exhausted() {
                    error!(provider = %e.provider(), error = %e, "OPERATOR ALERT: knowledge base provider quota exhausted");
                } else {
                    warn!(error = %e, "knowledge base fetch failed, using fallback text");
                }
                self.fallback_text.clone()
            }
        }
    }

    pub fn invalidate(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Current entry regardless of age.
    pub fn cached(&self) -> Option<Arc<CachedKnowledge>> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn fresh(&self) -> Option<Arc<CachedKnowledge>> {
        let entry = self.cached()?;
        (self.clock.now() - entry.fetched_at < self.ttl).then_some(entry)
    }
}
