use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

use ragfolio_core::Error;

use crate::format::FormattedContext;
use crate::knowledge::KnowledgeBaseCache;
use crate::orchestrator::Retriever;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    NoRelevantResults,
    TimedOut,
    RetrievalFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContextOutcome {
    Retrieved(FormattedContext),
    /// Static knowledge base used instead of retrieved chunks.
    Fallback { text: String, reason: FallbackReason },
}

impl ContextOutcome {
    pub fn text(&self) -> &str {
        match self {
            ContextOutcome::Retrieved(ctx) => &ctx.text,
            ContextOutcome::Fallback { text, .. } => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ContextOutcome::Fallback { .. })
    }
}

/// Per-turn context for the chat layer. Never fails.
pub struct ContextService {
    retriever: Arc<Retriever>,
    knowledge: Arc<KnowledgeBaseCache>,
    timeout: Duration,
}

impl ContextService {
    pub fn new(retriever: Arc<Retriever>, knowledge: Arc<KnowledgeBaseCache>, timeout: Duration) -> Self {
        Self { retriever, knowledge, timeout }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub async fn context_for(&self, query: &str) -> ContextOutcome {
        let reason = match self.retriever.retrieve_within(query, self.timeout).await {
            Ok(ctx) if !ctx.is_empty() => return ContextOutcome::Retrieved(ctx),
            Ok(_) => FallbackReason::NoRelevantResults,
            Err(Error::Timeout(after)) => {
                warn!(?after, "retrieval timed out, using static knowledge base");
                FallbackReason::TimedOut
            }
            Err(e) => {
                match &e {
                    Error::Provider(p) if p.is_quota_exhausted() => {
                        error!(provider = %p.provider(), error = %p, "OPERATOR ALERT: provider quota exhausted");
                    }
                    _ => warn!(error = %e, "retrieval failed, using static knowledge base"),
                }
                FallbackReason::RetrievalFailed(e.to_string())
            }
        };
        ContextOutcome::Fallback { text: self.knowledge.get().await, reason }
    }
}
