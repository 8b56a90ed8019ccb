//! Retrieval engine: query normalization, category classification, the
//! dynamic relevance filter and the orchestrator that ties them to an
//! embedder and a vector index.

pub mod classifier;
pub mod filter;
pub mod format;
pub mod knowledge;
pub mod language;
pub mod orchestrator;
pub mod service;
pub mod vocabulary;

pub use classifier::CategoryClassifier;
pub use filter::{select, Selection, SelectionPath};
pub use format::{FormattedContext, QualityTier, NO_RELEVANT_INFORMATION};
pub use knowledge::{CachedKnowledge, Clock, KnowledgeBaseCache, SystemClock};
pub use language::{detect_language, QueryNormalizer, Translation, UnchangedReason};
pub use orchestrator::Retriever;
pub use service::{ContextOutcome, ContextService, FallbackReason};
