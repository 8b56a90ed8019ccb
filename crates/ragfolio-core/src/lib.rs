//! Shared vocabulary for the ragfolio workspace: chunk and policy types,
//! collaborator traits, the error taxonomy and configuration loading.

pub mod config;
pub mod error;
pub mod language;
pub mod policy;
pub mod traits;
pub mod types;

pub use error::{Error, ProviderError, ProviderKind, Result};
pub use language::Language;
pub use policy::{PolicyUpdate, RetrievalPolicy};
pub use types::{Category, Chunk, ChunkMetadata, Metadata, Predicate, ScoredChunk};
