//! Hugging Face HTTP collaborators: feature-extraction embeddings, NLLB
//! translation and the knowledge-base dataset rows endpoint.

mod client;
pub mod dataset;
pub mod embed;
pub mod translate;

pub use client::HfClient;
pub use dataset::HfDatasetSource;
pub use embed::HfEmbedder;
pub use translate::HfTranslator;
