use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which outbound collaborator failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Embedding,
    Index,
    Translation,
    KnowledgeBase,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProviderKind::Embedding => "embedding",
            ProviderKind::Index => "index",
            ProviderKind::Translation => "translation",
            ProviderKind::KnowledgeBase => "knowledge_base",
        })
    }
}

/// Failure of an embedding, index, translation or dataset call.
///
/// Never retried inside the retrieval core.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} provider rejected credentials: {message}")]
    Auth { provider: ProviderKind, message: String },

    #[error("{provider} provider quota exhausted: {message}")]
    QuotaExhausted { provider: ProviderKind, message: String },

    #[error("{provider} provider unreachable: {message}")]
    Network { provider: ProviderKind, message: String },

    #[error("{provider} provider returned HTTP {status}: {message}")]
    Status { provider: ProviderKind, status: u16, message: String },

    #[error("{provider} provider returned an unusable response: {message}")]
    InvalidResponse { provider: ProviderKind, message: String },

    #[error("{provider} backend failed: {message}")]
    Backend { provider: ProviderKind, message: String },
}

const QUOTA_MARKERS: [&str; 6] = ["quota", "rate limit", "insufficient", "credits", "payment", "billing"];

impl ProviderError {
    /// Classify a non-success HTTP response.
    pub fn from_status(provider: ProviderKind, status: u16, body: &str) -> Self {
        let message = if body.trim().is_empty() { format!("HTTP {}", status) } else { body.trim().to_string() };
        let lower = message.to_lowercase();
        match status {
            401 | 403 => ProviderError::Auth { provider, message },
            402 | 429 => ProviderError::QuotaExhausted { provider, message },
            _ if QUOTA_MARKERS.iter().any(|m| lower.contains(m)) => {
                ProviderError::QuotaExhausted { provider, message }
            }
            _ => ProviderError::Status { provider, status, message },
        }
    }

    pub fn provider(&self) -> ProviderKind {
        match self {
            ProviderError::Auth { provider, .. }
            | ProviderError::QuotaExhausted { provider, .. }
            | ProviderError::Network { provider, .. }
            | ProviderError::Status { provider, .. }
            | ProviderError::InvalidResponse { provider, .. }
            | ProviderError::Backend { provider, .. } => *provider,
        }
    }

    /// Token or credit exhaustion; an operator has to act on these.
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, ProviderError::QuotaExhausted { .. })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Retrieval timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, Error>;
