//! Retrieval thresholds shared by every request.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Process-wide retrieval policy.
///
/// - `min_score`: hard floor below which a chunk is discarded
/// - `score_threshold`: score at or above which a chunk is "high quality"
/// - `max_chunks`: number of candidates fetched from the index, and the output cap
/// - `min_chunks`: lower bound on returned chunks when enough pass the floor
/// - `max_tokens`: optional soft budget on total returned text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalPolicy {
    pub min_score: f32,
    pub score_threshold: f32,
    pub max_chunks: usize,
    pub min_chunks: usize,
    pub max_tokens: Option<usize>,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self { min_score: 0.3, score_threshold: 0.7, max_chunks: 10, min_chunks: 2, max_tokens: Some(2000) }
    }
}

impl RetrievalPolicy {
    pub fn validate(&self) -> Result<()> {
        if !self.min_score.is_finite() || !self.score_threshold.is_finite() {
            return Err(Error::InvalidConfig("retrieval thresholds must be finite".into()));
        }
        if self.max_chunks == 0 {
            return Err(Error::InvalidConfig("max_chunks must be at least 1".into()));
        }
        if self.min_chunks > self.max_chunks {
            return Err(Error::InvalidConfig(format!(
                "min_chunks ({}) exceeds max_chunks ({})",
                self.min_chunks, self.max_chunks
            )));
        }
        if self.max_tokens == Some(0) {
            return Err(Error::InvalidConfig("max_tokens must be at least 1 when set".into()));
        }
        Ok(())
    }

    /// Merge a partial update, returning the new policy only if it is valid.
    pub fn apply(&self, update: &PolicyUpdate) -> Result<Self> {
        let next = Self {
            min_score: update.min_score.unwrap_or(self.min_score),
            score_threshold: update.score_threshold.unwrap_or(self.score_threshold),
            max_chunks: update.max_chunks.unwrap_or(self.max_chunks),
            min_chunks: update.min_chunks.unwrap_or(self.min_chunks),
            max_tokens: update.max_tokens.unwrap_or(self.max_tokens),
        };
        next.validate()?;
        Ok(next)
    }
}

/// Partial policy for runtime tuning. `max_tokens: Some(None)` clears the budget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyUpdate {
    pub min_score: Option<f32>,
    pub score_threshold: Option<f32>,
    pub max_chunks: Option<usize>,
    pub min_chunks: Option<usize>,
    pub max_tokens: Option<Option<usize>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        assert!(RetrievalPolicy::default().validate().is_ok());
    }

    #[test]
    fn apply_rejects_min_above_max() {
        let policy = RetrievalPolicy::default();
        let update = PolicyUpdate { min_chunks: Some(20), ..Default::default() };
        assert!(matches!(policy.apply(&update), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn apply_can_clear_token_budget() {
        let policy = RetrievalPolicy::default();
        let update = PolicyUpdate { max_tokens: Some(None), min_score: Some(0.25), ..Default::default() };
        let next = policy.apply(&update).expect("valid update");
        assert_eq!(next.max_tokens, None);
        assert_eq!(next.min_score, 0.25);
        assert_eq!(next.max_chunks, policy.max_chunks);
    }
}
