//! Dynamic relevance filter: decides which retrieved chunks reach the context.
//!
//! Stages, in order: floor filter, quality tiering, score-gap pruning with
//! its `min_chunks` clamp, token packing. Input is in rank order and so is
//! the output. Selection works on rank indices because category re-ranking
//! means scores are not necessarily descending.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ragfolio_core::types::sanitize_score;
use ragfolio_core::{RetrievalPolicy, ScoredChunk};

/// Score drop between neighbours that marks a new relevance tier.
pub const GAP_THRESHOLD: f32 = 0.1;
/// High-quality candidates needed for the abundance path.
pub const HIGH_QUALITY_MIN_COUNT: usize = 3;
/// High-quality candidates taken on the abundance path.
pub const HIGH_QUALITY_TAKE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPath {
    /// No candidates at all.
    Empty,
    /// Nothing passed `min_score`; the single best candidate is returned.
    BelowFloor,
    Abundant,
    GapPruned,
}

impl SelectionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionPath::Empty => "empty",
            SelectionPath::BelowFloor => "below_floor",
            SelectionPath::Abundant => "abundant",
            SelectionPath::GapPruned => "gap_pruned",
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SelectionPath::BelowFloor)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub chunks: Vec<ScoredChunk>,
    pub path: SelectionPath,
}

impl Selection {
    pub fn empty() -> Self {
        Self { chunks: Vec::new(), path: SelectionPath::Empty }
    }
}

pub fn select(candidates: &[ScoredChunk], policy: &RetrievalPolicy) -> Selection {
    if candidates.is_empty() {
        return Selection::empty();
    }
    let score = |i: usize| sanitize_score(candidates[i].score);

    let passing: Vec<usize> = (0..candidates.len()).filter(|&i| score(i) >= policy.min_score).collect();
    if passing.is_empty() {
        let mut best = 0;
        for i in 1..candidates.len() {
            if score(i) > score(best) {
                best = i;
            }
        }
        warn!(candidates = candidates.len(), best_score = score(best), "no chunk above floor, returning best candidate");
        return Selection { chunks: vec![candidates[best].clone()], path: SelectionPath::BelowFloor };
    }

    let high_quality: Vec<usize> = passing.iter().copied().filter(|&i| score(i) >= policy.score_threshold).collect();
    let (mut staged, path) = if high_quality.len() >= HIGH_QUALITY_MIN_COUNT {
        let take = HIGH_QUALITY_TAKE.min(policy.max_chunks);
        (high_quality.into_iter().take(take).collect::<Vec<_>>(), SelectionPath::Abundant)
    } else {
        (gap_prune(&passing, &score, policy), SelectionPath::GapPruned)
    };

    // min_chunks clamp; the abundance path never draws from lower tiers
    if path == SelectionPath::GapPruned {
        let floor = policy.min_chunks.min(passing.len()).min(policy.max_chunks);
        for &i in &passing {
            if staged.len() >= floor {
                break;
            }
            if !staged.contains(&i) {
                staged.push(i);
            }
        }
    }
    staged.sort_unstable();
    staged.truncate(policy.max_chunks);

    let packed = match policy.max_tokens {
        Some(budget) => pack_tokens(candidates, &staged, budget),
        None => staged,
    };
    debug!(
        candidates = candidates.len(),
        passing = passing.len(),
        selected = packed.len(),
        path = path.as_str(),
        "relevance filter"
    );
    Selection { chunks: packed.into_iter().map(|i| candidates[i].clone()).collect(), path }
}

fn gap_prune(passing: &[usize], score: &impl Fn(usize) -> f32, policy: &RetrievalPolicy) -> Vec<usize> {
    let mut kept = vec![passing[0]];
    for pair in passing.windows(2) {
        if kept.len() >= policy.max_chunks {
            break;
        }
        let gap = score(pair[0]) - score(pair[1]);
        if gap > GAP_THRESHOLD && kept.len() >= policy.min_chunks {
            break;
        }
        kept.push(pair[1]);
    }
    kept
}

/// Greedy prefix within `budget`; the first chunk survives even when it alone overflows.
fn pack_tokens(candidates: &[ScoredChunk], staged: &[usize], budget: usize) -> Vec<usize> {
    let mut packed = Vec::with_capacity(staged.len());
    let mut total = 0usize;
    for &i in staged {
        let tokens = candidates[i].token_count;
        if total.saturating_add(tokens) > budget {
            if packed.is_empty() {
                packed.push(i);
            }
            break;
        }
        total += tokens;
        packed.push(i);
    }
    packed
}
