use serde::Serialize;

use ragfolio_core::{Category, RetrievalPolicy, ScoredChunk};

use crate::filter::{Selection, SelectionPath};

/// Marker handed to the generator when nothing was retrieved.
pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found.";

const SOURCE_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    High,
    Medium,
    Low,
}

impl QualityTier {
    pub fn for_score(score: f32, policy: &RetrievalPolicy) -> Self {
        if score >= policy.score_threshold {
            QualityTier::High
        } else if score >= policy.min_score {
            QualityTier::Medium
        } else {
            QualityTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::High => "high",
            QualityTier::Medium => "medium",
            QualityTier::Low => "low",
        }
    }
}

/// Context block handed to the answer generator, plus what produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedContext {
    pub text: String,
    pub sources: Vec<ScoredChunk>,
    pub category: Option<Category>,
    pub path: SelectionPath,
    /// The category-filtered search came back empty and was retried unfiltered.
    pub unfiltered_fallback: bool,
}

impl FormattedContext {
    pub fn empty(category: Option<Category>) -> Self {
        Self {
            text: NO_RELEVANT_INFORMATION.to_string(),
            sources: Vec::new(),
            category,
            path: SelectionPath::Empty,
            unfiltered_fallback: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

pub fn format_context(
    selection: Selection,
    category: Option<Category>,
    unfiltered_fallback: bool,
    policy: &RetrievalPolicy,
) -> FormattedContext {
    if selection.chunks.is_empty() {
        return FormattedContext { unfiltered_fallback, ..FormattedContext::empty(category) };
    }
    let text = selection
        .chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("{}\n{}", source_header(i + 1, chunk, policy), chunk.text.trim()))
        .collect::<Vec<_>>()
        .join(SOURCE_SEPARATOR);
    FormattedContext { text, sources: selection.chunks, category, path: selection.path, unfiltered_fallback }
}

fn source_header(n: usize, chunk: &ScoredChunk, policy: &RetrievalPolicy) -> String {
    let tier = QualityTier::for_score(chunk.score, policy);
    let mut parts = vec![format!("Source {}", n), format!("relevance: {} ({:.2})", tier.as_str(), chunk.score)];
    if let Some(category) = chunk.category() {
        parts.push(format!("category: {}", category));
    }
    if let Some(name) = chunk.metadata.name() {
        parts.push(name.to_string());
    }
    format!("[{}]", parts.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragfolio_core::Metadata;

    #[test]
    fn renders_headers_and_separators() {
        let policy = RetrievalPolicy::default();
        let aws = ScoredChunk::new(
            "aws",
            "AWS Lambda, S3 and CloudFront.",
            Metadata::from_json(serde_json::json!({ "category": "skills", "name": "AWS Cloud Platform" })),
            0.812,
        );
        let note = ScoredChunk::new("n", " Loose note ", Metadata::Unknown(serde_json::json!(7)), 0.45);
        let selection = Selection { chunks: vec![aws, note], path: SelectionPath::GapPruned };
        let ctx = format_context(selection, Some(Category::Skills), false, &policy);
        assert_eq!(
            ctx.text,
            "[Source 1 | relevance: high (0.81) | category: skills | AWS Cloud Platform]\nAWS Lambda, S3 and CloudFront.\
             \n\n---\n\n[Source 2 | relevance: medium (0.45)]\nLoose note"
        );
        assert_eq!(ctx.sources.len(), 2);
    }

    #[test]
    fn empty_selection_uses_marker() {
        let ctx = format_context(Selection::empty(), None, true, &RetrievalPolicy::default());
        assert_eq!(ctx.text, NO_RELEVANT_INFORMATION);
        assert!(ctx.is_empty());
        assert!(ctx.unfiltered_fallback);
    }

    #[test]
    fn tiers_follow_policy() {
        let policy = RetrievalPolicy::default();
        assert_eq!(QualityTier::for_score(0.7, &policy), QualityTier::High);
        assert_eq!(QualityTier::for_score(0.3, &policy), QualityTier::Medium);
        assert_eq!(QualityTier::for_score(0.1, &policy), QualityTier::Low);
    }
}
