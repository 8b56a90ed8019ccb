//! Domain types shared by the embedders, index clients and the retrieval core.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type ChunkId = String;

/// Coarse topic label attached to a chunk at ingestion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Profile,
    Experience,
    Projects,
    Skills,
    Education,
    Certifications,
    Achievements,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Profile,
        Category::Experience,
        Category::Projects,
        Category::Skills,
        Category::Education,
        Category::Certifications,
        Category::Achievements,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Profile => "profile",
            Category::Experience => "experience",
            Category::Projects => "projects",
            Category::Skills => "skills",
            Category::Education => "education",
            Category::Certifications => "certifications",
            Category::Achievements => "achievements",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| Error::NotFound(format!("category '{}'", needle)))
    }
}

/// Metadata fields the retrieval core understands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub category: Option<Category>,
    /// Record type assigned at ingestion (`project`, `faq`, `technology`, ...).
    pub kind: Option<String>,
    pub name: Option<String>,
    pub tags: Vec<String>,
}

/// Metadata carried through retrieval untouched.
///
/// Records whose metadata is not a JSON object keep the raw value in
/// `Unknown` so they can still be returned and formatted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "value", rename_all = "snake_case")]
pub enum Metadata {
    Known(ChunkMetadata),
    Unknown(serde_json::Value),
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata::Known(ChunkMetadata::default())
    }
}

impl Metadata {
    pub fn category(&self) -> Option<Category> {
        match self {
            Metadata::Known(m) => m.category,
            Metadata::Unknown(_) => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Metadata::Known(m) => m.name.as_deref(),
            Metadata::Unknown(_) => None,
        }
    }

    /// Interpret an arbitrary JSON metadata bag.
    ///
    /// `category` values outside the vocabulary are dropped; `tags` may be an
    /// array or a comma separated string. `type` maps to `kind`.
    pub fn from_json(value: serde_json::Value) -> Self {
        let map = match value {
            serde_json::Value::Object(map) => map,
            other => return Metadata::Unknown(other),
        };
        let text = |key: &str| {
            map.get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let category = text("category").and_then(|c| c.parse().ok());
        let tags = match map.get("tags") {
            Some(serde_json::Value::Array(items)) => {
                normalize_tags(items.iter().filter_map(|t| t.as_str()))
            }
            Some(serde_json::Value::String(joined)) => normalize_tags(joined.split(',')),
            _ => Vec::new(),
        };
        Metadata::Known(ChunkMetadata { category, kind: text("type"), name: text("name"), tags })
    }
}

/// Lowercase, trim, drop empties and duplicates while keeping first-seen order.
pub fn normalize_tags<'a, I>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// A retrievable unit of indexed text with its precomputed embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
}

impl Chunk {
    pub fn category(&self) -> Option<Category> {
        self.metadata.category()
    }
}

/// A chunk returned for one query, with its similarity score.
///
/// `score` is higher-is-better; `token_count` is an estimate used for
/// context budgeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: ChunkId,
    pub text: String,
    pub metadata: Metadata,
    pub score: f32,
    pub token_count: usize,
}

impl ScoredChunk {
    pub fn new(id: impl Into<ChunkId>, text: impl Into<String>, metadata: Metadata, score: f32) -> Self {
        let text = text.into();
        let token_count = estimate_tokens(&text);
        Self { id: id.into(), text, metadata, score: sanitize_score(score), token_count }
    }

    pub fn with_token_count(mut self, token_count: usize) -> Self {
        self.token_count = token_count;
        self
    }

    pub fn category(&self) -> Option<Category> {
        self.metadata.category()
    }
}

/// Non-finite scores from a misbehaving index count as no similarity at all.
pub fn sanitize_score(score: f32) -> f32 {
    if score.is_finite() { score } else { 0.0 }
}

/// Word-based token estimate (about 0.75 words per token).
pub fn estimate_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f32 / 0.75) as usize
}

/// Metadata predicate pushed down to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    CategoryEq(Category),
}

impl Predicate {
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Predicate::CategoryEq(c) => metadata.category() == Some(*c),
        }
    }

    /// SQL filter expression understood by LanceDB `only_if`.
    pub fn to_sql(&self) -> String {
        match self {
            Predicate::CategoryEq(c) => format!("category = '{}'", c.as_str()),
        }
    }
}
