use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

use ragfolio_core::{Category, Error, Result};

use crate::language::QueryNormalizer;
use crate::vocabulary::{default_keywords, MATCH_ORDER};

/// Keyword classifier over the fixed category vocabulary.
pub struct CategoryClassifier {
    normalizer: QueryNormalizer,
    patterns: Vec<(Category, Regex)>,
}

impl CategoryClassifier {
    pub fn new(normalizer: QueryNormalizer) -> Result<Self> {
        Self::with_keywords(normalizer, &BTreeMap::new())
    }

    /// `overrides` replaces the built-in list for the categories it names.
    /// The category name itself always matches.
    pub fn with_keywords(normalizer: QueryNormalizer, overrides: &BTreeMap<Category, Vec<String>>) -> Result<Self> {
        let mut patterns = Vec::with_capacity(MATCH_ORDER.len());
        for category in MATCH_ORDER {
            let mut words: Vec<String> = vec![category.as_str().to_string()];
            match overrides.get(&category) {
                Some(custom) => words.extend(custom.iter().map(|w| w.trim().to_lowercase()).filter(|w| !w.is_empty())),
                None => words.extend(default_keywords(category).iter().map(|w| w.to_string())),
            }
            let alternation = words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|");
            let regex = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
                .map_err(|e| Error::InvalidConfig(format!("keywords for {}: {}", category, e)))?;
            patterns.push((category, regex));
        }
        Ok(Self { normalizer, patterns })
    }

    pub fn normalizer(&self) -> &QueryNormalizer {
        &self.normalizer
    }

    /// Match already-normalized text. First category in match order wins.
    pub fn match_category(&self, text: &str) -> Option<Category> {
        self.patterns.iter().find(|(_, re)| re.is_match(text)).map(|(c, _)| *c)
    }

    pub async fn classify(&self, query: &str) -> Option<Category> {
        let normalized = self.normalizer.normalize(query).await;
        let category = self.match_category(normalized.text());
        debug!(category = ?category, translated = normalized.is_translated(), "classified query");
        category
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragfolio_core::Language;

    fn classifier() -> CategoryClassifier {
        CategoryClassifier::new(QueryNormalizer::passthrough(Language::English)).unwrap()
    }

    #[test]
    fn matches_whole_words_case_insensitively() {
        let c = classifier();
        assert_eq!(c.match_category("What cloud platforms have you used?"), Some(Category::Skills));
        assert_eq!(c.match_category("Tell me about your PROJECTS"), Some(Category::Projects));
        assert_eq!(c.match_category("Where did you study? Which degree?"), Some(Category::Education));
        assert_eq!(c.match_category("cloudy weather"), None);
        assert_eq!(c.match_category(""), None);
    }

    #[test]
    fn earlier_category_wins() {
        let c = classifier();
        // "project" (projects) and "work" (experience) both present
        assert_eq!(c.match_category("Which project was your best work?"), Some(Category::Projects));
        assert_eq!(c.match_category("How can I contact you about a job?"), Some(Category::Experience));
    }

    #[test]
    fn overrides_replace_defaults() {
        let mut overrides = BTreeMap::new();
        overrides.insert(Category::Skills, vec!["Rust".to_string()]);
        let c = CategoryClassifier::with_keywords(QueryNormalizer::passthrough(Language::English), &overrides).unwrap();
        assert_eq!(c.match_category("Do you know rust?"), Some(Category::Skills));
        assert_eq!(c.match_category("Any cloud?"), None);
        assert_eq!(c.match_category("list your skills"), Some(Category::Skills));
    }
}
