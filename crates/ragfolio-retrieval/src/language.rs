//! Query normalization into the canonical language.

use std::sync::Arc;
use tracing::{debug, warn};

use ragfolio_core::traits::Translator;
use ragfolio_core::Language;

const STOPWORDS: [(Language, &[&str]); 6] = [
    (Language::English, &["the", "and", "what", "which", "have", "you", "your", "are", "with", "did", "is", "of", "how", "do"]),
    (Language::French, &["le", "la", "les", "des", "est", "quels", "quelles", "quel", "vous", "avez", "tu", "as", "et", "ton", "tes", "votre", "vos", "sur", "du", "une", "qu"]),
    (Language::Spanish, &["el", "los", "las", "qué", "que", "cuáles", "has", "tienes", "usted", "tus", "y", "con", "del", "una", "es"]),
    (Language::German, &["der", "die", "das", "und", "welche", "hast", "du", "sie", "ist", "mit", "ein", "eine", "dein", "deine", "was"]),
    (Language::Italian, &["il", "gli", "che", "quali", "hai", "sei", "tuoi", "tue", "con", "della", "di", "è", "una", "cosa"]),
    (Language::Portuguese, &["os", "as", "quais", "você", "voce", "tem", "seus", "suas", "com", "uma", "não", "é", "do", "da"]),
];

const DIACRITICS: [(Language, &str); 5] = [
    (Language::French, "éèêëàâçùûôœî"),
    (Language::Spanish, "ñ¿¡áíóú"),
    (Language::German, "äöüß"),
    (Language::Italian, "ìòà"),
    (Language::Portuguese, "ãõç"),
];

/// Best-effort language guess from stopwords and diacritics.
///
/// Text with no signal at all is reported as English.
pub fn detect_language(text: &str) -> Language {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .flat_map(|w| w.split('\''))
        .filter(|w| !w.is_empty())
        .collect();

    let mut best = (Language::English, 0usize);
    for lang in Language::ALL {
        let stop_hits = STOPWORDS
            .iter()
            .find(|(l, _)| *l == lang)
            .map(|(_, list)| words.iter().filter(|w| list.contains(*w)).count())
            .unwrap_or(0);
        let accent_hits = DIACRITICS
            .iter()
            .find(|(l, _)| *l == lang)
            .map(|(_, marks)| lower.chars().filter(|c| marks.contains(*c)).count())
            .unwrap_or(0);
        // accents are a stronger signal than short function words
        let score = stop_hits * 2 + accent_hits * 3;
        if score > best.1 {
            best = (lang, score);
        }
    }
    best.0
}

/// Why normalization left the query untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnchangedReason {
    AlreadyCanonical,
    EmptyInput,
    NoTranslator,
    ProviderFailed(String),
    EmptyOutput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Translated { text: String, from: Language },
    Unchanged { text: String, reason: UnchangedReason },
}

impl Translation {
    pub fn text(&self) -> &str {
        match self {
            Translation::Translated { text, .. } | Translation::Unchanged { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Translation::Translated { text, .. } | Translation::Unchanged { text, .. } => text,
        }
    }

    pub fn is_translated(&self) -> bool {
        matches!(self, Translation::Translated { .. })
    }
}

/// Translates queries into the canonical language. Never fails: every
/// degraded path returns the original text with a reason.
#[derive(Clone)]
pub struct QueryNormalizer {
    translator: Option<Arc<dyn Translator>>,
    canonical: Language,
}

impl QueryNormalizer {
    pub fn new(translator: Option<Arc<dyn Translator>>, canonical: Language) -> Self {
        Self { translator, canonical }
    }

    /// Normalizer that never calls out; keyword matching runs on the raw text.
    pub fn passthrough(canonical: Language) -> Self {
        Self { translator: None, canonical }
    }

    pub fn canonical(&self) -> Language {
        self.canonical
    }

    pub async fn normalize(&self, text: &str) -> Translation {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Translation::Unchanged { text: text.to_string(), reason: UnchangedReason::EmptyInput };
        }
        let source = detect_language(trimmed);
        if source == self.canonical {
            return Translation::Unchanged { text: trimmed.to_string(), reason: UnchangedReason::AlreadyCanonical };
        }
        let Some(translator) = &self.translator else {
            debug!(%source, "no translator configured, using original query");
            return Translation::Unchanged { text: trimmed.to_string(), reason: UnchangedReason::NoTranslator };
        };
        match translator.translate(trimmed, source, self.canonical).await {
            Ok(out) if out.trim().is_empty() => {
                warn!(%source, "translation returned empty text, using original query");
                Translation::Unchanged { text: trimmed.to_string(), reason: UnchangedReason::EmptyOutput }
            }
            Ok(out) => {
                debug!(%source, target = %self.canonical, "query translated");
                Translation::Translated { text: out.trim().to_string(), from: source }
            }
            Err(e) => {
                warn!(%source, error = %e, "translation failed, using original query");
                Translation::Unchanged { text: trimmed.to_string(), reason: UnchangedReason::ProviderFailed(e.to_string()) }
            }
        }
    }
}
