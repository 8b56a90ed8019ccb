#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ragfolio_core::traits::{Embedder, KnowledgeSource, Translator, VectorIndex};
use ragfolio_core::{Language, Metadata, Predicate, ProviderError, ProviderKind, RetrievalPolicy, ScoredChunk};
use ragfolio_retrieval::{CategoryClassifier, QueryNormalizer, Retriever};

pub fn chunk(id: &str, score: f32, category: &str) -> ScoredChunk {
    let metadata = Metadata::from_json(serde_json::json!({ "category": category, "name": id }));
    ScoredChunk::new(id, format!("text for {}", id), metadata, score)
}

pub fn scored(scores: &[f32]) -> Vec<ScoredChunk> {
    scores.iter().enumerate().map(|(i, s)| chunk(&format!("c{}", i), *s, "skills")).collect()
}

pub fn ids(chunks: &[ScoredChunk]) -> Vec<String> {
    chunks.iter().map(|c| c.id.clone()).collect()
}

/// Returns a fixed vector; counts calls.
pub struct FixedEmbedder {
    pub dim: usize,
    pub returned_len: usize,
    pub calls: AtomicUsize,
    pub fail: Option<fn() -> ProviderError>,
    pub texts: Mutex<Vec<String>>,
}

impl FixedEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, returned_len: dim, calls: AtomicUsize::new(0), fail: None, texts: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    fn model_id(&self) -> &str {
        "fixed"
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().extend(texts.iter().cloned());
        if let Some(fail) = self.fail {
            return Err(fail());
        }
        Ok(texts.iter().map(|_| vec![0.5; self.returned_len]).collect())
    }
}

/// Answers filtered and unfiltered queries from scripted lists, recording each predicate.
#[derive(Default)]
pub struct ScriptedIndex {
    pub filtered: Vec<ScoredChunk>,
    pub unfiltered: Vec<ScoredChunk>,
    pub delay: Option<Duration>,
    pub fail: bool,
    pub calls: Mutex<Vec<Option<Predicate>>>,
}

impl ScriptedIndex {
    pub fn calls(&self) -> Vec<Option<Predicate>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorIndex for ScriptedIndex {
    async fn query(
        &self,
        _vector: &[f32],
        top_k: usize,
        filter: Option<&Predicate>,
    ) -> Result<Vec<ScoredChunk>, ProviderError> {
        self.calls.lock().unwrap().push(filter.copied());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ProviderError::Network { provider: ProviderKind::Index, message: "connection reset".into() });
        }
        let source = if filter.is_some() { &self.filtered } else { &self.unfiltered };
        Ok(source.iter().take(top_k).cloned().collect())
    }
}

pub struct MapTranslator {
    pub output: Result<String, fn() -> ProviderError>,
}

#[async_trait]
impl Translator for MapTranslator {
    async fn translate(&self, _text: &str, _source: Language, _target: Language) -> Result<String, ProviderError> {
        match &self.output {
            Ok(s) => Ok(s.clone()),
            Err(f) => Err(f()),
        }
    }
}

pub struct CountingSource {
    pub text: String,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl CountingSource {
    pub fn new(text: &str) -> Self {
        Self { text: text.to_string(), fail: false, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeSource for CountingSource {
    async fn fetch(&self) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::QuotaExhausted {
                provider: ProviderKind::KnowledgeBase,
                message: "monthly credits exceeded".into(),
            });
        }
        Ok(self.text.clone())
    }
}

pub fn passthrough_classifier() -> CategoryClassifier {
    CategoryClassifier::new(QueryNormalizer::passthrough(Language::English)).unwrap()
}

pub fn retriever(embedder: Arc<FixedEmbedder>, index: Arc<ScriptedIndex>) -> Retriever {
    Retriever::new(embedder, index, passthrough_classifier(), RetrievalPolicy::default()).unwrap()
}
