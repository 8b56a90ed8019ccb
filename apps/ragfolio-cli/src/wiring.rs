use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use ragfolio_core::config::{expand_path, EmbeddingBackend, Settings};
use ragfolio_core::traits::{Embedder, KnowledgeSource, Translator};
use ragfolio_embed::{resolve_model_dir, HashEmbedder, LocalEmbedder};
use ragfolio_hf::{HfClient, HfDatasetSource, HfEmbedder, HfTranslator};
use ragfolio_retrieval::{CategoryClassifier, ContextService, KnowledgeBaseCache, QueryNormalizer, Retriever};
use ragfolio_vector::LanceChunkIndex;

fn hf_client(settings: &Settings) -> Result<HfClient> {
    let timeout = Duration::from_millis(settings.providers.request_timeout_ms);
    Ok(HfClient::new(settings.providers.hf_token.clone(), timeout)?)
}

/// Translation needs a token; without one queries are matched as typed.
pub fn classifier(settings: &Settings) -> Result<CategoryClassifier> {
    let providers = &settings.providers;
    let translator: Option<Arc<dyn Translator>> = match providers.hf_token.as_deref() {
        Some(token) if !token.trim().is_empty() => Some(Arc::new(HfTranslator::new(
            hf_client(settings)?,
            &providers.hf_base_url,
            &providers.translation_model,
        )) as Arc<dyn Translator>),
        _ => None,
    };
    let normalizer = QueryNormalizer::new(translator, providers.canonical_language);
    Ok(CategoryClassifier::with_keywords(normalizer, &settings.classifier.keywords)?)
}

fn embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    let providers = &settings.providers;
    let embedder: Arc<dyn Embedder> = match providers.embedding_backend {
        EmbeddingBackend::Hf => Arc::new(HfEmbedder::new(
            hf_client(settings)?,
            &providers.hf_base_url,
            &providers.embedding_model,
            providers.embedding_dim,
        )),
        EmbeddingBackend::Local => {
            let configured = providers.local_model_dir.as_deref().map(expand_path);
            let dir = resolve_model_dir(configured.as_deref(), &providers.embedding_model)?;
            Arc::new(LocalEmbedder::load(&dir, &providers.embedding_model)?)
        }
        EmbeddingBackend::Hash => Arc::new(HashEmbedder::new(providers.embedding_dim)),
    };
    info!(model = embedder.model_id(), dim = embedder.dim(), "embedder ready");
    Ok(embedder)
}

pub async fn context_service(settings: &Settings) -> Result<ContextService> {
    let index = LanceChunkIndex::new(&settings.index.uri, &settings.index.table)
        .await
        .with_context(|| format!("opening index at {}", settings.index.uri))?;
    let retriever = Retriever::new(embedder(settings)?, Arc::new(index), classifier(settings)?, settings.retrieval.clone())?;

    let knowledge = &settings.knowledge;
    let source: Option<Arc<dyn KnowledgeSource>> = match &knowledge.dataset_id {
        Some(id) => Some(Arc::new(HfDatasetSource::new(hf_client(settings)?, &knowledge.datasets_base_url, id)) as Arc<dyn KnowledgeSource>),
        None => None,
    };
    let cache = KnowledgeBaseCache::new(source, Duration::from_secs(knowledge.ttl_secs), &knowledge.fallback_text);
    Ok(ContextService::new(
        Arc::new(retriever),
        Arc::new(cache),
        Duration::from_millis(settings.service.retrieve_timeout_ms),
    ))
}
