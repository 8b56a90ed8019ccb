mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use ragfolio_core::traits::Embedder;
use ragfolio_core::{Category, Error, Language, PolicyUpdate, Predicate, ProviderError, ProviderKind, RetrievalPolicy};
use ragfolio_embed::HashEmbedder;
use ragfolio_retrieval::{CategoryClassifier, QueryNormalizer, Retriever, SelectionPath, NO_RELEVANT_INFORMATION};
use ragfolio_vector::MemoryIndex;

#[tokio::test]
async fn cloud_platforms_scenario() {
    let embedder = Arc::new(FixedEmbedder::new(3));
    let index = Arc::new(ScriptedIndex {
        filtered: vec![
            chunk("aws", 0.81, "skills"),
            chunk("azure", 0.78, "skills"),
            chunk("gcp", 0.76, "skills"),
            chunk("excel", 0.42, "skills"),
        ],
        ..Default::default()
    });
    let retriever = retriever(embedder.clone(), index.clone());

    let ctx = retriever.retrieve("What cloud platforms have you used?").await.expect("retrieve");
    assert_eq!(ctx.category, Some(Category::Skills));
    assert_eq!(ids(&ctx.sources), vec!["aws", "azure", "gcp"]);
    assert_eq!(ctx.path, SelectionPath::Abundant);
    assert!(!ctx.unfiltered_fallback);
    assert!(ctx.text.starts_with("[Source 1 | relevance: high (0.81) | category: skills | aws]"));
    assert_eq!(index.calls(), vec![Some(Predicate::CategoryEq(Category::Skills))]);
    assert_eq!(embedder.calls(), 1);
}

#[tokio::test]
async fn empty_filtered_search_falls_back_to_unfiltered() {
    let unfiltered = vec![chunk("p1", 0.66, "projects"), chunk("p2", 0.64, "profile"), chunk("p3", 0.2, "projects")];
    let index = Arc::new(ScriptedIndex { unfiltered: unfiltered.clone(), ..Default::default() });
    let retriever = retriever(Arc::new(FixedEmbedder::new(3)), index.clone());

    let ctx = retriever.retrieve("Which certifications do you hold?").await.expect("retrieve");
    assert_eq!(ctx.category, Some(Category::Certifications));
    assert!(ctx.unfiltered_fallback);
    assert_eq!(index.calls(), vec![Some(Predicate::CategoryEq(Category::Certifications)), None]);

    // same size as a plain unfiltered retrieval under the same policy
    let plain = ragfolio_retrieval::select(&unfiltered, &retriever.policy());
    assert_eq!(ctx.sources.len(), plain.chunks.len());
    assert_eq!(ids(&ctx.sources), vec!["p1", "p2"]);
}

#[tokio::test]
async fn unclassified_query_searches_without_filter() {
    let index = Arc::new(ScriptedIndex { unfiltered: scored(&[0.5, 0.45]), ..Default::default() });
    let retriever = retriever(Arc::new(FixedEmbedder::new(3)), index.clone());
    let ctx = retriever.retrieve("hello there").await.expect("retrieve");
    assert_eq!(ctx.category, None);
    assert!(!ctx.unfiltered_fallback);
    assert_eq!(index.calls(), vec![None]);
    assert_eq!(ctx.sources.len(), 2);
}

#[tokio::test]
async fn category_matches_are_ranked_first() {
    let mut other = chunk("other", 0.9, "projects");
    other.text = "unrelated".into();
    let index = Arc::new(ScriptedIndex {
        // predicate pushdown is advisory; the index may still leak other categories
        filtered: vec![other, chunk("low", 0.5, "skills"), chunk("high", 0.6, "skills")],
        ..Default::default()
    });
    let retriever = retriever(Arc::new(FixedEmbedder::new(3)), index);
    let ctx = retriever.retrieve("What tools do you like?").await.expect("retrieve");
    assert_eq!(ids(&ctx.sources), vec!["high", "low", "other"]);
}

#[tokio::test]
async fn blank_query_short_circuits() {
    let embedder = Arc::new(FixedEmbedder::new(3));
    let index = Arc::new(ScriptedIndex::default());
    let retriever = retriever(embedder.clone(), index.clone());
    let ctx = retriever.retrieve("   ").await.expect("retrieve");
    assert_eq!(ctx.text, NO_RELEVANT_INFORMATION);
    assert_eq!(ctx.path, SelectionPath::Empty);
    assert_eq!(embedder.calls(), 0);
    assert!(index.calls().is_empty());
}

#[tokio::test]
async fn empty_corpus_yields_marker_not_error() {
    let retriever = retriever(Arc::new(FixedEmbedder::new(3)), Arc::new(ScriptedIndex::default()));
    let ctx = retriever.retrieve("Tell me about your projects").await.expect("retrieve");
    assert!(ctx.is_empty());
    assert!(ctx.unfiltered_fallback);
    assert_eq!(ctx.text, NO_RELEVANT_INFORMATION);
}

#[tokio::test]
async fn provider_failures_propagate() {
    let embedder = Arc::new(FixedEmbedder {
        fail: Some(|| ProviderError::QuotaExhausted { provider: ProviderKind::Embedding, message: "credits".into() }),
        ..FixedEmbedder::new(3)
    });
    let retriever = retriever(embedder, Arc::new(ScriptedIndex::default()));
    let err = retriever.retrieve("skills?").await.unwrap_err();
    assert!(matches!(err, Error::Provider(ref p) if p.is_quota_exhausted()));

    let failing_index = Arc::new(ScriptedIndex { fail: true, ..Default::default() });
    let retriever = common::retriever(Arc::new(FixedEmbedder::new(3)), failing_index);
    let err = retriever.retrieve("skills?").await.unwrap_err();
    assert!(matches!(err, Error::Provider(ProviderError::Network { provider: ProviderKind::Index, .. })));
}

#[tokio::test]
async fn wrong_embedding_dimension_is_invalid_response() {
    let embedder = Arc::new(FixedEmbedder { returned_len: 2, ..FixedEmbedder::new(3) });
    let retriever = retriever(embedder, Arc::new(ScriptedIndex::default()));
    let err = retriever.retrieve("skills?").await.unwrap_err();
    assert!(matches!(err, Error::Provider(ProviderError::InvalidResponse { provider: ProviderKind::Embedding, .. })));
}

#[tokio::test(start_paused = true)]
async fn retrieve_within_times_out() {
    let index = Arc::new(ScriptedIndex { delay: Some(Duration::from_secs(30)), ..Default::default() });
    let retriever = retriever(Arc::new(FixedEmbedder::new(3)), index);
    let err = retriever.retrieve_within("skills?", Duration::from_millis(50)).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(50)));
}

#[tokio::test]
async fn policy_updates_apply_atomically() {
    let index = Arc::new(ScriptedIndex { unfiltered: scored(&[0.5, 0.48, 0.46, 0.44]), ..Default::default() });
    let retriever = retriever(Arc::new(FixedEmbedder::new(3)), index);

    let err = retriever.update_policy(&PolicyUpdate { min_chunks: Some(50), ..Default::default() });
    assert!(matches!(err, Err(Error::InvalidConfig(_))));
    assert_eq!(retriever.policy(), RetrievalPolicy::default());

    let next = retriever
        .update_policy(&PolicyUpdate { max_chunks: Some(2), min_chunks: Some(1), ..Default::default() })
        .expect("valid update");
    assert_eq!(next.max_chunks, 2);
    let ctx = retriever.retrieve("hello").await.expect("retrieve");
    assert_eq!(ctx.sources.len(), 2);
}

#[tokio::test]
async fn translated_query_drives_classification() {
    let translator = Arc::new(MapTranslator { output: Ok("What projects have you built?".to_string()) });
    let classifier = CategoryClassifier::new(QueryNormalizer::new(Some(translator), Language::English)).unwrap();
    let index = Arc::new(ScriptedIndex { filtered: vec![chunk("p", 0.72, "projects")], ..Default::default() });
    let retriever =
        Retriever::new(Arc::new(FixedEmbedder::new(3)), index.clone(), classifier, RetrievalPolicy::default()).unwrap();
    let ctx = retriever.retrieve("Quels sont tes projets récents ?").await.expect("retrieve");
    assert_eq!(ctx.category, Some(Category::Projects));
    assert_eq!(index.calls(), vec![Some(Predicate::CategoryEq(Category::Projects))]);
}

#[tokio::test]
async fn failing_translator_falls_back_to_original_query() {
    let translator = Arc::new(MapTranslator {
        output: Err(|| ProviderError::Network { provider: ProviderKind::Translation, message: "down".into() }),
    });
    let classifier = CategoryClassifier::new(QueryNormalizer::new(Some(translator), Language::English)).unwrap();
    let embedder = Arc::new(FixedEmbedder::new(3));
    let index = Arc::new(ScriptedIndex { filtered: vec![chunk("p", 0.72, "projects")], ..Default::default() });
    let retriever = Retriever::new(embedder.clone(), index.clone(), classifier, RetrievalPolicy::default()).unwrap();

    let query = "Quels sont les projets de ton portfolio ?";
    let ctx = retriever.retrieve(query).await.expect("retrieve");
    assert_eq!(ctx.category, Some(Category::Projects), "keywords matched on the untranslated text");
    assert_eq!(embedder.texts(), vec![query.to_string()]);
    assert_eq!(ids(&ctx.sources), vec!["p"]);
}

#[tokio::test]
async fn retrieval_is_idempotent_over_a_real_index() {
    let embedder = Arc::new(HashEmbedder::new(128));
    let texts = [
        ("aws", "AWS cloud platforms: Lambda, S3, CloudFront", "skills"),
        ("azure", "Azure cloud fundamentals certification", "certifications"),
        ("k8s", "Kubernetes and Docker for cloud infrastructure", "skills"),
        ("thesis", "Master degree thesis on distributed systems", "education"),
    ];
    let mut chunks = Vec::new();
    for (id, text, category) in texts {
        chunks.push(ragfolio_core::Chunk {
            id: id.to_string(),
            text: text.to_string(),
            embedding: embedder.embed(text).await.expect("embed"),
            metadata: ragfolio_core::Metadata::from_json(serde_json::json!({ "category": category })),
        });
    }
    let index = Arc::new(MemoryIndex::new(chunks));
    let retriever = Retriever::new(embedder, index, passthrough_classifier(), RetrievalPolicy::default()).unwrap();

    let first = retriever.retrieve("What cloud platforms have you used?").await.expect("retrieve");
    let second = retriever.retrieve("What cloud platforms have you used?").await.expect("retrieve");
    assert_eq!(first, second);
    assert_eq!(first.category, Some(Category::Skills));
    assert!(!first.sources.is_empty());
    assert!(first.sources.iter().all(|c| c.category() == Some(Category::Skills)));
}
