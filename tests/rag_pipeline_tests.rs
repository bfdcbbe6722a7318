//! End-to-end pipeline tests with table-driven embeddings and a mock model.

mod common;

use async_trait::async_trait;
use common::mocks::{FailingEmbedder, MockLLMClient, RejectingStore, TableEmbedder};
use ragchat::db::{LocalVectorStore, ProfileStore, WritePolicy};
use ragchat::llm::LLMClient;
use ragchat::rag::{
    EmbeddingProvider, EmbeddingService, LoaderRegistry, RagPipeline, TextChunker,
    DEFAULT_TEMPLATE,
};
use ragchat::types::{AppError, Result};
use ragchat_vector::DistanceMetric;
use std::sync::Arc;
use std::time::Duration;

const QUESTION: &str = "Which letters come first?";

fn letters_embedder() -> TableEmbedder {
    TableEmbedder::new([
        ("ABCD", vec![0.0, 0.0]),
        ("DEFG", vec![1.0, 0.0]),
        ("GHIJ", vec![5.0, 0.0]),
        (QUESTION, vec![0.9, 0.0]),
    ])
}

async fn pipeline_with(
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LLMClient>,
    policy: WritePolicy,
) -> RagPipeline {
    let store = Arc::new(LocalVectorStore::in_memory().await.unwrap());
    let profiles = ProfileStore::new(store, 2, DistanceMetric::Euclidean, policy).unwrap();
    let embeddings = EmbeddingService::new(embedder, 2, 4, Duration::from_secs(5)).unwrap();

    RagPipeline::new(
        LoaderRegistry::new(1 << 20).unwrap(),
        TextChunker::new(4, 1).unwrap(),
        embeddings,
        profiles,
        llm,
    )
}

async fn letters_pipeline(llm: MockLLMClient) -> RagPipeline {
    pipeline_with(
        Arc::new(letters_embedder().with_fallback(vec![9.0, 9.0])),
        Arc::new(llm),
        WritePolicy::Replace,
    )
    .await
}

#[tokio::test]
async fn test_ingest_chunks_and_stores_every_chunk() {
    let pipeline = letters_pipeline(MockLLMClient::new("ok")).await;

    let report = pipeline
        .ingest_text("letters", "inline", "ABCDEFGHIJ")
        .await
        .unwrap();

    assert_eq!(report.profile, "letters");
    assert_eq!(report.chunks, 3);
    assert_eq!(report.ids.len(), 3);
    assert_eq!(pipeline.profiles().count("letters").await.unwrap(), 3);
}

#[tokio::test]
async fn test_context_holds_two_nearest_in_order() {
    let pipeline = letters_pipeline(MockLLMClient::new("ok")).await;
    pipeline
        .ingest_text("letters", "inline", "ABCDEFGHIJ")
        .await
        .unwrap();

    let context = pipeline.context("letters", QUESTION, 2).await.unwrap();
    assert_eq!(context, "DEFG\nABCD");
}

#[tokio::test]
async fn test_ask_sends_composed_prompt() {
    let llm = MockLLMClient::new("DEFG and ABCD");
    let pipeline = letters_pipeline(llm.clone()).await;
    pipeline
        .ingest_text("letters", "inline", "ABCDEFGHIJ")
        .await
        .unwrap();

    let answer = pipeline.ask("letters", QUESTION, 2).await.unwrap();

    let expected = format!("{}\nDEFG\nABCD\n{}", DEFAULT_TEMPLATE, QUESTION);
    assert_eq!(answer.answer, "DEFG and ABCD");
    assert_eq!(answer.prompt, expected);
    assert_eq!(llm.prompts(), vec![expected]);

    let sources: Vec<&str> = answer.sources.iter().map(|s| s.content.as_str()).collect();
    assert_eq!(sources, ["DEFG", "ABCD"]);
    assert!(answer.sources[0].distance <= answer.sources[1].distance);
}

#[tokio::test]
async fn test_never_ingested_profile_is_empty_not_error() {
    let pipeline = letters_pipeline(MockLLMClient::new("I don't know")).await;

    assert_eq!(pipeline.context("demo", QUESTION, 5).await.unwrap(), "");

    let answer = pipeline.ask("demo", QUESTION, 5).await.unwrap();
    assert!(answer.sources.is_empty());
    assert_eq!(answer.answer, "I don't know");
}

#[tokio::test]
async fn test_k_larger_than_profile_returns_everything() {
    let pipeline = letters_pipeline(MockLLMClient::new("ok")).await;
    pipeline
        .ingest_text("letters", "inline", "ABCDEFGHIJ")
        .await
        .unwrap();

    let answer = pipeline.ask("letters", QUESTION, 50).await.unwrap();
    assert_eq!(answer.sources.len(), 3);
    assert_eq!(answer.sources[2].content, "GHIJ");
}

#[tokio::test]
async fn test_reingest_replaces_profile() {
    let pipeline = letters_pipeline(MockLLMClient::new("ok")).await;
    pipeline
        .ingest_text("letters", "first", "ABCDEFGHIJ")
        .await
        .unwrap();
    let report = pipeline
        .ingest_text("letters", "second", "KLMNOP")
        .await
        .unwrap();

    assert_eq!(report.chunks, 2);
    assert_eq!(pipeline.profiles().count("letters").await.unwrap(), 2);
    let context = pipeline.context("letters", QUESTION, 10).await.unwrap();
    assert!(context.contains("KLMN"));
    assert!(!context.contains("ABCD"));
}

#[tokio::test]
async fn test_append_policy_keeps_both_documents() {
    let pipeline = pipeline_with(
        Arc::new(letters_embedder().with_fallback(vec![9.0, 9.0])),
        Arc::new(MockLLMClient::new("ok")),
        WritePolicy::Append,
    )
    .await;

    pipeline.ingest_text("letters", "first", "ABCDEFGHIJ").await.unwrap();
    pipeline.ingest_text("letters", "second", "KLMNOP").await.unwrap();
    assert_eq!(pipeline.profiles().count("letters").await.unwrap(), 5);
}

#[tokio::test]
async fn test_embedding_failure_writes_nothing() {
    let pipeline = pipeline_with(
        Arc::new(FailingEmbedder::new("GHIJ", vec![1.0, 1.0])),
        Arc::new(MockLLMClient::new("ok")),
        WritePolicy::Replace,
    )
    .await;

    pipeline.ingest_text("letters", "old", "KLMNOP").await.unwrap();

    let err = pipeline
        .ingest_text("letters", "new", "ABCDEFGHIJ")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Embedding(_)));

    // The earlier document is untouched.
    let kept = pipeline
        .profiles()
        .search("letters", &[1.0, 1.0], 10)
        .await
        .unwrap();
    assert_eq!(kept.contents().collect::<Vec<_>>(), ["KLMN", "NOP"]);
}

#[tokio::test]
async fn test_store_failure_keeps_previous_document() {
    let store = Arc::new(RejectingStore::new(
        LocalVectorStore::in_memory().await.unwrap(),
        "GHIJ",
    ));
    let profiles =
        ProfileStore::new(store, 2, DistanceMetric::Euclidean, WritePolicy::Replace).unwrap();
    let embeddings = EmbeddingService::new(
        Arc::new(letters_embedder().with_fallback(vec![9.0, 9.0])),
        2,
        4,
        Duration::from_secs(5),
    )
    .unwrap();
    let pipeline = RagPipeline::new(
        LoaderRegistry::new(1 << 20).unwrap(),
        TextChunker::new(4, 1).unwrap(),
        embeddings,
        profiles,
        Arc::new(MockLLMClient::new("ok")),
    );

    pipeline.ingest_text("letters", "old", "KLMNOP").await.unwrap();
    let err = pipeline
        .ingest_text("letters", "new", "ABCDEFGHIJ")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Store(_)));

    assert_eq!(pipeline.profiles().count("letters").await.unwrap(), 2);
    let context = pipeline.context("letters", QUESTION, 5).await.unwrap();
    assert_eq!(context, "KLMN\nNOP");
}

#[tokio::test]
async fn test_profile_names_are_free_form() {
    let pipeline = letters_pipeline(MockLLMClient::new("ok")).await;

    for name in ["café", "Team Docs"] {
        let report = pipeline.ingest_text(name, "inline", "ABCDEFGHIJ").await.unwrap();
        assert_eq!(report.profile, name);
    }
    let context = pipeline.context("Team Docs", QUESTION, 2).await.unwrap();
    assert_eq!(context, "DEFG\nABCD");
}

#[tokio::test]
async fn test_overlong_profile_name_rejected_before_embedding() {
    let embedder = Arc::new(letters_embedder().with_fallback(vec![0.0, 0.0]));
    let pipeline = pipeline_with(
        embedder.clone(),
        Arc::new(MockLLMClient::new("ok")),
        WritePolicy::Replace,
    )
    .await;

    let name = "p".repeat(200);
    let err = pipeline
        .ingest_text(&name, "inline", "ABCDEFGHIJ")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_text_shorter_than_overlap_is_rejected() {
    let embedder = Arc::new(letters_embedder().with_fallback(vec![0.0, 0.0]));
    let pipeline = pipeline_with(
        embedder.clone(),
        Arc::new(MockLLMClient::new("ok")),
        WritePolicy::Replace,
    )
    .await;

    let err = pipeline.ingest_text("letters", "tiny", "A").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(embedder.calls(), 0);
    assert!(pipeline.profiles().list_profiles().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_question_rejected() {
    let llm = MockLLMClient::new("ok");
    let pipeline = letters_pipeline(llm.clone()).await;

    assert!(matches!(
        pipeline.ask("letters", "   ", 3).await,
        Err(AppError::Validation(_))
    ));
    assert!(llm.prompts().is_empty());
}

#[tokio::test]
async fn test_llm_failure_propagates() {
    let pipeline = letters_pipeline(MockLLMClient::failing()).await;
    pipeline
        .ingest_text("letters", "inline", "ABCDEFGHIJ")
        .await
        .unwrap();

    assert!(matches!(
        pipeline.ask("letters", QUESTION, 2).await,
        Err(AppError::LLM(_))
    ));
}

struct SlowLLM;

#[async_trait]
impl LLMClient for SlowLLM {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok("too late".to_string())
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}

#[tokio::test(start_paused = true)]
async fn test_llm_call_times_out() {
    let pipeline = pipeline_with(
        Arc::new(letters_embedder()),
        Arc::new(SlowLLM),
        WritePolicy::Replace,
    )
    .await
    .with_llm_timeout(Duration::from_secs(1));

    match pipeline.ask("letters", QUESTION, 2).await {
        Err(AppError::LLM(msg)) => assert!(msg.contains("1s")),
        other => panic!("expected timeout, got {:?}", other.map(|a| a.answer)),
    }
}

#[tokio::test]
async fn test_ingest_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("letters.md");
    tokio::fs::write(&path, "ABCDEFGHIJ").await.unwrap();

    let pipeline = letters_pipeline(MockLLMClient::new("ok")).await;
    let report = pipeline.ingest("letters", &path).await.unwrap();
    assert_eq!(report.chunks, 3);

    let answer = pipeline.ask("letters", QUESTION, 1).await.unwrap();
    let source = answer.sources[0].metadata.as_ref().unwrap();
    assert_eq!(source.source, path.display().to_string());
    assert_eq!(source.sequence_index, 1);
}

#[tokio::test]
async fn test_custom_separator() {
    let pipeline = letters_pipeline(MockLLMClient::new("ok"))
        .await
        .with_separator("");
    pipeline
        .ingest_text("letters", "inline", "ABCDEFGHIJ")
        .await
        .unwrap();

    assert_eq!(
        pipeline.context("letters", QUESTION, 2).await.unwrap(),
        "DEFGABCD"
    );
}

#[tokio::test]
async fn test_profiles_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = Arc::new(LocalVectorStore::open(dir.path()).await.unwrap());
        let profiles =
            ProfileStore::new(store, 2, DistanceMetric::Euclidean, WritePolicy::Replace).unwrap();
        let pipeline = RagPipeline::new(
            LoaderRegistry::new(1024).unwrap(),
            TextChunker::new(4, 1).unwrap(),
            EmbeddingService::new(Arc::new(letters_embedder()), 2, 2, Duration::from_secs(5))
                .unwrap(),
            profiles,
            Arc::new(MockLLMClient::new("ok")),
        );
        pipeline
            .ingest_text("letters", "inline", "ABCDEFGHIJ")
            .await
            .unwrap();
    }

    let store = Arc::new(LocalVectorStore::open(dir.path()).await.unwrap());
    let profiles =
        ProfileStore::new(store, 2, DistanceMetric::Euclidean, WritePolicy::Replace).unwrap();
    let hits = profiles.search("letters", &[0.9, 0.0], 2).await.unwrap();
    assert_eq!(hits.contents().collect::<Vec<_>>(), ["DEFG", "ABCD"]);
}
