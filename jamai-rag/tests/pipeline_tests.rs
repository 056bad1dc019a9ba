//! End-to-end tests of the pipeline over the in-memory store.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use jamai_rag::{
    ChatModel, ChatRequest, ChatRole, CompletionRequest, ConversationTurn, DocumentChunk,
    EmbeddingProvider, FALLBACK_ANSWER, Filter, InMemoryVectorStore, IngestFile, Metadata,
    NO_CONTEXT, NO_READABLE_TEXT, Point, RagConfig, RagError, RagPipeline, Result, ScoredPoint,
    VectorStore,
};

const COLLECTION: &str = "rag_documents";

/// Deterministic hash-based embeddings; identical texts get identical vectors.
struct MockEmbeddingProvider {
    dimensions: usize,
    poison: Option<&'static str>,
}

impl MockEmbeddingProvider {
    fn new(dimensions: usize) -> Self {
        Self { dimensions, poison: None }
    }

    fn failing_on(dimensions: usize, poison: &'static str) -> Self {
        Self { dimensions, poison: Some(poison) }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.poison.is_some_and(|p| text.contains(p)) {
            return Err(RagError::EmbeddingError {
                provider: "mock".into(),
                message: "backend unavailable".into(),
            });
        }
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut emb = vec![0.0f32; self.dimensions];
        for (i, v) in emb.iter_mut().enumerate() {
            *v = ((hash.wrapping_add(i as u64)) as f32).sin();
        }
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(emb)
    }
}

/// Replies with a fixed answer and records every request.
struct RecordingChatModel {
    reply: String,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl RecordingChatModel {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self { reply: reply.to_string(), requests: Mutex::default() })
    }

    fn last_request(&self) -> CompletionRequest {
        self.requests.lock().unwrap().last().cloned().expect("no request recorded")
    }
}

#[async_trait]
impl ChatModel for RecordingChatModel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.reply.clone())
    }
}

/// Counts every call reaching the wrapped in-memory store.
#[derive(Default)]
struct CountingStore {
    inner: InMemoryVectorStore,
    calls: AtomicUsize,
}

impl CountingStore {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl VectorStore for CountingStore {
    async fn check_collection(&self, name: &str) -> Result<()> {
        self.hit();
        self.inner.check_collection(name).await
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.hit();
        self.inner.create_collection(name, dimensions).await
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        self.hit();
        self.inner.upsert(collection, points).await
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredPoint>> {
        self.hit();
        self.inner.search(collection, vector, top_k, filter).await
    }

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<u64> {
        self.hit();
        self.inner.count(collection, filter).await
    }
}

struct Harness {
    pipeline: RagPipeline,
    store: Arc<CountingStore>,
    model: Arc<RecordingChatModel>,
}

fn harness_with(embedder: MockEmbeddingProvider, reply: &str) -> Harness {
    let store = Arc::new(CountingStore::default());
    let model = RecordingChatModel::replying(reply);
    let pipeline = RagPipeline::builder()
        .config(RagConfig::default())
        .embedding_provider(Arc::new(embedder))
        .vector_store(store.clone())
        .chat_model(model.clone())
        .build()
        .unwrap();
    Harness { pipeline, store, model }
}

fn harness() -> Harness {
    harness_with(MockEmbeddingProvider::new(32), "Use the testing checklist.")
}

fn guide() -> IngestFile {
    IngestFile::new("guide.txt", "AI testing guide")
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn ingest_then_search_returns_the_indexed_chunk() {
    let h = harness();

    let report = h
        .pipeline
        .ingest(&[IngestFile::new("guide.txt", "AI testing guide")], Some("acme"), &tags(&["docs"]))
        .await
        .unwrap();

    assert_eq!(report.files_processed, 1);
    assert_eq!(report.chunks_indexed, 1);
    assert!(report.skipped.is_empty());

    let results = h.pipeline.search("AI testing guide", 1, Some("acme"), None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, "AI testing guide");
    assert_eq!(results[0].source(), "guide.txt");
    assert!(results[0].chunk_id().is_some());
    assert!((results[0].score - 1.0).abs() < 1e-4);
}

#[tokio::test]
async fn search_respects_tenant_and_tag_filters() {
    let h = harness();
    h.pipeline
        .ingest(&[IngestFile::new("a.txt", "alpha notes")], Some("acme"), &tags(&["finance"]))
        .await
        .unwrap();
    h.pipeline
        .ingest(&[IngestFile::new("b.txt", "beta notes")], Some("globex"), &tags(&["docs"]))
        .await
        .unwrap();

    let acme = h.pipeline.search("notes", 10, Some("acme"), None).await.unwrap();
    assert_eq!(acme.len(), 1);
    assert_eq!(acme[0].source(), "a.txt");

    let wanted = tags(&["docs", "hr"]);
    let docs = h.pipeline.search("notes", 10, None, Some(wanted.as_slice())).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].source(), "b.txt");

    let wanted = tags(&["docs"]);
    let none = h.pipeline.search("notes", 10, Some("acme"), Some(wanted.as_slice())).await.unwrap();
    assert!(none.is_empty());

    let all = h.pipeline.search("notes", 10, None, Some(&[][..])).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn count_matches_reports_exact_tenant_counts() {
    let h = harness();
    assert_eq!(h.pipeline.count_matches("acme").await.unwrap(), 0);

    let text = "x".repeat(2000);
    let files = [IngestFile::new("long.txt", text)];
    let report = h.pipeline.ingest(&files, Some("acme"), &[]).await.unwrap();
    h.pipeline.ingest(&[IngestFile::new("other.txt", "other")], Some("globex"), &[]).await.unwrap();

    assert_eq!(report.chunks_indexed, 3);
    assert_eq!(h.pipeline.count_matches("acme").await.unwrap(), 3);
    assert_eq!(h.pipeline.count_matches("globex").await.unwrap(), 1);
    assert_eq!(h.pipeline.count_matches("initech").await.unwrap(), 0);
}

#[tokio::test]
async fn dropped_collection_is_recreated_on_next_use() {
    let h = harness();
    h.pipeline.ingest(&[guide()], Some("acme"), &[]).await.unwrap();

    assert!(h.store.inner.drop_collection(COLLECTION).await);

    let results = h.pipeline.search("AI testing guide", 4, Some("acme"), None).await.unwrap();
    assert!(results.is_empty());
    assert!(!h.pipeline.collections().is_ready());

    let report = h
        .pipeline
        .ingest(&[IngestFile::new("guide.txt", "AI testing guide")], Some("acme"), &[])
        .await
        .unwrap();
    assert_eq!(report.chunks_indexed, 1);
    assert_eq!(h.store.inner.dimensions(COLLECTION).await, Some(32));
    assert_eq!(h.pipeline.count_matches("acme").await.unwrap(), 1);
}

#[tokio::test]
async fn count_on_dropped_collection_returns_zero_and_resets() {
    let h = harness();
    h.pipeline.ensure_ready().await.unwrap();
    h.store.inner.drop_collection(COLLECTION).await;

    assert_eq!(h.pipeline.count_matches("acme").await.unwrap(), 0);
    assert!(!h.pipeline.collections().is_ready());
}

#[tokio::test]
async fn blank_inputs_do_not_touch_the_store() {
    let h = harness();

    let written = h
        .pipeline
        .upsert(vec![
            DocumentChunk::new("a", "   ", Metadata::new()),
            DocumentChunk::new("b", "", Metadata::new()),
        ])
        .await
        .unwrap();
    assert_eq!(written, 0);

    assert!(h.pipeline.search("  \n", 4, None, None).await.unwrap().is_empty());

    let report = h.pipeline.ingest(&[IngestFile::new("empty.txt", " ")], None, &[]).await.unwrap();
    assert_eq!(report.files_processed, 0);
    assert_eq!(report.chunks_indexed, 0);
    assert_eq!(report.skipped.get("empty.txt").map(String::as_str), Some(NO_READABLE_TEXT));

    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn embedding_failure_aborts_the_whole_batch() {
    let h = harness_with(MockEmbeddingProvider::failing_on(16, "poison"), "unused");
    let files = [
        IngestFile::new("good.txt", "perfectly fine text"),
        IngestFile::new("bad.txt", "poison pill"),
    ];

    let err = h.pipeline.ingest(&files, Some("acme"), &[]).await.unwrap_err();

    assert!(matches!(err, RagError::EmbeddingError { .. }));
    assert_eq!(h.pipeline.count_matches("acme").await.unwrap(), 0);
}

#[tokio::test]
async fn chat_answers_from_retrieved_context() {
    let h = harness();
    h.pipeline.ingest(&[guide()], Some("acme"), &[]).await.unwrap();

    let response = h
        .pipeline
        .chat(&ChatRequest {
            query: "AI testing guide".into(),
            tenant_id: Some("acme".into()),
            conversation: Some(vec![
                ConversationTurn::new("user", "hi"),
                ConversationTurn::new("tool", "ignored"),
                ConversationTurn::new("assistant", "hello"),
            ]),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(response.answer, "Use the testing checklist.");
    assert_eq!(response.sources.len(), 1);
    assert_eq!(response.sources[0].source, "guide.txt");

    let request = h.model.last_request();
    let roles: Vec<ChatRole> = request.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![ChatRole::System, ChatRole::User, ChatRole::Assistant, ChatRole::User]);
    let prompt = &request.messages[3].content;
    assert!(prompt.contains("[Source 1] guide.txt\nAI testing guide"));
    assert!(prompt.ends_with("Question: AI testing guide\nAnswer:"));
}

#[tokio::test]
async fn chat_without_documents_falls_back() {
    let h = harness_with(MockEmbeddingProvider::new(8), "   ");

    let request = ChatRequest { query: "anything?".into(), ..Default::default() };
    let response = h.pipeline.chat(&request).await.unwrap();

    assert_eq!(response.answer, FALLBACK_ANSWER);
    assert!(response.sources.is_empty());
    assert!(h.model.last_request().messages[1].content.contains(NO_CONTEXT));
}

#[test]
fn builder_requires_components() {
    let err = RagPipeline::builder().build().err().unwrap();
    assert!(matches!(err, RagError::ConfigError(_)));
}
