//! Ingestion and retrieval through the pipeline.

mod common;

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use common::{BagOfWordsEmbedder, pipeline};
use pdfrag::{
    CancellationToken, Chunk, InMemoryVectorStore, LocalVectorStore, NoopObserver, RagConfig,
    RagError, RecordingObserver, SearchResult, StatusEvent, VectorStore,
};

fn small_chunks() -> RagConfig {
    RagConfig::builder().chunk_size(4).build().unwrap()
}

#[tokio::test]
async fn reingesting_a_document_does_not_duplicate_entries() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("report.pdf");
    fs::write(&file, "solar panels convert sunlight into electricity for homes and offices")
        .unwrap();

    let embedder = Arc::new(BagOfWordsEmbedder::default());
    let pipeline = pipeline(small_chunks(), embedder.clone());
    let collection = pipeline.open_collection(Arc::new(InMemoryVectorStore::new())).await.unwrap();
    let cancel = CancellationToken::new();

    let first = pipeline.ingest_file(&collection, &file, None, &cancel).await.unwrap();
    let after_first = collection.count().await.unwrap();
    let second = pipeline.ingest_file(&collection, &file, None, &cancel).await.unwrap();

    assert_eq!(first.entries, 3);
    assert_eq!(second.entries, 3);
    assert_eq!(after_first, 3);
    assert_eq!(collection.count().await.unwrap(), after_first);
    assert_eq!(embedder.calls(), 6);
}

#[tokio::test]
async fn directory_ingestion_skips_non_pdf_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("efficiency.pdf"), "insulation reduces heating losses").unwrap();
    fs::write(dir.path().join("notes.txt"), "unrelated grocery list apples bananas").unwrap();

    let pipeline = pipeline(small_chunks(), Arc::new(BagOfWordsEmbedder::default()));
    let collection = pipeline.open_collection(Arc::new(InMemoryVectorStore::new())).await.unwrap();
    let observer = RecordingObserver::new();

    let report = pipeline
        .ingest_directory(&collection, dir.path(), &observer, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.documents[0].source, "efficiency.pdf");
    assert_eq!(collection.count().await.unwrap(), 1);

    let hits = pipeline.retrieve(&collection, "apples bananas", 5).await.unwrap();
    assert!(hits.iter().all(|h| h.chunk.source == "efficiency.pdf"));

    assert_eq!(
        observer.events(),
        vec![
            StatusEvent::Progress { completed: 0, total: 1 },
            StatusEvent::Status { message: "Processing efficiency.pdf...".into() },
            StatusEvent::Progress { completed: 1, total: 1 },
        ]
    );
}

#[tokio::test]
async fn corrupt_page_does_not_sink_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("mixed.pdf");
    fs::write(&file, "page one words\u{c}<<corrupt>> page two\u{c}page three words").unwrap();

    let pipeline = pipeline(small_chunks(), Arc::new(BagOfWordsEmbedder::default()));
    let collection = pipeline.open_collection(Arc::new(InMemoryVectorStore::new())).await.unwrap();

    let report =
        pipeline.ingest_file(&collection, &file, None, &CancellationToken::new()).await.unwrap();

    assert_eq!(report.pages, 3);
    assert_eq!(report.failed_pages.len(), 1);
    assert_eq!(report.failed_pages[0].page, 2);
    assert!(report.entries > 0);

    let hits = pipeline.retrieve(&collection, "page three", 10).await.unwrap();
    assert!(hits.iter().all(|h| !h.chunk.text.contains("corrupt")));
}

#[tokio::test]
async fn empty_document_contributes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("scanned.pdf"), "  \n ").unwrap();
    fs::write(dir.path().join("text.pdf"), "heat pumps move heat").unwrap();

    let pipeline = pipeline(small_chunks(), Arc::new(BagOfWordsEmbedder::default()));
    let collection = pipeline.open_collection(Arc::new(InMemoryVectorStore::new())).await.unwrap();

    let report = pipeline
        .ingest_directory(&collection, dir.path(), &NoopObserver, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.documents.len(), 2);
    assert_eq!(report.empty_documents(), 1);
    assert_eq!(report.entries(), 1);
}

#[tokio::test]
async fn cancelled_ingestion_stops_before_embedding() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.pdf"), "one two three four five").unwrap();

    let embedder = Arc::new(BagOfWordsEmbedder::default());
    let pipeline = pipeline(small_chunks(), embedder.clone());
    let collection = pipeline.open_collection(Arc::new(InMemoryVectorStore::new())).await.unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = pipeline
        .ingest_directory(&collection, dir.path(), &NoopObserver, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::Cancelled));
    assert_eq!(embedder.calls(), 0);
    assert_eq!(collection.count().await.unwrap(), 0);
}

#[tokio::test]
async fn retrieval_ranks_matching_chunks_first() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("lighting.pdf"), "led lamps save energy").unwrap();
    fs::write(dir.path().join("water.pdf"), "low flow showers save water").unwrap();
    fs::write(dir.path().join("walls.pdf"), "cavity wall insulation").unwrap();

    let pipeline = pipeline(small_chunks(), Arc::new(BagOfWordsEmbedder::default()));
    let collection = pipeline.open_collection(Arc::new(InMemoryVectorStore::new())).await.unwrap();
    pipeline
        .ingest_directory(&collection, dir.path(), &NoopObserver, &CancellationToken::new())
        .await
        .unwrap();

    let hits = pipeline.retrieve(&collection, "led lamps", 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk.text, "led lamps save energy");
    assert!(hits[0].score >= hits[1].score);
}

#[tokio::test]
async fn durable_index_survives_reopen() {
    let docs = tempfile::tempdir().unwrap();
    let db = tempfile::tempdir().unwrap();
    fs::write(docs.path().join("a.pdf"), "thermal mass keeps buildings cool").unwrap();

    let pipeline = pipeline(small_chunks(), Arc::new(BagOfWordsEmbedder::default()));
    {
        let store: Arc<dyn VectorStore> =
            Arc::new(LocalVectorStore::open(db.path()).await.unwrap());
        let collection = pipeline.open_collection(store).await.unwrap();
        pipeline
            .ingest_directory(&collection, docs.path(), &NoopObserver, &CancellationToken::new())
            .await
            .unwrap();
    }

    let store: Arc<dyn VectorStore> = Arc::new(LocalVectorStore::open(db.path()).await.unwrap());
    let collection = pipeline.open_collection(store).await.unwrap();
    assert_eq!(collection.count().await.unwrap(), 2);
    let hits = pipeline.retrieve(&collection, "thermal mass", 1).await.unwrap();
    assert_eq!(hits[0].chunk.text, "thermal mass keeps buildings");
}

/// Counts store writes on top of the in-memory backend.
#[derive(Default)]
struct CountingStore {
    inner: InMemoryVectorStore,
    upserts: AtomicUsize,
}

#[async_trait]
impl VectorStore for CountingStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> pdfrag::Result<()> {
        self.inner.create_collection(name, dimensions).await
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> pdfrag::Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(collection, chunks).await
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> pdfrag::Result<Vec<SearchResult>> {
        self.inner.search(collection, embedding, top_k).await
    }

    async fn count(&self, collection: &str) -> pdfrag::Result<usize> {
        self.inner.count(collection).await
    }
}

#[tokio::test]
async fn each_document_is_written_in_one_upsert() {
    let dir = tempfile::tempdir().unwrap();
    let ten_words = "one two three four five six seven eight nine ten";
    fs::write(dir.path().join("a.pdf"), ten_words).unwrap();
    fs::write(dir.path().join("b.pdf"), "heat pumps move heat indoors").unwrap();

    let store = Arc::new(CountingStore::default());
    let pipeline = pipeline(small_chunks(), Arc::new(BagOfWordsEmbedder::default()));
    let collection = pipeline.open_collection(store.clone()).await.unwrap();

    let report = pipeline
        .ingest_directory(&collection, dir.path(), &NoopObserver, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.entries(), 5);
    assert_eq!(store.upserts.load(Ordering::SeqCst), 2);
}
