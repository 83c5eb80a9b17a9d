//! Extraction from real PDF files produced with `lopdf`.

mod common;

use std::path::Path;
use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use pdfrag::{
    CancellationToken, InMemoryVectorStore, NoopObserver, PdfExtractor, RagConfig, RagPipeline,
    TextExtractor,
};

/// Write a PDF with one page per entry of `pages`.
fn write_pdf(path: &Path, pages: &[&str]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

#[test]
fn extracts_text_from_every_page() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two-pages.pdf");
    write_pdf(&path, &["Hello World", "Second page"]);

    let extracted = PdfExtractor.extract(&path).unwrap();

    assert_eq!(extracted.pages, 2);
    assert!(extracted.failed_pages.is_empty());
    assert!(extracted.text.contains("Hello"));
    assert!(extracted.text.contains("Second"));
    let hello = extracted.text.find("Hello").unwrap();
    let second = extracted.text.find("Second").unwrap();
    assert!(hello < second);
}

#[test]
fn truncated_file_is_a_document_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.pdf");
    std::fs::write(&path, b"%PDF-1.5\n1 0 obj\n<< /Type /Catalog").unwrap();

    assert!(matches!(
        PdfExtractor.extract(&path),
        Err(pdfrag::RagError::ExtractionError { .. })
    ));
}

#[tokio::test]
async fn default_pipeline_ingests_generated_pdfs() {
    let dir = tempfile::tempdir().unwrap();
    write_pdf(&dir.path().join("greeting.pdf"), &["Hello World"]);

    let pipeline = RagPipeline::builder()
        .config(RagConfig::default())
        .embedding_provider(Arc::new(common::BagOfWordsEmbedder::default()))
        .build()
        .unwrap();
    let collection =
        pipeline.open_collection(Arc::new(InMemoryVectorStore::new())).await.unwrap();

    let report = pipeline
        .ingest_directory(&collection, dir.path(), &NoopObserver, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.entries(), 1);
    let hits = pipeline.retrieve(&collection, "hello", 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.source, "greeting.pdf");
    assert!(hits[0].chunk.text.contains("Hello"));
}
