//! Integration tests for the conversion entry points, run against the
//! in-memory engine from `common`.

mod common;

use common::{fake_pdf, fake_pdf_with, FakeBackend, SlowLoader};
use edgequake_pdf2img::{
    ConversionOptions, ConversionProgressCallback, EngineRegistry, OutputFormat, Pdf2ImgError,
    PdfConverter, PdfFile,
};
use image::GenericImageView;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn converter_with(backend: Arc<FakeBackend>) -> PdfConverter {
    PdfConverter::new(Arc::new(EngineRegistry::with_backend(backend)))
}

// ── convert_pdf_to_images ────────────────────────────────────────────────

#[tokio::test]
async fn single_page_has_no_page_infix() {
    let converter = converter_with(FakeBackend::new());
    let file = PdfFile::new("cover.pdf", fake_pdf(1));

    let results = converter
        .convert_pdf_to_images(&file, &ConversionOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].filename, "cover.png");
    assert_eq!(results[0].page_number, 1);
    assert_eq!(results[0].total_pages, 1);
    assert_eq!(results[0].mime_type, "image/png");
}

#[tokio::test]
async fn pages_are_ordered_and_named() {
    let converter = converter_with(FakeBackend::new());
    let file = PdfFile::new("report.pdf", fake_pdf(3));
    let options = ConversionOptions::builder()
        .format(OutputFormat::Jpeg)
        .build()
        .unwrap();

    let results = converter.convert_pdf_to_images(&file, &options).await.unwrap();

    let numbers: Vec<usize> = results.iter().map(|r| r.page_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert!(results.iter().all(|r| r.total_pages == 3));
    assert_eq!(results[1].filename, "report_page_2.jpg");
    assert!(results.iter().all(|r| r.mime_type == "image/jpeg"));
    assert!(results.iter().all(|r| r.blob.starts_with(&[0xFF, 0xD8])));
}

#[tokio::test]
async fn results_are_registered_as_urls() {
    let converter = converter_with(FakeBackend::new());
    let file = PdfFile::new("a.pdf", fake_pdf(2));

    let results = converter
        .convert_pdf_to_images(&file, &ConversionOptions::default())
        .await
        .unwrap();

    let urls = converter.object_urls();
    assert_eq!(urls.len(), 2);
    for r in &results {
        assert_eq!(urls.resolve(&r.url).unwrap(), r.blob);
        assert_eq!(urls.mime_type(&r.url), Some("image/png"));
    }
}

#[tokio::test]
async fn default_options_render_png_at_double_scale() {
    let converter = converter_with(FakeBackend::new());
    let file = PdfFile::new("letter.pdf", fake_pdf(1));
    let explicit = ConversionOptions::builder()
        .quality(0.95)
        .scale(2.0)
        .format(OutputFormat::Png)
        .build()
        .unwrap();

    let a = converter
        .convert_pdf_to_images(&file, &ConversionOptions::default())
        .await
        .unwrap();
    let b = converter.convert_pdf_to_images(&file, &explicit).await.unwrap();

    assert_eq!(a[0].blob, b[0].blob);
    let img = image::load_from_memory(&a[0].blob).unwrap();
    assert_eq!(img.dimensions(), (1224, 1584));
}

#[tokio::test]
async fn page_handles_are_released() {
    let backend = FakeBackend::new();
    let converter = converter_with(Arc::clone(&backend));
    let file = PdfFile::new("a.pdf", fake_pdf(4));

    converter
        .convert_pdf_to_images(&file, &ConversionOptions::default())
        .await
        .unwrap();

    assert_eq!(backend.pages_loaded.load(Ordering::SeqCst), 4);
    assert_eq!(backend.pages_dropped.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn malformed_input_is_a_wrapped_parse_error() {
    let converter = converter_with(FakeBackend::new());
    let file = PdfFile::new("junk.pdf", b"not a pdf".to_vec());

    let err = converter
        .convert_pdf_to_images(&file, &ConversionOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Pdf2ImgError::Conversion { .. }));
    assert!(matches!(err.root(), Pdf2ImgError::DocumentParse { .. }));
    assert!(err.to_string().starts_with("Failed to convert PDF: "));
    assert!(err.to_string().contains("%FAKEPDF"));
}

#[tokio::test]
async fn render_failure_aborts_without_leaking_urls() {
    let converter = converter_with(FakeBackend::new());
    let file = PdfFile::new("a.pdf", fake_pdf_with(3, &[("fail_render", "2")]));

    let err = converter
        .convert_pdf_to_images(&file, &ConversionOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err.root(), Pdf2ImgError::Render { page: 2, .. }));
    assert!(converter.object_urls().is_empty());
}

#[tokio::test]
async fn invalid_options_are_rejected_before_rendering() {
    let backend = FakeBackend::new();
    let converter = converter_with(Arc::clone(&backend));
    let file = PdfFile::new("a.pdf", fake_pdf(1));
    let options = ConversionOptions {
        scale: 0.0,
        ..ConversionOptions::default()
    };

    let err = converter.convert_pdf_to_images(&file, &options).await.unwrap_err();
    assert!(matches!(err.root(), Pdf2ImgError::InvalidOptions(_)));
    assert_eq!(backend.opened.load(Ordering::SeqCst), 0);
}

#[test]
fn conversion_outside_runtime_fails_before_engine_load() {
    let loader = SlowLoader::new(Duration::ZERO);
    let converter = PdfConverter::new(Arc::new(EngineRegistry::new(loader.clone())));
    let file = PdfFile::new("a.pdf", fake_pdf(1));

    let err = futures::executor::block_on(
        converter.convert_pdf_to_images(&file, &ConversionOptions::default()),
    )
    .unwrap_err();
    assert!(matches!(err, Pdf2ImgError::Environment { .. }));

    let err = futures::executor::block_on(converter.get_pdf_info(&file)).unwrap_err();
    assert!(matches!(err, Pdf2ImgError::Environment { .. }));

    assert_eq!(loader.loads(), 0);
}

// ── convert_pdf_to_single_image ──────────────────────────────────────────

#[test]
fn single_image_outside_runtime_uses_placeholder() {
    let loader = SlowLoader::new(Duration::ZERO);
    let converter = PdfConverter::new(Arc::new(EngineRegistry::new(loader.clone())));
    let file = PdfFile::new("offline.pdf", fake_pdf(2));

    let single = futures::executor::block_on(converter.convert_pdf_to_single_image(
        &file,
        OutputFormat::Png,
        &ConversionOptions::default(),
    ))
    .unwrap();

    assert!(single.fallback_reason.unwrap().is_environment());
    assert_eq!(single.result.filename, "offline.png");
    assert_eq!(loader.loads(), 0);
}

#[tokio::test]
async fn single_image_returns_first_page_and_releases_the_rest() {
    let converter = converter_with(FakeBackend::new());
    let file = PdfFile::new("deck.pdf", fake_pdf(3));

    let single = converter
        .convert_pdf_to_single_image(&file, OutputFormat::Webp, &ConversionOptions::default())
        .await
        .unwrap();

    assert!(!single.is_placeholder());
    assert_eq!(single.result.page_number, 1);
    assert_eq!(single.result.total_pages, 3);
    assert_eq!(single.result.filename, "deck_page_1.webp");
    assert_eq!(single.result.mime_type, "image/webp");
    assert_eq!(converter.object_urls().len(), 1);
}

#[tokio::test]
async fn single_image_falls_back_on_malformed_input() {
    let converter = converter_with(FakeBackend::new());
    let file = PdfFile::new("broken.pdf", b"%PDF-1.7 truncated".to_vec());

    let single = converter
        .convert_pdf_to_single_image(&file, OutputFormat::Jpeg, &ConversionOptions::default())
        .await
        .unwrap();

    assert!(single.is_placeholder());
    assert_eq!(single.result.filename, "broken.jpeg");
    assert_eq!(single.result.page_number, 1);
    assert_eq!(single.result.total_pages, 1);
    assert!(single.result.blob.is_empty());

    let placeholder = converter.object_urls().resolve(&single.result.url).unwrap();
    let img = image::load_from_memory(&placeholder).unwrap();
    assert_eq!(img.dimensions(), (800, 1000));

    let reason = single.fallback_reason.unwrap();
    assert!(matches!(reason.root(), Pdf2ImgError::DocumentParse { .. }));
}

#[tokio::test]
async fn single_image_falls_back_on_empty_document() {
    let converter = converter_with(FakeBackend::new());
    let file = PdfFile::new("empty.pdf", fake_pdf(0));

    let single = converter
        .convert_pdf_to_single_image(&file, OutputFormat::Png, &ConversionOptions::default())
        .await
        .unwrap();

    assert!(single.is_placeholder());
    assert_eq!(single.result.filename, "empty.png");
    assert!(matches!(
        single.fallback_reason.as_ref().map(|e| e.root()),
        Some(Pdf2ImgError::Render { page: 1, .. })
    ));
}

#[tokio::test]
async fn single_image_falls_back_when_engine_cannot_load() {
    let loader = SlowLoader::failing_once();
    let converter = PdfConverter::new(Arc::new(EngineRegistry::new(loader.clone())));
    let file = PdfFile::new("a.pdf", fake_pdf(1));

    let single = converter
        .convert_pdf_to_single_image(&file, OutputFormat::Png, &ConversionOptions::default())
        .await
        .unwrap();
    assert!(matches!(
        single.fallback_reason.as_ref().map(|e| e.root()),
        Some(Pdf2ImgError::EngineLoad { .. })
    ));
}

async fn placeholder_for(name: &str) -> edgequake_pdf2img::SingleImage {
    let converter = converter_with(FakeBackend::new());
    let file = PdfFile::new(name, b"junk".to_vec());
    converter
        .convert_pdf_to_single_image(&file, OutputFormat::Png, &ConversionOptions::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn placeholder_survives_control_characters_in_name() {
    let single = placeholder_for("scan\u{1}.pdf").await;
    assert!(single.is_placeholder());
    assert_eq!(single.result.filename, "scan\u{1}.png");
}

#[tokio::test]
async fn placeholder_survives_non_ascii_name() {
    let single = placeholder_for("Übersicht 報告 📄.PDF").await;
    assert!(single.is_placeholder());
    assert_eq!(single.result.filename, "Übersicht 報告 📄.png");
}

#[tokio::test]
async fn placeholder_survives_very_long_name() {
    let name = format!("{}.pdf", "a".repeat(4096));
    let single = placeholder_for(&name).await;
    assert!(single.is_placeholder());
    assert_eq!(single.result.filename.len(), 4096 + ".png".len());
}

// ── get_pdf_info ─────────────────────────────────────────────────────────

#[tokio::test]
async fn info_reports_present_fields_only() {
    let converter = converter_with(FakeBackend::new());
    let file = PdfFile::new(
        "q3.pdf",
        fake_pdf_with(7, &[("title", "Q3 results"), ("author", ""), ("creator", "Writer")]),
    );

    let info = converter.get_pdf_info(&file).await.unwrap();
    assert_eq!(info.num_pages, 7);
    assert_eq!(info.title.as_deref(), Some("Q3 results"));
    assert_eq!(info.author, None);
    assert_eq!(info.subject, None);
    assert_eq!(info.creator.as_deref(), Some("Writer"));
}

#[tokio::test]
async fn info_failures_collapse_to_metadata_error() {
    let converter = converter_with(FakeBackend::new());
    let file = PdfFile::new("junk.pdf", b"junk".to_vec());

    let err = converter.get_pdf_info(&file).await.unwrap_err();
    assert_eq!(err.to_string(), "Could not read PDF information");
    assert!(matches!(err.root(), Pdf2ImgError::DocumentParse { .. }));
}

// ── Engine registry ──────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_use_loads_engine_once() {
    let loader = SlowLoader::new(Duration::from_millis(100));
    let registry = Arc::new(EngineRegistry::new(loader.clone()));
    assert!(!registry.is_loaded());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.pdf_engine().await.map(|e| e.name()) })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "FakePDF");
    }

    assert_eq!(loader.loads(), 1);
    assert!(registry.is_loaded());
}

#[tokio::test]
async fn failed_engine_load_is_retried() {
    let loader = SlowLoader::failing_once();
    let registry = EngineRegistry::new(loader.clone());

    let err = registry.pdf_engine().await.err().unwrap();
    assert!(matches!(err, Pdf2ImgError::EngineLoad { .. }));
    assert!(!registry.is_loaded());

    registry.pdf_engine().await.unwrap();
    assert_eq!(loader.loads(), 2);
}

// ── Progress & output ────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl ConversionProgressCallback for Recorder {
    fn on_conversion_start(&self, total_pages: usize) {
        self.events.lock().unwrap().push(format!("start {total_pages}"));
    }

    fn on_page_start(&self, page_number: usize, _total_pages: usize) {
        self.events.lock().unwrap().push(format!("page {page_number}"));
    }

    fn on_page_complete(&self, page_number: usize, _total_pages: usize, encoded_len: usize) {
        assert!(encoded_len > 0);
        self.events.lock().unwrap().push(format!("done {page_number}"));
    }

    fn on_conversion_complete(&self, total_pages: usize) {
        self.events.lock().unwrap().push(format!("end {total_pages}"));
    }
}

#[tokio::test]
async fn progress_events_follow_page_order() {
    let recorder = Arc::new(Recorder::default());
    let converter = converter_with(FakeBackend::new()).with_progress(recorder.clone());
    let file = PdfFile::new("a.pdf", fake_pdf(2));

    converter
        .convert_pdf_to_images(&file, &ConversionOptions::default())
        .await
        .unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec!["start 2", "page 1", "done 1", "page 2", "done 2", "end 2"]
    );
}

#[tokio::test]
async fn written_files_match_results() {
    let converter = converter_with(FakeBackend::new());
    let file = PdfFile::new("Scan.PDF", fake_pdf(2));
    let dir = tempfile::tempdir().unwrap();

    let results = converter
        .convert_pdf_to_images(&file, &ConversionOptions::default())
        .await
        .unwrap();
    let written = edgequake_pdf2img::write_results(&results, dir.path())
        .await
        .unwrap();

    assert_eq!(
        written,
        vec![dir.path().join("Scan_page_1.png"), dir.path().join("Scan_page_2.png")]
    );
    assert_eq!(std::fs::read(&written[1]).unwrap(), results[1].blob.to_vec());
}
