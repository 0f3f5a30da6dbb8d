//! In-memory PDF engine used by the integration tests.
//!
//! Documents are plain text so tests can describe them inline:
//!
//! ```text
//! %FAKEPDF
//! pages=3
//! title=Quarterly report
//! fail_render=2
//! ```
//!
//! Anything not starting with `%FAKEPDF` fails to open. Every page is
//! 612×792 points (US Letter) and renders to a solid grey surface.

#![allow(dead_code)]

use edgequake_pdf2img::{
    BackendLoader, DocumentInfo, EngineError, Pdf2ImgError, PdfBackend, PdfDocumentHandle,
    PdfPageHandle, Viewport,
};
use image::{DynamicImage, Rgba, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const MAGIC: &str = "%FAKEPDF";
pub const PAGE_WIDTH_PT: f32 = 612.0;
pub const PAGE_HEIGHT_PT: f32 = 792.0;

/// Build the bytes of a fake document.
pub fn fake_pdf(pages: usize) -> Vec<u8> {
    format!("{MAGIC}\npages={pages}\n").into_bytes()
}

pub fn fake_pdf_with(pages: usize, extra: &[(&str, &str)]) -> Vec<u8> {
    let mut doc = format!("{MAGIC}\npages={pages}\n");
    for (k, v) in extra {
        doc.push_str(&format!("{k}={v}\n"));
    }
    doc.into_bytes()
}

#[derive(Debug, Default)]
pub struct FakeBackend {
    pub opened: AtomicUsize,
    pub pages_loaded: AtomicUsize,
    pub pages_dropped: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

struct FakeDocument<'a> {
    backend: &'a FakeBackend,
    pages: usize,
    info: DocumentInfo,
    fail_render: Option<usize>,
}

struct FakePage<'a> {
    backend: &'a FakeBackend,
    page_number: usize,
    fail: bool,
}

impl PdfBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "FakePDF"
    }

    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn PdfDocumentHandle + 'a>, EngineError> {
        let text = std::str::from_utf8(bytes).map_err(|_| EngineError::new("not text"))?;
        let mut lines = text.lines();
        if lines.next() != Some(MAGIC) {
            return Err(EngineError::new("missing %FAKEPDF header"));
        }

        let mut doc = FakeDocument {
            backend: self,
            pages: 0,
            info: DocumentInfo::default(),
            fail_render: None,
        };
        for line in lines {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key {
                "pages" => {
                    doc.pages = value
                        .parse()
                        .map_err(|_| EngineError::new("bad page count"))?
                }
                "title" => doc.info.title = Some(value.to_string()),
                "author" => doc.info.author = Some(value.to_string()),
                "subject" => doc.info.subject = Some(value.to_string()),
                "creator" => doc.info.creator = Some(value.to_string()),
                "fail_render" => doc.fail_render = value.parse().ok(),
                _ => {}
            }
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(doc))
    }
}

impl PdfDocumentHandle for FakeDocument<'_> {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn page(&self, index: usize) -> Result<Box<dyn PdfPageHandle + '_>, EngineError> {
        if index >= self.pages {
            return Err(EngineError::new(format!("no page {index}")));
        }
        self.backend.pages_loaded.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            backend: self.backend,
            page_number: index + 1,
            fail: self.fail_render == Some(index + 1),
        }))
    }

    fn info(&self) -> DocumentInfo {
        self.info.clone()
    }
}

impl PdfPageHandle for FakePage<'_> {
    fn size(&self) -> (f32, f32) {
        (PAGE_WIDTH_PT, PAGE_HEIGHT_PT)
    }

    fn render(&self, viewport: Viewport) -> Result<DynamicImage, EngineError> {
        if self.fail {
            return Err(EngineError::new(format!(
                "bitmap allocation failed on page {}",
                self.page_number
            )));
        }
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            viewport.width,
            viewport.height,
            Rgba([200, 200, 200, 255]),
        )))
    }
}

impl Drop for FakePage<'_> {
    fn drop(&mut self) {
        self.backend.pages_dropped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Loader that counts invocations and takes a while, so concurrent first
/// use can pile up on it.
pub struct SlowLoader {
    pub backend: Arc<FakeBackend>,
    pub loads: AtomicUsize,
    pub delay: Duration,
    pub fail_first: bool,
}

impl SlowLoader {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            backend: FakeBackend::new(),
            loads: AtomicUsize::new(0),
            delay,
            fail_first: false,
        })
    }

    pub fn failing_once() -> Arc<Self> {
        Arc::new(Self {
            backend: FakeBackend::new(),
            loads: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail_first: true,
        })
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl BackendLoader for SlowLoader {
    fn engine_name(&self) -> &'static str {
        "FakePDF"
    }

    fn load(&self) -> Result<Arc<dyn PdfBackend>, Pdf2ImgError> {
        let n = self.loads.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        if self.fail_first && n == 0 {
            return Err(Pdf2ImgError::EngineLoad {
                engine: "FakePDF",
                detail: "library not found".into(),
            });
        }
        Ok(Arc::clone(&self.backend) as Arc<dyn PdfBackend>)
    }
}
