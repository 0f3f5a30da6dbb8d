//! Rendering engines and the registry that owns them.
//!
//! The PDF pipeline never talks to PDFium directly. It goes through three
//! small traits so the engine can be swapped (a different PDFium build, an
//! in-memory double in tests) without touching the pipeline:
//!
//! * [`PdfBackend`]: an initialised engine able to open documents.
//! * [`PdfDocumentHandle`]: one open document; hands out pages.
//! * [`PdfPageHandle`]: one page; rendering resources are released when
//!   the handle is dropped.
//!
//! Engines are created by a [`BackendLoader`] and owned by an
//! [`EngineRegistry`]. The registry initialises its engine on first use and
//! shares one in-flight initialisation between concurrent callers.

pub mod pdfium;

use crate::config::EngineSource;
use crate::error::{EngineError, Pdf2ImgError};
use image::DynamicImage;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

pub use self::pdfium::{PdfiumBackend, PdfiumLoader};

/// Pixel dimensions of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Viewport for a page of `width_pt × height_pt` PDF points at `scale`
    /// (1.0 = 72 DPI). Fractional pixels are truncated; never below 1×1.
    pub fn for_page(width_pt: f32, height_pt: f32, scale: f32) -> Self {
        let px = |pt: f32| ((pt * scale).floor() as u32).max(1);
        Self {
            width: px(width_pt),
            height: px(height_pt),
        }
    }
}

/// Raw document information fields as reported by an engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
}

/// An initialised PDF engine.
pub trait PdfBackend: Send + Sync {
    /// Engine name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Parse `bytes` into a document.
    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn PdfDocumentHandle + 'a>, EngineError>;
}

/// An open document.
pub trait PdfDocumentHandle {
    fn page_count(&self) -> usize;

    /// Load the page at 0-based `index`.
    fn page(&self, index: usize) -> Result<Box<dyn PdfPageHandle + '_>, EngineError>;

    fn info(&self) -> DocumentInfo;
}

/// A loaded page. Dropping it releases the page's engine resources.
pub trait PdfPageHandle {
    /// Page size in PDF points (1/72 inch).
    fn size(&self) -> (f32, f32);

    /// Rasterise the page into a surface of exactly `viewport` pixels.
    fn render(&self, viewport: Viewport) -> Result<DynamicImage, EngineError>;
}

/// Produces an engine. Called on the blocking pool, at most once per
/// successful registry initialisation.
pub trait BackendLoader: Send + Sync {
    fn engine_name(&self) -> &'static str;

    fn load(&self) -> Result<Arc<dyn PdfBackend>, Pdf2ImgError>;
}

/// Loader for an engine that already exists.
struct Preloaded(Arc<dyn PdfBackend>);

impl BackendLoader for Preloaded {
    fn engine_name(&self) -> &'static str {
        self.0.name()
    }

    fn load(&self) -> Result<Arc<dyn PdfBackend>, Pdf2ImgError> {
        Ok(Arc::clone(&self.0))
    }
}

static GLOBAL: Lazy<Arc<EngineRegistry>> =
    Lazy::new(|| Arc::new(EngineRegistry::pdfium(EngineSource::from_env())));

/// Owner of a lazily-initialised PDF engine.
///
/// Pass an `Arc<EngineRegistry>` to every [`crate::PdfConverter`] that should
/// share the engine. A failed initialisation is not remembered: the next call
/// runs the loader again.
pub struct EngineRegistry {
    loader: Arc<dyn BackendLoader>,
    pdf: OnceCell<Arc<dyn PdfBackend>>,
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("engine", &self.loader.engine_name())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl EngineRegistry {
    /// A registry whose engine is produced by `loader` on first use.
    pub fn new(loader: Arc<dyn BackendLoader>) -> Self {
        Self {
            loader,
            pdf: OnceCell::new(),
        }
    }

    /// A registry backed by PDFium resolved from `source.pdfium`.
    pub fn pdfium(source: EngineSource) -> Self {
        Self::new(Arc::new(PdfiumLoader::new(source.pdfium)))
    }

    /// A registry that is already initialised with `backend`.
    pub fn with_backend(backend: Arc<dyn PdfBackend>) -> Self {
        Self {
            loader: Arc::new(Preloaded(Arc::clone(&backend))),
            pdf: OnceCell::from(backend),
        }
    }

    /// The process-wide registry used by the crate-level functions.
    ///
    /// Built from [`EngineSource::from_env`] on first access.
    pub fn global() -> Arc<EngineRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// `true` once the engine has been initialised.
    pub fn is_loaded(&self) -> bool {
        self.pdf.initialized()
    }

    /// The PDF engine, initialising it if needed.
    ///
    /// Concurrent callers arriving while initialisation is in flight wait for
    /// that attempt instead of starting their own.
    pub async fn pdf_engine(&self) -> Result<Arc<dyn PdfBackend>, Pdf2ImgError> {
        let engine = self
            .pdf
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                info!("Initialising {} engine", loader.engine_name());
                tokio::task::spawn_blocking(move || loader.load())
                    .await
                    .map_err(|e| Pdf2ImgError::Internal(format!("Engine loader panicked: {e}")))?
            })
            .await?;
        Ok(Arc::clone(engine))
    }
}
