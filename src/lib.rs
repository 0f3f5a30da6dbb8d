//! # edgequake-pdf2img
//!
//! Render PDF documents into page images (PNG, JPEG, WebP) through PDFium,
//! with a placeholder fallback for callers that always need an image, and a
//! loader for the ffmpeg WASM media engine.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Context  require a Tokio runtime (Environment error otherwise)
//!  ├─ 2. Engine   registry hands out PDFium, loading it once (pdfium-auto)
//!  ├─ 3. Render   pages rasterised one at a time (spawn_blocking)
//!  ├─ 4. Encode   surface → PNG / JPEG / WebP bytes
//!  └─ 5. Output   results registered as blob: URLs, named after the input
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2img::{convert_pdf_to_images, ConversionOptions, PdfFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // PDFium is located via PDFIUM_LIB_PATH or downloaded on first use.
//!     let file = PdfFile::from_path("document.pdf").await?;
//!     let pages = convert_pdf_to_images(&file, &ConversionOptions::default()).await?;
//!     for page in &pages {
//!         println!("{} ({} bytes)", page.filename, page.blob.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2img` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-pdf2img = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod blob;
pub mod config;
pub mod convert;
pub mod engine;
pub mod environment;
pub mod error;
pub mod media;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use blob::ObjectUrlStore;
pub use config::{
    ConversionOptions, ConversionOptionsBuilder, EngineSource, MediaEngineSource, OutputFormat,
};
pub use convert::{
    convert_pdf_to_images, convert_pdf_to_single_image, convert_pdf_using_fallback, get_pdf_info,
    write_atomic, write_results, PdfConverter,
};
pub use engine::{
    BackendLoader, DocumentInfo, EngineRegistry, PdfBackend, PdfDocumentHandle, PdfPageHandle,
    Viewport,
};
pub use error::{EngineError, Pdf2ImgError};
pub use media::{load_ffmpeg, MediaEngine};
pub use output::{ConversionResult, FallbackImage, PdfInfo, SingleImage};
pub use pdfium_auto::PdfiumSource;
pub use pipeline::input::PdfFile;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
