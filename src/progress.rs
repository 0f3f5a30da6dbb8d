//! Progress-callback trait for per-page rendering events.
//!
//! Attach an [`Arc<dyn ConversionProgressCallback>`] with
//! [`crate::PdfConverter::with_progress`] to receive events while a document
//! is rendered. Events fire on the blocking render thread, in page order.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2img::{ConversionProgressCallback, PdfConverter};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_number: usize, total_pages: usize, encoded_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} done ({} bytes)", page_number, total_pages, encoded_len);
//!     }
//! }
//!
//! let converter = PdfConverter::global().with_progress(Arc::new(CountingCallback {
//!     completed: AtomicUsize::new(0),
//! }));
//! ```

use std::sync::Arc;

/// Called by the render stage as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. A failing page aborts the conversion; no event is
/// emitted for it and `on_conversion_complete` is not called.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after the document is opened.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page is rendered.
    fn on_page_start(&self, page_number: usize, total_pages: usize) {
        let _ = (page_number, total_pages);
    }

    /// Called after a page is rendered and encoded.
    ///
    /// # Arguments
    /// * `page_number`: 1-indexed page number
    /// * `total_pages`: total pages
    /// * `encoded_len`: byte length of the encoded image
    fn on_page_complete(&self, page_number: usize, total_pages: usize, encoded_len: usize) {
        let _ = (page_number, total_pages, encoded_len);
    }

    /// Called once after every page has been rendered.
    fn on_conversion_complete(&self, total_pages: usize) {
        let _ = total_pages;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::PdfConverter`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
