//! Pipeline stages for PDF-to-image conversion.
//!
//! Each submodule implements exactly one step, so each is testable on its own
//! and the engine can change without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ naming
//! (path/URL)  (engine)   (image)    (filenames)
//!                 │
//!                 └── on failure (single-image path only) ──▶ fallback
//! ```
//!
//! 1. [`input`]   : turn a path, URL or byte buffer into a [`input::PdfFile`]
//! 2. [`render`]  : open the document and rasterise pages sequentially;
//!    runs in `spawn_blocking` because engines are not async-safe
//! 3. [`encode`]  : encode each surface to PNG / JPEG / WebP
//! 4. [`naming`]  : derive output filenames from the input name
//! 5. [`fallback`]: placeholder image when the engine path fails

pub mod encode;
pub mod fallback;
pub mod input;
pub mod naming;
pub mod render;
