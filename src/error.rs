//! Error types for the edgequake-pdf2img library.
//!
//! [`Pdf2ImgError`] is the single error type returned by every public
//! operation. Its variants follow the conversion pipeline step that failed,
//! so callers can match on the category instead of parsing messages:
//!
//! ```text
//! Environment ─▶ EngineLoad ─▶ DocumentParse ─▶ Render ─▶ Encode
//! ```
//!
//! The page conversion entry point wraps every post-environment failure in
//! [`Pdf2ImgError::Conversion`]; metadata extraction wraps them in
//! [`Pdf2ImgError::Metadata`]. The wrapped cause stays reachable through
//! [`std::error::Error::source`] and [`Pdf2ImgError::root`].
//!
//! Rendering backends report plain [`EngineError`]s; the converter decides
//! which category they belong to based on the step that produced them.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-pdf2img library.
#[derive(Debug, Error)]
pub enum Pdf2ImgError {
    // ── Context errors ────────────────────────────────────────────────────
    /// The operation was invoked outside a context able to host it.
    #[error("{operation} can only be performed inside a Tokio runtime")]
    Environment { operation: &'static str },

    /// An external engine could not be fetched, located or initialised.
    #[error("Failed to load {engine} engine: {detail}")]
    EngineLoad { engine: &'static str, detail: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The byte buffer could not be parsed as a PDF document.
    #[error("Invalid PDF structure: {detail}")]
    DocumentParse { detail: String },

    /// A page could not be rasterised.
    #[error("Rendering failed for page {page}: {detail}")]
    Render { page: usize, detail: String },

    /// A rendered surface could not be encoded to the output format.
    #[error("Failed to encode page {page}: {detail}")]
    Encode { page: usize, detail: String },

    /// Metadata extraction failed; `source` holds the underlying failure.
    #[error("Could not read PDF information")]
    Metadata {
        #[source]
        source: Box<Pdf2ImgError>,
    },

    /// Catch-all for page conversion; the message carries the cause.
    #[error("Failed to convert PDF: {source}")]
    Conversion {
        #[source]
        source: Box<Pdf2ImgError>,
    },

    // ── Input / output errors ─────────────────────────────────────────────
    /// Conversion options violate their documented ranges.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Input file was not found or could not be read.
    #[error("Input file not readable: '{path}': {source}")]
    InputNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP input URL could not be downloaded.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Could not create or write an output image.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error (panicked task, poisoned state).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2ImgError {
    /// Wrap `self` into the generic conversion error, unless it already is one
    /// or it is an environment error (which is raised before the wrapped scope).
    pub(crate) fn into_conversion(self) -> Self {
        match self {
            e @ (Pdf2ImgError::Conversion { .. } | Pdf2ImgError::Environment { .. }) => e,
            other => Pdf2ImgError::Conversion {
                source: Box::new(other),
            },
        }
    }

    /// Wrap `self` into the metadata error category.
    pub(crate) fn into_metadata(self) -> Self {
        match self {
            e @ (Pdf2ImgError::Metadata { .. } | Pdf2ImgError::Environment { .. }) => e,
            other => Pdf2ImgError::Metadata {
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, skipping `Conversion` / `Metadata` wrappers.
    pub fn root(&self) -> &Pdf2ImgError {
        match self {
            Pdf2ImgError::Conversion { source } | Pdf2ImgError::Metadata { source } => {
                source.root()
            }
            other => other,
        }
    }

    /// `true` for [`Pdf2ImgError::Environment`], including wrapped ones.
    pub fn is_environment(&self) -> bool {
        matches!(self.root(), Pdf2ImgError::Environment { .. })
    }
}

/// A failure reported by a rendering backend.
///
/// Backends only describe what went wrong; the pipeline step that called them
/// decides whether it becomes a parse, render or metadata failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<pdfium_auto::PdfiumAutoError> for Pdf2ImgError {
    fn from(e: pdfium_auto::PdfiumAutoError) -> Self {
        Pdf2ImgError::EngineLoad {
            engine: "PDFium",
            detail: e.to_string(),
        }
    }
}
