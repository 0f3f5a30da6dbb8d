//! Execution-context check shared by every public operation.
//!
//! Rendering and engine initialisation run on Tokio's blocking pool, and the
//! media loader needs Tokio's I/O driver. Calling any of them from a plain
//! executor (for example `futures::executor::block_on`) would panic deep
//! inside Tokio; this check turns that into [`Pdf2ImgError::Environment`]
//! before any engine is touched.

use crate::error::Pdf2ImgError;

/// Fail with [`Pdf2ImgError::Environment`] unless a Tokio runtime is current.
pub fn require_runtime(operation: &'static str) -> Result<(), Pdf2ImgError> {
    match tokio::runtime::Handle::try_current() {
        Ok(_) => Ok(()),
        Err(_) => Err(Pdf2ImgError::Environment { operation }),
    }
}
