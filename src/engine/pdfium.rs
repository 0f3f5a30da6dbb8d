//! PDFium-backed engine.
//!
//! `pdfium-render` wraps the PDFium C++ library, which is not safe to drive
//! from async contexts. Every method here is blocking; the pipeline calls
//! them from `tokio::task::spawn_blocking`.

use super::{BackendLoader, DocumentInfo, PdfBackend, PdfDocumentHandle, PdfPageHandle, Viewport};
use crate::error::{EngineError, Pdf2ImgError};
use image::DynamicImage;
use pdfium_auto::PdfiumSource;
use pdfium_render::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

/// Resolves the PDFium library from a [`PdfiumSource`] and binds it.
#[derive(Debug, Clone)]
pub struct PdfiumLoader {
    source: PdfiumSource,
}

impl PdfiumLoader {
    pub fn new(source: PdfiumSource) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &PdfiumSource {
        &self.source
    }
}

impl BackendLoader for PdfiumLoader {
    fn engine_name(&self) -> &'static str {
        "PDFium"
    }

    fn load(&self) -> Result<Arc<dyn PdfBackend>, Pdf2ImgError> {
        pdfium_auto::check_platform()?;
        let path = pdfium_auto::ensure_library(&self.source, None)?;
        let pdfium = pdfium_auto::bind_from_path(&path)?;
        info!("PDFium bound from {}", path.display());
        Ok(Arc::new(PdfiumBackend::new(pdfium)))
    }
}

/// A bound PDFium library.
pub struct PdfiumBackend {
    pdfium: Pdfium,
}

impl PdfiumBackend {
    pub fn new(pdfium: Pdfium) -> Self {
        Self { pdfium }
    }
}

impl PdfBackend for PdfiumBackend {
    fn name(&self) -> &'static str {
        "PDFium"
    }

    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn PdfDocumentHandle + 'a>, EngineError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| EngineError::new(format!("{:?}", e)))?;
        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl PdfDocumentHandle for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page(&self, index: usize) -> Result<Box<dyn PdfPageHandle + '_>, EngineError> {
        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| EngineError::new(format!("{:?}", e)))?;
        Ok(Box::new(PdfiumPage { page }))
    }

    fn info(&self) -> DocumentInfo {
        let metadata = self.document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).map(|t| t.value().to_string())
        };

        DocumentInfo {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
        }
    }
}

struct PdfiumPage<'a> {
    page: PdfPage<'a>,
}

impl PdfPageHandle for PdfiumPage<'_> {
    fn size(&self) -> (f32, f32) {
        (self.page.width().value, self.page.height().value)
    }

    fn render(&self, viewport: Viewport) -> Result<DynamicImage, EngineError> {
        let (width, height) = target_size(viewport)?;
        let config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_target_height(height);

        let bitmap = self
            .page
            .render_with_config(&config)
            .map_err(|e| EngineError::new(format!("{:?}", e)))?;

        let image = bitmap.as_image();
        debug!("PDFium rendered {}x{} px", image.width(), image.height());
        Ok(image)
    }
}

/// PDFium takes signed pixel sizes.
fn target_size(viewport: Viewport) -> Result<(i32, i32), EngineError> {
    let px = |v: u32| {
        i32::try_from(v).map_err(|_| EngineError::new(format!("target size {v} px exceeds PDFium limits")))
    };
    Ok((px(viewport.width)?, px(viewport.height)?))
}
