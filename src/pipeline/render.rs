//! PDF rasterisation: open a document and render every page through the engine.
//!
//! Engines wrap native libraries with thread-local state, so the whole job
//! runs inside `tokio::task::spawn_blocking`. Pages are rendered strictly in
//! order, one at a time: each page handle is dropped as soon as its surface
//! exists and each surface as soon as it is encoded, so peak memory is one
//! page surface plus the encoded outputs regardless of document length.
//!
//! Reference URLs are only registered once every page succeeded; a failure on
//! page N discards pages 1..N without leaving URLs behind.

use crate::blob::ObjectUrlStore;
use crate::config::ConversionOptions;
use crate::engine::{PdfBackend, Viewport};
use crate::error::Pdf2ImgError;
use crate::output::{ConversionResult, PdfInfo};
use crate::pipeline::encode::encode_surface;
use crate::pipeline::input::PdfFile;
use crate::pipeline::naming::page_filename;
use crate::progress::ProgressCallback;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything a render job needs, owned so it can move to the blocking pool.
pub struct RenderJob {
    pub backend: Arc<dyn PdfBackend>,
    pub file: PdfFile,
    pub options: ConversionOptions,
    pub urls: Arc<ObjectUrlStore>,
    pub progress: Option<ProgressCallback>,
}

/// Render every page of `job.file`, in page order.
pub async fn render_document(job: RenderJob) -> Result<Vec<ConversionResult>, Pdf2ImgError> {
    tokio::task::spawn_blocking(move || render_document_blocking(&job))
        .await
        .map_err(|e| Pdf2ImgError::Internal(format!("Render task panicked: {}", e)))?
}

/// Read page count and document information.
pub async fn read_info(backend: Arc<dyn PdfBackend>, file: PdfFile) -> Result<PdfInfo, Pdf2ImgError> {
    tokio::task::spawn_blocking(move || read_info_blocking(backend.as_ref(), &file))
        .await
        .map_err(|e| Pdf2ImgError::Internal(format!("Metadata task panicked: {}", e)))?
}

fn render_document_blocking(job: &RenderJob) -> Result<Vec<ConversionResult>, Pdf2ImgError> {
    let document = job
        .backend
        .open(job.file.bytes())
        .map_err(|e| Pdf2ImgError::DocumentParse { detail: e.0 })?;

    let total_pages = document.page_count();
    info!(
        "{} loaded '{}': {} pages",
        job.backend.name(),
        job.file.name(),
        total_pages
    );
    if let Some(cb) = &job.progress {
        cb.on_conversion_start(total_pages);
    }

    let mut encoded: Vec<Bytes> = Vec::with_capacity(total_pages);

    for index in 0..total_pages {
        let page_number = index + 1;
        if let Some(cb) = &job.progress {
            cb.on_page_start(page_number, total_pages);
        }

        let render_failed = |detail: String| Pdf2ImgError::Render {
            page: page_number,
            detail,
        };

        let surface = {
            let page = document.page(index).map_err(|e| render_failed(e.0))?;
            let (width_pt, height_pt) = page.size();
            let viewport = Viewport::for_page(width_pt, height_pt, job.options.scale);
            let surface = page.render(viewport).map_err(|e| render_failed(e.0))?;
            drop(page);
            surface
        };

        let blob = encode_surface(&surface, &job.options).map_err(|e| Pdf2ImgError::Encode {
            page: page_number,
            detail: e.to_string(),
        })?;
        debug!(
            "Page {}/{} → {}x{} px, {} bytes",
            page_number,
            total_pages,
            surface.width(),
            surface.height(),
            blob.len()
        );
        drop(surface);

        if let Some(cb) = &job.progress {
            cb.on_page_complete(page_number, total_pages, blob.len());
        }
        encoded.push(blob);
    }

    let mime_type = job.options.format.mime_type();
    let results = encoded
        .into_iter()
        .enumerate()
        .map(|(index, blob)| {
            let page_number = index + 1;
            ConversionResult {
                filename: page_filename(job.file.name(), page_number, total_pages, job.options.format),
                url: job.urls.create(blob.clone(), mime_type),
                blob,
                mime_type,
                page_number,
                total_pages,
            }
        })
        .collect();

    if let Some(cb) = &job.progress {
        cb.on_conversion_complete(total_pages);
    }

    Ok(results)
}

fn read_info_blocking(backend: &dyn PdfBackend, file: &PdfFile) -> Result<PdfInfo, Pdf2ImgError> {
    let document = backend
        .open(file.bytes())
        .map_err(|e| Pdf2ImgError::DocumentParse { detail: e.0 })?;

    let info = document.info();
    let present = |v: Option<String>| v.filter(|s| !s.is_empty());

    Ok(PdfInfo {
        num_pages: document.page_count(),
        title: present(info.title),
        author: present(info.author),
        subject: present(info.subject),
        creator: present(info.creator),
    })
}
