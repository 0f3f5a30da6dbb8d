//! Conversion entry points.
//!
//! [`PdfConverter`] ties the pieces together: an [`EngineRegistry`] that owns
//! the PDF engine, an [`ObjectUrlStore`] that holds the encoded images, and
//! an optional progress callback. Converters are cheap to clone and share
//! both the registry and the store.
//!
//! The free functions at the bottom of this module use the process-wide
//! registry and store; build a converter yourself when the engine should come
//! from somewhere other than [`crate::EngineSource::from_env`].
//!
//! ## Error policy
//!
//! * [`PdfConverter::convert_pdf_to_images`] never recovers; every failure
//!   after the runtime check is wrapped in [`Pdf2ImgError::Conversion`].
//! * [`PdfConverter::get_pdf_info`] never recovers; failures are wrapped in
//!   [`Pdf2ImgError::Metadata`].
//! * [`PdfConverter::convert_pdf_to_single_image`] substitutes a placeholder
//!   for any primary-path failure and reports the swallowed error in
//!   [`SingleImage::fallback_reason`].

use crate::blob::ObjectUrlStore;
use crate::config::{ConversionOptions, OutputFormat};
use crate::engine::EngineRegistry;
use crate::environment::require_runtime;
use crate::error::Pdf2ImgError;
use crate::output::{ConversionResult, FallbackImage, PdfInfo, SingleImage};
use crate::pipeline::fallback;
use crate::pipeline::input::PdfFile;
use crate::pipeline::render::{self, RenderJob};
use crate::progress::ProgressCallback;
use bytes::Bytes;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Converts PDF documents into page images.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2img::{ConversionOptions, OutputFormat, PdfConverter, PdfFile};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let converter = PdfConverter::global();
/// let file = PdfFile::from_path("report.pdf").await?;
/// let options = ConversionOptions::builder().format(OutputFormat::Jpeg).build()?;
///
/// for page in converter.convert_pdf_to_images(&file, &options).await? {
///     println!("{} → {}", page.filename, page.url);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PdfConverter {
    engines: Arc<EngineRegistry>,
    urls: Arc<ObjectUrlStore>,
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for PdfConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfConverter")
            .field("engines", &self.engines)
            .field("live_urls", &self.urls.len())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl PdfConverter {
    /// A converter using `engines` and a private URL store.
    pub fn new(engines: Arc<EngineRegistry>) -> Self {
        Self {
            engines,
            urls: Arc::new(ObjectUrlStore::new()),
            progress: None,
        }
    }

    /// The converter behind the crate-level functions: global registry,
    /// global URL store.
    pub fn global() -> Self {
        Self::new(EngineRegistry::global()).with_object_urls(ObjectUrlStore::global())
    }

    /// Register results in `urls` instead of the converter's own store.
    pub fn with_object_urls(mut self, urls: Arc<ObjectUrlStore>) -> Self {
        self.urls = urls;
        self
    }

    /// Receive per-page events from subsequent conversions.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn object_urls(&self) -> &Arc<ObjectUrlStore> {
        &self.urls
    }

    pub fn engines(&self) -> &Arc<EngineRegistry> {
        &self.engines
    }

    /// Render every page of `file` and return one result per page, in order.
    ///
    /// # Errors
    /// * [`Pdf2ImgError::Environment`] outside a Tokio runtime (not wrapped).
    /// * [`Pdf2ImgError::Conversion`] for everything else; its
    ///   [`root`](Pdf2ImgError::root) is the failing step (`InvalidOptions`,
    ///   `EngineLoad`, `DocumentParse`, `Render` or `Encode`).
    pub async fn convert_pdf_to_images(
        &self,
        file: &PdfFile,
        options: &ConversionOptions,
    ) -> Result<Vec<ConversionResult>, Pdf2ImgError> {
        require_runtime("PDF conversion")?;
        let start = Instant::now();
        info!(
            "Converting '{}' ({} bytes) to {}",
            file.name(),
            file.size(),
            options.format
        );

        let results = self
            .render_all(file, options)
            .await
            .map_err(Pdf2ImgError::into_conversion)?;

        info!(
            "Converted '{}': {} pages in {}ms",
            file.name(),
            results.len(),
            start.elapsed().as_millis()
        );
        Ok(results)
    }

    async fn render_all(
        &self,
        file: &PdfFile,
        options: &ConversionOptions,
    ) -> Result<Vec<ConversionResult>, Pdf2ImgError> {
        options.validate()?;
        let backend = self.engines.pdf_engine().await?;
        render::render_document(RenderJob {
            backend,
            file: file.clone(),
            options: *options,
            urls: Arc::clone(&self.urls),
            progress: self.progress.clone(),
        })
        .await
    }

    /// Render `file` as `format` and return only the first page.
    ///
    /// Any failure of the rendering path, including a document without
    /// pages or a missing runtime, is replaced by a placeholder image named
    /// after the input; the original error is kept in
    /// [`SingleImage::fallback_reason`]. The placeholder result carries an
    /// empty `blob`; its bytes are reachable through its `url`.
    ///
    /// # Errors
    /// Only if the placeholder itself cannot be produced.
    pub async fn convert_pdf_to_single_image(
        &self,
        file: &PdfFile,
        format: OutputFormat,
        options: &ConversionOptions,
    ) -> Result<SingleImage, Pdf2ImgError> {
        let options = ConversionOptions { format, ..*options };

        let primary = self
            .convert_pdf_to_images(file, &options)
            .await
            .and_then(|results| self.first_page(results));

        match primary {
            Ok(result) => Ok(SingleImage {
                result,
                fallback_reason: None,
            }),
            Err(e) => {
                warn!("PDF conversion of '{}' failed, using placeholder: {}", file.name(), e);
                let placeholder = self.convert_pdf_using_fallback(file, format)?;
                Ok(SingleImage {
                    result: ConversionResult {
                        blob: Bytes::new(),
                        mime_type: format.mime_type(),
                        filename: placeholder.filename,
                        url: placeholder.url,
                        page_number: 1,
                        total_pages: 1,
                    },
                    fallback_reason: Some(e),
                })
            }
        }
    }

    /// Keep the first result and release the URLs of the others.
    fn first_page(&self, results: Vec<ConversionResult>) -> Result<ConversionResult, Pdf2ImgError> {
        let mut results = results.into_iter();
        let first = results.next().ok_or_else(|| {
            Pdf2ImgError::Render {
                page: 1,
                detail: "document has no pages".into(),
            }
            .into_conversion()
        })?;
        for extra in results {
            self.urls.revoke(&extra.url);
        }
        Ok(first)
    }

    /// Build the placeholder image for `file` without touching the engine.
    pub fn convert_pdf_using_fallback(
        &self,
        file: &PdfFile,
        format: OutputFormat,
    ) -> Result<FallbackImage, Pdf2ImgError> {
        fallback::convert_pdf_using_fallback(file, format, &self.urls)
    }

    /// Page count and document information of `file`.
    ///
    /// # Errors
    /// * [`Pdf2ImgError::Environment`] outside a Tokio runtime.
    /// * [`Pdf2ImgError::Metadata`] for everything else.
    pub async fn get_pdf_info(&self, file: &PdfFile) -> Result<PdfInfo, Pdf2ImgError> {
        require_runtime("PDF info extraction")?;
        let read = async {
            let backend = self.engines.pdf_engine().await?;
            render::read_info(backend, file.clone()).await
        };
        let info = read.await.map_err(Pdf2ImgError::into_metadata)?;
        debug!("'{}': {} pages", file.name(), info.num_pages);
        Ok(info)
    }
}

/// Write every result's blob to `dir/<filename>`.
///
/// Each file is written atomically (temp file + rename). Placeholder results
/// have an empty `blob`; pass the placeholder's bytes via its URL instead.
pub async fn write_results(
    results: &[ConversionResult],
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, Pdf2ImgError> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Pdf2ImgError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let mut written = Vec::with_capacity(results.len());
    for result in results {
        let path = dir.join(&result.filename);
        write_atomic(&path, &result.blob).await?;
        written.push(path);
    }
    Ok(written)
}

/// Atomic write: write to a sibling temp file, then rename over `path`.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Pdf2ImgError> {
    let failed = |source: std::io::Error| Pdf2ImgError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(failed)?;
    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

// ── Process-wide convenience functions ───────────────────────────────────

/// [`PdfConverter::convert_pdf_to_images`] on [`PdfConverter::global`].
pub async fn convert_pdf_to_images(
    file: &PdfFile,
    options: &ConversionOptions,
) -> Result<Vec<ConversionResult>, Pdf2ImgError> {
    PdfConverter::global().convert_pdf_to_images(file, options).await
}

/// [`PdfConverter::convert_pdf_to_single_image`] on [`PdfConverter::global`].
pub async fn convert_pdf_to_single_image(
    file: &PdfFile,
    format: OutputFormat,
    options: &ConversionOptions,
) -> Result<SingleImage, Pdf2ImgError> {
    PdfConverter::global()
        .convert_pdf_to_single_image(file, format, options)
        .await
}

/// [`PdfConverter::convert_pdf_using_fallback`] on [`PdfConverter::global`].
pub fn convert_pdf_using_fallback(
    file: &PdfFile,
    format: OutputFormat,
) -> Result<FallbackImage, Pdf2ImgError> {
    PdfConverter::global().convert_pdf_using_fallback(file, format)
}

/// [`PdfConverter::get_pdf_info`] on [`PdfConverter::global`].
pub async fn get_pdf_info(file: &PdfFile) -> Result<PdfInfo, Pdf2ImgError> {
    PdfConverter::global().get_pdf_info(file).await
}
