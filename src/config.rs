//! Configuration types for PDF-to-image conversion and engine provisioning.
//!
//! Two kinds of configuration live here:
//!
//! * [`ConversionOptions`]: per-call rendering knobs (quality, scale, format),
//!   built via [`ConversionOptionsBuilder`] or taken from `Default`.
//! * [`EngineSource`]: where the external engines come from (PDFium release
//!   mirror / local library, ffmpeg core CDN). Injected into registries and
//!   loaders rather than baked into the code, so offline deployments and tests
//!   can substitute their own locations.

use crate::error::Pdf2ImgError;
use pdfium_auto::PdfiumSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output image format.
///
/// `Jpg` and `Jpeg` encode identically; they differ only in how filenames are
/// derived (page filenames always use `jpg`, placeholder filenames keep the
/// name the caller asked for).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless PNG (default). Quality is ignored.
    #[default]
    Png,
    /// JPEG, quality-controlled.
    Jpg,
    /// JPEG, quality-controlled.
    Jpeg,
    /// Lossless WebP. Quality is ignored.
    Webp,
}

impl OutputFormat {
    /// The format name as written by callers (`png`, `jpg`, `jpeg`, `webp`).
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpg => "jpg",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Webp => "webp",
        }
    }

    /// Filename extension for rendered pages: `jpeg` is shortened to `jpg`.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            other => other.as_str(),
        }
    }

    /// MIME type of the encoded payload.
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpg | OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Webp => "image/webp",
        }
    }

    /// The `image` crate format used for encoding.
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Jpg | OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            OutputFormat::Webp => image::ImageFormat::WebP,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Pdf2ImgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" => Ok(OutputFormat::Jpg),
            "jpeg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::Webp),
            other => Err(Pdf2ImgError::InvalidOptions(format!(
                "unsupported format '{other}' (expected png, jpg, jpeg or webp)"
            ))),
        }
    }
}

/// Largest accepted render scale (4608 DPI).
pub const MAX_SCALE: f32 = 64.0;

/// Options for one conversion call.
///
/// # Example
/// ```rust
/// use edgequake_pdf2img::{ConversionOptions, OutputFormat};
///
/// let options = ConversionOptions::builder()
///     .format(OutputFormat::Jpeg)
///     .quality(0.8)
///     .scale(1.5)
///     .build()
///     .unwrap();
/// assert_eq!(options.format.extension(), "jpg");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Encoder quality in `[0, 1]`. Default: 0.95. Only JPEG honours it.
    pub quality: f32,

    /// Render scale relative to the page size in PDF points (1.0 = 72 DPI).
    /// Default: 2.0.
    pub scale: f32,

    /// Output format. Default: PNG.
    pub format: OutputFormat,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            quality: 0.95,
            scale: 2.0,
            format: OutputFormat::Png,
        }
    }
}

impl ConversionOptions {
    /// Create a new builder starting from the defaults.
    pub fn builder() -> ConversionOptionsBuilder {
        ConversionOptionsBuilder {
            options: Self::default(),
        }
    }

    /// Check the documented ranges.
    pub fn validate(&self) -> Result<(), Pdf2ImgError> {
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(Pdf2ImgError::InvalidOptions(format!(
                "quality must be within 0–1, got {}",
                self.quality
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 || self.scale > MAX_SCALE {
            return Err(Pdf2ImgError::InvalidOptions(format!(
                "scale must be within (0, {MAX_SCALE}], got {}",
                self.scale
            )));
        }
        Ok(())
    }

    /// JPEG quality on the encoder's 1–100 scale.
    pub(crate) fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// Builder for [`ConversionOptions`].
#[derive(Debug)]
pub struct ConversionOptionsBuilder {
    options: ConversionOptions,
}

impl ConversionOptionsBuilder {
    pub fn quality(mut self, quality: f32) -> Self {
        self.options.quality = quality;
        self
    }

    pub fn scale(mut self, scale: f32) -> Self {
        self.options.scale = scale;
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.options.format = format;
        self
    }

    /// Build the options, validating ranges.
    pub fn build(self) -> Result<ConversionOptions, Pdf2ImgError> {
        self.options.validate()?;
        Ok(self.options)
    }
}

// ── Engine sources ───────────────────────────────────────────────────────

/// Base URL of the pinned `@ffmpeg/core` UMD build.
pub const DEFAULT_FFMPEG_BASE_URL: &str = "https://unpkg.com/@ffmpeg/core@0.12.2/dist/umd";

/// Version of `@ffmpeg/core` the default base URL points at.
pub const DEFAULT_FFMPEG_VERSION: &str = "0.12.2";

/// Where the ffmpeg WASM core is fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEngineSource {
    /// Directory URL holding `ffmpeg-core.js` and `ffmpeg-core.wasm`.
    pub base_url: String,
    /// Informational version label carried into the loaded handle.
    pub version: String,
}

impl Default for MediaEngineSource {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FFMPEG_BASE_URL.to_string(),
            version: DEFAULT_FFMPEG_VERSION.to_string(),
        }
    }
}

impl MediaEngineSource {
    /// URL of the core runtime script.
    pub fn core_url(&self) -> String {
        format!("{}/ffmpeg-core.js", self.base_url.trim_end_matches('/'))
    }

    /// URL of the WASM binary.
    pub fn wasm_url(&self) -> String {
        format!("{}/ffmpeg-core.wasm", self.base_url.trim_end_matches('/'))
    }
}

/// Locations of both external engines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSource {
    pub pdfium: PdfiumSource,
    pub media: MediaEngineSource,
}

impl EngineSource {
    /// Defaults overridden by environment variables.
    ///
    /// PDFium: see [`PdfiumSource::from_env`]. Media engine:
    /// `PDF2IMG_FFMPEG_BASE_URL` and `PDF2IMG_FFMPEG_VERSION`.
    pub fn from_env() -> Self {
        let mut media = MediaEngineSource::default();
        if let Ok(url) = std::env::var("PDF2IMG_FFMPEG_BASE_URL") {
            if !url.is_empty() {
                media.base_url = url;
            }
        }
        if let Ok(version) = std::env::var("PDF2IMG_FFMPEG_VERSION") {
            if !version.is_empty() {
                media.version = version;
            }
        }
        Self {
            pdfium: PdfiumSource::from_env(),
            media,
        }
    }
}
