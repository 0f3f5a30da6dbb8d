//! Placeholder image for when the PDF engine path fails.
//!
//! The placeholder is a fixed 800×1000 page describing the input (name and
//! size) instead of its content. It is built as a small SVG scene and
//! rasterised with `resvg`, so text layout and anti-aliasing come from the
//! same stack regardless of output format. Text uses system fonts; on a host
//! without any, the border and background are still produced.

use crate::blob::ObjectUrlStore;
use crate::config::{ConversionOptions, OutputFormat};
use crate::error::Pdf2ImgError;
use crate::output::FallbackImage;
use crate::pipeline::encode::encode_surface;
use crate::pipeline::input::PdfFile;
use crate::pipeline::naming::fallback_filename;
use image::{DynamicImage, RgbaImage};
use once_cell::sync::Lazy;
use quick_xml::escape::escape;
use resvg::tiny_skia;
use resvg::usvg::{self, fontdb};
use std::sync::Arc;
use tracing::{debug, info};

pub const PLACEHOLDER_WIDTH: u32 = 800;
pub const PLACEHOLDER_HEIGHT: u32 = 1000;

/// Placeholders are always encoded at this quality.
pub const PLACEHOLDER_QUALITY: f32 = 0.95;

static SYSTEM_FONTS: Lazy<Arc<fontdb::Database>> = Lazy::new(|| {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    debug!("Loaded {} system font faces for placeholders", db.len());
    Arc::new(db)
});

/// Build a placeholder for `file`, encode it as `format` and register it.
pub fn convert_pdf_using_fallback(
    file: &PdfFile,
    format: OutputFormat,
    urls: &ObjectUrlStore,
) -> Result<FallbackImage, Pdf2ImgError> {
    let surface = render_placeholder(file.name(), file.size())?;

    let options = ConversionOptions {
        quality: PLACEHOLDER_QUALITY,
        format,
        ..ConversionOptions::default()
    };
    let blob = encode_surface(&surface, &options).map_err(|e| Pdf2ImgError::Encode {
        page: 1,
        detail: e.to_string(),
    })?;

    let filename = fallback_filename(file.name(), format);
    let url = urls.create(blob.clone(), format.mime_type());
    info!("Generated placeholder {} ({} bytes)", filename, blob.len());

    Ok(FallbackImage { blob, url, filename })
}

/// Rasterise the placeholder scene.
pub fn render_placeholder(name: &str, size_bytes: usize) -> Result<DynamicImage, Pdf2ImgError> {
    let svg = placeholder_svg(name, size_bytes);

    let options = usvg::Options {
        fontdb: Arc::clone(&SYSTEM_FONTS),
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_str(&svg, &options)
        .map_err(|e| Pdf2ImgError::Internal(format!("placeholder scene: {e}")))?;

    let mut pixmap = tiny_skia::Pixmap::new(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT)
        .ok_or_else(|| Pdf2ImgError::Internal("placeholder surface allocation failed".into()))?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    // Opaque background, so premultiplied and straight alpha coincide.
    RgbaImage::from_raw(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT, pixmap.take())
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| Pdf2ImgError::Internal("placeholder surface size mismatch".into()))
}

/// Size in megabytes with two decimals.
pub fn format_megabytes(size_bytes: usize) -> String {
    format!("{:.2}", size_bytes as f64 / 1024.0 / 1024.0)
}

fn placeholder_svg(name: &str, size_bytes: usize) -> String {
    let w = PLACEHOLDER_WIDTH;
    let h = PLACEHOLDER_HEIGHT;
    let cx = w / 2;
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">
  <rect x="0" y="0" width="{w}" height="{h}" fill="#ffffff"/>
  <rect x="0" y="0" width="{w}" height="{h}" fill="none" stroke="#cccccc" stroke-width="2"/>
  <g font-family="Arial, Helvetica, sans-serif" fill="#333333" text-anchor="middle">
    <text x="{cx}" y="100" font-size="24">PDF Preview</text>
    <text x="{cx}" y="150" font-size="16">File: {name}</text>
    <text x="{cx}" y="180" font-size="16">Size: {size} MB</text>
    <text x="{cx}" y="220" font-size="16">PDF rendering engine temporarily unavailable</text>
    <text x="{cx}" y="250" font-size="16">This is a placeholder image</text>
  </g>
</svg>"##,
        name = xml_text(name),
        size = format_megabytes(size_bytes),
    )
}

/// Text node content for `s`: characters XML 1.0 forbids become U+FFFD,
/// markup characters are escaped.
fn xml_text(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| if is_xml_char(c) { c } else { char::REPLACEMENT_CHARACTER })
        .collect();
    escape(cleaned.as_str()).into_owned()
}

/// XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}
