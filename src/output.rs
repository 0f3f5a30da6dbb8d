//! Result types returned by the conversion entry points.

use crate::error::Pdf2ImgError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::Serialize;

/// One rendered page.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    /// Encoded image bytes. Empty for placeholder results.
    #[serde(skip)]
    pub blob: Bytes,
    pub mime_type: &'static str,
    pub filename: String,
    /// Reference URL registered in the converter's `ObjectUrlStore`.
    pub url: String,
    /// 1-based page number.
    pub page_number: usize,
    pub total_pages: usize,
}

impl ConversionResult {
    /// The blob as a base64 `data:` URL.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.blob))
    }
}

/// Document information returned by `get_pdf_info`.
///
/// Metadata fields that are missing or empty are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PdfInfo {
    pub num_pages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
}

/// Output of the placeholder generator.
#[derive(Debug, Clone)]
pub struct FallbackImage {
    pub blob: Bytes,
    pub url: String,
    pub filename: String,
}

/// Output of `convert_pdf_to_single_image`.
#[derive(Debug)]
pub struct SingleImage {
    pub result: ConversionResult,
    /// The primary-path failure that caused a placeholder to be returned.
    pub fallback_reason: Option<Pdf2ImgError>,
}

impl SingleImage {
    /// `true` when `result` is a placeholder rather than a rendered page.
    pub fn is_placeholder(&self) -> bool {
        self.fallback_reason.is_some()
    }
}
