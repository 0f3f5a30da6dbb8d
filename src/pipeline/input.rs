//! Input resolution: normalise bytes, a local path or a URL into a [`PdfFile`].
//!
//! Engines parse from memory, so every input ends up as a byte buffer plus a
//! display name. The name only drives output filenames; neither the `.pdf`
//! suffix nor the `%PDF` magic is checked here. Malformed input is reported
//! by the engine as a parse failure.

use crate::error::Pdf2ImgError;
use bytes::Bytes;
use std::path::Path;
use tracing::{debug, info};

/// A PDF held in memory together with its display filename.
#[derive(Debug, Clone)]
pub struct PdfFile {
    name: String,
    bytes: Bytes,
}

impl PdfFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a local file; the display name is the file name component.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, Pdf2ImgError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Pdf2ImgError::InputNotFound {
                path: path.to_path_buf(),
                source: e,
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        debug!("Read {} ({} bytes)", path.display(), bytes.len());
        Ok(Self::new(name, bytes))
    }

    /// Resolve a local path or an HTTP/HTTPS URL.
    pub async fn resolve(input: &str, timeout_secs: u64) -> Result<Self, Pdf2ImgError> {
        if is_url(input) {
            download_url(input, timeout_secs).await
        } else {
            Self::from_path(input).await
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Size of the document in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<PdfFile, Pdf2ImgError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| Pdf2ImgError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {timeout_secs}s"))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    info!("Downloaded {} bytes", bytes.len());

    Ok(PdfFile::new(extract_filename(url), bytes))
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_extract_filename() {
        assert_eq!(extract_filename("https://example.com/a/report.pdf"), "report.pdf");
        assert_eq!(extract_filename("https://arxiv.org/pdf/1706.03762"), "1706.03762");
        assert_eq!(extract_filename("https://example.com/"), "downloaded.pdf");
        assert_eq!(extract_filename("https://example.com/download"), "downloaded.pdf");
    }

    #[tokio::test]
    async fn from_path_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Invoice.PDF");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let file = PdfFile::from_path(&path).await.unwrap();
        assert_eq!(file.name(), "Invoice.PDF");
        assert_eq!(file.size(), 8);
    }

    #[tokio::test]
    async fn missing_path_is_reported() {
        let err = PdfFile::resolve("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, Pdf2ImgError::InputNotFound { .. }));
    }
}
