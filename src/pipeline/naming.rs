//! Output filename templating.

use crate::config::OutputFormat;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_PDF_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());

/// The input name without a trailing `.pdf` (any case).
pub fn base_name(input_name: &str) -> &str {
    match RE_PDF_SUFFIX.find(input_name) {
        Some(m) => &input_name[..m.start()],
        None => input_name,
    }
}

/// Filename of a rendered page.
///
/// Single-page documents get `<base>.<ext>`, longer ones
/// `<base>_page_<n>.<ext>`, where `ext` is `jpg` for JPEG output.
pub fn page_filename(input_name: &str, page_number: usize, total_pages: usize, format: OutputFormat) -> String {
    let base = base_name(input_name);
    let ext = format.extension();
    if total_pages == 1 {
        format!("{base}.{ext}")
    } else {
        format!("{base}_page_{page_number}.{ext}")
    }
}

/// Filename of a placeholder image: `<base>.<format>` with the format name
/// exactly as requested (`jpeg` stays `jpeg`).
pub fn fallback_filename(input_name: &str, format: OutputFormat) -> String {
    format!("{}.{}", base_name(input_name), format.as_str())
}
