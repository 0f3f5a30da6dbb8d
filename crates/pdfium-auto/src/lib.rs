//! # pdfium-auto
//!
//! Resolve, download and cache [PDFium](https://pdfium.googlesource.com/pdfium/)
//! binaries at runtime, so that users of `pdfium-render` do not need to
//! install libpdfium by hand or set `LD_LIBRARY_PATH` / `DYLD_LIBRARY_PATH`.
//!
//! Where the binaries come from is described by a [`PdfiumSource`]: a release
//! base URL, a pinned version, an optional cache directory and an optional
//! explicit library path. Nothing is hard-wired, so air-gapped deployments can
//! point the source at a mirror (or at a pre-installed library) and tests can
//! point it at a scratch directory.
//!
//! ## How it works
//!
//! On a call to [`ensure_library`] or [`bind`]:
//!
//! 1. If `source.library_path` is set and exists, it is used as-is.
//! 2. Otherwise the per-version cache directory is checked for the platform
//!    library.
//! 3. If absent, `{base_url}/chromium%2F{version}/{archive}` is downloaded and
//!    the library is extracted into the cache directory.
//! 4. [`bind`] then calls [`Pdfium::bind_to_library`] on the resolved path.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pdfium_auto::{bind, ensure_library, PdfiumSource};
//!
//! let source = PdfiumSource::from_env();
//!
//! // Option A: one-shot bind, no progress output
//! let pdfium = bind(&source, None).expect("PDFium unavailable");
//!
//! // Option B: download with progress, then bind
//! let path = ensure_library(&source, Some(&|downloaded, total| {
//!     if let Some(t) = total {
//!         eprint!("\rDownloading PDFium: {}/{} bytes", downloaded, t);
//!     }
//! })).expect("download failed");
//! let pdfium = pdfium_auto::bind_from_path(&path).expect("bind failed");
//! ```
//!
//! ## Platform support
//!
//! | OS      | Arch    | Library               |
//! |---------|---------|-----------------------|
//! | macOS   | arm64   | `libpdfium.dylib`     |
//! | macOS   | x86_64  | `libpdfium.dylib`     |
//! | Linux   | x86_64  | `libpdfium.so`        |
//! | Linux   | aarch64 | `libpdfium.so`        |
//! | Windows | x86_64  | `pdfium.dll`          |
//! | Windows | aarch64 | `pdfium.dll`          |
//! | Windows | x86     | `pdfium.dll`          |
//!
//! ## Environment variables read by [`PdfiumSource::from_env`]
//!
//! - `PDFIUM_LIB_PATH`: path to an existing pdfium library; skips download.
//! - `PDFIUM_AUTO_CACHE_DIR`: override the default cache directory.
//! - `PDFIUM_BASE_URL`: release mirror to download from.
//! - `PDFIUM_VERSION`: pdfium-binaries release tag.

use std::io::Read;
use std::path::{Path, PathBuf};

use pdfium_render::prelude::Pdfium;
use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// The pdfium-binaries release tag used when no version is configured.
///
/// Maps to [`bblanchon/pdfium-binaries chromium/7690`](https://github.com/bblanchon/pdfium-binaries/releases/tag/chromium%2F7690).
pub const DEFAULT_PDFIUM_VERSION: &str = "7690";

/// GitHub release base URL used when no mirror is configured.
pub const DEFAULT_BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by pdfium-auto operations.
#[derive(Error, Debug)]
pub enum PdfiumAutoError {
    /// The current OS/architecture combination is not supported.
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// Could not create or navigate the local cache directory.
    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    /// Network download failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// gzip/tar extraction failed.
    #[error("Archive extraction failed: {0}")]
    Extract(String),

    /// `libloading` / `pdfium-render` could not load the library.
    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

// ── Source description ───────────────────────────────────────────────────────

/// Where the PDFium library comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfiumSource {
    /// Release base URL; the archive URL is `{base_url}/chromium%2F{version}/{archive}`.
    pub base_url: String,
    /// pdfium-binaries release tag.
    pub version: String,
    /// Root of the cache; the library lives in `{cache_root}/pdfium-{version}/`.
    /// `None` selects the platform cache directory.
    pub cache_root: Option<PathBuf>,
    /// An existing library to bind directly, bypassing cache and download.
    pub library_path: Option<PathBuf>,
}

impl Default for PdfiumSource {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            version: DEFAULT_PDFIUM_VERSION.to_string(),
            cache_root: None,
            library_path: None,
        }
    }
}

impl PdfiumSource {
    /// Defaults overridden by `PDFIUM_*` environment variables.
    pub fn from_env() -> Self {
        let mut source = Self::default();
        if let Some(url) = non_empty_env("PDFIUM_BASE_URL") {
            source.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(version) = non_empty_env("PDFIUM_VERSION") {
            source.version = version;
        }
        source.cache_root = non_empty_env("PDFIUM_AUTO_CACHE_DIR").map(PathBuf::from);
        source.library_path = non_empty_env("PDFIUM_LIB_PATH").map(PathBuf::from);
        source
    }

    /// Per-version cache directory for the PDFium library.
    ///
    /// Default locations:
    /// - **macOS**: `~/Library/Caches/pdf2img/pdfium-{VERSION}/`
    /// - **Linux**: `~/.cache/pdf2img/pdfium-{VERSION}/`
    /// - **Windows**: `%LOCALAPPDATA%\pdf2img\pdfium-{VERSION}\`
    pub fn cache_dir(&self) -> PathBuf {
        let leaf = format!("pdfium-{}", self.version);
        if let Some(root) = &self.cache_root {
            return root.join(leaf);
        }

        let base = dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
            .unwrap_or_else(std::env::temp_dir);

        base.join("pdf2img").join(leaf)
    }

    /// Download URL of the platform archive.
    pub fn archive_url(&self) -> Result<String, PdfiumAutoError> {
        let info = detect_platform()?;
        Ok(format!(
            "{}/chromium%2F{}/{}",
            self.base_url.trim_end_matches('/'),
            self.version,
            info.archive_name
        ))
    }

    /// Returns the on-disk library path if no network access is needed.
    pub fn cached_library(&self) -> Option<PathBuf> {
        if let Some(p) = &self.library_path {
            if p.exists() {
                return Some(p.clone());
            }
        }
        let info = detect_platform().ok()?;
        let p = self.cache_dir().join(info.lib_name);
        p.exists().then_some(p)
    }

    /// `true` when [`ensure_library`] would not touch the network.
    pub fn is_cached(&self) -> bool {
        self.cached_library().is_some()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

// ── Internal: platform metadata ──────────────────────────────────────────────

struct PlatformInfo {
    /// Asset filename in the release, e.g. `pdfium-mac-arm64.tgz`.
    archive_name: &'static str,
    /// Relative path inside the archive, e.g. `lib/libpdfium.dylib`.
    lib_path_in_archive: &'static str,
    /// Filename to write on disk, e.g. `libpdfium.dylib`.
    lib_name: &'static str,
}

fn detect_platform() -> Result<PlatformInfo, PdfiumAutoError> {
    platform_for(std::env::consts::OS, std::env::consts::ARCH)
}

fn platform_for(os: &str, arch: &str) -> Result<PlatformInfo, PdfiumAutoError> {
    const SO: (&str, &str) = ("lib/libpdfium.so", "libpdfium.so");
    const DYLIB: (&str, &str) = ("lib/libpdfium.dylib", "libpdfium.dylib");
    const DLL: (&str, &str) = ("bin/pdfium.dll", "pdfium.dll");

    let (archive_name, (lib_path_in_archive, lib_name)) = match (os, arch) {
        ("macos", "aarch64") => ("pdfium-mac-arm64.tgz", DYLIB),
        ("macos", "x86_64") => ("pdfium-mac-x64.tgz", DYLIB),
        ("linux", "x86_64") => ("pdfium-linux-x64.tgz", SO),
        ("linux", "aarch64") => ("pdfium-linux-arm64.tgz", SO),
        ("windows", "x86_64") => ("pdfium-win-x64.tgz", DLL),
        ("windows", "aarch64") => ("pdfium-win-arm64.tgz", DLL),
        ("windows", "x86") => ("pdfium-win-x86.tgz", DLL),
        (os, arch) => {
            return Err(PdfiumAutoError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            })
        }
    };

    Ok(PlatformInfo {
        archive_name,
        lib_path_in_archive,
        lib_name,
    })
}

/// `Ok(())` when pdfium-binaries publishes a library for this OS/arch.
pub fn check_platform() -> Result<(), PdfiumAutoError> {
    detect_platform().map(|_| ())
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Ensures the PDFium dynamic library described by `source` is on disk.
///
/// `on_progress` receives `(bytes_downloaded, total_size_option)` during
/// the download. Pass `None` to suppress progress callbacks.
///
/// No process-wide memoisation happens here: callers that need a single
/// initialisation (e.g. an engine registry) provide it themselves.
pub fn ensure_library(
    source: &PdfiumSource,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, PdfiumAutoError> {
    // 1. Explicit library.
    if let Some(p) = &source.library_path {
        if p.exists() {
            return Ok(p.clone());
        }
        // Fall through: path configured but missing → still try cache/download.
        eprintln!(
            "pdfium-auto: library path '{}' not found; using cache or download",
            p.display()
        );
    }

    let info = detect_platform()?;
    let cache_dir = source.cache_dir();
    let lib_path = cache_dir.join(info.lib_name);

    // 2. Already cached on disk.
    if lib_path.exists() {
        return Ok(lib_path);
    }

    // 3. Download and extract.
    let url = source.archive_url()?;

    std::fs::create_dir_all(&cache_dir).map_err(PdfiumAutoError::CacheDir)?;

    let archive_bytes = download_bytes(&url, on_progress)?;
    extract_library(&archive_bytes, info.lib_path_in_archive, &lib_path)?;

    Ok(lib_path)
}

/// Binds to PDFium, downloading it first if necessary.
pub fn bind(
    source: &PdfiumSource,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Pdfium, PdfiumAutoError> {
    let lib_path = ensure_library(source, on_progress)?;
    bind_from_path(&lib_path)
}

/// Binds to a PDFium library at an explicit `path`.
///
/// Does not interact with the download / cache layer.
pub fn bind_from_path(path: &Path) -> Result<Pdfium, PdfiumAutoError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| PdfiumAutoError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

// ── Internal helpers ─────────────────────────────────────────────────────────

/// Streams a URL into a `Vec<u8>`, calling `on_progress` every 64 KiB.
fn download_bytes(
    url: &str,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Vec<u8>, PdfiumAutoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-auto/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| PdfiumAutoError::Download(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .map_err(|e| PdfiumAutoError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(PdfiumAutoError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let capacity = total.unwrap_or(35 * 1024 * 1024) as usize;
    let mut buf = Vec::with_capacity(capacity);

    let mut stream = response;
    let mut chunk = vec![0u8; 64 * 1024]; // 64 KiB
    let mut downloaded: u64 = 0;

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                downloaded += n as u64;
                if let Some(cb) = on_progress {
                    cb(downloaded, total);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(PdfiumAutoError::Download(format!("Read error: {e}")));
            }
        }
    }

    Ok(buf)
}

/// Extracts a single file from a gzipped tar archive into `dest_path`.
fn extract_library(
    archive_bytes: &[u8],
    lib_path_in_archive: &str,
    dest_path: &Path,
) -> Result<(), PdfiumAutoError> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let gz = GzDecoder::new(archive_bytes);
    let mut archive = Archive::new(gz);

    for entry in archive
        .entries()
        .map_err(|e| PdfiumAutoError::Extract(e.to_string()))?
    {
        let mut entry = entry.map_err(|e| PdfiumAutoError::Extract(e.to_string()))?;
        let entry_path = entry
            .path()
            .map_err(|e| PdfiumAutoError::Extract(e.to_string()))?;

        if entry_path.to_string_lossy() == lib_path_in_archive {
            entry
                .unpack(dest_path)
                .map_err(|e| PdfiumAutoError::Extract(format!("Unpack failed: {e}")))?;
            return Ok(());
        }
    }

    Err(PdfiumAutoError::Extract(format!(
        "Library '{}' not found in archive",
        lib_path_in_archive
    )))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
