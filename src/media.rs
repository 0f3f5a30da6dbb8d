//! Media engine loader: the ffmpeg WASM core.
//!
//! The encoder ships as two assets under one base URL, a runtime script
//! (`ffmpeg-core.js`) and the WASM binary it instantiates
//! (`ffmpeg-core.wasm`). [`load_ffmpeg`] fetches both, checks that the binary
//! really is WebAssembly and registers each payload as a reference URL so a
//! host runtime can load them without touching the network again.
//!
//! Every call builds a fresh [`MediaEngine`]; nothing is cached and nothing
//! is retried.

use crate::blob::ObjectUrlStore;
use crate::config::MediaEngineSource;
use crate::environment::require_runtime;
use crate::error::Pdf2ImgError;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

const ENGINE: &str = "FFmpeg";

/// `\0asm` followed by binary format version 1.
const WASM_HEADER: [u8; 8] = [0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];

const CORE_MIME: &str = "text/javascript";
const WASM_MIME: &str = "application/wasm";

const FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// A loaded media engine: both assets in memory plus their reference URLs.
#[derive(Debug, Clone)]
pub struct MediaEngine {
    pub version: String,
    /// Reference URL of the runtime script.
    pub core_url: String,
    /// Reference URL of the WASM binary.
    pub wasm_url: String,
    pub core: Bytes,
    pub wasm: Bytes,
}

impl MediaEngine {
    /// Save both assets into `dir` under their canonical names.
    pub async fn write_to_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, Pdf2ImgError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Pdf2ImgError::OutputWriteFailed {
                path: dir.to_path_buf(),
                source: e,
            })?;

        let mut written = Vec::with_capacity(2);
        for (name, bytes) in [("ffmpeg-core.js", &self.core), ("ffmpeg-core.wasm", &self.wasm)] {
            let path = dir.join(name);
            crate::convert::write_atomic(&path, bytes).await?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Fetch the media engine described by `source` and register its assets in
/// `urls`.
pub async fn load_ffmpeg(
    source: &MediaEngineSource,
    urls: &ObjectUrlStore,
) -> Result<MediaEngine, Pdf2ImgError> {
    require_runtime("FFmpeg loading")?;

    match fetch_assets(source).await {
        Ok((core, wasm)) => {
            let core_url = urls.create(core.clone(), CORE_MIME);
            let wasm_url = urls.create(wasm.clone(), WASM_MIME);
            info!(
                "{} core {} loaded ({} + {} bytes)",
                ENGINE,
                source.version,
                core.len(),
                wasm.len()
            );
            Ok(MediaEngine {
                version: source.version.clone(),
                core_url,
                wasm_url,
                core,
                wasm,
            })
        }
        Err(e) => {
            error!("Failed to load {}: {}", ENGINE, e);
            Err(e)
        }
    }
}

async fn fetch_assets(source: &MediaEngineSource) -> Result<(Bytes, Bytes), Pdf2ImgError> {
    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| load_failed(e.to_string()))?;

    let core = fetch(&client, &source.core_url()).await?;
    let wasm = fetch(&client, &source.wasm_url()).await?;
    check_wasm_header(&wasm)?;
    Ok((core, wasm))
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<Bytes, Pdf2ImgError> {
    debug!("Fetching {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| load_failed(format!("{url}: {e}")))?;

    if !response.status().is_success() {
        return Err(load_failed(format!("{url}: HTTP {}", response.status())));
    }

    response
        .bytes()
        .await
        .map_err(|e| load_failed(format!("{url}: {e}")))
}

fn check_wasm_header(wasm: &[u8]) -> Result<(), Pdf2ImgError> {
    if wasm.len() < WASM_HEADER.len() || wasm[..4] != WASM_HEADER[..4] {
        return Err(load_failed("core binary is not a WebAssembly module".into()));
    }
    if wasm[4..8] != WASM_HEADER[4..] {
        return Err(load_failed(format!(
            "unsupported WebAssembly version {:?}",
            &wasm[4..8]
        )));
    }
    Ok(())
}

fn load_failed(detail: String) -> Pdf2ImgError {
    Pdf2ImgError::EngineLoad {
        engine: ENGINE,
        detail,
    }
}
