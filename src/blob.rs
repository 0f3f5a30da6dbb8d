//! Process-local reference URLs for in-memory payloads.
//!
//! Every rendered image is registered in an [`ObjectUrlStore`] and handed to
//! the caller as a `blob:` URL. The store keeps the bytes alive until the URL
//! is revoked; nothing is revoked automatically, so long-running callers must
//! call [`ObjectUrlStore::revoke`] once they are done with a result.

use bytes::Bytes;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// URL scheme prefix of every reference handed out by the store.
pub const BLOB_URL_PREFIX: &str = "blob:pdf2img/";

#[derive(Debug, Clone)]
struct Entry {
    bytes: Bytes,
    mime_type: &'static str,
}

static GLOBAL: Lazy<Arc<ObjectUrlStore>> = Lazy::new(|| Arc::new(ObjectUrlStore::new()));

/// A registry of `blob:` URLs pointing at in-memory payloads.
#[derive(Debug, Default)]
pub struct ObjectUrlStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl ObjectUrlStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide store used by the crate-level functions.
    pub fn global() -> Arc<ObjectUrlStore> {
        Arc::clone(&GLOBAL)
    }

    /// Register `bytes` and return a fresh URL referencing them.
    pub fn create(&self, bytes: Bytes, mime_type: &'static str) -> String {
        let url = format!("{BLOB_URL_PREFIX}{}", Uuid::new_v4());
        debug!("Registered {} ({} bytes, {})", url, bytes.len(), mime_type);
        self.entries
            .lock()
            .insert(url.clone(), Entry { bytes, mime_type });
        url
    }

    /// The payload behind `url`, if it has not been revoked.
    pub fn resolve(&self, url: &str) -> Option<Bytes> {
        self.entries.lock().get(url).map(|e| e.bytes.clone())
    }

    /// The MIME type recorded for `url`.
    pub fn mime_type(&self, url: &str) -> Option<&'static str> {
        self.entries.lock().get(url).map(|e| e.mime_type)
    }

    /// Release the payload behind `url`. Returns `false` for unknown URLs.
    pub fn revoke(&self, url: &str) -> bool {
        self.entries.lock().remove(url).is_some()
    }

    /// Number of live URLs.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes held by live URLs.
    pub fn retained_bytes(&self) -> usize {
        self.entries.lock().values().map(|e| e.bytes.len()).sum()
    }
}
