//! Blob store capability and its backends.
//!
//! Paths are `<entity-id>/<file-name>`; see [`crate::blobref`] for the
//! `blob://` reference form stored on records.

use crate::error::StoreError;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub trait BlobStore: Send + Sync {
    /// Open a read stream; `StoreError::NotFound` when nothing is stored at `path`.
    fn get(&self, path: &str) -> StoreResult<Box<dyn Read + Send>>;

    fn put(&self, path: &str, data: &mut dyn Read, content_type: &str) -> StoreResult<()>;
}

/// Blobs as plain files under a root directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, path: &str) -> StoreResult<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        if escapes || path.is_empty() {
            return Err(StoreError::Backend(format!("blob path outside store root: {path:?}")));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for FsBlobStore {
    fn get(&self, path: &str) -> StoreResult<Box<dyn Read + Send>> {
        let file_path = self.resolve(path)?;
        match std::fs::File::open(&file_path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(path.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, path: &str, data: &mut dyn Read, _content_type: &str) -> StoreResult<()> {
        let file_path = self.resolve(path)?;
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(&file_path)?;
        std::io::copy(data, &mut file)?;
        tracing::debug!(path, dest = %file_path.display(), "stored blob");
        Ok(())
    }
}

/// Blobs served over HTTP: `GET|PUT <base-url>/<path>`.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpBlobStore {
    pub fn new(base_url: &str, timeout: Duration) -> StoreResult<Self> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl BlobStore for HttpBlobStore {
    fn get(&self, path: &str) -> StoreResult<Box<dyn Read + Send>> {
        let response = self.client.get(self.url(path)).send()?;
        match response.status() {
            reqwest::StatusCode::OK => Ok(Box::new(response)),
            reqwest::StatusCode::NOT_FOUND => Err(StoreError::NotFound(path.to_string())),
            status => Err(StoreError::Status { path: path.to_string(), status: status.as_u16() }),
        }
    }

    fn put(&self, path: &str, data: &mut dyn Read, content_type: &str) -> StoreResult<()> {
        let mut body = Vec::new();
        data.read_to_end(&mut body)?;
        let response = self
            .client
            .put(self.url(path))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()?;
        if !response.status().is_success() {
            return Err(StoreError::Status { path: path.to_string(), status: response.status().as_u16() });
        }
        tracing::debug!(path, "stored blob");
        Ok(())
    }
}

/// Process-local store, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, StoredBlob>>,
}

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Vec<u8>,
    content_type: String,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, data: impl Into<Vec<u8>>) {
        if let Ok(mut blobs) = self.blobs.lock() {
            blobs.insert(
                path.to_string(),
                StoredBlob { data: data.into(), content_type: "application/octet-stream".to_string() },
            );
        }
    }

    #[must_use]
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.lock().ok()?.get(path).map(|b| b.data.clone())
    }

    #[must_use]
    pub fn content_type(&self, path: &str) -> Option<String> {
        self.blobs.lock().ok()?.get(path).map(|b| b.content_type.clone())
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<String, StoredBlob>>> {
        self.blobs.lock().map_err(|_| StoreError::Backend("blob store lock poisoned".to_string()))
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, path: &str) -> StoreResult<Box<dyn Read + Send>> {
        let blobs = self.lock()?;
        let blob = blobs.get(path).ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        Ok(Box::new(Cursor::new(blob.data.clone())))
    }

    fn put(&self, path: &str, data: &mut dyn Read, content_type: &str) -> StoreResult<()> {
        let mut bytes = Vec::new();
        data.read_to_end(&mut bytes)?;
        self.lock()?
            .insert(path.to_string(), StoredBlob { data: bytes, content_type: content_type.to_string() });
        Ok(())
    }
}
