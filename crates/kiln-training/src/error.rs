use std::path::PathBuf;
use thiserror::Error;

pub type PrepResult<T> = std::result::Result<T, PrepError>;

#[derive(Debug, Error)]
pub enum PrepError {
    #[error("invalid blob reference {reference:?}: expected prefix {prefix}", prefix = crate::blobref::BLOB_URI_PREFIX)]
    InvalidReference { reference: String },

    #[error("failed to parse configuration from {reference}: {source}")]
    ConfigParse {
        reference: String,
        #[source]
        source: kiln_prototxt::ParseError,
    },

    #[error("failed to fetch {reference}: {reason}")]
    FetchFailed { reference: String, reason: String },

    #[error("failed to extract archive {archive}: {reason}")]
    ExtractionFailed { archive: String, reason: String },

    #[error("failed to write {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to store blob {path}: {source}")]
    StoreWrite {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("label vocabulary mismatch: training {training:?}, testing {testing:?}")]
    LabelVocabularyMismatch { training: Vec<String>, testing: Vec<String> },

    #[error("failed to persist job {job_id}: {reason}")]
    Persist { job_id: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PrepError {
    pub(crate) fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailed { path: path.into(), source }
    }
}

/// Failures reported by blob and job store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unexpected status {status} for {path}")]
    Status { path: String, status: u16 },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Backend(String),
}
