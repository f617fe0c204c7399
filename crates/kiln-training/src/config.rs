//! Preparation settings, loaded from TOML.
//!
//! ```toml
//! work_directory = "/var/lib/kiln/work"
//! label_policy = "stable"
//! vocabulary_check = "advisory"
//! max_update_retries = 5
//! http_timeout_secs = 10
//!
//! [blob_store]
//! kind = "fs"
//! root = "/var/lib/kiln/blobs"
//!
//! [job_store]
//! root = "/var/lib/kiln/jobs"
//! ```

use crate::assemble::VocabularyCheck;
use crate::error::{PrepError, PrepResult};
use crate::toc::LabelPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BLOB_STORE_URL: &str = "http://localhost:8484";
pub const DEFAULT_WORK_DIRECTORY: &str = "/tmp/kiln";
pub const DEFAULT_MAX_UPDATE_RETRIES: u32 = 3;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Where blobs live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlobStoreConfig {
    Http { url: String },
    Fs { root: PathBuf },
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self::Http { url: DEFAULT_BLOB_STORE_URL.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStoreConfig {
    pub root: PathBuf,
}

impl Default for JobStoreConfig {
    fn default() -> Self {
        Self { root: PathBuf::from(DEFAULT_WORK_DIRECTORY).join("jobs") }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    /// Per-job work directories are created below this one.
    pub work_directory: PathBuf,
    pub label_policy: LabelPolicy,
    pub vocabulary_check: VocabularyCheck,
    pub max_update_retries: u32,
    pub http_timeout_secs: u64,
    pub blob_store: BlobStoreConfig,
    pub job_store: JobStoreConfig,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            work_directory: PathBuf::from(DEFAULT_WORK_DIRECTORY),
            label_policy: LabelPolicy::default(),
            vocabulary_check: VocabularyCheck::default(),
            max_update_retries: DEFAULT_MAX_UPDATE_RETRIES,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            blob_store: BlobStoreConfig::default(),
            job_store: JobStoreConfig::default(),
        }
    }
}

impl PrepConfig {
    /// Load configuration from a TOML file. Missing keys take their defaults.
    pub fn load_from_file(path: &Path) -> PrepResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PrepError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| PrepError::Config(format!("failed to parse {}: {e}", path.display())))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> PrepResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| PrepError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> PrepResult<String> {
        toml::to_string_pretty(self).map_err(|e| PrepError::Config(format!("failed to serialize: {e}")))
    }

    pub fn validate(&self) -> PrepResult<()> {
        if self.http_timeout_secs == 0 {
            return Err(PrepError::Config("http_timeout_secs must be greater than zero".to_string()));
        }
        if let BlobStoreConfig::Http { url } = &self.blob_store {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(PrepError::Config(format!("blob store url must be http(s): {url}")));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = PrepConfig::default();
        assert_eq!(config.blob_store, BlobStoreConfig::Http { url: "http://localhost:8484".to_string() });
        assert_eq!(config.work_directory, PathBuf::from("/tmp/kiln"));
        assert_eq!(config.max_update_retries, 3);
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert_eq!(config.label_policy, LabelPolicy::Sequential);
        assert_eq!(config.vocabulary_check, VocabularyCheck::Enforce);
        assert_eq!(PrepConfig::from_toml("").unwrap(), config);
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kiln.toml");
        std::fs::write(
            &path,
            r#"
work_directory = "/srv/work"
label_policy = "stable"
vocabulary_check = "advisory"
max_update_retries = 5

[blob_store]
kind = "fs"
root = "/srv/blobs"
"#,
        )
        .unwrap();

        let config = PrepConfig::load_from_file(&path).unwrap();
        assert_eq!(config.blob_store, BlobStoreConfig::Fs { root: PathBuf::from("/srv/blobs") });
        assert_eq!(config.work_directory, PathBuf::from("/srv/work"));
        assert_eq!(config.label_policy, LabelPolicy::Stable);
        assert_eq!(config.vocabulary_check, VocabularyCheck::Advisory);
        assert_eq!(config.max_update_retries, 5);
        assert_eq!(config.http_timeout_secs, 30);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = PrepConfig { max_update_retries: 7, ..PrepConfig::default() };
        assert_eq!(PrepConfig::from_toml(&config.to_toml().unwrap()).unwrap(), config);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(PrepConfig::from_toml("http_timeout_secs = 0"), Err(PrepError::Config(_))));
        assert!(PrepConfig::from_toml("[blob_store]\nkind = \"http\"\nurl = \"ftp://x\"\n").is_err());
        assert!(PrepConfig::from_toml("label_policy = \"random\"").is_err());
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = PrepConfig::load_from_file(&temp.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
