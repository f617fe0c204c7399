use crate::blobref;
use crate::error::PrepResult;
use crate::layout::Split;
use serde::{Deserialize, Serialize};

/// Identifier for a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(pub String);

impl DatasetId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DatasetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A packaged training/testing archive pair held in the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Dataset {
    pub id: DatasetId,
    pub training_archive: String,
    pub testing_archive: String,
}

impl Dataset {
    /// Dataset with archives at the conventional `<dataset-id>/training.tar.gz`
    /// and `<dataset-id>/testing.tar.gz` locations.
    #[must_use]
    pub fn new(id: DatasetId) -> Self {
        let training_archive = blobref::to_reference(&format!("{}/{}", id, Split::Training.archive_name()));
        let testing_archive = blobref::to_reference(&format!("{}/{}", id, Split::Testing.archive_name()));
        Self { id, training_archive, testing_archive }
    }

    #[must_use]
    pub fn archive_reference(&self, split: Split) -> &str {
        match split {
            Split::Training => &self.training_archive,
            Split::Testing => &self.testing_archive,
        }
    }

    /// Blob path of the archive for `split`.
    pub fn archive_path(&self, split: Split) -> PrepResult<&str> {
        blobref::to_relative_path(self.archive_reference(split))
    }
}
