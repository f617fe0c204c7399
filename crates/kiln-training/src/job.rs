use crate::blobref;
use crate::dataset::DatasetId;
use crate::error::{PrepError, PrepResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a solver job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolverJobId(pub String);

impl SolverJobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SolverJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SolverJobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for SolverJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One training run: a solver/network configuration pair and a dataset.
///
/// Both specification references start as external URLs and are replaced by
/// `blob://<job-id>/...` references once the configurations are rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SolverJob {
    pub id: SolverJobId,
    /// Bumped by the job store on every successful write.
    #[serde(default)]
    pub revision: u64,
    pub dataset_id: DatasetId,
    pub specification_url: String,
    pub specification_net_url: String,
}

impl SolverJob {
    #[must_use]
    pub fn new(dataset_id: DatasetId, specification_url: String, specification_net_url: String) -> Self {
        Self { id: SolverJobId::new(), revision: 0, dataset_id, specification_url, specification_net_url }
    }

    pub fn validate(&self) -> PrepResult<()> {
        if self.id.0.trim().is_empty() {
            return Err(PrepError::Config("job id is required".to_string()));
        }
        if self.dataset_id.0.trim().is_empty() {
            return Err(PrepError::Config(format!("job {}: dataset-id is required", self.id)));
        }
        if self.specification_url.trim().is_empty() {
            return Err(PrepError::Config(format!("job {}: specification-url is required", self.id)));
        }
        if self.specification_net_url.trim().is_empty() {
            return Err(PrepError::Config(format!("job {}: specification-net-url is required", self.id)));
        }
        Ok(())
    }

    /// Blob path of the solver configuration; fails until it has been rewritten.
    pub fn specification_path(&self) -> PrepResult<&str> {
        blobref::to_relative_path(&self.specification_url)
    }

    pub fn specification_net_path(&self) -> PrepResult<&str> {
        blobref::to_relative_path(&self.specification_net_url)
    }

    /// Whether both configuration references already point into the blob store.
    #[must_use]
    pub fn is_rewritten(&self) -> bool {
        blobref::is_reference(&self.specification_url) && blobref::is_reference(&self.specification_net_url)
    }

    /// Blob path for a file namespaced under this job.
    #[must_use]
    pub fn blob_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.id, file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> SolverJob {
        SolverJob {
            id: SolverJobId::from("job-1"),
            revision: 3,
            dataset_id: DatasetId::from("ds-1"),
            specification_url: "http://example.com/solver.prototxt".to_string(),
            specification_net_url: "blob://job-1/solver-net.prototxt".to_string(),
        }
    }

    #[test]
    fn test_json_uses_kebab_case_keys() {
        let value = serde_json::to_value(job()).unwrap();
        assert_eq!(value["dataset-id"], "ds-1");
        assert_eq!(value["specification-net-url"], "blob://job-1/solver-net.prototxt");
        assert_eq!(value["id"], "job-1");

        let back: SolverJob = serde_json::from_value(value).unwrap();
        assert_eq!(back, job());
    }

    #[test]
    fn test_specification_paths() {
        let job = job();
        assert!(matches!(job.specification_path(), Err(PrepError::InvalidReference { .. })));
        assert_eq!(job.specification_net_path().unwrap(), "job-1/solver-net.prototxt");
        assert!(!job.is_rewritten());
        assert_eq!(job.blob_path("solver.prototxt"), "job-1/solver.prototxt");
    }

    #[test]
    fn test_validate_requires_fields() {
        let mut job = job();
        assert!(job.validate().is_ok());
        job.dataset_id = DatasetId::from(" ");
        assert!(matches!(job.validate(), Err(PrepError::Config(_))));
    }

    #[test]
    fn test_new_assigns_unique_ids() {
        let a = SolverJob::new(DatasetId::from("ds"), "u".to_string(), "n".to_string());
        let b = SolverJob::new(DatasetId::from("ds"), "u".to_string(), "n".to_string());
        assert_ne!(a.id, b.id);
        assert_eq!(a.revision, 0);
    }
}
