use crate::error::{PrepError, PrepResult};
use crate::job::SolverJobId;
use std::path::{Path, PathBuf};

/// Rewritten solver configuration, stored as `<job-id>/solver.prototxt`.
pub const SOLVER_FILE: &str = "solver.prototxt";
/// Rewritten network configuration; the solver's `net` field points here.
pub const SOLVER_NET_FILE: &str = "solver-net.prototxt";
pub const SNAPSHOT_PREFIX: &str = "snapshot";

pub const TRAINING_DIR: &str = "training-data";
pub const TESTING_DIR: &str = "testing-data";
pub const TRAINING_INDEX: &str = "training-index";
pub const TESTING_INDEX: &str = "testing-index";

pub const TRAINING_ARCHIVE: &str = "training.tar.gz";
pub const TESTING_ARCHIVE: &str = "testing.tar.gz";

/// One half of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Training,
    Testing,
}

impl Split {
    /// Processing order used by the assembler.
    pub const ALL: [Split; 2] = [Split::Training, Split::Testing];

    /// Extraction subdirectory, also the `source` of `Data` layers.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Training => TRAINING_DIR,
            Self::Testing => TESTING_DIR,
        }
    }

    /// Manifest file name, also the `source` of `ImageData` layers.
    #[must_use]
    pub fn index_name(self) -> &'static str {
        match self {
            Self::Training => TRAINING_INDEX,
            Self::Testing => TESTING_INDEX,
        }
    }

    #[must_use]
    pub fn archive_name(self) -> &'static str {
        match self {
            Self::Training => TRAINING_ARCHIVE,
            Self::Testing => TESTING_ARCHIVE,
        }
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Training => f.write_str("training"),
            Self::Testing => f.write_str("testing"),
        }
    }
}

/// Local work directory handed to the training engine.
///
/// ```text
/// <root>/
///   solver.prototxt
///   solver-net.prototxt
///   training.tar.gz        raw copy of the fetched archive
///   training-index         manifest: "training-data/<path> <label>"
///   training-data/...
///   testing.tar.gz
///   testing-index
///   testing-data/...
/// ```
#[derive(Debug, Clone)]
pub struct WorkLayout {
    root: PathBuf,
}

impl WorkLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Per-job directory under a shared work root.
    #[must_use]
    pub fn for_job(work_root: &Path, job_id: &SolverJobId) -> Self {
        Self::new(work_root.join(job_id.as_str()))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn split_dir(&self, split: Split) -> PathBuf {
        self.root.join(split.dir_name())
    }

    #[must_use]
    pub fn index_path(&self, split: Split) -> PathBuf {
        self.root.join(split.index_name())
    }

    /// Where a fetched file named `file_name` lands (configs, raw archives).
    #[must_use]
    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    pub fn ensure_root(&self) -> PrepResult<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| PrepError::write_failed(&self.root, e))
    }
}
