//! Job records and revision-checked updates.
//!
//! Every successful write bumps [`SolverJob::revision`]. Writers hand back the
//! record they loaded; if somebody else wrote in between, the store answers
//! [`UpdateOutcome::Conflict`] and the caller reloads and re-applies its change
//! (see [`save_with_retry`]).

use crate::blob::StoreResult;
use crate::error::{PrepError, PrepResult, StoreError};
use crate::job::{SolverJob, SolverJobId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Result of a compare-and-set write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Written; carries the record as stored, with its new revision.
    Updated(SolverJob),
    /// The stored revision no longer matches the one the caller started from.
    Conflict,
    Failed(String),
}

pub trait JobStore: Send + Sync {
    fn load(&self, id: &SolverJobId) -> StoreResult<SolverJob>;

    /// Create or replace a record unconditionally.
    fn insert(&self, job: &SolverJob) -> StoreResult<()>;

    /// Write `job` only if the stored revision still equals `job.revision`.
    fn compare_and_set(&self, job: &SolverJob) -> UpdateOutcome;
}

/// Apply `update` to `job` and persist it, reloading and re-applying on
/// revision conflicts up to `max_retries` times.
pub fn save_with_retry<F>(
    store: &dyn JobStore,
    job: &SolverJob,
    max_retries: u32,
    update: F,
) -> PrepResult<SolverJob>
where
    F: Fn(&mut SolverJob),
{
    let persist = |reason: String| PrepError::Persist { job_id: job.id.to_string(), reason };

    let mut candidate = job.clone();
    update(&mut candidate);
    let mut attempt = 0;
    loop {
        match store.compare_and_set(&candidate) {
            UpdateOutcome::Updated(saved) => {
                tracing::debug!(job_id = %saved.id, revision = saved.revision, attempt, "saved job");
                return Ok(saved);
            }
            UpdateOutcome::Failed(reason) => return Err(persist(reason)),
            UpdateOutcome::Conflict if attempt >= max_retries => {
                return Err(persist(format!("revision conflict after {attempt} retries")));
            }
            UpdateOutcome::Conflict => {
                attempt += 1;
                tracing::warn!(job_id = %job.id, attempt, "job changed concurrently, retrying update");
                candidate = store.load(&job.id).map_err(|e| persist(e.to_string()))?;
                update(&mut candidate);
            }
        }
    }
}

/// One pretty-printed JSON document per job at `<root>/<job-id>.json`.
///
/// The revision check is only atomic against writers sharing this value.
#[derive(Debug)]
pub struct FileJobStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileJobStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root, write_lock: Mutex::new(()) }
    }

    fn path_for(&self, id: &SolverJobId) -> StoreResult<PathBuf> {
        let id = id.as_str();
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(StoreError::Backend(format!("invalid job id: {id:?}")));
        }
        Ok(self.root.join(format!("{id}.json")))
    }

    fn read(&self, id: &SolverJobId) -> StoreResult<SolverJob> {
        let path = self.path_for(id)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write through a temporary file so readers never see a partial document.
    fn write(&self, job: &SolverJob) -> StoreResult<()> {
        let path = self.path_for(&job.id)?;
        std::fs::create_dir_all(&self.root)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(job)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| StoreError::Backend("job store lock poisoned".to_string()))
    }
}

impl JobStore for FileJobStore {
    fn load(&self, id: &SolverJobId) -> StoreResult<SolverJob> {
        self.read(id)
    }

    fn insert(&self, job: &SolverJob) -> StoreResult<()> {
        let _guard = self.lock()?;
        self.write(job)
    }

    fn compare_and_set(&self, job: &SolverJob) -> UpdateOutcome {
        let result = self.lock().and_then(|_guard| {
            let current = self.read(&job.id)?;
            if current.revision != job.revision {
                return Ok(UpdateOutcome::Conflict);
            }
            let next = SolverJob { revision: current.revision + 1, ..job.clone() };
            self.write(&next)?;
            Ok(UpdateOutcome::Updated(next))
        });
        result.unwrap_or_else(|e: StoreError| UpdateOutcome::Failed(e.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<SolverJobId, SolverJob>>,
}

impl MemoryJobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, HashMap<SolverJobId, SolverJob>>> {
        self.jobs.lock().map_err(|_| StoreError::Backend("job store lock poisoned".to_string()))
    }
}

impl JobStore for MemoryJobStore {
    fn load(&self, id: &SolverJobId) -> StoreResult<SolverJob> {
        self.lock()?.get(id).cloned().ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn insert(&self, job: &SolverJob) -> StoreResult<()> {
        self.lock()?.insert(job.id.clone(), job.clone());
        Ok(())
    }

    fn compare_and_set(&self, job: &SolverJob) -> UpdateOutcome {
        let mut jobs = match self.lock() {
            Ok(jobs) => jobs,
            Err(e) => return UpdateOutcome::Failed(e.to_string()),
        };
        let Some(current) = jobs.get_mut(&job.id) else {
            return UpdateOutcome::Failed(format!("job not found: {}", job.id));
        };
        if current.revision != job.revision {
            return UpdateOutcome::Conflict;
        }
        *current = SolverJob { revision: current.revision + 1, ..job.clone() };
        UpdateOutcome::Updated(current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetId;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    fn job(id: &str) -> SolverJob {
        SolverJob {
            id: SolverJobId::from(id),
            revision: 0,
            dataset_id: DatasetId::from("ds-1"),
            specification_url: "http://cfg/solver.prototxt".to_string(),
            specification_net_url: "http://cfg/net.prototxt".to_string(),
        }
    }

    fn set_refs(job: &mut SolverJob) {
        job.specification_url = "blob://job-1/solver.prototxt".to_string();
        job.specification_net_url = "blob://job-1/solver-net.prototxt".to_string();
    }

    /// Lets another writer bump the record before each of the first `remaining` writes.
    struct ContendedStore {
        inner: MemoryJobStore,
        remaining: AtomicU32,
    }

    impl JobStore for ContendedStore {
        fn load(&self, id: &SolverJobId) -> StoreResult<SolverJob> {
            self.inner.load(id)
        }

        fn insert(&self, job: &SolverJob) -> StoreResult<()> {
            self.inner.insert(job)
        }

        fn compare_and_set(&self, job: &SolverJob) -> UpdateOutcome {
            if self.remaining.load(Ordering::SeqCst) > 0 {
                self.remaining.fetch_sub(1, Ordering::SeqCst);
                let mut other = self.inner.load(&job.id).unwrap();
                other.dataset_id = DatasetId::from("ds-2");
                assert!(matches!(self.inner.compare_and_set(&other), UpdateOutcome::Updated(_)));
            }
            self.inner.compare_and_set(job)
        }
    }

    #[test]
    fn test_memory_store_compare_and_set() {
        let store = MemoryJobStore::new();
        store.insert(&job("job-1")).unwrap();

        let loaded = store.load(&SolverJobId::from("job-1")).unwrap();
        let UpdateOutcome::Updated(saved) = store.compare_and_set(&loaded) else {
            panic!("expected update");
        };
        assert_eq!(saved.revision, 1);
        assert_eq!(store.compare_and_set(&loaded), UpdateOutcome::Conflict);
        assert!(matches!(store.compare_and_set(&job("missing")), UpdateOutcome::Failed(_)));
    }

    #[test]
    fn test_file_store_round_trip_and_conflict() {
        let temp = TempDir::new().unwrap();
        let store = FileJobStore::new(temp.path().join("jobs"));
        store.insert(&job("job-1")).unwrap();
        assert!(temp.path().join("jobs/job-1.json").is_file());

        let loaded = store.load(&SolverJobId::from("job-1")).unwrap();
        assert_eq!(loaded, job("job-1"));
        assert!(matches!(store.compare_and_set(&loaded), UpdateOutcome::Updated(ref j) if j.revision == 1));
        assert_eq!(store.compare_and_set(&loaded), UpdateOutcome::Conflict);
        assert_eq!(store.load(&loaded.id).unwrap().revision, 1);
    }

    #[test]
    fn test_file_store_missing_and_invalid_ids() {
        let temp = TempDir::new().unwrap();
        let store = FileJobStore::new(temp.path().to_path_buf());
        assert!(matches!(store.load(&SolverJobId::from("nope")), Err(StoreError::NotFound(_))));
        assert!(matches!(store.load(&SolverJobId::from("../x")), Err(StoreError::Backend(_))));
        assert!(matches!(store.compare_and_set(&job("nope")), UpdateOutcome::Failed(_)));
    }

    #[test]
    fn test_save_with_retry_reapplies_update_after_conflict() {
        let store = ContendedStore { inner: MemoryJobStore::new(), remaining: AtomicU32::new(2) };
        let original = job("job-1");
        store.insert(&original).unwrap();

        let saved = save_with_retry(&store, &original, 3, set_refs).unwrap();
        assert_eq!(saved.specification_url, "blob://job-1/solver.prototxt");
        assert_eq!(saved.specification_net_url, "blob://job-1/solver-net.prototxt");
        // the concurrent writer's change survives
        assert_eq!(saved.dataset_id, DatasetId::from("ds-2"));
        assert_eq!(saved.revision, 3);
        assert_eq!(store.load(&original.id).unwrap(), saved);
    }

    #[test]
    fn test_save_with_retry_gives_up() {
        let store = ContendedStore { inner: MemoryJobStore::new(), remaining: AtomicU32::new(10) };
        let original = job("job-1");
        store.insert(&original).unwrap();

        match save_with_retry(&store, &original, 2, set_refs).unwrap_err() {
            PrepError::Persist { job_id, reason } => {
                assert_eq!(job_id, "job-1");
                assert!(reason.contains("conflict"));
            }
            other => panic!("expected Persist, got {other:?}"),
        }
    }

    #[test]
    fn test_save_with_retry_surfaces_failures() {
        let store = MemoryJobStore::new();
        assert!(matches!(save_with_retry(&store, &job("ghost"), 3, set_refs), Err(PrepError::Persist { .. })));
    }
}
