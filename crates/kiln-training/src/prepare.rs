//! Job preparation: rewrite a job's configurations into the blob store, and
//! later stage everything the training engine needs into a work directory.

use crate::assemble::{AssembleOptions, TrainingDataAssembler};
use crate::blob::{BlobStore, FsBlobStore, HttpBlobStore};
use crate::blobref;
use crate::config::{BlobStoreConfig, PrepConfig};
use crate::dataset::Dataset;
use crate::error::{PrepError, PrepResult};
use crate::fetch::{ConfigFetcher, HttpFetcher};
use crate::job::{SolverJob, SolverJobId};
use crate::layout::{SOLVER_FILE, SOLVER_NET_FILE, WorkLayout};
use crate::rewrite::{rewrite_network_bytes, rewrite_solver_bytes};
use crate::store::{FileJobStore, JobStore, save_with_retry};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

const CONFIG_CONTENT_TYPE: &str = "text/plain";

pub struct JobPreparer {
    fetcher: Arc<dyn ConfigFetcher>,
    blobs: Arc<dyn BlobStore>,
    jobs: Arc<dyn JobStore>,
    config: PrepConfig,
}

impl JobPreparer {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn ConfigFetcher>,
        blobs: Arc<dyn BlobStore>,
        jobs: Arc<dyn JobStore>,
        config: PrepConfig,
    ) -> Self {
        Self { fetcher, blobs, jobs, config }
    }

    /// HTTP fetcher, the configured blob store and a file-backed job store.
    pub fn from_config(config: PrepConfig) -> PrepResult<Self> {
        config.validate()?;
        let timeout = config.http_timeout();
        let blobs: Arc<dyn BlobStore> = match &config.blob_store {
            BlobStoreConfig::Http { url } => Arc::new(
                HttpBlobStore::new(url, timeout)
                    .map_err(|e| PrepError::Config(format!("failed to create blob store client: {e}")))?,
            ),
            BlobStoreConfig::Fs { root } => Arc::new(FsBlobStore::new(root.clone())),
        };
        let jobs = Arc::new(FileJobStore::new(config.job_store.root.clone()));
        let fetcher = Arc::new(HttpFetcher::new(timeout)?);
        Ok(Self::new(fetcher, blobs, jobs, config))
    }

    /// Default work directory for `job`: `<work_directory>/<job-id>`.
    #[must_use]
    pub fn work_layout(&self, job: &SolverJob) -> WorkLayout {
        WorkLayout::for_job(&self.config.work_directory, &job.id)
    }

    /// Load a job by id and run [`JobPreparer::prepare_configs`] on it.
    pub fn prepare(&self, id: &SolverJobId) -> PrepResult<SolverJob> {
        let job = self.load(id)?;
        self.prepare_configs(&job)
    }

    pub fn load(&self, id: &SolverJobId) -> PrepResult<SolverJob> {
        self.jobs
            .load(id)
            .map_err(|e| PrepError::Persist { job_id: id.to_string(), reason: format!("failed to load job: {e}") })
    }

    /// Fetch and rewrite both configurations, store them under the job's id
    /// and point the job record at them.
    ///
    /// Returns the record as persisted. Nothing is persisted unless both
    /// configurations were stored.
    pub fn prepare_configs(&self, job: &SolverJob) -> PrepResult<SolverJob> {
        job.validate()?;
        tracing::info!(job_id = %job.id, dataset_id = %job.dataset_id, "preparing job configuration");

        let solver = self.fetch(&job.specification_url)?;
        let solver = rewrite_solver_bytes(&job.specification_url, &solver)?;
        let solver_ref = self.store(job, SOLVER_FILE, &solver)?;

        let net = self.fetch(&job.specification_net_url)?;
        let net = rewrite_network_bytes(&job.specification_net_url, &net)?;
        let net_ref = self.store(job, SOLVER_NET_FILE, &net)?;

        let saved = save_with_retry(self.jobs.as_ref(), job, self.config.max_update_retries, |record| {
            record.specification_url.clone_from(&solver_ref);
            record.specification_net_url.clone_from(&net_ref);
        })?;
        tracing::info!(job_id = %saved.id, revision = saved.revision, "job configuration prepared");
        Ok(saved)
    }

    /// Copy both rewritten configurations into `work_dir`.
    pub fn stage_configs(&self, job: &SolverJob, work_dir: &Path) -> PrepResult<()> {
        let layout = WorkLayout::new(work_dir.to_path_buf());
        layout.ensure_root()?;
        for reference in [&job.specification_url, &job.specification_net_url] {
            let path = blobref::to_relative_path(reference)?;
            let bytes = self.read_blob(reference, path)?;
            let dest = layout.file_path(blobref::file_name(path));
            std::fs::write(&dest, bytes).map_err(|e| PrepError::write_failed(&dest, e))?;
            tracing::debug!(job_id = %job.id, reference = %reference, dest = %dest.display(), "staged configuration");
        }
        Ok(())
    }

    /// Stage configurations and training data for `job` into `work_dir`.
    /// Returns the label vocabulary.
    pub fn stage(&self, job: &SolverJob, work_dir: &Path) -> PrepResult<Vec<String>> {
        self.stage_configs(job, work_dir)?;
        let options = AssembleOptions {
            label_policy: self.config.label_policy,
            vocabulary_check: self.config.vocabulary_check,
        };
        let assembler = TrainingDataAssembler::new(Arc::clone(&self.blobs), options);
        let vocabulary = assembler.assemble(&Dataset::new(job.dataset_id.clone()), work_dir)?;
        tracing::info!(job_id = %job.id, work_dir = %work_dir.display(), labels = vocabulary.len(), "job staged");
        Ok(vocabulary)
    }

    /// External URLs go through the fetcher; `blob://` references are read
    /// from the blob store so that preparing a job twice works.
    fn fetch(&self, reference: &str) -> PrepResult<Vec<u8>> {
        if blobref::is_reference(reference) {
            let path = blobref::to_relative_path(reference)?;
            return self.read_blob(reference, path);
        }
        self.fetcher.fetch(reference)
    }

    fn read_blob(&self, reference: &str, path: &str) -> PrepResult<Vec<u8>> {
        let failed = |reason: String| PrepError::FetchFailed { reference: reference.to_string(), reason };
        let mut stream = self.blobs.get(path).map_err(|e| failed(e.to_string()))?;
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes).map_err(|e| failed(e.to_string()))?;
        Ok(bytes)
    }

    fn store(&self, job: &SolverJob, file_name: &str, bytes: &[u8]) -> PrepResult<String> {
        let path = job.blob_path(file_name);
        self.blobs
            .put(&path, &mut &bytes[..], CONFIG_CONTENT_TYPE)
            .map_err(|source| PrepError::StoreWrite { path: path.clone(), source })?;
        tracing::debug!(job_id = %job.id, path = %path, bytes = bytes.len(), "stored rewritten configuration");
        Ok(blobref::to_reference(&path))
    }
}
