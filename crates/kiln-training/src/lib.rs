//! Kiln Training
//!
//! Prepares solver jobs for an external training engine:
//! - Rewriting solver and network configurations to point at a fixed work layout
//! - Persisting rewritten configurations and updating job records (`JobPreparer`)
//! - Unpacking dataset archives and writing labeled manifests (`TrainingDataAssembler`)
//! - Blob, job store and fetch capabilities with filesystem, HTTP and in-memory backends

pub mod archive;
pub mod assemble;
pub mod blob;
pub mod blobref;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod job;
pub mod layout;
pub mod prepare;
pub mod rewrite;
pub mod store;
pub mod toc;

pub use archive::{ArchiveEntry, TeeReader, UnpackedArchive, unpack_and_index};
pub use assemble::{AssembleOptions, TrainingDataAssembler, VocabularyCheck};
pub use blob::{BlobStore, FsBlobStore, HttpBlobStore, MemoryBlobStore, StoreResult};
pub use blobref::{BLOB_URI_PREFIX, to_reference, to_relative_path};
pub use config::{BlobStoreConfig, JobStoreConfig, PrepConfig};
pub use dataset::{Dataset, DatasetId};
pub use error::{PrepError, PrepResult, StoreError};
pub use fetch::{ConfigFetcher, HttpFetcher, StaticFetcher};
pub use job::{SolverJob, SolverJobId};
pub use layout::{Split, WorkLayout};
pub use prepare::JobPreparer;
pub use rewrite::{rewrite_network_bytes, rewrite_network_config, rewrite_solver_bytes, rewrite_solver_config};
pub use store::{FileJobStore, JobStore, MemoryJobStore, UpdateOutcome, save_with_retry};
pub use toc::{LabelPolicy, TableOfContents, TocEntry};
