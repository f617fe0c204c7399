use crate::archive::{TeeReader, UnpackedArchive, unpack_and_index};
use crate::blob::BlobStore;
use crate::blobref;
use crate::dataset::Dataset;
use crate::error::{PrepError, PrepResult};
use crate::layout::{Split, WorkLayout};
use crate::toc::LabelPolicy;
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// What to do when the training and testing splits disagree on their labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyCheck {
    /// Fail with [`PrepError::LabelVocabularyMismatch`].
    #[default]
    Enforce,
    /// Log a warning and carry on with the training vocabulary.
    Advisory,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssembleOptions {
    pub label_policy: LabelPolicy,
    pub vocabulary_check: VocabularyCheck,
}

/// Fetches a dataset's archives and lays them out for the training engine.
pub struct TrainingDataAssembler {
    blobs: Arc<dyn BlobStore>,
    options: AssembleOptions,
}

impl TrainingDataAssembler {
    #[must_use]
    pub fn new(blobs: Arc<dyn BlobStore>, options: AssembleOptions) -> Self {
        Self { blobs, options }
    }

    /// Unpack the training then the testing archive of `dataset` into `dest`
    /// and write both manifests. Returns the training label vocabulary.
    ///
    /// Stops at the first error; files written so far are left in place.
    pub fn assemble(&self, dataset: &Dataset, dest: &Path) -> PrepResult<Vec<String>> {
        let layout = WorkLayout::new(dest.to_path_buf());
        layout.ensure_root()?;

        let training = self.assemble_split(dataset, Split::Training, &layout)?;
        let testing = self.assemble_split(dataset, Split::Testing, &layout)?;
        self.check_vocabulary(training.labels, testing.labels)
    }

    fn assemble_split(&self, dataset: &Dataset, split: Split, layout: &WorkLayout) -> PrepResult<UnpackedArchive> {
        let reference = dataset.archive_reference(split);
        let path = dataset.archive_path(split)?;
        let fetch_failed = |reason: String| PrepError::FetchFailed { reference: reference.to_string(), reason };

        let stream = self.blobs.get(path).map_err(|e| fetch_failed(e.to_string()))?;

        let raw_path = layout.file_path(blobref::file_name(path));
        let raw = std::fs::File::create(&raw_path).map_err(|e| PrepError::write_failed(&raw_path, e))?;
        let mut tee = TeeReader::new(stream, BufWriter::new(raw));

        let unpacked = unpack_and_index(reference, &mut tee, &layout.split_dir(split), self.options.label_policy);
        if let Some(e) = tee.take_write_error() {
            return Err(PrepError::write_failed(&raw_path, e));
        }
        let unpacked = unpacked?;

        // the unpacker stops at the end-of-archive marker
        if let Err(e) = tee.drain() {
            return Err(match tee.take_write_error() {
                Some(write_error) => PrepError::write_failed(&raw_path, write_error),
                None => fetch_failed(e.to_string()),
            });
        }
        let (_, mut raw) = tee.into_parts();
        raw.flush().map_err(|e| PrepError::write_failed(&raw_path, e))?;

        let index_path = layout.index_path(split);
        unpacked.toc.with_parent_dir(split.dir_name()).write_to_file(&index_path)?;

        tracing::info!(
            %split,
            archive = reference,
            entries = unpacked.entries.len(),
            labels = unpacked.labels.len(),
            index = %index_path.display(),
            "assembled split"
        );
        Ok(unpacked)
    }

    fn check_vocabulary(&self, training: Vec<String>, testing: Vec<String>) -> PrepResult<Vec<String>> {
        if training == testing {
            return Ok(training);
        }
        match self.options.vocabulary_check {
            VocabularyCheck::Enforce => Err(PrepError::LabelVocabularyMismatch { training, testing }),
            VocabularyCheck::Advisory => {
                tracing::warn!(?training, ?testing, "training and testing label vocabularies differ");
                Ok(training)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::tar_gz;
    use crate::blob::MemoryBlobStore;
    use crate::dataset::DatasetId;
    use crate::toc::TableOfContents;
    use tempfile::TempDir;

    fn store_with(training: &[(&str, &[u8])], testing: &[(&str, &[u8])]) -> Arc<MemoryBlobStore> {
        let store = Arc::new(MemoryBlobStore::new());
        store.insert("ds-1/training.tar.gz", tar_gz(training));
        store.insert("ds-1/testing.tar.gz", tar_gz(testing));
        store
    }

    fn dataset() -> Dataset {
        Dataset::new(DatasetId::from("ds-1"))
    }

    #[test]
    fn test_assemble_lays_out_both_splits() {
        let temp = TempDir::new().unwrap();
        let store = store_with(
            &[("Q/a.png", &b"qa"[..]), ("Q/b.png", &b"qb"[..]), ("R/c.png", &b"rc"[..])],
            &[("Q/d.png", &b"qd"[..]), ("R/e.png", &b"re"[..])],
        );
        let assembler = TrainingDataAssembler::new(store.clone(), AssembleOptions::default());

        let vocabulary = assembler.assemble(&dataset(), temp.path()).unwrap();
        assert_eq!(vocabulary, vec!["Q".to_string(), "R".to_string()]);

        let root = temp.path();
        assert_eq!(std::fs::read(root.join("training-data/Q/a.png")).unwrap(), b"qa");
        assert_eq!(std::fs::read(root.join("testing-data/R/e.png")).unwrap(), b"re");
        assert_eq!(
            std::fs::read_to_string(root.join("training-index")).unwrap(),
            "training-data/Q/a.png 0\ntraining-data/Q/b.png 0\ntraining-data/R/c.png 1\n"
        );
        let testing = TableOfContents::parse(&std::fs::read_to_string(root.join("testing-index")).unwrap()).unwrap();
        assert_eq!(testing.len(), 2);
        assert_eq!(testing.entries()[1].path, "testing-data/R/e.png");

        // raw copies are byte-identical to the stored archives
        assert_eq!(std::fs::read(root.join("training.tar.gz")).unwrap(), store.contents("ds-1/training.tar.gz").unwrap());
        assert_eq!(std::fs::read(root.join("testing.tar.gz")).unwrap(), store.contents("ds-1/testing.tar.gz").unwrap());
    }

    #[test]
    fn test_missing_archive_is_fetch_failed() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(MemoryBlobStore::new());
        store.insert("ds-1/training.tar.gz", tar_gz(&[("Q/a.png", &b"a"[..])]));
        let assembler = TrainingDataAssembler::new(store, AssembleOptions::default());

        match assembler.assemble(&dataset(), temp.path()).unwrap_err() {
            PrepError::FetchFailed { reference, .. } => assert_eq!(reference, "blob://ds-1/testing.tar.gz"),
            other => panic!("expected FetchFailed, got {other:?}"),
        }
        // the training split is kept
        assert!(temp.path().join("training-index").is_file());
    }

    #[test]
    fn test_vocabulary_mismatch_is_enforced_by_default() {
        let temp = TempDir::new().unwrap();
        let store = store_with(&[("Q/a.png", &b"a"[..])], &[("R/b.png", &b"b"[..])]);
        let assembler = TrainingDataAssembler::new(store, AssembleOptions::default());

        match assembler.assemble(&dataset(), temp.path()).unwrap_err() {
            PrepError::LabelVocabularyMismatch { training, testing } => {
                assert_eq!(training, vec!["Q".to_string()]);
                assert_eq!(testing, vec!["R".to_string()]);
            }
            other => panic!("expected LabelVocabularyMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_advisory_vocabulary_check_returns_training_labels() {
        let temp = TempDir::new().unwrap();
        let store = store_with(&[("Q/a.png", &b"a"[..])], &[("R/b.png", &b"b"[..])]);
        let options = AssembleOptions { vocabulary_check: VocabularyCheck::Advisory, ..AssembleOptions::default() };
        let assembler = TrainingDataAssembler::new(store, options);

        assert_eq!(assembler.assemble(&dataset(), temp.path()).unwrap(), vec!["Q".to_string()]);
    }

    #[test]
    fn test_corrupt_archive_is_extraction_failed() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(MemoryBlobStore::new());
        store.insert("ds-1/training.tar.gz", b"not a gzip stream".to_vec());
        let assembler = TrainingDataAssembler::new(store, AssembleOptions::default());

        assert!(matches!(
            assembler.assemble(&dataset(), temp.path()),
            Err(PrepError::ExtractionFailed { archive, .. }) if archive == "blob://ds-1/training.tar.gz"
        ));
    }
}
