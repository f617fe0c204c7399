//! Streaming extraction of `.tar.gz` dataset archives with on-the-fly
//! labeling of every extracted file.

use crate::error::{PrepError, PrepResult};
use crate::toc::{LabelPolicy, Labeler, TableOfContents, parent_dir};
use flate2::read::GzDecoder;
use std::io::{self, Read, Write};
use std::path::{Component, Path};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// A regular file written during extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Archive-internal path, `/`-separated, relative to the destination.
    pub path: String,
    pub size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct UnpackedArchive {
    pub entries: Vec<ArchiveEntry>,
    pub toc: TableOfContents,
    /// Parent directories in first-seen order.
    pub labels: Vec<String>,
}

/// Extract every regular file of the gzip-compressed tar stream `reader`
/// under `dest`, labeling entries in archive order with `policy`.
///
/// `archive` names the stream in errors and logs. Entries with absolute
/// paths or `..` components are rejected. Directories, links and other
/// special entries are not written or indexed.
pub fn unpack_and_index<R: Read>(
    archive: &str,
    reader: R,
    dest: &Path,
    policy: LabelPolicy,
) -> PrepResult<UnpackedArchive> {
    let extraction =
        |reason: String| PrepError::ExtractionFailed { archive: archive.to_string(), reason };

    std::fs::create_dir_all(dest).map_err(|e| PrepError::write_failed(dest, e))?;

    let mut tar = tar::Archive::new(GzDecoder::new(reader));
    let mut labeler = Labeler::new(policy);
    let mut unpacked = UnpackedArchive::default();

    for entry in tar.entries().map_err(|e| extraction(e.to_string()))? {
        let mut entry = entry.map_err(|e| extraction(e.to_string()))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let raw_path = entry.path().map_err(|e| extraction(e.to_string()))?.into_owned();
        let path = relative_entry_path(&raw_path).map_err(extraction)?;

        let target = dest.join(&path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PrepError::write_failed(parent, e))?;
        }
        let file = std::fs::File::create(&target).map_err(|e| PrepError::write_failed(&target, e))?;
        let size = copy_entry(&mut entry, file).map_err(|err| match err {
            CopyError::Read(e) => extraction(format!("{path}: {e}")),
            CopyError::Write(e) => PrepError::write_failed(&target, e),
        })?;

        let label = labeler.observe(parent_dir(&path));
        tracing::trace!(archive, path = %path, label, size, "extracted entry");
        unpacked.toc.push(path.clone(), label);
        unpacked.entries.push(ArchiveEntry { path, size });
    }

    unpacked.labels = labeler.into_vocabulary();
    tracing::info!(
        archive,
        dest = %dest.display(),
        entries = unpacked.entries.len(),
        labels = unpacked.labels.len(),
        "unpacked archive"
    );
    Ok(unpacked)
}

/// Normalize an entry path to `a/b/c`, refusing anything that would land
/// outside the destination directory.
fn relative_entry_path(path: &Path) -> Result<String, String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| format!("entry path is not valid UTF-8: {}", path.display()))?;
                parts.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(format!("entry escapes destination: {}", path.display()));
            }
        }
    }
    if parts.is_empty() {
        return Err(format!("entry has an empty path: {}", path.display()));
    }
    Ok(parts.join("/"))
}

enum CopyError {
    Read(io::Error),
    Write(io::Error),
}

fn copy_entry<R: Read, W: Write>(reader: &mut R, mut out: W) -> Result<u64, CopyError> {
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::Read(e)),
        };
        out.write_all(&buf[..n]).map_err(CopyError::Write)?;
        total += n as u64;
    }
    out.flush().map_err(CopyError::Write)?;
    Ok(total)
}

/// Reader that copies everything it yields into a second writer.
///
/// A failed copy surfaces as a read error; the original write error is kept
/// for [`TeeReader::take_write_error`] so callers can report it as such.
pub struct TeeReader<R, W> {
    inner: R,
    copy: W,
    write_error: Option<io::Error>,
}

impl<R: Read, W: Write> TeeReader<R, W> {
    pub fn new(inner: R, copy: W) -> Self {
        Self { inner, copy, write_error: None }
    }

    pub fn take_write_error(&mut self) -> Option<io::Error> {
        self.write_error.take()
    }

    /// Read the rest of the stream so the copy is complete.
    pub fn drain(&mut self) -> io::Result<u64> {
        io::copy(self, &mut io::sink())
    }

    pub fn into_parts(self) -> (R, W) {
        (self.inner, self.copy)
    }
}

impl<R: Read, W: Write> Read for TeeReader<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            if let Err(e) = self.copy.write_all(&buf[..n]) {
                let kind = e.kind();
                self.write_error = Some(e);
                return Err(io::Error::new(kind, "failed to write raw copy"));
            }
        }
        Ok(n)
    }
}
