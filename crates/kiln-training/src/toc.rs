//! Table of contents ("TOC") for an extracted dataset split: one
//! `<path> <label>` line per file, where the label is derived from the
//! file's parent directory.

use crate::error::{PrepError, PrepResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::Path;

/// How parent directories are turned into numeric labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPolicy {
    /// Increment the label every time the directory changes between
    /// consecutive entries. Matches existing manifests, but only yields one
    /// label per class when the archive is sorted by directory: going back
    /// to a directory seen earlier produces a new label.
    #[default]
    Sequential,
    /// Each directory keeps the index at which it was first seen.
    Stable,
}

/// Assigns labels to entries in archive order.
#[derive(Debug, Clone, Default)]
pub struct Labeler {
    policy: LabelPolicy,
    current_dir: Option<String>,
    label: u32,
    vocabulary: Vec<String>,
    first_seen: HashMap<String, u32>,
}

impl Labeler {
    #[must_use]
    pub fn new(policy: LabelPolicy) -> Self {
        Self { policy, ..Self::default() }
    }

    /// Label for the next entry, whose parent directory is `dir`.
    pub fn observe(&mut self, dir: &str) -> u32 {
        if !self.first_seen.contains_key(dir) {
            self.first_seen.insert(dir.to_string(), self.vocabulary.len() as u32);
            self.vocabulary.push(dir.to_string());
        }

        match self.policy {
            LabelPolicy::Sequential => {
                if let Some(current) = &self.current_dir {
                    if current != dir {
                        self.label += 1;
                    }
                }
                self.current_dir = Some(dir.to_string());
                self.label
            }
            LabelPolicy::Stable => self.first_seen[dir],
        }
    }

    #[must_use]
    pub fn into_vocabulary(self) -> Vec<String> {
        self.vocabulary
    }
}

/// Parent directory of an archive path, `.` for top-level entries.
#[must_use]
pub fn parent_dir(path: &str) -> &str {
    match path.trim_end_matches('/').rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => ".",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub path: String,
    pub label: u32,
}

impl std::fmt::Display for TocEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.path, self.label)
    }
}

/// Entries in archive order; never sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOfContents {
    entries: Vec<TocEntry>,
}

impl TableOfContents {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<String>, label: u32) {
        self.entries.push(TocEntry { path: path.into(), label });
    }

    #[must_use]
    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Label every path in order with `policy`, returning the TOC and the
    /// label vocabulary.
    #[must_use]
    pub fn label_paths<'a>(paths: impl IntoIterator<Item = &'a str>, policy: LabelPolicy) -> (Self, Vec<String>) {
        let mut labeler = Labeler::new(policy);
        let mut toc = Self::new();
        for path in paths {
            let label = labeler.observe(parent_dir(path));
            toc.push(path, label);
        }
        (toc, labeler.into_vocabulary())
    }

    /// Prefix every path with `dir`, e.g. `Q/a.png 27` -> `training-data/Q/a.png 27`.
    #[must_use]
    pub fn with_parent_dir(&self, dir: &str) -> Self {
        let dir = dir.trim_end_matches('/');
        let entries = self
            .entries
            .iter()
            .map(|entry| TocEntry {
                path: if dir.is_empty() { entry.path.clone() } else { format!("{dir}/{}", entry.path) },
                label: entry.label,
            })
            .collect();
        Self { entries }
    }

    /// Write one `<path> <label>` line per entry.
    pub fn write_to_file(&self, dest: &Path) -> PrepResult<()> {
        let file = std::fs::File::create(dest).map_err(|e| PrepError::write_failed(dest, e))?;
        let mut out = BufWriter::new(file);
        for entry in &self.entries {
            writeln!(out, "{entry}").map_err(|e| PrepError::write_failed(dest, e))?;
        }
        out.flush().map_err(|e| PrepError::write_failed(dest, e))
    }

    /// Read a manifest produced by [`TableOfContents::write_to_file`].
    /// Paths may contain spaces; the label is the last field.
    pub fn parse(text: &str) -> PrepResult<Self> {
        let mut toc = Self::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let parsed = line
                .rsplit_once(' ')
                .and_then(|(path, label)| label.parse::<u32>().ok().map(|label| (path, label)));
            let Some((path, label)) = parsed else {
                return Err(PrepError::Config(format!("malformed manifest line {}: {line:?}", idx + 1)));
            };
            toc.push(path, label);
        }
        Ok(toc)
    }
}

impl std::fmt::Display for TableOfContents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}
