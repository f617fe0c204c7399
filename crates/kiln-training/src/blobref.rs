//! Conversion between `blob://` references and blob store paths.
//!
//! References are what job records carry; paths are what the [`BlobStore`]
//! understands. Paths are passed through verbatim: no `..` or empty-segment
//! normalization happens here, so never feed untrusted input through it.
//!
//! [`BlobStore`]: crate::blob::BlobStore

use crate::error::{PrepError, PrepResult};

pub const BLOB_URI_PREFIX: &str = "blob://";

/// `blob://foo/bar.txt` -> `foo/bar.txt`
pub fn to_relative_path(reference: &str) -> PrepResult<&str> {
    reference
        .strip_prefix(BLOB_URI_PREFIX)
        .ok_or_else(|| PrepError::InvalidReference { reference: reference.to_string() })
}

/// `foo/bar.txt` -> `blob://foo/bar.txt`
#[must_use]
pub fn to_reference(path: &str) -> String {
    format!("{BLOB_URI_PREFIX}{path}")
}

#[must_use]
pub fn is_reference(value: &str) -> bool {
    value.starts_with(BLOB_URI_PREFIX)
}

/// Last `/`-separated segment of a blob path.
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for reference in ["blob://job-1/solver.prototxt", "blob://", "blob://a//../b"] {
            let path = to_relative_path(reference).unwrap();
            assert_eq!(to_reference(path), reference);
        }
    }

    #[test]
    fn test_strips_prefix_only_once() {
        assert_eq!(to_relative_path("blob://blob://x").unwrap(), "blob://x");
    }

    #[test]
    fn test_rejects_missing_prefix() {
        for reference in ["http://example.com/solver.prototxt", "job-1/solver.prototxt", "", " blob://x"] {
            assert!(matches!(
                to_relative_path(reference),
                Err(PrepError::InvalidReference { reference: r }) if r == reference
            ));
        }
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("job-1/solver-net.prototxt"), "solver-net.prototxt");
        assert_eq!(file_name("solver.prototxt"), "solver.prototxt");
    }
}
