//! Segment file discovery for multi-segment evidence containers
//!
//! Evidence container segments use a two-digit suffix on the extension:
//! `image.s01`, `image.s02`, ... Opening with a single filename expands it
//! to the full ordered segment set.

use exovault_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Highest supported segment number
pub const MAX_SEGMENTS: u16 = 99;

/// Build the path of segment `number` (1-based) for a container base path.
///
/// `base` is the path without the segment extension: `image` yields
/// `image.s01` for segment 1.
pub fn segment_path(base: &Path, number: u16) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".s{:02}", number));
    PathBuf::from(name)
}

/// Resolve a first-segment filename to the full ordered segment set.
///
/// A path that does not carry a `.s01` extension is returned as-is (assumed
/// to be a complete single-file container). Probing stops at the first
/// missing segment number.
pub fn resolve_segments(first: &Path) -> Result<Vec<PathBuf>> {
    let Some(base) = strip_segment_extension(first) else {
        debug!(path = %first.display(), "single file, no segment expansion");
        return Ok(vec![first.to_path_buf()]);
    };
    if !first.exists() {
        return Err(Error::resource_missing(format!(
            "first segment file does not exist: {}",
            first.display()
        )));
    }
    let mut segments = vec![first.to_path_buf()];
    for number in 2..=MAX_SEGMENTS {
        let candidate = segment_path(&base, number);
        if !candidate.exists() {
            break;
        }
        segments.push(candidate);
    }
    debug!(
        path = %first.display(),
        segment_count = segments.len(),
        "resolved segment set"
    );
    Ok(segments)
}

/// Strip a `.s01` extension, returning the container base path.
fn strip_segment_extension(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(".s01")?;
    if stem.is_empty() {
        return None;
    }
    Some(path.with_file_name(stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_segment_path_format() {
        let base = Path::new("/case/image");
        assert_eq!(segment_path(base, 1), PathBuf::from("/case/image.s01"));
        assert_eq!(segment_path(base, 12), PathBuf::from("/case/image.s12"));
    }

    #[test]
    fn test_resolve_single_file_passthrough() {
        let segments = resolve_segments(Path::new("/case/image.bin")).unwrap();
        assert_eq!(segments, vec![PathBuf::from("/case/image.bin")]);
    }

    #[test]
    fn test_resolve_ordered_set() {
        let dir = tempdir().unwrap();
        for n in 1..=3 {
            File::create(dir.path().join(format!("image.s{:02}", n))).unwrap();
        }
        // A gap ends the set
        File::create(dir.path().join("image.s05")).unwrap();

        let first = dir.path().join("image.s01");
        let segments = resolve_segments(&first).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], first);
        assert_eq!(segments[2], dir.path().join("image.s03"));
    }

    #[test]
    fn test_resolve_missing_first_segment() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("missing.s01");
        assert!(resolve_segments(&first).is_err());
    }
}
