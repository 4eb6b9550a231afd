//! Logical file tree export to a real filesystem directory

use crate::path::build_target_path;
use exovault_core::{FileEntry, Result};
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};

/// Block size for streaming entry data
pub const EXPORT_BLOCK_SIZE: usize = 8192;

/// Export one entry (and, for directories, everything below it) under
/// `parent`.
///
/// Existing targets are never overwritten: a collision logs a skip notice
/// and counts as success. A failure below a directory aborts the remaining
/// subtree.
pub fn export_entry(entry: &mut dyn FileEntry, parent: &Path) -> Result<()> {
    let name = entry.name()?;
    match build_target_path(parent, &name)? {
        // An unnamed node contributes no path component; its children land
        // directly under the parent.
        Cow::Borrowed(path) => export_children(entry, path),
        Cow::Owned(path) => {
            if path.exists() {
                info!(path = %path.display(), "target exists, skipping");
                return Ok(());
            }
            if entry.is_file()? {
                export_file(entry, &path)
            } else {
                fs::create_dir(&path)?;
                export_children(entry, &path)
            }
        }
    }
}

fn export_children(entry: &mut dyn FileEntry, parent: &Path) -> Result<()> {
    let count = entry.number_of_children()?;
    for index in 0..count {
        let mut child = entry.child(index)?;
        export_entry(child.as_mut(), parent)?;
    }
    Ok(())
}

/// Stream a file entry's data to `target` in fixed-size blocks.
///
/// A short read from the entry is a hard error; the truncated target file
/// is left on disk for inspection.
fn export_file(entry: &mut dyn FileEntry, target: &Path) -> Result<()> {
    debug!(path = %target.display(), "exporting file entry");
    let mut output = File::create(target)?;
    let size = entry.size()?;
    entry.seek(0)?;

    let mut block = [0u8; EXPORT_BLOCK_SIZE];
    let mut remaining = size;
    while remaining > 0 {
        let want = (remaining as usize).min(EXPORT_BLOCK_SIZE);
        let count = entry.read(&mut block[..want])?;
        if count != want {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "short read from file entry: wanted {} bytes, got {}",
                    want, count
                ),
            )
            .into());
        }
        output.write_all(&block[..count])?;
        remaining -= count as u64;
    }
    output.flush()?;
    Ok(())
}
