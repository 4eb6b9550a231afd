//! Raw output container
//!
//! A flat byte-for-byte copy of the media, optionally split into numbered
//! segment files (`image.raw.001`, `image.raw.002`, ...). Integrity metadata
//! goes into a plain-text `.info` sidecar written on close.

use exovault_core::{Error, RawContainer, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Build the path of raw segment `number` (1-based) for a base path.
pub fn raw_segment_path(base: &Path, number: u32) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".{:03}", number));
    PathBuf::from(name)
}

/// Flat segmented writer with a sidecar for integrity metadata.
///
/// With a maximum segment size of zero (the default) all bytes go into a
/// single file at the base path; otherwise output splits into numbered
/// segment files as the limit is reached.
pub struct RawWriter {
    base: PathBuf,
    current: Option<File>,
    segment_number: u32,
    current_segment_bytes: u64,
    max_segment_size: u64,
    media_size: Option<u64>,
    bytes_written: u64,
    hashes: Vec<(String, String)>,
    abort: Arc<AtomicBool>,
    closed: bool,
}

impl RawWriter {
    /// Create a raw writer rooted at `base`. No file is created until the
    /// first write, but the target directory must already exist.
    pub fn create(base: &Path) -> Result<Self> {
        if let Some(parent) = base.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("target directory does not exist: {}", parent.display()),
                )
                .into());
            }
        }
        Ok(Self {
            base: base.to_path_buf(),
            current: None,
            segment_number: 0,
            current_segment_bytes: 0,
            max_segment_size: 0,
            media_size: None,
            bytes_written: 0,
            hashes: Vec::new(),
            abort: Arc::new(AtomicBool::new(false)),
            closed: false,
        })
    }

    /// Shared cancellation flag
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// Total media bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn sidecar_path(&self) -> PathBuf {
        let mut name = self.base.as_os_str().to_os_string();
        name.push(".info");
        PathBuf::from(name)
    }

    fn next_segment(&mut self) -> Result<&mut File> {
        self.segment_number += 1;
        let path = if self.max_segment_size == 0 {
            self.base.clone()
        } else {
            raw_segment_path(&self.base, self.segment_number)
        };
        debug!(path = %path.display(), "starting raw segment");
        self.current = Some(File::create(&path)?);
        self.current_segment_bytes = 0;
        Ok(self.current.as_mut().ok_or_else(|| {
            Error::invalid_container("raw segment file not open")
        })?)
    }
}

impl RawContainer for RawWriter {
    fn write_buffer(&mut self, data: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::unsupported("raw container already closed"));
        }
        if self.abort.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }
        let mut remaining = data;
        while !remaining.is_empty() {
            if self.current.is_none() {
                self.next_segment()?;
            } else if self.max_segment_size > 0
                && self.current_segment_bytes >= self.max_segment_size
            {
                self.next_segment()?;
            }
            let take = if self.max_segment_size == 0 {
                remaining.len()
            } else {
                remaining
                    .len()
                    .min((self.max_segment_size - self.current_segment_bytes) as usize)
            };
            let file = self
                .current
                .as_mut()
                .ok_or_else(|| Error::invalid_container("raw segment file not open"))?;
            file.write_all(&remaining[..take])?;
            self.current_segment_bytes += take as u64;
            self.bytes_written += take as u64;
            remaining = &remaining[take..];
        }
        Ok(data.len())
    }

    fn set_media_size(&mut self, size: u64) -> Result<()> {
        self.media_size = Some(size);
        Ok(())
    }

    fn set_maximum_segment_size(&mut self, size: u64) -> Result<()> {
        if self.current.is_some() {
            return Err(Error::unsupported(
                "cannot change segment size after writing started",
            ));
        }
        self.max_segment_size = size;
        Ok(())
    }

    fn set_integrity_hash(&mut self, identifier: &str, value: &str) -> Result<()> {
        if self.hashes.iter().any(|(name, _)| name == identifier) {
            return Err(Error::already_set(format!(
                "integrity hash {}",
                identifier
            )));
        }
        self.hashes.push((identifier.to_string(), value.to_string()));
        Ok(())
    }

    fn signal_abort(&mut self) -> Result<()> {
        self.abort.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if let Some(file) = self.current.as_mut() {
            file.flush()?;
        }
        self.current = None;

        let mut sidecar = File::create(self.sidecar_path())?;
        writeln!(sidecar, "# Raw export information")?;
        if let Some(size) = self.media_size {
            writeln!(sidecar, "media_size: {}", size)?;
        }
        writeln!(sidecar, "bytes_written: {}", self.bytes_written)?;
        if self.max_segment_size > 0 {
            writeln!(sidecar, "segment_files: {}", self.segment_number)?;
        }
        for (name, value) in &self.hashes {
            writeln!(sidecar, "{}: {}", name, value)?;
        }
        sidecar.flush()?;
        self.closed = true;
        debug!(
            bytes = self.bytes_written,
            segments = self.segment_number,
            "closed raw container"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_single_file_output() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("export.raw");
        let mut writer = RawWriter::create(&base).unwrap();
        writer.write_buffer(b"hello ").unwrap();
        writer.write_buffer(b"world").unwrap();
        writer.set_media_size(11).unwrap();
        writer
            .set_integrity_hash("MD5", "5eb63bbbe01eeed093cb22bb8f5acdc3")
            .unwrap();
        writer.close().unwrap();

        assert_eq!(std::fs::read(&base).unwrap(), b"hello world");
        let info = std::fs::read_to_string(dir.path().join("export.raw.info")).unwrap();
        assert!(info.contains("media_size: 11"));
        assert!(info.contains("MD5: 5eb63bbbe01eeed093cb22bb8f5acdc3"));
    }

    #[test]
    fn test_segmented_output_splits_at_limit() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("export.raw");
        let mut writer = RawWriter::create(&base).unwrap();
        writer.set_maximum_segment_size(4).unwrap();
        writer.write_buffer(b"0123456789").unwrap();
        writer.close().unwrap();

        assert_eq!(
            std::fs::read(raw_segment_path(&base, 1)).unwrap(),
            b"0123"
        );
        assert_eq!(
            std::fs::read(raw_segment_path(&base, 2)).unwrap(),
            b"4567"
        );
        assert_eq!(std::fs::read(raw_segment_path(&base, 3)).unwrap(), b"89");
    }

    #[test]
    fn test_segment_size_locked_after_first_write() {
        let dir = tempdir().unwrap();
        let mut writer = RawWriter::create(&dir.path().join("locked.raw")).unwrap();
        writer.write_buffer(b"x").unwrap();
        assert!(writer.set_maximum_segment_size(1024).is_err());
    }

    #[test]
    fn test_duplicate_hash_rejected() {
        let dir = tempdir().unwrap();
        let mut writer = RawWriter::create(&dir.path().join("dup.raw")).unwrap();
        writer.set_integrity_hash("SHA1", "aa").unwrap();
        assert!(writer.set_integrity_hash("SHA1", "bb").is_err());
    }

    #[test]
    fn test_abort_cancels_writes() {
        let dir = tempdir().unwrap();
        let mut writer = RawWriter::create(&dir.path().join("abort.raw")).unwrap();
        writer.signal_abort().unwrap();
        assert!(matches!(
            writer.write_buffer(b"data"),
            Err(exovault_core::Error::Cancelled)
        ));
    }
}
