//! Incremental integrity digests over the exported media
//!
//! MD5 and SHA1 run independently; either, both, or neither may be enabled
//! for a session. Hashing always covers the raw (decompressed) bytes.

use exovault_core::{Error, Result};
use md5::{Digest as Md5Digest, Md5};
use sha1::Sha1;

/// Finalized digest values, hex-encoded. `None` where the algorithm was
/// never enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestSummary {
    pub md5: Option<String>,
    pub sha1: Option<String>,
}

/// Running digest state for a transfer.
pub struct DigestAccumulator {
    md5: Option<Md5>,
    sha1: Option<Sha1>,
    finalized: bool,
}

impl DigestAccumulator {
    pub fn new(enable_md5: bool, enable_sha1: bool) -> Self {
        Self {
            md5: enable_md5.then(Md5::new),
            sha1: enable_sha1.then(Sha1::new),
            finalized: false,
        }
    }

    /// True when at least one algorithm is enabled
    pub fn is_enabled(&self) -> bool {
        self.md5.is_some() || self.sha1.is_some()
    }

    /// Feed a block of media bytes into every enabled digest.
    pub fn update(&mut self, data: &[u8]) -> Result<()> {
        if self.finalized {
            return Err(Error::already_set("digest already finalized"));
        }
        if let Some(md5) = self.md5.as_mut() {
            md5.update(data);
        }
        if let Some(sha1) = self.sha1.as_mut() {
            sha1.update(data);
        }
        Ok(())
    }

    /// Produce the final hex strings. Callable exactly once.
    pub fn finalize(&mut self) -> Result<DigestSummary> {
        if self.finalized {
            return Err(Error::already_set("digest already finalized"));
        }
        self.finalized = true;
        Ok(DigestSummary {
            md5: self.md5.take().map(|md5| hex::encode(md5.finalize())),
            sha1: self.sha1.take().map(|sha1| hex::encode(sha1.finalize())),
        })
    }
}
