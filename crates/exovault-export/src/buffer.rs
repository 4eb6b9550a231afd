//! Dual-representation chunk buffer
//!
//! One buffer instance is reused across the whole transfer loop. It holds a
//! raw (decompressed) and a compressed representation side by side; the
//! `authoritative` tag says which one currently carries the chunk's bytes,
//! so a stale representation can never be written out by mistake.

use exovault_core::{ChunkHeader, Error, Result};

/// Which representation currently holds the authoritative bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Raw,
    Compressed,
}

/// Reusable chunk buffer carrying both representations plus the chunk
/// header from the low-level read path.
pub struct MediaBuffer {
    /// Decompressed chunk bytes; length is the valid data length
    pub raw: Vec<u8>,
    /// Stored (possibly compressed) chunk bytes
    pub compressed: Vec<u8>,
    authoritative: Representation,
    /// Header carried from read to write on the chunk-level path
    pub header: Option<ChunkHeader>,
    chunk_size: usize,
}

impl MediaBuffer {
    /// Allocate a buffer for chunks of `chunk_size` bytes.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            raw: Vec::with_capacity(chunk_size),
            compressed: Vec::with_capacity(chunk_size),
            authoritative: Representation::Raw,
            header: None,
            chunk_size,
        }
    }

    /// Nominal chunk size the buffer was allocated for
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Representation currently holding the chunk's bytes
    pub fn authoritative(&self) -> Representation {
        self.authoritative
    }

    /// Mark which representation is authoritative
    pub fn set_authoritative(&mut self, representation: Representation) {
        self.authoritative = representation;
    }

    /// The authoritative byte slice
    pub fn data(&self) -> &[u8] {
        match self.authoritative {
            Representation::Raw => &self.raw,
            Representation::Compressed => &self.compressed,
        }
    }

    /// Mutable view of the authoritative bytes
    pub fn data_mut(&mut self) -> &mut [u8] {
        match self.authoritative {
            Representation::Raw => &mut self.raw,
            Representation::Compressed => &mut self.compressed,
        }
    }

    /// Reset both representations for the next iteration
    pub fn clear(&mut self) {
        self.raw.clear();
        self.compressed.clear();
        self.authoritative = Representation::Raw;
        self.header = None;
    }

    /// Swap adjacent byte pairs of the raw representation in place.
    ///
    /// Byte-order correction for 16-bit-sample media, applied only on the
    /// raw/flat output path. `size` must be non-zero, even, and match the
    /// raw data length exactly.
    pub fn swap_byte_pairs(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(Error::invalid_argument("swap size is zero"));
        }
        if size % 2 != 0 {
            return Err(Error::invalid_argument(format!(
                "swap size {} is odd",
                size
            )));
        }
        if size != self.raw.len() {
            return Err(Error::invalid_argument(format!(
                "swap size {} does not match data length {}",
                size,
                self.raw.len()
            )));
        }
        for pair in self.raw.chunks_exact_mut(2) {
            pair.swap(0, 1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_byte_pairs() {
        let mut buffer = MediaBuffer::new(4);
        buffer.raw.extend_from_slice(&[0x01, 0x02, 0x03, 0x04]);
        buffer.swap_byte_pairs(4).unwrap();
        assert_eq!(buffer.raw, vec![0x02, 0x01, 0x04, 0x03]);
    }

    #[test]
    fn test_swap_rejects_zero_size() {
        let mut buffer = MediaBuffer::new(4);
        assert!(matches!(
            buffer.swap_byte_pairs(0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_swap_rejects_odd_size() {
        let mut buffer = MediaBuffer::new(4);
        buffer.raw.extend_from_slice(&[1, 2, 3]);
        assert!(matches!(
            buffer.swap_byte_pairs(3),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_swap_rejects_length_mismatch() {
        let mut buffer = MediaBuffer::new(8);
        buffer.raw.extend_from_slice(&[1, 2, 3, 4]);
        assert!(matches!(
            buffer.swap_byte_pairs(6),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_authoritative_selection() {
        let mut buffer = MediaBuffer::new(8);
        buffer.raw.extend_from_slice(b"raw data");
        buffer.compressed.extend_from_slice(b"zzz");
        assert_eq!(buffer.data(), b"raw data");
        buffer.set_authoritative(Representation::Compressed);
        assert_eq!(buffer.data(), b"zzz");
        buffer.clear();
        assert_eq!(buffer.authoritative(), Representation::Raw);
        assert!(buffer.data().is_empty());
    }
}
