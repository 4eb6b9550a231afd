//! Collaborator traits for the export engine
//!
//! The engine never owns a container format; it drives these narrow
//! contracts. The evidence container is the segmented, checksummed,
//! optionally compressed format used as input and optionally as output; the
//! raw container is the flat segmented format with sidecar integrity
//! metadata.

use crate::error::Result;
use crate::types::{
    ChunkHeader, CompressionFlags, CompressionLevel, ErrorRange, EvidenceFormat, MediaInfo,
};
use std::path::PathBuf;

/// A segmented, checksummed evidence container, open for reading or writing.
pub trait EvidenceContainer {
    /// Total media size in bytes
    fn media_size(&self) -> Result<u64>;

    /// Chunk size in bytes
    fn chunk_size(&self) -> Result<u32>;

    /// Sector size in bytes
    fn bytes_per_sector(&self) -> Result<u32>;

    /// Media geometry snapshot
    fn media_info(&self) -> Result<MediaInfo>;

    /// Seek to an absolute media offset, returning the resulting offset
    fn seek(&mut self, offset: u64) -> Result<u64>;

    /// Read decompressed media bytes at the current offset (high-level API)
    fn read_buffer(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write media bytes at the current offset (high-level API)
    fn write_buffer(&mut self, data: &[u8]) -> Result<usize>;

    /// Read the next stored chunk payload without decompressing it
    /// (low-level API). Fills `compressed` and returns the chunk header.
    fn read_chunk(&mut self, compressed: &mut Vec<u8>) -> Result<ChunkHeader>;

    /// Decompress and checksum-verify a stored chunk payload into `raw`,
    /// returning the number of valid raw bytes.
    ///
    /// A mismatch surfaces as `Error::ChecksumVerification`; when
    /// wipe-chunk-on-error is set the container zero-fills `raw` before
    /// returning the error.
    fn prepare_read_chunk(
        &mut self,
        compressed: &[u8],
        raw: &mut Vec<u8>,
        header: &ChunkHeader,
    ) -> Result<usize>;

    /// Compress a raw chunk for writing when the output policy requires it,
    /// returning the header describing the authoritative representation.
    fn prepare_write_chunk(&mut self, raw: &[u8], compressed: &mut Vec<u8>) -> Result<ChunkHeader>;

    /// Write a prepared chunk payload. `raw_len` is the decompressed length
    /// the payload covers; returns the number of payload bytes written.
    fn write_chunk(&mut self, data: &[u8], raw_len: usize, header: &ChunkHeader) -> Result<usize>;

    /// Flush trailing segment metadata after the last chunk, returning the
    /// number of bytes written by the finalization
    fn write_finalize(&mut self) -> Result<u64>;

    /// Zero-fill chunk buffers handed out after a failed verification
    fn set_wipe_chunk_on_error(&mut self, wipe: bool) -> Result<()>;

    /// All header (case metadata) values
    fn header_values(&self) -> Result<Vec<(String, String)>>;

    /// Set a header value on a writable container
    fn set_header_value(&mut self, identifier: &str, value: &str) -> Result<()>;

    /// Set an integrity hash value on a writable container
    fn set_hash_value(&mut self, identifier: &str, value: &str) -> Result<()>;

    /// Set the media size on a writable container
    fn set_media_size(&mut self, size: u64) -> Result<()>;

    /// Set the sector size on a writable container
    fn set_bytes_per_sector(&mut self, size: u32) -> Result<()>;

    /// Set compression policy on a writable container
    fn set_compression(&mut self, level: CompressionLevel, flags: CompressionFlags) -> Result<()>;

    /// Set the sub-format family on a writable container
    fn set_format(&mut self, format: EvidenceFormat) -> Result<()>;

    /// Set the target segment file size on a writable container
    fn set_segment_file_size(&mut self, size: u64) -> Result<()>;

    /// Set sectors per chunk on a writable container
    fn set_sectors_per_chunk(&mut self, count: u32) -> Result<()>;

    /// Attach a GUID (legacy sub-formats only)
    fn set_guid(&mut self, guid: &[u8; 16]) -> Result<()>;

    /// Record a checksum error range against this container
    fn append_checksum_error(&mut self, range: ErrorRange) -> Result<()>;

    /// Number of recorded checksum error ranges
    fn number_of_checksum_errors(&self) -> Result<u32>;

    /// Recorded checksum error range by index
    fn checksum_error(&self, index: u32) -> Result<ErrorRange>;

    /// Record an acquiry error range against this container
    fn append_acquiry_error(&mut self, range: ErrorRange) -> Result<()>;

    /// Filename of the segment file covering the current offset
    fn segment_filename(&self) -> Result<PathBuf>;

    /// Root of the embedded logical file tree, if the container has one
    fn root_file_entry(&self) -> Result<Option<Box<dyn FileEntry>>>;

    /// Request cooperative cancellation of in-flight operations
    fn signal_abort(&mut self) -> Result<()>;

    /// Close the container, flushing writable state
    fn close(&mut self) -> Result<()>;
}

/// A flat segmented container storing uncompressed media bytes plus sidecar
/// integrity metadata.
pub trait RawContainer {
    /// Append media bytes
    fn write_buffer(&mut self, data: &[u8]) -> Result<usize>;

    /// Set the media size recorded in the sidecar
    fn set_media_size(&mut self, size: u64) -> Result<()>;

    /// Set the maximum segment file size (0 means a single unsplit file)
    fn set_maximum_segment_size(&mut self, size: u64) -> Result<()>;

    /// Record an integrity hash value in the sidecar
    fn set_integrity_hash(&mut self, identifier: &str, value: &str) -> Result<()>;

    /// Request cooperative cancellation of in-flight operations
    fn signal_abort(&mut self) -> Result<()>;

    /// Close the container, writing the sidecar
    fn close(&mut self) -> Result<()>;
}

/// A node in the logical file tree embedded inside an evidence container.
///
/// Entries are owned handles; traversal never borrows from the container.
pub trait FileEntry {
    /// Entry name (UTF-8); empty for the root
    fn name(&self) -> Result<String>;

    /// Data size in bytes (0 for directories)
    fn size(&self) -> Result<u64>;

    /// True for a regular file, false for a directory or other entry
    fn is_file(&self) -> Result<bool>;

    /// Number of child entries
    fn number_of_children(&self) -> Result<usize>;

    /// Child entry by index, in container-defined order
    fn child(&self, index: usize) -> Result<Box<dyn FileEntry>>;

    /// Seek within the entry's data
    fn seek(&mut self, offset: u64) -> Result<u64>;

    /// Read from the entry's data at the current position
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}
