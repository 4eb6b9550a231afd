//! Simple segmented evidence container
//!
//! A compact evidence image format in the shape the export engine expects
//! from its input and output collaborators:
//!
//! - media split into fixed-size chunks, each optionally zlib-compressed and
//!   carrying a crc32 over the raw bytes
//! - one or more segment files (`image.s01`, `image.s02`, ...), each opening
//!   with a small signature header
//! - a footer in the last segment holding the chunk table, media geometry,
//!   case header values, integrity hash values, recorded error ranges, and
//!   an optional inline logical file tree
//!
//! ```text
//! ┌─────────────────────────┐
//! │ Segment header (16 B)   │  signature + version + segment number
//! ├─────────────────────────┤
//! │ Chunk payloads          │  raw or zlib, located via the footer table
//! ├─────────────────────────┤
//! │ Footer (last segment)   │  bincode blob
//! ├─────────────────────────┤
//! │ Trailer (8 B)           │  blob length + footer signature
//! └─────────────────────────┘
//! ```

use crate::segments::segment_path;
use crate::tree::{LogicalEntry, MemoryFileEntry};
use exovault_core::{
    ChunkHeader, CompressionFlags, CompressionLevel, Error, ErrorRange, EvidenceContainer,
    EvidenceFormat, FileEntry, MediaInfo, Result,
};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Signature opening every segment file
pub const SEGMENT_SIGNATURE: [u8; 8] = *b"EXOVAULT";

/// Signature closing the footer trailer
pub const FOOTER_SIGNATURE: [u8; 4] = *b"EXOF";

/// On-disk format version
pub const FORMAT_VERSION: u8 = 1;

/// Default target segment file size (1.4 GiB, the conventional default for
/// segmented evidence images)
pub const DEFAULT_SEGMENT_FILE_SIZE: u64 = 1440 * 1024 * 1024;

const SEGMENT_HEADER_SIZE: u64 = 16;
const FOOTER_TRAILER_SIZE: u64 = 8;

/// Location and shape of one stored chunk
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ChunkRecord {
    /// Segment file index (0-based)
    segment: u16,
    /// Payload offset within the segment file
    offset: u64,
    /// Stored payload length
    stored_len: u32,
    /// Decompressed length the payload covers
    raw_len: u32,
    /// Whether the payload is zlib-compressed
    is_compressed: bool,
    /// crc32 over the raw bytes
    checksum: u32,
}

/// Trailing metadata blob of the last segment
#[derive(Debug, Default, Serialize, Deserialize)]
struct Footer {
    media: MediaInfo,
    format: Option<EvidenceFormat>,
    compression_level: CompressionLevel,
    compression_flags: CompressionFlags,
    guid: Option<[u8; 16]>,
    header_values: Vec<(String, String)>,
    hash_values: Vec<(String, String)>,
    checksum_errors: Vec<ErrorRange>,
    acquiry_errors: Vec<ErrorRange>,
    chunks: Vec<ChunkRecord>,
    logical_tree: Option<LogicalEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Read,
    Write,
}

/// Segmented, checksummed, optionally compressed evidence container.
///
/// One instance is open in exactly one mode: [`SimpleEvidence::open`] for
/// reading an existing segment set, [`SimpleEvidence::create`] for writing a
/// new one.
pub struct SimpleEvidence {
    mode: Mode,
    base: PathBuf,
    paths: Vec<PathBuf>,
    files: Vec<File>,
    footer: Footer,
    max_segment_size: u64,
    /// Bytes written to the currently open segment (write mode)
    current_segment_bytes: u64,
    /// Current media offset (read cursor)
    position: u64,
    cached_chunk: Option<usize>,
    cached_data: Vec<u8>,
    wipe_chunk_on_error: bool,
    finalized: bool,
    abort: Arc<AtomicBool>,
    tree_root: Option<Arc<LogicalEntry>>,
}

impl SimpleEvidence {
    /// Open an existing container from its ordered segment file set.
    pub fn open(paths: &[PathBuf]) -> Result<Self> {
        if paths.is_empty() {
            return Err(Error::invalid_argument("no segment filenames given"));
        }
        let mut files = Vec::with_capacity(paths.len());
        for (index, path) in paths.iter().enumerate() {
            let mut file = File::open(path)?;
            let number = read_segment_header(&mut file, path)?;
            if number as usize != index + 1 {
                return Err(Error::invalid_container(format!(
                    "segment {} carries number {}, expected {}",
                    path.display(),
                    number,
                    index + 1
                )));
            }
            files.push(file);
        }
        let last = files
            .last_mut()
            .ok_or_else(|| Error::invalid_argument("no segment filenames given"))?;
        let mut footer = read_footer(last)?;
        let tree_root = footer.logical_tree.take().map(Arc::new);

        debug!(
            segments = paths.len(),
            media_size = footer.media.media_size,
            chunks = footer.chunks.len(),
            "opened evidence container"
        );
        Ok(Self {
            mode: Mode::Read,
            base: paths[0].clone(),
            paths: paths.to_vec(),
            files,
            footer,
            max_segment_size: 0,
            current_segment_bytes: 0,
            position: 0,
            cached_chunk: None,
            cached_data: Vec::new(),
            wipe_chunk_on_error: false,
            finalized: false,
            abort: Arc::new(AtomicBool::new(false)),
            tree_root,
        })
    }

    /// Create a new container for writing. `base` is the path without the
    /// segment extension; the first segment is created immediately.
    pub fn create(base: &Path) -> Result<Self> {
        let mut container = Self {
            mode: Mode::Write,
            base: base.to_path_buf(),
            paths: Vec::new(),
            files: Vec::new(),
            footer: Footer::default(),
            max_segment_size: DEFAULT_SEGMENT_FILE_SIZE,
            current_segment_bytes: 0,
            position: 0,
            cached_chunk: None,
            cached_data: Vec::new(),
            wipe_chunk_on_error: false,
            finalized: false,
            abort: Arc::new(AtomicBool::new(false)),
            tree_root: None,
        };
        container.start_segment()?;
        Ok(container)
    }

    /// Shared cancellation flag; observed by the chunk read/write paths.
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// Attach a logical file tree to a writable container.
    pub fn set_logical_tree(&mut self, root: LogicalEntry) -> Result<()> {
        self.require_write()?;
        if self.footer.logical_tree.is_some() {
            return Err(Error::already_set("logical tree"));
        }
        self.footer.logical_tree = Some(root);
        Ok(())
    }

    fn require_read(&self) -> Result<()> {
        if self.mode != Mode::Read {
            return Err(Error::unsupported("container is not open for reading"));
        }
        Ok(())
    }

    fn require_write(&self) -> Result<()> {
        if self.mode != Mode::Write {
            return Err(Error::unsupported("container is not open for writing"));
        }
        if self.finalized {
            return Err(Error::already_set("container already finalized"));
        }
        Ok(())
    }

    fn check_abort(&self) -> Result<()> {
        if self.abort.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    fn start_segment(&mut self) -> Result<()> {
        let number = (self.paths.len() + 1) as u16;
        let path = segment_path(&self.base, number);
        let mut file = File::create(&path)?;
        let mut header = [0u8; SEGMENT_HEADER_SIZE as usize];
        header[..8].copy_from_slice(&SEGMENT_SIGNATURE);
        header[8] = FORMAT_VERSION;
        header[9..11].copy_from_slice(&number.to_le_bytes());
        file.write_all(&header)?;
        debug!(path = %path.display(), number, "started segment file");
        self.paths.push(path);
        self.files.push(file);
        self.current_segment_bytes = SEGMENT_HEADER_SIZE;
        Ok(())
    }

    /// Chunk size in bytes, rejecting zero or overflowing geometry
    fn checked_chunk_size(&self) -> Result<u32> {
        self.footer
            .media
            .chunk_size()
            .filter(|&size| size > 0)
            .ok_or_else(|| Error::invalid_container("invalid chunk geometry"))
    }

    /// Chunk record index covering a media offset
    fn chunk_index_at(&self, offset: u64) -> Result<usize> {
        let chunk_size = self.checked_chunk_size()? as u64;
        Ok((offset / chunk_size) as usize)
    }

    /// Read and decode the chunk at `index` into the cache.
    fn load_chunk(&mut self, index: usize) -> Result<()> {
        if self.cached_chunk == Some(index) {
            return Ok(());
        }
        let record = *self
            .footer
            .chunks
            .get(index)
            .ok_or_else(|| Error::invalid_argument(format!("chunk index {} out of range", index)))?;
        let mut stored = vec![0u8; record.stored_len as usize];
        let file = &mut self.files[record.segment as usize];
        file.seek(SeekFrom::Start(record.offset))?;
        file.read_exact(&mut stored)?;

        let header = ChunkHeader {
            is_compressed: record.is_compressed,
            checksum: record.checksum,
            verify_checksum: true,
        };
        let mut raw = Vec::new();
        match decode_chunk(&stored, &mut raw, &header, record.raw_len as usize) {
            Ok(_) => {
                self.cached_data = raw;
                self.cached_chunk = Some(index);
                Ok(())
            }
            Err(err @ Error::ChecksumVerification(_)) => {
                if self.wipe_chunk_on_error {
                    raw.clear();
                }
                // Keep the buffer shaped like a full chunk either way
                raw.resize(record.raw_len as usize, 0);
                self.cached_data = raw;
                self.cached_chunk = Some(index);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

impl EvidenceContainer for SimpleEvidence {
    fn media_size(&self) -> Result<u64> {
        Ok(self.footer.media.media_size)
    }

    fn chunk_size(&self) -> Result<u32> {
        self.checked_chunk_size()
    }

    fn bytes_per_sector(&self) -> Result<u32> {
        Ok(self.footer.media.bytes_per_sector)
    }

    fn media_info(&self) -> Result<MediaInfo> {
        Ok(self.footer.media)
    }

    fn seek(&mut self, offset: u64) -> Result<u64> {
        if offset > self.footer.media.media_size {
            return Err(Error::invalid_argument(format!(
                "offset {} beyond media size {}",
                offset, self.footer.media.media_size
            )));
        }
        self.position = offset;
        Ok(self.position)
    }

    fn read_buffer(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.require_read()?;
        self.check_abort()?;
        let media_size = self.footer.media.media_size;
        let chunk_size = self.checked_chunk_size()? as u64;
        let mut total = 0usize;
        while total < buf.len() && self.position < media_size {
            let index = self.chunk_index_at(self.position)?;
            if let Err(err) = self.load_chunk(index) {
                if err.is_recoverable() {
                    // The high-level API recovers in place: substitute data
                    // (wiped or as-decoded) stands in for the bad chunk and
                    // the range is recorded against this container.
                    self.footer
                        .checksum_errors
                        .push(chunk_error_range(index, &self.footer.media));
                } else {
                    return Err(err);
                }
            }
            let chunk_offset = (self.position % chunk_size) as usize;
            let available = self.cached_data.len().saturating_sub(chunk_offset);
            let want = (buf.len() - total).min(available);
            if want == 0 {
                break;
            }
            buf[total..total + want]
                .copy_from_slice(&self.cached_data[chunk_offset..chunk_offset + want]);
            total += want;
            self.position += want as u64;
        }
        Ok(total)
    }

    fn write_buffer(&mut self, data: &[u8]) -> Result<usize> {
        self.require_write()?;
        if data.is_empty() {
            return Ok(0);
        }
        let mut compressed = Vec::new();
        let header = self.prepare_write_chunk(data, &mut compressed)?;
        let payload: &[u8] = if header.is_compressed {
            &compressed
        } else {
            data
        };
        self.write_chunk(payload, data.len(), &header)
    }

    fn read_chunk(&mut self, compressed: &mut Vec<u8>) -> Result<ChunkHeader> {
        self.require_read()?;
        self.check_abort()?;
        let index = self.chunk_index_at(self.position)?;
        let record = *self
            .footer
            .chunks
            .get(index)
            .ok_or_else(|| Error::invalid_argument(format!("chunk index {} out of range", index)))?;
        compressed.clear();
        compressed.resize(record.stored_len as usize, 0);
        let file = &mut self.files[record.segment as usize];
        file.seek(SeekFrom::Start(record.offset))?;
        file.read_exact(compressed)?;
        self.position += record.raw_len as u64;
        Ok(ChunkHeader {
            is_compressed: record.is_compressed,
            checksum: record.checksum,
            verify_checksum: true,
        })
    }

    fn prepare_read_chunk(
        &mut self,
        compressed: &[u8],
        raw: &mut Vec<u8>,
        header: &ChunkHeader,
    ) -> Result<usize> {
        let chunk_size = self.checked_chunk_size()? as usize;
        match decode_chunk(compressed, raw, header, chunk_size) {
            Ok(count) => Ok(count),
            Err(err @ Error::ChecksumVerification(_)) => {
                if self.wipe_chunk_on_error {
                    raw.clear();
                    raw.resize(chunk_size, 0);
                }
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    fn prepare_write_chunk(&mut self, raw: &[u8], compressed: &mut Vec<u8>) -> Result<ChunkHeader> {
        self.require_write()?;
        if raw.is_empty() {
            return Err(Error::invalid_argument("empty chunk"));
        }
        let checksum = crc32fast::hash(raw);
        let want_compression = match self.footer.compression_level {
            CompressionLevel::None => {
                self.footer.compression_flags.compress_empty_blocks
                    && raw.iter().all(|&byte| byte == 0)
            }
            CompressionLevel::Fast | CompressionLevel::Best => true,
        };
        let mut is_compressed = false;
        compressed.clear();
        if want_compression {
            let level = match self.footer.compression_level {
                CompressionLevel::Best => Compression::best(),
                _ => Compression::fast(),
            };
            let mut encoder = ZlibEncoder::new(Vec::new(), level);
            encoder.write_all(raw)?;
            let encoded = encoder.finish()?;
            // Keep the raw representation when compression does not pay off
            if encoded.len() < raw.len() {
                *compressed = encoded;
                is_compressed = true;
            }
        }
        Ok(ChunkHeader {
            is_compressed,
            checksum,
            verify_checksum: true,
        })
    }

    fn write_chunk(&mut self, data: &[u8], raw_len: usize, header: &ChunkHeader) -> Result<usize> {
        self.require_write()?;
        self.check_abort()?;
        if data.is_empty() {
            return Ok(0);
        }
        // An uncompressed payload must be exactly the declared raw length;
        // a mismatch would desynchronize read-back position bookkeeping
        if !header.is_compressed && data.len() != raw_len {
            return Err(Error::invalid_argument(format!(
                "declared raw length {} does not match payload length {}",
                raw_len,
                data.len()
            )));
        }
        // Chunk payloads never straddle segment files
        if self.max_segment_size > 0
            && self.current_segment_bytes + data.len() as u64 > self.max_segment_size
            && self.current_segment_bytes > SEGMENT_HEADER_SIZE
        {
            self.start_segment()?;
        }
        let segment = (self.paths.len() - 1) as u16;
        let record = ChunkRecord {
            segment,
            offset: self.current_segment_bytes,
            stored_len: data.len() as u32,
            raw_len: raw_len as u32,
            is_compressed: header.is_compressed,
            checksum: header.checksum,
        };
        let file = self
            .files
            .last_mut()
            .ok_or_else(|| Error::invalid_container("no open segment file"))?;
        file.write_all(data)?;
        self.current_segment_bytes += data.len() as u64;
        self.footer.chunks.push(record);
        Ok(data.len())
    }

    fn write_finalize(&mut self) -> Result<u64> {
        self.require_write()?;
        let blob = bincode::serialize(&self.footer)
            .map_err(|err| Error::conversion(format!("footer serialization failed: {}", err)))?;
        let file = self
            .files
            .last_mut()
            .ok_or_else(|| Error::invalid_container("no open segment file"))?;
        file.write_all(&blob)?;
        file.write_all(&(blob.len() as u32).to_le_bytes())?;
        file.write_all(&FOOTER_SIGNATURE)?;
        file.flush()?;
        self.finalized = true;
        debug!(
            segments = self.paths.len(),
            chunks = self.footer.chunks.len(),
            "finalized evidence container"
        );
        Ok(blob.len() as u64 + FOOTER_TRAILER_SIZE)
    }

    fn set_wipe_chunk_on_error(&mut self, wipe: bool) -> Result<()> {
        self.wipe_chunk_on_error = wipe;
        Ok(())
    }

    fn header_values(&self) -> Result<Vec<(String, String)>> {
        Ok(self.footer.header_values.clone())
    }

    fn set_header_value(&mut self, identifier: &str, value: &str) -> Result<()> {
        self.require_write()?;
        if let Some(entry) = self
            .footer
            .header_values
            .iter_mut()
            .find(|(name, _)| name == identifier)
        {
            entry.1 = value.to_string();
        } else {
            self.footer
                .header_values
                .push((identifier.to_string(), value.to_string()));
        }
        Ok(())
    }

    fn set_hash_value(&mut self, identifier: &str, value: &str) -> Result<()> {
        self.require_write()?;
        if self
            .footer
            .hash_values
            .iter()
            .any(|(name, _)| name == identifier)
        {
            return Err(Error::already_set(format!("hash value {}", identifier)));
        }
        self.footer
            .hash_values
            .push((identifier.to_string(), value.to_string()));
        Ok(())
    }

    fn set_media_size(&mut self, size: u64) -> Result<()> {
        self.require_write()?;
        self.footer.media.media_size = size;
        Ok(())
    }

    fn set_bytes_per_sector(&mut self, size: u32) -> Result<()> {
        self.require_write()?;
        if size == 0 {
            return Err(Error::invalid_argument("bytes per sector is zero"));
        }
        self.footer.media.bytes_per_sector = size;
        Ok(())
    }

    fn set_compression(&mut self, level: CompressionLevel, flags: CompressionFlags) -> Result<()> {
        self.require_write()?;
        self.footer.compression_level = level;
        self.footer.compression_flags = flags;
        Ok(())
    }

    fn set_format(&mut self, format: EvidenceFormat) -> Result<()> {
        self.require_write()?;
        self.footer.format = Some(format);
        Ok(())
    }

    fn set_segment_file_size(&mut self, size: u64) -> Result<()> {
        self.require_write()?;
        self.max_segment_size = size;
        Ok(())
    }

    fn set_sectors_per_chunk(&mut self, count: u32) -> Result<()> {
        self.require_write()?;
        if count == 0 {
            return Err(Error::invalid_argument("sectors per chunk is zero"));
        }
        self.footer.media.sectors_per_chunk = count;
        Ok(())
    }

    fn set_guid(&mut self, guid: &[u8; 16]) -> Result<()> {
        self.require_write()?;
        self.footer.guid = Some(*guid);
        Ok(())
    }

    fn append_checksum_error(&mut self, range: ErrorRange) -> Result<()> {
        self.footer.checksum_errors.push(range);
        Ok(())
    }

    fn number_of_checksum_errors(&self) -> Result<u32> {
        Ok(self.footer.checksum_errors.len() as u32)
    }

    fn checksum_error(&self, index: u32) -> Result<ErrorRange> {
        self.footer
            .checksum_errors
            .get(index as usize)
            .copied()
            .ok_or_else(|| Error::invalid_argument(format!("checksum error index {} out of range", index)))
    }

    fn append_acquiry_error(&mut self, range: ErrorRange) -> Result<()> {
        self.require_write()?;
        self.footer.acquiry_errors.push(range);
        Ok(())
    }

    fn segment_filename(&self) -> Result<PathBuf> {
        let index = self
            .chunk_index_at(self.position)?
            .min(self.footer.chunks.len().saturating_sub(1));
        let record = self
            .footer
            .chunks
            .get(index)
            .ok_or_else(|| Error::invalid_container("container has no chunks"))?;
        Ok(self.paths[record.segment as usize].clone())
    }

    fn root_file_entry(&self) -> Result<Option<Box<dyn FileEntry>>> {
        Ok(self
            .tree_root
            .as_ref()
            .map(|root| Box::new(MemoryFileEntry::new(Arc::clone(root))) as Box<dyn FileEntry>))
    }

    fn signal_abort(&mut self) -> Result<()> {
        self.abort.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.mode == Mode::Write && !self.finalized && !self.footer.chunks.is_empty() {
            self.write_finalize()?;
        }
        for file in &mut self.files {
            file.flush()?;
        }
        self.files.clear();
        Ok(())
    }
}

/// Sector range covered by chunk `index`, clamped to the media's last
/// sector for a trailing partial chunk
fn chunk_error_range(index: usize, media: &MediaInfo) -> ErrorRange {
    let sectors_per_chunk = media.sectors_per_chunk as u64;
    let start_sector = index as u64 * sectors_per_chunk;
    let count = match media.sector_count() {
        0 => sectors_per_chunk,
        total => sectors_per_chunk.min(total.saturating_sub(start_sector)),
    };
    ErrorRange::new(start_sector, count)
}

/// Decompress and verify a stored chunk payload into `raw`.
fn decode_chunk(
    stored: &[u8],
    raw: &mut Vec<u8>,
    header: &ChunkHeader,
    chunk_size: usize,
) -> Result<usize> {
    raw.clear();
    if header.is_compressed {
        let mut decoder = ZlibDecoder::new(stored);
        raw.reserve(chunk_size);
        decoder.read_to_end(raw).map_err(|err| {
            Error::checksum_verification(format!("chunk decompression failed: {}", err))
        })?;
    } else {
        raw.extend_from_slice(stored);
    }
    if header.verify_checksum && crc32fast::hash(raw) != header.checksum {
        return Err(Error::checksum_verification(format!(
            "chunk checksum mismatch, expected {:#010x}",
            header.checksum
        )));
    }
    Ok(raw.len())
}

fn read_segment_header(file: &mut File, path: &Path) -> Result<u16> {
    let mut header = [0u8; SEGMENT_HEADER_SIZE as usize];
    file.read_exact(&mut header).map_err(|_| {
        Error::invalid_container(format!("segment too small for header: {}", path.display()))
    })?;
    if header[..8] != SEGMENT_SIGNATURE {
        return Err(Error::invalid_container(format!(
            "bad segment signature in {}",
            path.display()
        )));
    }
    if header[8] != FORMAT_VERSION {
        return Err(Error::unsupported(format!(
            "unsupported format version {} in {}",
            header[8],
            path.display()
        )));
    }
    Ok(u16::from_le_bytes([header[9], header[10]]))
}

fn read_footer(file: &mut File) -> Result<Footer> {
    let end = file.seek(SeekFrom::End(0))?;
    if end < SEGMENT_HEADER_SIZE + FOOTER_TRAILER_SIZE {
        return Err(Error::invalid_container("last segment too small for footer"));
    }
    file.seek(SeekFrom::End(-(FOOTER_TRAILER_SIZE as i64)))?;
    let mut trailer = [0u8; FOOTER_TRAILER_SIZE as usize];
    file.read_exact(&mut trailer)?;
    if trailer[4..] != FOOTER_SIGNATURE {
        return Err(Error::invalid_container("missing footer signature"));
    }
    let blob_len = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]) as u64;
    if blob_len + FOOTER_TRAILER_SIZE > end {
        return Err(Error::invalid_container("footer length exceeds segment"));
    }
    file.seek(SeekFrom::End(-((blob_len + FOOTER_TRAILER_SIZE) as i64)))?;
    let mut blob = vec![0u8; blob_len as usize];
    file.read_exact(&mut blob)?;
    bincode::deserialize(&blob)
        .map_err(|err| Error::invalid_container(format!("footer deserialization failed: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::resolve_segments;
    use tempfile::tempdir;

    fn write_container(
        base: &Path,
        data: &[u8],
        bytes_per_sector: u32,
        sectors_per_chunk: u32,
        level: CompressionLevel,
        segment_size: u64,
    ) -> SimpleEvidence {
        let mut container = SimpleEvidence::create(base).unwrap();
        container.set_media_size(data.len() as u64).unwrap();
        container.set_bytes_per_sector(bytes_per_sector).unwrap();
        container.set_sectors_per_chunk(sectors_per_chunk).unwrap();
        container
            .set_compression(level, CompressionFlags::default())
            .unwrap();
        container.set_segment_file_size(segment_size).unwrap();

        let chunk_size = (bytes_per_sector * sectors_per_chunk) as usize;
        for chunk in data.chunks(chunk_size) {
            container.write_buffer(chunk).unwrap();
        }
        container.write_finalize().unwrap();
        container.close().unwrap();
        container
    }

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("image");
        let data = patterned(4096 * 3 + 100);
        write_container(&base, &data, 512, 8, CompressionLevel::Fast, 0);

        let paths = resolve_segments(&segment_path(&base, 1)).unwrap();
        let mut container = SimpleEvidence::open(&paths).unwrap();
        assert_eq!(container.media_size().unwrap(), data.len() as u64);
        assert_eq!(container.chunk_size().unwrap(), 4096);

        let mut out = vec![0u8; data.len()];
        let mut read = 0;
        while read < out.len() {
            let count = container.read_buffer(&mut out[read..]).unwrap();
            assert!(count > 0);
            read += count;
        }
        assert_eq!(out, data);
    }

    #[test]
    fn test_segment_split() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("split");
        let data = patterned(4096 * 8);
        // Uncompressed chunks of 4096 bytes, split roughly every two chunks
        write_container(&base, &data, 512, 8, CompressionLevel::None, 9000);

        let paths = resolve_segments(&segment_path(&base, 1)).unwrap();
        assert!(paths.len() >= 3, "expected multiple segments, got {}", paths.len());

        let mut container = SimpleEvidence::open(&paths).unwrap();
        let mut out = vec![0u8; data.len()];
        let mut read = 0;
        while read < out.len() {
            read += container.read_buffer(&mut out[read..]).unwrap();
        }
        assert_eq!(out, data);
    }

    #[test]
    fn test_low_level_chunk_round_trip() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("lowlevel");
        let data = patterned(4096 * 2);
        write_container(&base, &data, 512, 8, CompressionLevel::Best, 0);

        let paths = resolve_segments(&segment_path(&base, 1)).unwrap();
        let mut container = SimpleEvidence::open(&paths).unwrap();

        let mut stored = Vec::new();
        let mut raw = Vec::new();
        let header = container.read_chunk(&mut stored).unwrap();
        let count = container
            .prepare_read_chunk(&stored, &mut raw, &header)
            .unwrap();
        assert_eq!(count, 4096);
        assert_eq!(raw, &data[..4096]);
    }

    #[test]
    fn test_corrupted_chunk_fails_verification() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("corrupt");
        let data = patterned(4096 * 2);
        write_container(&base, &data, 512, 8, CompressionLevel::None, 0);

        // Flip a byte inside the first chunk payload
        let first = segment_path(&base, 1);
        let mut bytes = std::fs::read(&first).unwrap();
        bytes[SEGMENT_HEADER_SIZE as usize + 10] ^= 0xFF;
        std::fs::write(&first, &bytes).unwrap();

        let mut container = SimpleEvidence::open(&[first]).unwrap();
        let mut stored = Vec::new();
        let mut raw = Vec::new();
        let header = container.read_chunk(&mut stored).unwrap();
        let result = container.prepare_read_chunk(&stored, &mut raw, &header);
        assert!(matches!(result, Err(Error::ChecksumVerification(_))));
    }

    #[test]
    fn test_wipe_chunk_on_error_zero_fills() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("wipe");
        let data = patterned(4096);
        write_container(&base, &data, 512, 8, CompressionLevel::None, 0);

        let first = segment_path(&base, 1);
        let mut bytes = std::fs::read(&first).unwrap();
        bytes[SEGMENT_HEADER_SIZE as usize] ^= 0xFF;
        std::fs::write(&first, &bytes).unwrap();

        let mut container = SimpleEvidence::open(&[first]).unwrap();
        container.set_wipe_chunk_on_error(true).unwrap();
        let mut stored = Vec::new();
        let mut raw = Vec::new();
        let header = container.read_chunk(&mut stored).unwrap();
        let result = container.prepare_read_chunk(&stored, &mut raw, &header);
        assert!(result.is_err());
        assert_eq!(raw.len(), 4096);
        assert!(raw.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_metadata_round_trip() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("meta");
        let mut container = SimpleEvidence::create(&base).unwrap();
        container.set_media_size(512).unwrap();
        container.set_bytes_per_sector(512).unwrap();
        container.set_sectors_per_chunk(1).unwrap();
        container.set_header_value("case_number", "2026-081").unwrap();
        container.set_header_value("examiner_name", "D. Riley").unwrap();
        container.set_hash_value("MD5", "d41d8cd98f00b204e9800998ecf8427e").unwrap();
        container
            .append_acquiry_error(ErrorRange::new(4, 2))
            .unwrap();
        container.write_buffer(&[0xAB; 512]).unwrap();
        container.close().unwrap();

        let container = SimpleEvidence::open(&[segment_path(&base, 1)]).unwrap();
        let headers = container.header_values().unwrap();
        assert!(headers.contains(&("case_number".to_string(), "2026-081".to_string())));
        assert!(headers.contains(&("examiner_name".to_string(), "D. Riley".to_string())));
    }

    #[test]
    fn test_hash_value_already_set() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("hashes");
        let mut container = SimpleEvidence::create(&base).unwrap();
        container.set_hash_value("MD5", "aa").unwrap();
        assert!(matches!(
            container.set_hash_value("MD5", "bb"),
            Err(Error::AlreadySet(_))
        ));
    }

    #[test]
    fn test_logical_tree_round_trip() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("logical");
        let mut container = SimpleEvidence::create(&base).unwrap();
        container.set_media_size(512).unwrap();
        container.set_bytes_per_sector(512).unwrap();
        container.set_sectors_per_chunk(1).unwrap();
        container
            .set_logical_tree(LogicalEntry::directory(
                "",
                vec![LogicalEntry::file("notes.txt", b"hello".to_vec())],
            ))
            .unwrap();
        container.write_buffer(&[0u8; 512]).unwrap();
        container.close().unwrap();

        let container = SimpleEvidence::open(&[segment_path(&base, 1)]).unwrap();
        let root = container.root_file_entry().unwrap().unwrap();
        assert_eq!(root.number_of_children().unwrap(), 1);
        let child = root.child(0).unwrap();
        assert_eq!(child.name().unwrap(), "notes.txt");
        assert_eq!(child.size().unwrap(), 5);
    }

    #[test]
    fn test_abort_cancels_reads() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("abort");
        let data = patterned(4096);
        write_container(&base, &data, 512, 8, CompressionLevel::None, 0);

        let mut container = SimpleEvidence::open(&[segment_path(&base, 1)]).unwrap();
        container.signal_abort().unwrap();
        let mut buf = [0u8; 512];
        assert!(matches!(
            container.read_buffer(&mut buf),
            Err(Error::Cancelled)
        ));
    }

    #[test]
    fn test_write_chunk_rejects_declared_length_mismatch() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("mismatch");
        let mut container = SimpleEvidence::create(&base).unwrap();
        container.set_media_size(2048).unwrap();
        container.set_bytes_per_sector(512).unwrap();
        container.set_sectors_per_chunk(4).unwrap();

        let raw = [0x3Cu8; 2048];
        let mut compressed = Vec::new();
        let header = container.prepare_write_chunk(&raw, &mut compressed).unwrap();
        assert!(!header.is_compressed);
        assert!(matches!(
            container.write_chunk(&raw, raw.len() + 1, &header),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(
            container.write_chunk(&raw, raw.len(), &header).unwrap(),
            raw.len()
        );
    }

    #[test]
    fn test_error_range_clamped_to_final_partial_chunk() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("partial");
        // 5 sectors of 512 bytes, 4 sectors per chunk: the second chunk
        // covers only sector 4
        let data = patterned(2560);
        write_container(&base, &data, 512, 4, CompressionLevel::None, 0);

        let first = segment_path(&base, 1);
        let mut bytes = std::fs::read(&first).unwrap();
        bytes[SEGMENT_HEADER_SIZE as usize + 2048 + 3] ^= 0xFF;
        std::fs::write(&first, &bytes).unwrap();

        let mut container = SimpleEvidence::open(&[first]).unwrap();
        container.set_wipe_chunk_on_error(true).unwrap();
        let mut out = vec![0u8; data.len()];
        let mut read = 0;
        while read < out.len() {
            read += container.read_buffer(&mut out[read..]).unwrap();
        }
        assert_eq!(container.number_of_checksum_errors().unwrap(), 1);
        assert_eq!(container.checksum_error(0).unwrap(), ErrorRange::new(4, 1));
    }

    #[test]
    fn test_open_rejects_bad_signature() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.s01");
        std::fs::write(&path, b"not an evidence segment at all").unwrap();
        assert!(SimpleEvidence::open(&[path]).is_err());
    }
}
