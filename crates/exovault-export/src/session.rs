//! Export session: input/output lifecycle and the transfer loop
//!
//! A session owns exactly one input container and at most one output
//! target, moves the media chunk by chunk, keeps the digest state and the
//! error ledger in lock-step with the input offset, and writes the final
//! hashes into the output's metadata.

use crate::buffer::MediaBuffer;
use crate::digest::{DigestAccumulator, DigestSummary};
use crate::ledger::{coalesce, ErrorLedger};
use crate::transfer::{BufferLevelTransfer, ChunkLevelTransfer, TransferStrategy};
use crate::tree::export_entry;
use exovault_containers::{resolve_segments, RawWriter, SimpleEvidence, DEFAULT_SEGMENT_FILE_SIZE};
use exovault_core::{
    CompressionFlags, CompressionLevel, Error, EvidenceContainer, EvidenceFormat, OutputFormat,
    RawContainer, Result,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Tool identity written into evidence container headers
pub const TOOL_NAME: &str = "exovault";
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The one active output of a session.
pub enum OutputTarget {
    /// Evidence container in write mode
    Ewf(Box<dyn EvidenceContainer>),
    /// Raw/flat segmented container
    Raw(Box<dyn RawContainer>),
    /// Write media bytes to standard output
    Stdout(io::Stdout),
}

/// Result of an output open attempt.
///
/// A failed open is non-fatal: the partial handle is dropped and the
/// session continues without an output (reads, digests, and error
/// bookkeeping still run).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputOpen {
    Opened,
    Unavailable,
}

/// Session construction options.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub calculate_md5: bool,
    pub calculate_sha1: bool,
    /// Zero-fill chunks that failed verification instead of passing their
    /// decoded content through
    pub wipe_chunk_on_error: bool,
    /// Byte-order correction for 16-bit-sample media; raw and stdout
    /// output only
    pub swap_byte_pairs: bool,
    /// Move chunks through the low-level stored-payload API instead of the
    /// container's decompressing buffer API
    pub chunk_level_access: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            calculate_md5: true,
            calculate_sha1: false,
            wipe_chunk_on_error: false,
            swap_byte_pairs: false,
            chunk_level_access: true,
        }
    }
}

/// Output configuration applied through [`ExportSession::set_output_values`].
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub evidence_format: EvidenceFormat,
    pub compression_level: CompressionLevel,
    pub compression_flags: CompressionFlags,
    /// Target segment file size; 0 selects the default for evidence output
    /// and a single unsplit file for raw output
    pub segment_file_size: u64,
    pub sectors_per_chunk: u32,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            evidence_format: EvidenceFormat::Encase6,
            compression_level: CompressionLevel::None,
            compression_flags: CompressionFlags::default(),
            segment_file_size: 0,
            sectors_per_chunk: 64,
        }
    }
}

/// Top-level export state. See the crate docs for the lifecycle:
/// open input, open output, set output values, transfer, finalize, close.
pub struct ExportSession {
    input: Option<Box<dyn EvidenceContainer>>,
    output: Option<OutputTarget>,
    strategy: Box<dyn TransferStrategy>,
    digest: DigestAccumulator,
    ledger: ErrorLedger,
    bytes_per_sector: u32,
    input_chunk_size: u32,
    output_chunk_size: u32,
    input_offset: u64,
    wipe_chunk_on_error: bool,
    swap_byte_pairs: bool,
    write_compressed: bool,
    summary: Option<DigestSummary>,
}

impl ExportSession {
    pub fn new(options: SessionOptions) -> Self {
        let strategy: Box<dyn TransferStrategy> = if options.chunk_level_access {
            Box::new(ChunkLevelTransfer)
        } else {
            Box::new(BufferLevelTransfer)
        };
        Self {
            input: None,
            output: None,
            strategy,
            digest: DigestAccumulator::new(options.calculate_md5, options.calculate_sha1),
            ledger: ErrorLedger::new(0),
            bytes_per_sector: 0,
            input_chunk_size: 0,
            output_chunk_size: 0,
            input_offset: 0,
            wipe_chunk_on_error: options.wipe_chunk_on_error,
            swap_byte_pairs: options.swap_byte_pairs,
            write_compressed: false,
            summary: None,
        }
    }

    /// Open the input evidence container.
    ///
    /// A single filename is expanded to the full ordered segment set;
    /// multiple filenames are taken as already complete.
    pub fn open_input(&mut self, filenames: &[PathBuf]) -> Result<()> {
        if self.input.is_some() {
            return Err(Error::already_set("input container"));
        }
        let paths = match filenames {
            [] => return Err(Error::invalid_argument("no input filenames given")),
            [single] => resolve_segments(single)?,
            many => many.to_vec(),
        };
        let mut container = SimpleEvidence::open(&paths)?;
        container.set_wipe_chunk_on_error(self.wipe_chunk_on_error)?;

        let media = container.media_info()?;
        self.bytes_per_sector = media.bytes_per_sector;
        self.input_chunk_size = media
            .chunk_size()
            .filter(|&size| size > 0)
            .ok_or_else(|| Error::invalid_container("input has invalid chunk geometry"))?;
        self.ledger = ErrorLedger::new(media.bytes_per_sector);
        self.input = Some(Box::new(container));
        info!(
            media_size = media.media_size,
            bytes_per_sector = media.bytes_per_sector,
            chunk_size = self.input_chunk_size,
            "opened input"
        );
        Ok(())
    }

    /// Open the output target. For raw output the filename `-` selects
    /// standard output.
    ///
    /// Open failure does not abort the session: the error is logged and
    /// [`OutputOpen::Unavailable`] is returned.
    pub fn open_output(&mut self, format: OutputFormat, target: &Path) -> Result<OutputOpen> {
        if self.output.is_some() {
            return Err(Error::already_set("output target"));
        }
        if self.input.is_none() {
            return Err(Error::resource_missing("input container not open"));
        }
        let opened = match format {
            OutputFormat::Raw if target.as_os_str() == "-" => {
                Some(OutputTarget::Stdout(io::stdout()))
            }
            OutputFormat::Raw => match RawWriter::create(target) {
                Ok(writer) => Some(OutputTarget::Raw(Box::new(writer))),
                Err(err) => {
                    warn!(path = %target.display(), error = %err, "raw output open failed");
                    None
                }
            },
            OutputFormat::Ewf => match SimpleEvidence::create(target) {
                Ok(container) => Some(OutputTarget::Ewf(Box::new(container))),
                Err(err) => {
                    warn!(path = %target.display(), error = %err, "evidence output open failed");
                    None
                }
            },
        };
        match opened {
            Some(target) => {
                self.output = Some(target);
                Ok(OutputOpen::Opened)
            }
            None => Ok(OutputOpen::Unavailable),
        }
    }

    /// Configure the output: copy case metadata and geometry from the
    /// input, apply compression and segmentation policy, and attach a GUID
    /// for the sub-formats that carry one.
    pub fn set_output_values(&mut self, options: &OutputOptions) -> Result<()> {
        let input = self
            .input
            .as_deref_mut()
            .ok_or_else(|| Error::resource_missing("input container not open"))?;
        let media = input.media_info()?;
        self.write_compressed = options.compression_level != CompressionLevel::None
            || options.compression_flags.compress_empty_blocks;

        match self.output.as_mut() {
            Some(OutputTarget::Ewf(output)) => {
                for (identifier, value) in input.header_values()? {
                    output.set_header_value(&identifier, &value)?;
                }
                output.set_header_value("acquiry_operating_system", std::env::consts::OS)?;
                output.set_header_value("acquiry_software", TOOL_NAME)?;
                output.set_header_value("acquiry_software_version", TOOL_VERSION)?;
                output.set_format(options.evidence_format)?;
                output.set_compression(options.compression_level, options.compression_flags)?;
                output.set_segment_file_size(if options.segment_file_size == 0 {
                    DEFAULT_SEGMENT_FILE_SIZE
                } else {
                    options.segment_file_size
                })?;
                output.set_media_size(media.media_size)?;
                output.set_bytes_per_sector(media.bytes_per_sector)?;
                output.set_sectors_per_chunk(options.sectors_per_chunk)?;
                // The transfer loop writes chunks shaped for the output
                self.output_chunk_size = media
                    .bytes_per_sector
                    .checked_mul(options.sectors_per_chunk)
                    .filter(|&size| size > 0)
                    .ok_or_else(|| {
                        Error::invalid_argument("output chunk geometry overflows")
                    })?;
                if let Some(guid) = format_guid(options.evidence_format) {
                    output.set_guid(&guid)?;
                }
            }
            Some(OutputTarget::Raw(output)) => {
                output.set_media_size(media.media_size)?;
                output.set_maximum_segment_size(options.segment_file_size)?;
            }
            Some(OutputTarget::Stdout(_)) | None => {}
        }
        Ok(())
    }

    /// Run the transfer loop until the input is exhausted, returning the
    /// number of media bytes written.
    ///
    /// Chunks that fail verification do not abort the loop: they are
    /// recorded in the ledger (and against both containers) and the offset
    /// keeps advancing so output stays aligned with the source.
    pub fn transfer(&mut self) -> Result<u64> {
        let input = self
            .input
            .as_deref_mut()
            .ok_or_else(|| Error::resource_missing("input container not open"))?;
        let media_size = input.media_size()?;
        input.seek(self.input_offset)?;

        let mut buffer = MediaBuffer::new(self.input_chunk_size as usize);
        // Evidence output gets chunks shaped for its own geometry, which
        // need not match the input's; bytes are re-chunked through a
        // staging buffer on the way out.
        let out_chunk_size = if self.output_chunk_size > 0 {
            self.output_chunk_size as usize
        } else {
            self.input_chunk_size as usize
        };
        let mut out_buffer = MediaBuffer::new(out_chunk_size);
        let mut staged: Vec<u8> = Vec::new();
        let mut total_written = 0u64;
        while self.input_offset < media_size {
            let remaining = media_size - self.input_offset;
            let outcome = self.strategy.read(input, &mut buffer, remaining)?;
            if outcome.bytes == 0 {
                break;
            }
            if outcome.verification_failed {
                let range = self.ledger.append_read_error(self.input_offset, outcome.bytes)?;
                input.append_checksum_error(range)?;
                if let Some(OutputTarget::Ewf(output)) = self.output.as_mut() {
                    output.append_acquiry_error(range)?;
                }
                warn!(%range, offset = self.input_offset, "chunk failed verification");
            }
            if self.swap_byte_pairs
                && !matches!(self.output, Some(OutputTarget::Ewf(_)))
                && !buffer.raw.is_empty()
            {
                buffer.swap_byte_pairs(buffer.raw.len())?;
            }
            self.digest.update(&buffer.raw)?;

            match self.output.as_mut() {
                Some(OutputTarget::Ewf(output)) => {
                    staged.extend_from_slice(&buffer.raw);
                    while staged.len() >= out_chunk_size {
                        out_buffer.clear();
                        out_buffer.raw.extend(staged.drain(..out_chunk_size));
                        total_written +=
                            self.strategy.write(output.as_mut(), &mut out_buffer)? as u64;
                    }
                }
                Some(OutputTarget::Raw(output)) => {
                    total_written += output.write_buffer(&buffer.raw)? as u64;
                }
                Some(OutputTarget::Stdout(stdout)) => {
                    stdout.write_all(&buffer.raw)?;
                    total_written += buffer.raw.len() as u64;
                }
                None => {}
            }
            self.input_offset += outcome.bytes as u64;
        }
        // Trailing partial output chunk
        if let Some(OutputTarget::Ewf(output)) = self.output.as_mut() {
            if !staged.is_empty() {
                out_buffer.clear();
                out_buffer.raw.append(&mut staged);
                total_written += self.strategy.write(output.as_mut(), &mut out_buffer)? as u64;
            }
        }
        debug!(
            bytes_read = self.input_offset,
            bytes_written = total_written,
            errors = self.ledger.ranges().len(),
            "transfer complete"
        );
        Ok(total_written)
    }

    /// Finalize the digests, write them into the output metadata, and
    /// flush trailing evidence-container metadata. Returns the byte count
    /// of that trailing metadata (0 for raw and stdout output).
    ///
    /// Callable exactly once per session.
    pub fn finalize(&mut self) -> Result<u64> {
        if self.summary.is_some() {
            return Err(Error::already_set("session already finalized"));
        }
        let summary = self.digest.finalize()?;
        let count = match self.output.as_mut() {
            Some(OutputTarget::Ewf(output)) => {
                if let Some(md5) = summary.md5.as_deref() {
                    output.set_hash_value("MD5", md5)?;
                }
                if let Some(sha1) = summary.sha1.as_deref() {
                    output.set_hash_value("SHA1", sha1)?;
                }
                output.write_finalize()?
            }
            Some(OutputTarget::Raw(output)) => {
                if let Some(md5) = summary.md5.as_deref() {
                    output.set_integrity_hash("MD5", md5)?;
                }
                if let Some(sha1) = summary.sha1.as_deref() {
                    output.set_integrity_hash("SHA1", sha1)?;
                }
                0
            }
            Some(OutputTarget::Stdout(_)) | None => 0,
        };
        self.summary = Some(summary);
        Ok(count)
    }

    /// Close the input container, then the output. Input must be open;
    /// an output close failure is reported but does not reopen the input.
    pub fn close(&mut self) -> Result<()> {
        let mut input = self
            .input
            .take()
            .ok_or_else(|| Error::resource_missing("input container not open"))?;
        input.close()?;
        match self.output.take() {
            Some(OutputTarget::Ewf(mut output)) => output.close()?,
            Some(OutputTarget::Raw(mut output)) => output.close()?,
            Some(OutputTarget::Stdout(mut stdout)) => stdout.flush()?,
            None => {}
        }
        Ok(())
    }

    /// Propagate an abort request to every open container.
    pub fn signal_abort(&mut self) -> Result<()> {
        if let Some(input) = self.input.as_deref_mut() {
            input.signal_abort()?;
        }
        match self.output.as_mut() {
            Some(OutputTarget::Ewf(output)) => output.signal_abort()?,
            Some(OutputTarget::Raw(output)) => output.signal_abort()?,
            Some(OutputTarget::Stdout(_)) | None => {}
        }
        Ok(())
    }

    /// Export the input's embedded logical file tree under `target`.
    pub fn export_file_tree(&mut self, target: &Path) -> Result<()> {
        let input = self
            .input
            .as_deref_mut()
            .ok_or_else(|| Error::resource_missing("input container not open"))?;
        let mut root = input
            .root_file_entry()?
            .ok_or_else(|| Error::resource_missing("container has no logical file tree"))?;
        export_entry(root.as_mut(), target)
    }

    /// Digest values, present after [`ExportSession::finalize`].
    pub fn digest_summary(&self) -> Option<&DigestSummary> {
        self.summary.as_ref()
    }

    /// Error ranges recorded during the transfer, in record order.
    pub fn ledger(&self) -> &ErrorLedger {
        &self.ledger
    }

    /// Media bytes consumed from the input so far.
    pub fn input_offset(&self) -> u64 {
        self.input_offset
    }

    /// True when the configured output policy materializes a compressed
    /// representation before write.
    pub fn is_write_compressed(&self) -> bool {
        self.write_compressed
    }

    /// Write the calculated hash lines to `writer`.
    pub fn write_hash_values(&self, writer: &mut dyn Write) -> Result<()> {
        let Some(summary) = self.summary.as_ref() else {
            return Ok(());
        };
        if let Some(md5) = summary.md5.as_deref() {
            writeln!(writer, "MD5 hash calculated over data:\t\t{}", md5)?;
        }
        if let Some(sha1) = summary.sha1.as_deref() {
            writeln!(writer, "SHA1 hash calculated over data:\t\t{}", sha1)?;
        }
        Ok(())
    }

    /// Write the checksum-error report: each (coalesced) error range with
    /// the segment file(s) whose byte span it falls in.
    pub fn write_checksum_errors(&mut self, writer: &mut dyn Write) -> Result<()> {
        let input = self
            .input
            .as_deref_mut()
            .ok_or_else(|| Error::resource_missing("input container not open"))?;
        let count = input.number_of_checksum_errors()?;
        if count == 0 {
            return Ok(());
        }
        writeln!(writer, "Read errors during export:")?;
        writeln!(writer, "\ttotal number: {}", count)?;

        let mut ranges = Vec::with_capacity(count as usize);
        for index in 0..count {
            ranges.push(input.checksum_error(index)?);
        }
        for range in coalesce(&ranges) {
            let start_offset = range.start_sector * self.bytes_per_sector as u64;
            let end_offset = range.end_sector() * self.bytes_per_sector as u64;

            // Walk the byte range in chunk strides and name each distinct
            // segment file it touches, skipping consecutive repeats.
            let mut names: Vec<String> = Vec::new();
            let mut offset = start_offset;
            while offset < end_offset {
                input.seek(offset)?;
                let filename = input.segment_filename()?.display().to_string();
                if names.last() != Some(&filename) {
                    names.push(filename);
                }
                offset += self.input_chunk_size as u64;
            }
            writeln!(
                writer,
                "\t{} in segment file(s): {}",
                range,
                names.join(", ")
            )?;
        }
        Ok(())
    }
}

/// GUID for the sub-formats that carry one: random for the EnCase 5/6 and
/// EWF-X families, time-based for linen, none for the rest.
fn format_guid(format: EvidenceFormat) -> Option<[u8; 16]> {
    match format {
        EvidenceFormat::Encase5 | EvidenceFormat::Encase6 | EvidenceFormat::Ewfx => {
            Some(*Uuid::new_v4().as_bytes())
        }
        EvidenceFormat::Linen5 | EvidenceFormat::Linen6 => {
            Some(*Uuid::now_v1(&[0u8; 6]).as_bytes())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exovault_containers::segment_path;
    use tempfile::tempdir;

    fn build_input(base: &Path, data: &[u8]) {
        let mut container = SimpleEvidence::create(base).unwrap();
        container.set_media_size(data.len() as u64).unwrap();
        container.set_bytes_per_sector(512).unwrap();
        container.set_sectors_per_chunk(4).unwrap();
        for chunk in data.chunks(2048) {
            container.write_buffer(chunk).unwrap();
        }
        container.close().unwrap();
    }

    #[test]
    fn test_open_input_twice_rejected() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("in");
        build_input(&base, &[0u8; 2048]);

        let mut session = ExportSession::new(SessionOptions::default());
        session.open_input(&[segment_path(&base, 1)]).unwrap();
        assert!(matches!(
            session.open_input(&[segment_path(&base, 1)]),
            Err(Error::AlreadySet(_))
        ));
        session.close().unwrap();
    }

    #[test]
    fn test_output_before_input_rejected() {
        let dir = tempdir().unwrap();
        let mut session = ExportSession::new(SessionOptions::default());
        assert!(matches!(
            session.open_output(OutputFormat::Raw, &dir.path().join("out.raw")),
            Err(Error::ResourceMissing(_))
        ));
    }

    #[test]
    fn test_failed_output_open_is_non_fatal() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("in");
        build_input(&base, &[0u8; 2048]);

        let mut session = ExportSession::new(SessionOptions::default());
        session.open_input(&[segment_path(&base, 1)]).unwrap();
        let missing_dir = dir.path().join("no-such-dir").join("out.raw");
        assert_eq!(
            session.open_output(OutputFormat::Raw, &missing_dir).unwrap(),
            OutputOpen::Unavailable
        );
        // The session still transfers (digest-only dry run)
        session.transfer().unwrap();
        session.finalize().unwrap();
        assert!(session.digest_summary().unwrap().md5.is_some());
        session.close().unwrap();
    }

    #[test]
    fn test_finalize_twice_rejected() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("in");
        build_input(&base, &[7u8; 2048]);

        let mut session = ExportSession::new(SessionOptions::default());
        session.open_input(&[segment_path(&base, 1)]).unwrap();
        session.transfer().unwrap();
        session.finalize().unwrap();
        assert!(matches!(session.finalize(), Err(Error::AlreadySet(_))));
        session.close().unwrap();
    }

    #[test]
    fn test_close_without_input_rejected() {
        let mut session = ExportSession::new(SessionOptions::default());
        assert!(matches!(session.close(), Err(Error::ResourceMissing(_))));
    }

    #[test]
    fn test_swap_byte_pairs_applies_to_raw_output() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("in");
        // Whole media is one 2048-byte chunk of an even-length pattern
        let data: Vec<u8> = (0..2048u32).map(|i| (i % 256) as u8).collect();
        build_input(&base, &data);

        let options = SessionOptions {
            swap_byte_pairs: true,
            ..SessionOptions::default()
        };
        let mut session = ExportSession::new(options);
        session.open_input(&[segment_path(&base, 1)]).unwrap();
        let out = dir.path().join("out.raw");
        session.open_output(OutputFormat::Raw, &out).unwrap();
        session.set_output_values(&OutputOptions::default()).unwrap();
        session.transfer().unwrap();
        session.finalize().unwrap();
        session.close().unwrap();

        let written = std::fs::read(&out).unwrap();
        let mut expected = data;
        for pair in expected.chunks_exact_mut(2) {
            pair.swap(0, 1);
        }
        assert_eq!(written, expected);
    }
}
