//! Chunk transfer strategies
//!
//! The pipeline moves media through either the container's low-level chunk
//! API (stored payload plus header, decompressed by the caller) or its
//! high-level buffer API (the container decompresses and recovers
//! internally). The choice is made once at session construction and
//! expressed as a strategy, not as conditionals through the loop.

use crate::buffer::{MediaBuffer, Representation};
use exovault_core::{EvidenceContainer, Result};

/// Result of pulling one chunk from the input.
#[derive(Debug, Clone, Copy)]
pub struct ReadOutcome {
    /// Media bytes the read covers; advances the input offset even when
    /// verification failed
    pub bytes: usize,
    /// The chunk failed checksum verification and its bytes are substitute
    /// content (wiped or as-decoded)
    pub verification_failed: bool,
}

/// One end-to-end chunk movement policy.
pub trait TransferStrategy {
    /// Pull the next chunk into the buffer. `remaining` is the media bytes
    /// left before end of input.
    fn read(
        &mut self,
        input: &mut dyn EvidenceContainer,
        buffer: &mut MediaBuffer,
        remaining: u64,
    ) -> Result<ReadOutcome>;

    /// Push the buffer's chunk to an evidence container output, returning
    /// the media bytes it covers.
    fn write(
        &mut self,
        output: &mut dyn EvidenceContainer,
        buffer: &mut MediaBuffer,
    ) -> Result<usize>;
}

/// Low-level path: stored payloads move through the caller, which asks the
/// containers to decompress/compress around them. Verification failures
/// surface here and are reported per chunk.
pub struct ChunkLevelTransfer;

impl TransferStrategy for ChunkLevelTransfer {
    fn read(
        &mut self,
        input: &mut dyn EvidenceContainer,
        buffer: &mut MediaBuffer,
        remaining: u64,
    ) -> Result<ReadOutcome> {
        buffer.clear();
        let header = input.read_chunk(&mut buffer.compressed)?;
        buffer.header = Some(header);
        buffer.set_authoritative(Representation::Compressed);

        match input.prepare_read_chunk(&buffer.compressed, &mut buffer.raw, &header) {
            Ok(count) => {
                buffer.set_authoritative(Representation::Raw);
                Ok(ReadOutcome {
                    bytes: count,
                    verification_failed: false,
                })
            }
            Err(err) if err.is_recoverable() => {
                // The full chunk still counts toward the offset so the
                // output stays aligned with the source.
                let bytes = (remaining as usize).min(buffer.chunk_size());
                buffer.raw.resize(bytes, 0);
                buffer.set_authoritative(Representation::Raw);
                Ok(ReadOutcome {
                    bytes,
                    verification_failed: true,
                })
            }
            Err(err) => Err(err),
        }
    }

    fn write(
        &mut self,
        output: &mut dyn EvidenceContainer,
        buffer: &mut MediaBuffer,
    ) -> Result<usize> {
        let raw_len = buffer.raw.len();
        if raw_len == 0 {
            return Ok(0);
        }
        let header = output.prepare_write_chunk(&buffer.raw, &mut buffer.compressed)?;
        buffer.set_authoritative(if header.is_compressed {
            Representation::Compressed
        } else {
            Representation::Raw
        });
        output.write_chunk(buffer.data(), raw_len, &header)?;
        Ok(raw_len)
    }
}

/// High-level path: the container hands out decompressed bytes and recovers
/// from verification failures internally, recording them against itself.
pub struct BufferLevelTransfer;

impl TransferStrategy for BufferLevelTransfer {
    fn read(
        &mut self,
        input: &mut dyn EvidenceContainer,
        buffer: &mut MediaBuffer,
        remaining: u64,
    ) -> Result<ReadOutcome> {
        buffer.clear();
        let want = (remaining as usize).min(buffer.chunk_size());
        buffer.raw.resize(want, 0);
        let count = input.read_buffer(&mut buffer.raw)?;
        buffer.raw.truncate(count);
        buffer.set_authoritative(Representation::Raw);
        Ok(ReadOutcome {
            bytes: count,
            verification_failed: false,
        })
    }

    fn write(
        &mut self,
        output: &mut dyn EvidenceContainer,
        buffer: &mut MediaBuffer,
    ) -> Result<usize> {
        if buffer.raw.is_empty() {
            return Ok(0);
        }
        output.write_buffer(&buffer.raw)
    }
}
