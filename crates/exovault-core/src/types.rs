//! Core types shared across the export engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open sector range recorded against a container.
///
/// The same coordinates serve as a checksum error on the input side and an
/// acquiry error on the output side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRange {
    /// First sector of the range
    pub start_sector: u64,
    /// Number of sectors in the range
    pub sector_count: u64,
}

impl ErrorRange {
    /// Create a new error range
    pub fn new(start_sector: u64, sector_count: u64) -> Self {
        Self {
            start_sector,
            sector_count,
        }
    }

    /// First sector past the end of the range
    pub fn end_sector(&self) -> u64 {
        self.start_sector + self.sector_count
    }

    /// True if the other range overlaps or directly follows this one
    pub fn is_contiguous_with(&self, other: &ErrorRange) -> bool {
        other.start_sector <= self.end_sector() && self.start_sector <= other.end_sector()
    }
}

impl fmt::Display for ErrorRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sector(s) {} - {} (number: {})",
            self.start_sector,
            self.end_sector(),
            self.sector_count
        )
    }
}

/// Output container format selected for an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Segmented evidence container
    Ewf,
    /// Raw/flat segmented container
    Raw,
}

/// Evidence container sub-format families.
///
/// Only the legacy EnCase 5/6 and EWF-X families carry a random GUID; the
/// linen families carry a time-based one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvidenceFormat {
    Encase2,
    Encase3,
    Encase4,
    Encase5,
    Encase6,
    Linen5,
    Linen6,
    Ewfx,
    Smart,
}

impl EvidenceFormat {
    /// Short identifier used in reports and metadata
    pub fn name(&self) -> &'static str {
        match self {
            EvidenceFormat::Encase2 => "encase2",
            EvidenceFormat::Encase3 => "encase3",
            EvidenceFormat::Encase4 => "encase4",
            EvidenceFormat::Encase5 => "encase5",
            EvidenceFormat::Encase6 => "encase6",
            EvidenceFormat::Linen5 => "linen5",
            EvidenceFormat::Linen6 => "linen6",
            EvidenceFormat::Ewfx => "ewfx",
            EvidenceFormat::Smart => "smart",
        }
    }
}

impl fmt::Display for EvidenceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compression level for evidence container output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionLevel {
    None,
    Fast,
    Best,
}

impl Default for CompressionLevel {
    fn default() -> Self {
        CompressionLevel::None
    }
}

/// Compression policy flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompressionFlags {
    /// Compress chunks that consist entirely of zero bytes even when the
    /// compression level is `None`
    pub compress_empty_blocks: bool,
}

/// Per-chunk metadata carried by the low-level chunk API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Whether the chunk payload is stored compressed
    pub is_compressed: bool,
    /// Stored chunk checksum
    pub checksum: u32,
    /// Whether the checksum must be verified/written alongside the payload
    pub verify_checksum: bool,
}

/// Media geometry captured from a container at open time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Total media size in bytes
    pub media_size: u64,
    /// Fixed sector size in bytes
    pub bytes_per_sector: u32,
    /// Sectors covered by one stored chunk
    pub sectors_per_chunk: u32,
}

impl MediaInfo {
    /// Chunk size in bytes; `None` when the geometry does not fit in u32.
    /// Geometry read from a container footer is untrusted.
    pub fn chunk_size(&self) -> Option<u32> {
        self.bytes_per_sector.checked_mul(self.sectors_per_chunk)
    }

    /// Total number of sectors the media covers, including a trailing
    /// partial sector.
    pub fn sector_count(&self) -> u64 {
        if self.bytes_per_sector == 0 {
            return 0;
        }
        self.media_size.div_ceil(self.bytes_per_sector as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_range_end_sector() {
        let range = ErrorRange::new(100, 10);
        assert_eq!(range.end_sector(), 110);
        assert_eq!(range.to_string(), "sector(s) 100 - 110 (number: 10)");
    }

    #[test]
    fn test_error_range_contiguity() {
        let a = ErrorRange::new(100, 10);
        assert!(a.is_contiguous_with(&ErrorRange::new(110, 5)));
        assert!(a.is_contiguous_with(&ErrorRange::new(105, 20)));
        assert!(a.is_contiguous_with(&ErrorRange::new(90, 10)));
        assert!(!a.is_contiguous_with(&ErrorRange::new(111, 5)));
    }

    #[test]
    fn test_media_info_chunk_size() {
        let info = MediaInfo {
            media_size: 64 * 512 * 100,
            bytes_per_sector: 512,
            sectors_per_chunk: 64,
        };
        assert_eq!(info.chunk_size(), Some(32768));
        assert_eq!(info.sector_count(), 64 * 100);
    }

    #[test]
    fn test_media_info_chunk_size_overflow() {
        let info = MediaInfo {
            media_size: 0,
            bytes_per_sector: u32::MAX,
            sectors_per_chunk: u32::MAX,
        };
        assert_eq!(info.chunk_size(), None);
    }

    #[test]
    fn test_media_info_sector_count_rounds_up() {
        let info = MediaInfo {
            media_size: 2560 + 100,
            bytes_per_sector: 512,
            sectors_per_chunk: 4,
        };
        assert_eq!(info.sector_count(), 6);
    }

    #[test]
    fn test_evidence_format_names() {
        assert_eq!(EvidenceFormat::Encase6.name(), "encase6");
        assert_eq!(EvidenceFormat::Linen5.to_string(), "linen5");
    }
}
