//! Sector-addressed error ledger
//!
//! Byte offsets from the transfer loop become sector ranges here; the same
//! division must be used on read and on report so the input's checksum
//! error list and the output's acquiry error list stay aligned.

use exovault_core::{Error, ErrorRange, Result};

/// Tracks the error ranges recorded during one transfer.
///
/// Ranges are kept in record order without merging; merging is a
/// presentation concern handled by [`coalesce`].
pub struct ErrorLedger {
    bytes_per_sector: u32,
    ranges: Vec<ErrorRange>,
}

impl ErrorLedger {
    pub fn new(bytes_per_sector: u32) -> Self {
        Self {
            bytes_per_sector,
            ranges: Vec::new(),
        }
    }

    /// Convert a failed read at `start_offset` covering `byte_count` bytes
    /// into a sector range and record it.
    pub fn append_read_error(&mut self, start_offset: u64, byte_count: usize) -> Result<ErrorRange> {
        if self.bytes_per_sector == 0 {
            return Err(Error::invalid_argument("bytes per sector is zero"));
        }
        let range = ErrorRange::new(
            start_offset / self.bytes_per_sector as u64,
            byte_count as u64 / self.bytes_per_sector as u64,
        );
        self.ranges.push(range);
        Ok(range)
    }

    pub fn ranges(&self) -> &[ErrorRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Merge overlapping and directly adjacent ranges for presentation.
pub fn coalesce(ranges: &[ErrorRange]) -> Vec<ErrorRange> {
    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|range| range.start_sector);
    let mut merged: Vec<ErrorRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if last.is_contiguous_with(&range) => {
                let end = last.end_sector().max(range.end_sector());
                last.sector_count = end - last.start_sector;
            }
            _ => merged.push(range),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_read_error_converts_to_sectors() {
        let mut ledger = ErrorLedger::new(512);
        let range = ledger.append_read_error(51200, 5120).unwrap();
        assert_eq!(range, ErrorRange::new(100, 10));
        assert_eq!(ledger.ranges(), &[ErrorRange::new(100, 10)]);
    }

    #[test]
    fn test_zero_sector_size_rejected() {
        let mut ledger = ErrorLedger::new(0);
        assert!(matches!(
            ledger.append_read_error(0, 512),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_ranges_not_merged_at_record_time() {
        let mut ledger = ErrorLedger::new(512);
        ledger.append_read_error(0, 512).unwrap();
        ledger.append_read_error(512, 512).unwrap();
        assert_eq!(ledger.ranges().len(), 2);
    }

    #[test]
    fn test_coalesce_merges_adjacent_and_overlapping() {
        let ranges = [
            ErrorRange::new(10, 5),
            ErrorRange::new(0, 4),
            ErrorRange::new(15, 2),
            ErrorRange::new(12, 4),
            ErrorRange::new(30, 1),
        ];
        let merged = coalesce(&ranges);
        assert_eq!(
            merged,
            vec![
                ErrorRange::new(0, 4),
                ErrorRange::new(10, 7),
                ErrorRange::new(30, 1),
            ]
        );
    }
}
