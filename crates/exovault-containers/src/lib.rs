//! Container formats for the evidence export engine
//!
//! Implements the collaborator traits from `exovault-core`:
//!
//! - [`SimpleEvidence`], a segmented, checksummed, optionally compressed
//!   evidence container used for input and EWF-style output
//! - [`RawWriter`], a flat segmented output with a plain-text sidecar
//! - segment set discovery for both

pub mod evidence;
pub mod raw;
pub mod segments;
pub mod tree;

pub use evidence::{SimpleEvidence, DEFAULT_SEGMENT_FILE_SIZE};
pub use raw::{raw_segment_path, RawWriter};
pub use segments::{resolve_segments, segment_path, MAX_SEGMENTS};
pub use tree::{LogicalEntry, MemoryFileEntry};
