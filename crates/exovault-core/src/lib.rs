//! # Exovault Core
//!
//! Core traits, types, and error handling for the Exovault export engine.
//!
//! This crate provides the foundational abstractions the pipeline drives:
//! - **EvidenceContainer**: segmented, checksummed evidence image
//! - **RawContainer**: flat segmented image with sidecar metadata
//! - **FileEntry**: logical file tree embedded in an evidence container
//!
//! ## Example
//!
//! ```rust,no_run
//! use exovault_core::{EvidenceContainer, Result};
//!
//! fn describe(container: &dyn EvidenceContainer) -> Result<()> {
//!     println!("media size: {} bytes", container.media_size()?);
//!     println!("chunk size: {} bytes", container.chunk_size()?);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use error::{Error, Result};
pub use traits::{EvidenceContainer, FileEntry, RawContainer};
pub use types::{
    ChunkHeader, CompressionFlags, CompressionLevel, ErrorRange, EvidenceFormat, MediaInfo,
    OutputFormat,
};
