//! Forensic evidence export engine
//!
//! Moves media from an evidence container into an evidence, raw, or
//! stdout output, chunk by chunk, while keeping three streams of truth in
//! lock-step: the dual-representation chunk buffer, the running MD5/SHA1
//! digest state, and the sector-addressed error ledger shared between the
//! input's checksum errors and the output's acquiry errors. Also exports a
//! logical file tree embedded in the container to a real directory.
//!
//! Typical lifecycle:
//!
//! ```no_run
//! use exovault_export::{ExportSession, OutputOptions, SessionOptions};
//! use exovault_core::OutputFormat;
//! use std::path::{Path, PathBuf};
//!
//! # fn main() -> exovault_core::Result<()> {
//! let mut session = ExportSession::new(SessionOptions::default());
//! session.open_input(&[PathBuf::from("evidence.s01")])?;
//! session.open_output(OutputFormat::Raw, Path::new("export.raw"))?;
//! session.set_output_values(&OutputOptions::default())?;
//! session.transfer()?;
//! session.finalize()?;
//! session.close()?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod digest;
pub mod ledger;
pub mod path;
pub mod session;
pub mod transfer;
pub mod tree;

pub use buffer::{MediaBuffer, Representation};
pub use digest::{DigestAccumulator, DigestSummary};
pub use ledger::{coalesce, ErrorLedger};
pub use path::{build_target_path, sanitize_filename};
pub use session::{
    ExportSession, OutputOpen, OutputOptions, OutputTarget, SessionOptions, TOOL_NAME,
    TOOL_VERSION,
};
pub use transfer::{BufferLevelTransfer, ChunkLevelTransfer, ReadOutcome, TransferStrategy};
pub use tree::{export_entry, EXPORT_BLOCK_SIZE};
