//! Exovault error types

use thiserror::Error;

/// The main error type for export operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error against a container or the filesystem
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or out-of-range parameter
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation invoked on a handle that was never opened
    #[error("Missing resource: {0}")]
    ResourceMissing(String),

    /// String encoding conversion failed
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Attempt to reinitialize an already-configured value
    #[error("Already set: {0}")]
    AlreadySet(String),

    /// Chunk checksum mismatch on read.
    ///
    /// The only recoverable error kind: the transfer loop converts it into
    /// an error-ledger entry and keeps going.
    #[error("Checksum verification failed: {0}")]
    ChecksumVerification(String),

    /// Invalid container format or corrupted data
    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    /// Operation cancelled through signal_abort
    #[error("Operation cancelled")]
    Cancelled,

    /// Unsupported format or feature
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create a missing resource error
    pub fn resource_missing(msg: impl Into<String>) -> Self {
        Error::ResourceMissing(msg.into())
    }

    /// Create a conversion error
    pub fn conversion(msg: impl Into<String>) -> Self {
        Error::Conversion(msg.into())
    }

    /// Create an already set error
    pub fn already_set(msg: impl Into<String>) -> Self {
        Error::AlreadySet(msg.into())
    }

    /// Create a checksum verification error
    pub fn checksum_verification(msg: impl Into<String>) -> Self {
        Error::ChecksumVerification(msg.into())
    }

    /// Create an invalid container error
    pub fn invalid_container(msg: impl Into<String>) -> Self {
        Error::InvalidContainer(msg.into())
    }

    /// Create an unsupported error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    /// True for the recoverable error kind
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::ChecksumVerification(_))
    }
}
