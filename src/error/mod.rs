//! Error handling module for vidshrink

use thiserror::Error;

/// Main error type for compression operations
#[derive(Error, Debug)]
pub enum CompressionError {
    /// No native encoder is available on this host at all
    #[error("Unsupported environment: {message}")]
    UnsupportedEnvironment { message: String },

    /// The native encoder was found but failed to load
    #[error("Failed to initialize encoder: {message}")]
    InitializationFailure { message: String },

    /// The encode command failed; carries the native diagnostic
    #[error("Encode failed: {message}")]
    EncodeFailure { message: String },

    /// Cancelled by the caller
    #[error("Compression cancelled")]
    Cancelled,

    /// Wall-clock ceiling exceeded
    #[error("Compression timed out after {seconds}s")]
    TimedOut { seconds: u64 },

    /// Input rejected before any work started
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Media metadata could not be read
    #[error("Failed to probe media: {message}")]
    Probe { message: String },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompressionError {
    /// Whether the error is a terminal user-facing state rather than a fault
    pub fn is_cancellation(&self) -> bool {
        matches!(self, CompressionError::Cancelled)
    }

    pub(crate) fn encode(message: impl Into<String>) -> Self {
        CompressionError::EncodeFailure {
            message: message.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        CompressionError::InvalidInput {
            message: message.into(),
        }
    }
}

/// Result type alias for compression operations
pub type CompressResult<T> = std::result::Result<T, CompressionError>;

/// Errors raised by native engine adapters, before mapping at the pipeline boundary
#[derive(Error, Debug)]
pub enum EngineError {
    /// The native encoder does not exist on this host
    #[error("encoder unavailable: {0}")]
    Unavailable(String),

    /// The encoder exists but could not be started or verified
    #[error("encoder failed to load: {0}")]
    LoadFailed(String),

    /// A working-storage entry was missing
    #[error("no such working file: {0}")]
    FileNotFound(String),

    /// The encode command exited unsuccessfully
    #[error("command exited with {status}: {diagnostic}")]
    CommandFailed { status: String, diagnostic: String },

    /// The running command was aborted
    #[error("command aborted")]
    Aborted,

    /// I/O error inside the engine
    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for engine adapters
pub type EngineResult<T> = std::result::Result<T, EngineError>;
