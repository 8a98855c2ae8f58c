//! Error types for DeckLink device operations.
//!
//! Only programming errors and file I/O surface as [`IoError`]. Hardware and
//! configuration problems are reported through each device's status instead.

use deckflow_core::CoreError;

/// Result type alias for device I/O operations.
pub type Result<T> = std::result::Result<T, IoError>;

/// Error type for device I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Domain model error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// DeckLink-related errors
    #[error("DeckLink error: {0}")]
    DeckLinkError(String),

    /// No device record under this name
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Device not available
    #[error("Device not available: {0}")]
    DeviceNotAvailable(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// An internal invariant does not hold
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Settings file extension not handled
    #[error("Unsupported settings format: {0}")]
    UnsupportedFormat(String),

    /// Settings file above the size limit
    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge {
        /// Actual size in bytes
        size: u64,
        /// Allowed size in bytes
        limit: u64,
    },

    /// Settings file written by another format version
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Version this build writes
        expected: String,
        /// Version stored in the file
        found: String,
    },

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// RON parsing failed
    #[error("RON error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// RON serialization failed
    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    /// TOML parsing failed
    #[error("TOML error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl IoError {
    /// Creates a new generic error with a custom message.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Creates an invariant violation error.
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IoError::DeckLinkError("test error".to_string());
        assert_eq!(err.to_string(), "DeckLink error: test error");
    }

    #[test]
    fn test_core_error_is_transparent() {
        let err: IoError = CoreError::InvalidTimecode("bad".to_string()).into();
        assert_eq!(err.to_string(), "Invalid timecode: bad");
    }

    #[test]
    fn test_file_too_large() {
        let err = IoError::FileTooLarge {
            size: 2048,
            limit: 1024,
        };
        let err_str = err.to_string();
        assert!(err_str.contains("2048"));
        assert!(err_str.contains("1024"));
    }
}
