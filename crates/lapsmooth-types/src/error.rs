//! Error types for the lapsmooth pipeline.
//!
//! All crates return `SmoothResult<T>` from fallible operations.
//! Malformed geometry is not an error: the importer reports it as
//! diagnostics and keeps going.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for lapsmooth.
#[derive(Debug, Error)]
pub enum SmoothError {
    /// A file could not be opened or created.
    #[error("Cannot access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O operation failed after the file was opened.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Mesh data is malformed or inconsistent.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Device allocation, mapping or dispatch failure.
    #[error("Device error: {0}")]
    Device(String),

    /// The scheduler's read/write bookkeeping became inconsistent.
    #[error("Parity violation: {0}")]
    ParityViolation(String),
}

impl SmoothError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }

    /// Returns true for device failures, which abort the smoothing stage.
    pub fn is_device(&self) -> bool {
        matches!(self, Self::Device(_))
    }
}

/// Convenience alias for `Result<T, SmoothError>`.
pub type SmoothResult<T> = Result<T, SmoothError>;
