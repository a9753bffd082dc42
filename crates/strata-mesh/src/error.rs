//! Error types for mesh import and topology construction.

use thiserror::Error;

/// Errors that can occur while decoding or merging a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    /// No decoder recognized the content.
    #[error("content not recognized as a supported mesh format")]
    FormatNotRecognized,

    /// Merge tolerance must be positive and finite.
    #[error("invalid merge tolerance: {0}")]
    InvalidTolerance(f64),

    /// Attempted to mutate a topology after it was finalized.
    #[error("topology is finalized and can no longer be modified")]
    Finalized,

    /// Topology was requested before `finalize` was called.
    #[error("topology has not been finalized")]
    NotFinalized,

    /// A face referenced unknown or repeated vertices.
    #[error("invalid face: {0}")]
    InvalidFace(String),

    /// An ASCII vertex line could not be parsed.
    #[error("parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// I/O error while reading input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
