//! Error types for the slicer.

use strata_mesh::MeshError;
use thiserror::Error;

/// Errors that can occur during slicing.
#[derive(Error, Debug)]
pub enum SlicerError {
    /// Invalid slice settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// A settings key that does not exist.
    #[error("unknown setting: {0}")]
    UnknownSetting(String),

    /// The operation was cancelled.
    #[error("slicing cancelled")]
    Cancelled,

    /// Mesh import or topology error.
    #[error(transparent)]
    Mesh(#[from] MeshError),

    /// Settings file could not be parsed.
    #[error("invalid settings file: {0}")]
    Config(#[from] toml::de::Error),

    /// Settings could not be serialized.
    #[error("failed to write settings: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for slicer operations.
pub type Result<T> = std::result::Result<T, SlicerError>;
