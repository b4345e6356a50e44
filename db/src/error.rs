//! Error types for schema loading, configuration and the id index.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing db files.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A registry file that is not a resource schema.
    #[error("invalid schema {}: {message}", path.display())]
    InvalidSchema { path: PathBuf, message: String },

    /// Two files declare the same type name.
    #[error("duplicate schema {type_name} in {}", path.display())]
    DuplicateSchema { type_name: String, path: PathBuf },

    /// Checksum mismatch between the index and a package file.
    #[error("invalid checksum: {0}")]
    InvalidChecksum(String),

    /// All configured loader sources failed.
    #[error("no schema sources available")]
    NoSourcesAvailable,
}

/// Convenience alias for results with [`DatabaseError`].
pub type Result<T> = std::result::Result<T, DatabaseError>;
