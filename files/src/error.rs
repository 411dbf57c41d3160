//! Error types for mappable file construction and mutation.
//!
//! Only structural failures live here: metadata that disagrees with the data
//! it describes, indexes out of range, operations applied to the wrong kind
//! of file. Routine "no data at this location" conditions (a brainordinate
//! outside the index, an interpolation neighborhood off the grid, a selector
//! a file variant cannot answer) are `Option::None` returns, never errors —
//! they happen constantly during normal interactive use.

use std::error::Error as StdError;
use thiserror::Error;

/// Custom error type for mappable file operations.
#[derive(Debug, Error)]
pub enum FileError {
    /// Structural metadata disagrees with the data it describes; fatal to
    /// file construction, the file is left empty
    #[error("Structural mismatch in {context}: expected {expected}, got {actual}")]
    StructuralMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Duplicate brainordinate key or data offset during index construction
    #[error("Duplicate brainordinate entry at data offset {offset}")]
    DuplicateBrainordinate { offset: usize },

    /// Map index outside `[0, number_of_maps)`
    #[error("Map index {index} out of range for file with {count} maps")]
    InvalidMapIndex { index: usize, count: usize },

    /// Row/column index outside the matrix dimensions
    #[error("Slice index {index} out of range ({count} available)")]
    InvalidSliceIndex { index: usize, count: usize },

    /// A label-table operation on a palette-mapped file, or vice versa
    #[error("Operation '{operation}' is not valid for a {kind}-mapped file")]
    WrongDataKind { operation: String, kind: String },

    /// Operation the file variant does not support
    #[error("Operation '{operation}' is not supported by {file_kind} files")]
    UnsupportedOperation { operation: String, file_kind: String },

    /// Generic error with context (for wrapping other errors)
    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl FileError {
    /// Create a StructuralMismatch error
    pub fn structural_mismatch(
        context: impl Into<String>,
        expected: usize,
        actual: usize,
    ) -> Self {
        Self::StructuralMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Create a WrongDataKind error
    pub fn wrong_data_kind(operation: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::WrongDataKind {
            operation: operation.into(),
            kind: kind.into(),
        }
    }

    /// Create an UnsupportedOperation error
    pub fn unsupported(operation: impl Into<String>, file_kind: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation: operation.into(),
            file_kind: file_kind.into(),
        }
    }

    /// Create an Other error with a message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            source: None,
        }
    }
}

// Conversion from anyhow::Error for convenience
impl From<anyhow::Error> for FileError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            message: err.to_string(),
            source: None, // anyhow::Error already contains the full context
        }
    }
}

// Type alias for Result using FileError
pub type Result<T> = std::result::Result<T, FileError>;
