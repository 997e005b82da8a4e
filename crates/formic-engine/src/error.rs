//! Engine Errors
//!
//! Programmer errors only. A field failing validation is ordinary data
//! (`Outcome::Invalid`), never an error; everything here indicates a caller
//! defect and fails fast at the call site.

use formic_core::{Path, PathError};

/// Caller-defect errors raised by the engine
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("no field registered at {0}")]
    UnknownField(Path),

    #[error("{0} was never declared as an array field")]
    NotAnArrayField(Path),

    #[error("array field {path} has already been declared")]
    ArrayAlreadyDeclared { path: Path },

    #[error("index {index} out of bounds for array field {path} of length {len}")]
    IndexOutOfBounds {
        path: Path,
        index: usize,
        len: usize,
    },

    #[error("invalid rule configuration for {path}: {reason}")]
    InvalidRule { path: Path, reason: String },
}
