//! Error types shared across the quiver crates.

use std::fmt;

use thiserror::Error;

/// Errors raised by the array subsystem.
///
/// All errors are raised synchronously at the call that detects them, none
/// are downgraded to default values.
#[derive(Debug, Error)]
pub enum QuiverError {
    /// A dictionary was requested over a value type outside the supported
    /// set.
    #[error("unsupported dictionary value type: {datatype}")]
    UnsupportedType {
        /// Display form of the rejected type tag.
        datatype: String,
    },

    /// A descriptor's declared type disagrees with what the caller asked
    /// for.
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    /// An operation was attempted in a lifecycle state that doesn't allow
    /// it, e.g. appending to a finalized builder.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Previously-built data violates an invariant that must hold by
    /// construction. Fatal for the operation that found it.
    #[error("corrupt array data: {0}")]
    CorruptData(String),

    /// A caller-supplied index is outside the array's length.
    #[error("index {idx} out of bounds for length {len}")]
    OutOfBounds { idx: usize, len: usize },

    /// An allocation layout or addressing limit was exceeded.
    #[error("capacity error: {0}")]
    Capacity(String),
}

impl QuiverError {
    pub fn unsupported_type(datatype: impl fmt::Display) -> Self {
        QuiverError::UnsupportedType {
            datatype: datatype.to_string(),
        }
    }

    pub fn type_mismatch(expected: impl fmt::Display, got: impl fmt::Display) -> Self {
        QuiverError::TypeMismatch {
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        QuiverError::InvalidState(msg.into())
    }

    pub fn corrupt_data(msg: impl Into<String>) -> Self {
        QuiverError::CorruptData(msg.into())
    }

    pub fn capacity(msg: impl Into<String>) -> Self {
        QuiverError::Capacity(msg.into())
    }
}

pub type Result<T, E = QuiverError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = QuiverError::type_mismatch("Int32", "Utf8");
        assert_eq!("type mismatch: expected Int32, got Utf8", err.to_string());

        let err = QuiverError::OutOfBounds { idx: 4, len: 4 };
        assert_eq!("index 4 out of bounds for length 4", err.to_string());
    }
}
