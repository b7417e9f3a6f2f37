//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while packing or unpacking a buffer.
///
/// Packing only fails for fields too long for a 4-byte length prefix; every
/// other variant describes a malformed or truncated input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer ended before the requested field.
    #[error("unexpected end of input: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        /// Bytes required by the field being read.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// A packed string was not valid UTF-8.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// A packed value carried a type tag this codec does not know.
    #[error("unknown value tag: {tag}")]
    UnknownTag {
        /// The tag that was read.
        tag: i32,
    },

    /// A length prefix was negative.
    #[error("negative length prefix: {length}")]
    NegativeLength {
        /// The length that was read.
        length: i32,
    },

    /// A string or byte field is too long for a 4-byte length prefix.
    #[error("field of {length} bytes exceeds the packed length limit")]
    LengthOverflow {
        /// Length of the offending field.
        length: usize,
    },
}

impl CodecError {
    /// Create an unexpected end of input error.
    pub fn eof(needed: usize, available: usize) -> Self {
        Self::UnexpectedEof { needed, available }
    }
}
