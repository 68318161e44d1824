//! Contains the `Error` and `Result` types that this crate uses.

use thiserror::Error;

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur while encoding, decoding, or assembling a wire message.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The document could not be encoded: an unencodable value type, an invalid key under
    /// `check_keys`, a key containing NUL, a regex pattern containing NUL, or nesting deeper
    /// than the recursion cap.
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// Human-readable detail.
        message: String,
    },

    /// A byte sequence declared as text was not valid UTF-8.
    #[error("invalid string data: {message}")]
    InvalidStringData {
        /// Human-readable detail.
        message: String,
    },

    /// The decoder encountered malformed BSON bytes: a declared size exceeding the input, a
    /// missing trailing NUL, an element payload exceeding the remaining bytes, or an unknown
    /// type byte.
    #[error("invalid BSON: {message}")]
    InvalidBson {
        /// Human-readable detail.
        message: String,
    },

    /// An integer value does not fit in a signed 64-bit integer.
    #[error("overflow: MongoDB can only handle up to 8-byte ints")]
    Overflow,

    /// A wire-layer precondition was violated, e.g. an empty bulk insert.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Human-readable detail.
        message: String,
    },

    /// The growable buffer failed to allocate additional space.
    #[error("out of memory")]
    OutOfMemory,

    /// A generic `FromDocument` sink reported that a key vanished between iteration and lookup,
    /// indicating the input was mutated concurrently with encoding.
    #[error("key error: {message}")]
    KeyError {
        /// Human-readable detail.
        message: String,
    },
}

impl Error {
    pub(crate) fn invalid_document(message: impl Into<String>) -> Self {
        Error::InvalidDocument {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_string_data(message: impl Into<String>) -> Self {
        Error::InvalidStringData {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_bson(message: impl Into<String>) -> Self {
        Error::InvalidBson {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }
}
