//! Contains the Error and Result types used across the crate.

use crate::Tag;

/// Errors surfaced by readers, writers and the tag model.
///
/// Nothing is recovered internally: every failure propagates to the caller.
/// A pull reader that hits `Malformed` or `Truncated` latches into an error
/// state and fails all further non-query operations with `InvalidState`.
#[derive(Debug)]
pub enum Error {
    /// The input violates the wire format: negative lengths, a bad root tag
    /// type, an invalid tag byte, non-UTF-8 string data.
    Malformed(String),

    /// The byte source ended in the middle of a tag.
    Truncated,

    /// An accessor requested a conversion outside the permitted widenings.
    TypeMismatch(String),

    /// The operation is illegal in the current reader or writer state.
    InvalidState(String),

    /// A parameter was out of range or otherwise unusable.
    InvalidArgument(String),

    /// A structural rule was violated while producing output, for example
    /// closing a list before all declared elements were written, or
    /// serializing a list whose element type is still undetermined.
    Format(String),

    /// I/O failure from the underlying byte sink or source.
    Io(std::io::Error),
}

/// Convenience type for Result.
pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Malformed(msg) => write!(f, "malformed nbt: {}", msg),
            Error::Truncated => f.write_str("truncated nbt: input ended mid-tag"),
            Error::TypeMismatch(msg) => write!(f, "type mismatch: {}", msg),
            Error::InvalidState(msg) => write!(f, "invalid state: {}", msg),
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::Format(msg) => write!(f, "format error: {}", msg),
            Error::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::Truncated,
            _ => Error::Io(e),
        }
    }
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Error {
        Error::Malformed(msg.into())
    }

    pub(crate) fn invalid_tag(byte: u8) -> Error {
        Error::Malformed(format!("invalid tag byte: {}", byte))
    }

    pub(crate) fn negative_length(what: &str, len: i32) -> Error {
        Error::Malformed(format!("negative {} length: {}", what, len))
    }

    pub(crate) fn type_mismatch(from: Tag, to: &str) -> Error {
        Error::TypeMismatch(format!("cannot read {:?} as {}", from, to))
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Error {
        Error::InvalidState(msg.into())
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Error {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn format(msg: impl Into<String>) -> Error {
        Error::Format(msg.into())
    }
}
