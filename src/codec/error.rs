//! Error types for the frame length codec.
//!
//! - [`FramingError`]: wire-level frame boundary issues.
//! - [`EofError`]: end-of-stream conditions distinguishing clean closure from
//!   premature disconnection.
//! - [`CodecError`]: top-level enum wrapping both plus I/O errors.
//!
//! The codec works against `tokio_util` traits, which require
//! [`std::io::Error`]; [`CodecError`] converts into it with a matching
//! [`io::ErrorKind`] and can be recovered with [`CodecError::from_io`].

use std::io;

use thiserror::Error;

use crate::error::RecoveryPolicy;

/// Framing-level errors occurring during frame boundary detection.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// Frame size exceeds the configured maximum.
    #[error("frame exceeds max length: {size} > {max}")]
    OversizedFrame {
        /// Actual frame size.
        size: usize,
        /// Maximum allowed frame size.
        max: usize,
    },
}

/// EOF handling variants distinguishing normal vs. premature closure.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum EofError {
    /// Clean EOF at a frame boundary.
    #[error("connection closed cleanly at frame boundary")]
    CleanClose,

    /// EOF received after the length prefix but before the full frame.
    #[error("premature EOF: {bytes_received} bytes of {expected} byte frame received")]
    MidFrame {
        /// Frame bytes received before EOF.
        bytes_received: usize,
        /// Frame length announced by the prefix.
        expected: usize,
    },

    /// EOF received while reading the length prefix.
    #[error("premature EOF during header: {bytes_received} of {header_size} header bytes")]
    MidHeader {
        /// Prefix bytes received before EOF.
        bytes_received: usize,
        /// Length prefix size.
        header_size: usize,
    },
}

/// Top-level codec error taxonomy.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Framing layer error.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// Transport layer I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// End-of-stream handling.
    #[error("EOF: {0}")]
    Eof(#[from] EofError),
}

impl CodecError {
    /// Returns the recommended recovery policy for this error.
    ///
    /// Oversized frames are rejected on the encode path, before anything is
    /// written, so the local caller sees them. Everything else leaves the
    /// byte stream in an unknown state and closes the connection.
    ///
    /// # Examples
    ///
    /// ```
    /// use rsocket_core::{
    ///     RecoveryPolicy,
    ///     codec::{CodecError, EofError, FramingError},
    /// };
    ///
    /// let err = CodecError::Framing(FramingError::OversizedFrame { size: 2000, max: 1024 });
    /// assert_eq!(err.default_recovery_policy(), RecoveryPolicy::Propagate);
    ///
    /// let err = CodecError::Eof(EofError::CleanClose);
    /// assert_eq!(err.default_recovery_policy(), RecoveryPolicy::CloseConnection);
    /// ```
    #[must_use]
    pub fn default_recovery_policy(&self) -> RecoveryPolicy {
        match self {
            Self::Framing(FramingError::OversizedFrame { .. }) => RecoveryPolicy::Propagate,
            Self::Io(_) | Self::Eof(_) => RecoveryPolicy::CloseConnection,
        }
    }

    /// Returns true if this error represents a clean connection close.
    #[must_use]
    pub fn is_clean_close(&self) -> bool { matches!(self, Self::Eof(EofError::CleanClose)) }

    /// Returns true if the connection should be terminated.
    #[must_use]
    pub fn should_disconnect(&self) -> bool {
        self.default_recovery_policy() == RecoveryPolicy::CloseConnection
    }

    /// Recover a structured error from an [`io::Error`] produced by the codec.
    ///
    /// I/O errors that did not originate from a [`CodecError`] are wrapped as
    /// [`CodecError::Io`].
    #[must_use]
    pub fn from_io(err: io::Error) -> Self {
        let structured = err.get_ref().and_then(|inner| {
            inner
                .downcast_ref::<FramingError>()
                .map(|e| Self::Framing(e.clone()))
                .or_else(|| inner.downcast_ref::<EofError>().map(|e| Self::Eof(*e)))
        });
        structured.unwrap_or(Self::Io(err))
    }
}

impl From<CodecError> for io::Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => e,
            CodecError::Framing(e) => io::Error::new(io::ErrorKind::InvalidData, e),
            CodecError::Eof(e) => io::Error::new(io::ErrorKind::UnexpectedEof, e),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
