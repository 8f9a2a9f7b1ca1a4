//! `ERROR` frame codec and the RSocket 1.0 error code table.

use std::fmt;

use bytes::{BufMut, Bytes};

use super::{FrameFlags, FrameType, header};
use crate::{
    alloc::BufferAllocator,
    byte_order::{array_at, read_network_u32, write_network_u32},
    error::ProtocolViolation,
    stream::StreamId,
};

const ERROR_CODE_SIZE: usize = 4;

/// Error code carried by an `ERROR` frame.
///
/// # Examples
///
/// ```
/// use rsocket_core::ErrorCode;
///
/// assert_eq!(ErrorCode::APPLICATION_ERROR.get(), 0x201);
/// assert_eq!(ErrorCode::APPLICATION_ERROR.to_string(), "APPLICATION_ERROR");
/// assert_eq!(ErrorCode::new(0x301).to_string(), "0x00000301");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ErrorCode(u32);

impl ErrorCode {
    /// The SETUP frame is invalid for the server.
    pub const INVALID_SETUP: Self = Self(0x0000_0001);
    /// Some parameters of the SETUP are not supported.
    pub const UNSUPPORTED_SETUP: Self = Self(0x0000_0002);
    /// The server rejected the SETUP.
    pub const REJECTED_SETUP: Self = Self(0x0000_0003);
    /// The server rejected the RESUME.
    pub const REJECTED_RESUME: Self = Self(0x0000_0004);
    /// The connection is being terminated.
    pub const CONNECTION_ERROR: Self = Self(0x0000_0101);
    /// The connection is being closed cleanly.
    pub const CONNECTION_CLOSE: Self = Self(0x0000_0102);
    /// Application-level failure of a stream.
    pub const APPLICATION_ERROR: Self = Self(0x0000_0201);
    /// The responder rejected the request before processing it.
    pub const REJECTED: Self = Self(0x0000_0202);
    /// The responder canceled the request after starting it.
    pub const CANCELED: Self = Self(0x0000_0203);
    /// The request is invalid.
    pub const INVALID: Self = Self(0x0000_0204);

    /// Wrap a raw code.
    #[must_use]
    pub const fn new(code: u32) -> Self { Self(code) }

    /// Raw code.
    #[must_use]
    pub const fn get(self) -> u32 { self.0 }

    /// Name of an assigned code.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            0x0000_0001 => "INVALID_SETUP",
            0x0000_0002 => "UNSUPPORTED_SETUP",
            0x0000_0003 => "REJECTED_SETUP",
            0x0000_0004 => "REJECTED_RESUME",
            0x0000_0101 => "CONNECTION_ERROR",
            0x0000_0102 => "CONNECTION_CLOSE",
            0x0000_0201 => "APPLICATION_ERROR",
            0x0000_0202 => "REJECTED",
            0x0000_0203 => "CANCELED",
            0x0000_0204 => "INVALID",
            _ => return None,
        };
        Some(name)
    }

    /// Whether the code is only valid on stream 0.
    #[must_use]
    pub const fn is_connection_error(self) -> bool { self.0 < Self::APPLICATION_ERROR.0 }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#010x}", self.0),
        }
    }
}

/// Decoded `ERROR` frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorFrame {
    stream_id: StreamId,
    code: ErrorCode,
    message: String,
}

impl ErrorFrame {
    /// Stream the error applies to; `0` fails the whole connection.
    #[must_use]
    pub const fn stream_id(&self) -> StreamId { self.stream_id }

    /// Error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode { self.code }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str { &self.message }

    /// Convert into the crate error delivered to stream handlers.
    #[must_use]
    pub fn into_error(self) -> crate::Error {
        crate::Error::Remote {
            code: self.code,
            message: self.message,
        }
    }
}

/// Encode an `ERROR` frame.
#[must_use]
pub fn encode<A>(alloc: &A, stream_id: StreamId, code: ErrorCode, message: &str) -> Bytes
where
    A: BufferAllocator + ?Sized,
{
    let mut buf = header::encode(
        alloc,
        stream_id,
        FrameType::Error,
        FrameFlags::empty(),
        ERROR_CODE_SIZE + message.len(),
    );
    buf.put_slice(&write_network_u32(code.get()));
    buf.put_slice(message.as_bytes());
    buf.freeze()
}

/// Decode an `ERROR` frame.
///
/// # Errors
///
/// Fails on a bad header, a missing error code or a message that is not
/// UTF-8.
pub fn decode(frame: &[u8]) -> Result<ErrorFrame, ProtocolViolation> {
    let header = header::ensure_frame_type(FrameType::Error, frame)?;
    let code = array_at::<ERROR_CODE_SIZE>(frame, header::HEADER_SIZE)
        .map(read_network_u32)
        .ok_or(ProtocolViolation::Truncated {
            needed: header::HEADER_SIZE + ERROR_CODE_SIZE,
            available: frame.len(),
        })?;
    let message = frame
        .get(header::HEADER_SIZE + ERROR_CODE_SIZE..)
        .unwrap_or_default();
    let message = std::str::from_utf8(message).map_err(|_| ProtocolViolation::InvalidUtf8)?;
    Ok(ErrorFrame {
        stream_id: header.stream_id(),
        code: ErrorCode::new(code),
        message: message.to_owned(),
    })
}
