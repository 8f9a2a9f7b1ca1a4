//! Canonical error and result types for the crate.
//!
//! Errors fall into four families, each with a fixed recovery policy:
//!
//! - [`IllegalArgument`]: the caller passed an out-of-contract value. Always a
//!   local programming error, surfaced immediately and never corrected.
//! - [`ProtocolViolation`]: inbound bytes do not form a valid frame. The
//!   connection that produced them must be closed.
//! - [`Error::PayloadTooLarge`]: reassembly exceeded the inbound bound. Only the
//!   offending stream fails; the connection continues.
//! - [`Error::RegistryExhausted`] and [`Error::ConnectionClosed`]: the stream
//!   registry can no longer allocate.
//!
//! See [`Error::recovery_policy`] for the full mapping.

use thiserror::Error;

use crate::{
    frame::{ErrorCode, FrameType},
    stream::StreamId,
};

/// How the owner of a connection should react to an [`Error`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecoveryPolicy {
    /// Return the error to the local caller; nothing on the wire is affected.
    #[default]
    Propagate,
    /// Fail or cancel the affected stream; other streams continue.
    FailStream,
    /// Tear down the whole connection.
    CloseConnection,
}

impl RecoveryPolicy {
    /// Returns the policy name as a static string for metrics and logging.
    ///
    /// # Examples
    ///
    /// ```
    /// use rsocket_core::RecoveryPolicy;
    ///
    /// assert_eq!(RecoveryPolicy::Propagate.as_str(), "propagate");
    /// assert_eq!(RecoveryPolicy::FailStream.as_str(), "fail_stream");
    /// assert_eq!(RecoveryPolicy::CloseConnection.as_str(), "close_connection");
    /// ```
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Propagate => "propagate",
            Self::FailStream => "fail_stream",
            Self::CloseConnection => "close_connection",
        }
    }
}

/// Out-of-contract values supplied by a local caller.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IllegalArgument {
    /// A request or credit frame was asked to carry less than one item.
    #[error("request n is less than 1: {value}")]
    RequestNNotPositive {
        /// Demand the caller supplied.
        value: i64,
    },

    /// A stream id used the reserved top bit.
    #[error("stream id {value:#x} exceeds the 31-bit stream id range")]
    StreamIdOutOfRange {
        /// Raw value the caller supplied.
        value: u32,
    },

    /// Metadata does not fit the 24-bit metadata length field.
    #[error("metadata of {size} bytes exceeds the 24-bit length field")]
    MetadataTooLarge {
        /// Metadata size in bytes.
        size: usize,
    },

    /// Fragmentation is disabled and the payload exceeds one frame.
    #[error(
        "payload of {size} bytes does not fit a single frame with max frame length {max}; \
         consider enabling fragmentation"
    )]
    PayloadExceedsFrameLength {
        /// Encoded frame size, excluding the length prefix.
        size: usize,
        /// Configured maximum frame length.
        max: usize,
    },

    /// MTU outside `0 | min..=max_frame_length`.
    #[error("mtu {mtu} must be 0 or between {min} and the max frame length {max}")]
    InvalidMtu {
        /// Requested MTU.
        mtu: usize,
        /// Smallest non-zero MTU.
        min: usize,
        /// Configured maximum frame length.
        max: usize,
    },

    /// Maximum frame length outside what the 24-bit length prefix allows.
    #[error("max frame length {value} must be between {min} and {max}")]
    InvalidMaxFrameLength {
        /// Requested maximum frame length.
        value: usize,
        /// Smallest allowed value.
        min: usize,
        /// Largest value the length prefix can express.
        max: usize,
    },

    /// A PAYLOAD frame was asked to carry neither NEXT nor COMPLETE.
    #[error("payload frame must set NEXT, COMPLETE or both")]
    MissingPayloadFlags,

    /// Inbound payload bound too small to hold a minimal frame.
    #[error("max inbound payload size {value} must be at least {min}")]
    InvalidMaxInboundPayloadSize {
        /// Requested bound.
        value: usize,
        /// Smallest allowed value.
        min: usize,
    },
}

/// Inbound bytes that break the RSocket 1.0 frame grammar.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// Fewer bytes than the frame structure requires.
    #[error("frame truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required to continue decoding.
        needed: usize,
        /// Bytes available.
        available: usize,
    },

    /// The reserved top bit of the stream id is set.
    #[error("reserved stream id bit is set")]
    ReservedBitSet,

    /// The 6-bit frame type code is not assigned in RSocket 1.0.
    #[error("unknown frame type code {code:#04x}")]
    UnknownFrameType {
        /// Raw frame type code.
        code: u8,
    },

    /// The caller parsed for one frame type and found another.
    #[error("expected {expected} frame, found {found}")]
    UnexpectedFrameType {
        /// Frame type the caller asked for.
        expected: FrameType,
        /// Frame type present in the header.
        found: FrameType,
    },

    /// Credit field is zero or uses the reserved top bit.
    #[error("invalid request n {value:#x} on the wire")]
    InvalidRequestN {
        /// Raw 32-bit field.
        value: u32,
    },

    /// ERROR frame message is not UTF-8.
    #[error("error frame message is not valid UTF-8")]
    InvalidUtf8,

    /// PAYLOAD frame with neither NEXT nor COMPLETE.
    #[error("payload frame on stream {stream_id} has neither NEXT nor COMPLETE set")]
    MissingPayloadFlags {
        /// Stream carrying the frame.
        stream_id: StreamId,
    },

    /// A frame arrived that cannot continue or interleave with a pending
    /// fragment sequence.
    #[error("unexpected {frame_type} frame on stream {stream_id} during fragment reassembly")]
    UnexpectedFragment {
        /// Stream with the pending sequence.
        stream_id: StreamId,
        /// Offending frame type.
        frame_type: FrameType,
    },

    /// A connection-level frame used a non-zero stream id.
    #[error("{frame_type} frames must use stream 0, found stream {stream_id}")]
    ConnectionStreamRequired {
        /// Offending frame type.
        frame_type: FrameType,
        /// Stream id found in the header.
        stream_id: StreamId,
    },

    /// The peer opened a stream on an id with this endpoint's parity.
    #[error("{frame_type} frame opens stream {stream_id}, which only this endpoint may allocate")]
    PeerUsedLocalStreamId {
        /// Offending frame type.
        frame_type: FrameType,
        /// Stream id found in the header.
        stream_id: StreamId,
    },

    /// A stream-level frame used stream 0.
    #[error("{frame_type} frames require a non-zero stream id")]
    StreamIdRequired {
        /// Offending frame type.
        frame_type: FrameType,
    },
}

/// Top-level error type exposed by `rsocket-core`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Caller supplied an out-of-contract value.
    #[error("illegal argument: {0}")]
    IllegalArgument(#[from] IllegalArgument),

    /// Decoded bytes violate the protocol.
    #[error("protocol violation: {0}")]
    ProtocolViolation(#[from] ProtocolViolation),

    /// Reassembly exceeded the configured inbound payload bound.
    #[error(
        "reassembled payload on stream {stream_id} reached {attempted} bytes, exceeding the \
         inbound limit of {limit}"
    )]
    PayloadTooLarge {
        /// Stream whose reassembly was abandoned.
        stream_id: StreamId,
        /// Bytes the payload would have held.
        attempted: usize,
        /// Configured `max_inbound_payload_size`.
        limit: usize,
    },

    /// Every stream id of this role is currently in use.
    #[error("no free stream id is available")]
    RegistryExhausted,

    /// The stream registry was terminated.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Description of the failure that terminated the connection.
        reason: String,
    },

    /// The peer failed the stream with an ERROR frame.
    #[error("remote error {code}: {message}")]
    Remote {
        /// Error code carried by the frame.
        code: ErrorCode,
        /// Message carried by the frame.
        message: String,
    },
}

impl Error {
    /// Returns the recommended reaction to this error.
    ///
    /// | Error | Policy |
    /// |-------|--------|
    /// | `IllegalArgument` | `Propagate` |
    /// | `PayloadTooLarge`, `Remote` | `FailStream` |
    /// | `ProtocolViolation`, `RegistryExhausted`, `ConnectionClosed` | `CloseConnection` |
    ///
    /// # Examples
    ///
    /// ```
    /// use rsocket_core::{Error, RecoveryPolicy};
    ///
    /// assert_eq!(
    ///     Error::RegistryExhausted.recovery_policy(),
    ///     RecoveryPolicy::CloseConnection
    /// );
    /// ```
    #[must_use]
    pub fn recovery_policy(&self) -> RecoveryPolicy {
        match self {
            Self::IllegalArgument(_) => RecoveryPolicy::Propagate,
            Self::PayloadTooLarge { .. } | Self::Remote { .. } => RecoveryPolicy::FailStream,
            Self::ProtocolViolation(_) | Self::RegistryExhausted | Self::ConnectionClosed { .. } => {
                RecoveryPolicy::CloseConnection
            }
        }
    }

    /// Returns true if the connection must be torn down.
    #[must_use]
    pub fn should_close_connection(&self) -> bool {
        self.recovery_policy() == RecoveryPolicy::CloseConnection
    }

    /// Returns the error category as a string for logging and metrics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::IllegalArgument(_) => "illegal_argument",
            Self::ProtocolViolation(_) => "protocol_violation",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::RegistryExhausted => "registry_exhausted",
            Self::ConnectionClosed { .. } => "connection_closed",
            Self::Remote { .. } => "remote",
        }
    }
}

/// Canonical result alias used by `rsocket-core` public APIs.
pub type Result<T, E = Error> = std::result::Result<T, E>;
