//! RSocket 1.0 frame codecs.
//!
//! Each frame type has a module with free `encode`/`decode` functions.
//! Encoders take a [`BufferAllocator`](crate::BufferAllocator), allocate one
//! buffer of the exact frame size and return it frozen; decoders read from a
//! borrowed frame and hand out zero-copy slices. [`decode`] dispatches on the
//! header and yields a typed [`Frame`].
//!
//! Frame bytes here exclude the 24-bit length prefix used by stream
//! transports; see [`FrameLengthCodec`](crate::FrameLengthCodec).

use bytes::Bytes;

pub(crate) mod body;
pub mod cancel;
pub mod error;
mod flags;
mod frame_type;
pub mod header;
pub mod metadata_push;
pub mod payload;
pub mod request;
pub mod request_channel;
pub mod request_n;

pub use body::{MAX_METADATA_LENGTH, METADATA_LENGTH_SIZE};
pub use error::{ErrorCode, ErrorFrame};
pub use flags::FrameFlags;
pub use frame_type::FrameType;
pub use header::{HEADER_SIZE, Header};
pub use payload::PayloadFrame;
pub use request::RequestFrame;
pub use request_n::REQUEST_N_SIZE;

use crate::{error::ProtocolViolation, stream::StreamId};

/// A decoded frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// `REQUEST_RESPONSE`, `REQUEST_FNF`, `REQUEST_STREAM` or
    /// `REQUEST_CHANNEL`.
    Request(RequestFrame),
    /// `PAYLOAD`.
    Payload(PayloadFrame),
    /// `REQUEST_N`.
    RequestN {
        /// Stream receiving the credit.
        stream_id: StreamId,
        /// Granted credit, with unbounded promotion applied.
        request_n: u64,
    },
    /// `CANCEL`.
    Cancel {
        /// Stream being cancelled.
        stream_id: StreamId,
    },
    /// `ERROR`.
    Error(ErrorFrame),
    /// `METADATA_PUSH`.
    MetadataPush {
        /// Pushed metadata.
        metadata: Bytes,
    },
    /// Handshake and extension frames whose bodies this crate does not
    /// interpret: `SETUP`, `LEASE`, `KEEPALIVE`, `RESUME`, `RESUME_OK`,
    /// `EXT` and `RESERVED`.
    Opaque {
        /// Decoded header.
        header: Header,
        /// Frame bytes after the header.
        body: Bytes,
    },
}

impl Frame {
    /// Stream the frame belongs to.
    #[must_use]
    pub fn stream_id(&self) -> StreamId {
        match self {
            Self::Request(frame) => frame.stream_id(),
            Self::Payload(frame) => frame.stream_id(),
            Self::RequestN { stream_id, .. } | Self::Cancel { stream_id } => *stream_id,
            Self::Error(frame) => frame.stream_id(),
            Self::MetadataPush { .. } => StreamId::CONNECTION,
            Self::Opaque { header, .. } => header.stream_id(),
        }
    }

    /// Frame type.
    #[must_use]
    pub fn frame_type(&self) -> FrameType {
        match self {
            Self::Request(frame) => frame.frame_type(),
            Self::Payload(_) => FrameType::Payload,
            Self::RequestN { .. } => FrameType::RequestN,
            Self::Cancel { .. } => FrameType::Cancel,
            Self::Error(_) => FrameType::Error,
            Self::MetadataPush { .. } => FrameType::MetadataPush,
            Self::Opaque { header, .. } => header.frame_type(),
        }
    }

    /// Whether the `F` flag is set.
    #[must_use]
    pub fn follows(&self) -> bool {
        match self {
            Self::Request(frame) => frame.follows(),
            Self::Payload(frame) => frame.follows(),
            _ => false,
        }
    }
}

/// Decode one frame.
///
/// Besides the per-type checks, frames are validated against the stream
/// they travel on: connection-level types require stream 0 and stream-level
/// types require a non-zero stream.
///
/// # Errors
///
/// Returns a [`ProtocolViolation`] describing the first malformation found.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use rsocket_core::{Frame, HeapAllocator, StreamId, frame};
///
/// let stream_id = StreamId::new(3).expect("valid id");
/// let bytes = frame::request_n::encode(&HeapAllocator, stream_id, 16).expect("encode");
/// assert_eq!(
///     frame::decode(bytes),
///     Ok(Frame::RequestN { stream_id, request_n: 16 })
/// );
/// ```
pub fn decode(frame: Bytes) -> Result<Frame, ProtocolViolation> {
    let header = header::decode(&frame)?;
    let frame_type = header.frame_type();
    let stream_id = header.stream_id();

    if frame_type.is_connection_level() && !stream_id.is_connection() {
        return Err(ProtocolViolation::ConnectionStreamRequired {
            frame_type,
            stream_id,
        });
    }
    if frame_type.is_stream_level() && stream_id.is_connection() {
        return Err(ProtocolViolation::StreamIdRequired { frame_type });
    }

    let decoded = match frame_type {
        FrameType::RequestResponse
        | FrameType::RequestFnf
        | FrameType::RequestStream
        | FrameType::RequestChannel => Frame::Request(request::decode_body(header, &frame)?),
        FrameType::Payload => Frame::Payload(payload::decode_body(header, &frame)?),
        FrameType::RequestN => Frame::RequestN {
            stream_id,
            request_n: request_n::read_at(&frame, HEADER_SIZE)?,
        },
        FrameType::Cancel => Frame::Cancel { stream_id },
        FrameType::Error => Frame::Error(error::decode(&frame)?),
        FrameType::MetadataPush => Frame::MetadataPush {
            metadata: frame.slice(HEADER_SIZE..),
        },
        FrameType::Reserved
        | FrameType::Setup
        | FrameType::Lease
        | FrameType::Keepalive
        | FrameType::Resume
        | FrameType::ResumeOk
        | FrameType::Ext => Frame::Opaque {
            header,
            body: frame.slice(HEADER_SIZE..),
        },
    };
    Ok(decoded)
}
