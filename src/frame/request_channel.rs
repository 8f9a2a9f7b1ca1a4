//! `REQUEST_CHANNEL` frame codec.
//!
//! Body layout is `[initialRequestN][metadata length + metadata if M][data]`.
//! Encoders take ownership of the metadata and data they are given; the
//! bytes are copied into the new frame and the caller's handles are dropped.

use bytes::Bytes;

use super::{FrameType, header, request};
use crate::{
    alloc::BufferAllocator,
    error::{IllegalArgument, ProtocolViolation},
    payload::Payload,
    request_n::encode_requested,
    stream::StreamId,
};

pub use super::request::RequestFrame;

/// Encode a `REQUEST_CHANNEL` frame.
///
/// # Errors
///
/// Returns [`IllegalArgument::RequestNNotPositive`] when
/// `initial_request_n < 1` and [`IllegalArgument::MetadataTooLarge`] when the
/// metadata exceeds the 24-bit length field.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use rsocket_core::{HeapAllocator, StreamId, frame::request_channel};
///
/// let stream_id = StreamId::new(5).expect("valid id");
/// let frame = request_channel::encode(
///     &HeapAllocator,
///     stream_id,
///     false,
///     false,
///     3,
///     Some(Bytes::from_static(b"testMetadata")),
///     Bytes::from_static(b"testData"),
/// )
/// .expect("encode");
///
/// let decoded = request_channel::decode(&frame).expect("decode");
/// assert_eq!(decoded.initial_request_n(), Some(3));
/// assert_eq!(&decoded.payload().data()[..], b"testData");
/// ```
pub fn encode<A>(
    alloc: &A,
    stream_id: StreamId,
    fragment_follows: bool,
    complete: bool,
    initial_request_n: i64,
    metadata: Option<Bytes>,
    data: Bytes,
) -> Result<Bytes, IllegalArgument>
where
    A: BufferAllocator + ?Sized,
{
    let wire = encode_requested(initial_request_n)?;
    request::encode_raw(
        alloc,
        stream_id,
        FrameType::RequestChannel,
        fragment_follows,
        complete,
        Some(wire),
        metadata,
        data,
    )
}

/// Encode an unfragmented `REQUEST_CHANNEL` frame from a payload, consuming it.
///
/// The caller has already decided the payload fits in one frame.
///
/// # Errors
///
/// As [`encode`].
pub fn encode_releasing_payload<A>(
    alloc: &A,
    stream_id: StreamId,
    complete: bool,
    initial_request_n: i64,
    payload: Payload,
) -> Result<Bytes, IllegalArgument>
where
    A: BufferAllocator + ?Sized,
{
    let (data, metadata) = payload.into_parts();
    encode(
        alloc,
        stream_id,
        false,
        complete,
        initial_request_n,
        metadata,
        data,
    )
}

/// Decode a `REQUEST_CHANNEL` frame.
///
/// # Errors
///
/// Fails with [`ProtocolViolation::UnexpectedFrameType`] for other frame
/// types, [`ProtocolViolation::InvalidRequestN`] for a zero or reserved-bit
/// credit, and [`ProtocolViolation::Truncated`] for a short body.
pub fn decode(frame: &Bytes) -> Result<RequestFrame, ProtocolViolation> {
    let header = header::ensure_frame_type(FrameType::RequestChannel, frame)?;
    request::decode_body(header, frame)
}
