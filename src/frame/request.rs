//! Stream-opening request frames.
//!
//! `REQUEST_RESPONSE` and `REQUEST_FNF` bodies are `[metadata][data]`;
//! `REQUEST_STREAM` and `REQUEST_CHANNEL` prefix them with a 4-byte initial
//! request-N. All four share [`RequestFrame`] once decoded.

use bytes::{BufMut, Bytes};

use super::{FrameFlags, FrameType, body, header, request_n};
use crate::{
    alloc::BufferAllocator,
    byte_order::write_network_u32,
    error::{IllegalArgument, ProtocolViolation},
    payload::Payload,
    request_n::encode_requested,
    stream::StreamId,
};

/// Decoded request frame of any of the four request types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestFrame {
    stream_id: StreamId,
    frame_type: FrameType,
    follows: bool,
    complete: bool,
    initial_request_n: Option<u64>,
    payload: Payload,
}

impl RequestFrame {
    /// Stream opened by this request.
    #[must_use]
    pub const fn stream_id(&self) -> StreamId { self.stream_id }

    /// One of the four request frame types.
    #[must_use]
    pub const fn frame_type(&self) -> FrameType { self.frame_type }

    /// `F` flag: this is the first fragment of a larger request.
    #[must_use]
    pub const fn follows(&self) -> bool { self.follows }

    /// `C` flag. Only meaningful for `REQUEST_CHANNEL`.
    #[must_use]
    pub const fn is_complete(&self) -> bool { self.complete }

    /// Initial credit for stream and channel requests, with
    /// [`UNBOUNDED`](crate::UNBOUNDED) promotion applied.
    #[must_use]
    pub const fn initial_request_n(&self) -> Option<u64> { self.initial_request_n }

    /// Request payload.
    #[must_use]
    pub fn payload(&self) -> &Payload { &self.payload }

    /// Consume the frame, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> Payload { self.payload }

    /// Rebuild this frame around a reassembled payload, clearing `F`.
    pub(crate) fn into_reassembled(self, payload: Payload, complete: bool) -> Self {
        Self {
            follows: false,
            complete,
            payload,
            ..self
        }
    }
}

/// Encode a request frame of `frame_type`.
///
/// Shared by every request encoder; `initial_request_n` is already in wire
/// form and must be present exactly when the type carries one.
#[expect(
    clippy::too_many_arguments,
    reason = "mirrors the wire fields of a request frame"
)]
pub(crate) fn encode_raw<A>(
    alloc: &A,
    stream_id: StreamId,
    frame_type: FrameType,
    follows: bool,
    complete: bool,
    initial_request_n: Option<u32>,
    metadata: Option<Bytes>,
    data: Bytes,
) -> Result<Bytes, IllegalArgument>
where
    A: BufferAllocator + ?Sized,
{
    body::check_metadata(metadata.as_ref())?;
    let mut flags = FrameFlags::empty();
    flags.set(FrameFlags::METADATA, metadata.is_some());
    flags.set(FrameFlags::FOLLOWS, follows);
    flags.set(FrameFlags::COMPLETE, complete);
    let body_len = initial_request_n.map_or(0, |_| request_n::REQUEST_N_SIZE)
        + body::encoded_len(metadata.as_ref(), &data);

    let mut buf = header::encode(alloc, stream_id, frame_type, flags, body_len);
    if let Some(n) = initial_request_n {
        buf.put_slice(&write_network_u32(n));
    }
    body::put(&mut buf, metadata.as_ref(), &data);
    Ok(buf.freeze())
}

/// Encode a `REQUEST_RESPONSE` frame.
///
/// # Errors
///
/// Returns [`IllegalArgument::MetadataTooLarge`] when metadata exceeds the
/// 24-bit length field.
pub fn encode_request_response<A>(
    alloc: &A,
    stream_id: StreamId,
    follows: bool,
    metadata: Option<Bytes>,
    data: Bytes,
) -> Result<Bytes, IllegalArgument>
where
    A: BufferAllocator + ?Sized,
{
    encode_raw(
        alloc,
        stream_id,
        FrameType::RequestResponse,
        follows,
        false,
        None,
        metadata,
        data,
    )
}

/// Encode a `REQUEST_FNF` frame.
///
/// # Errors
///
/// Returns [`IllegalArgument::MetadataTooLarge`] when metadata exceeds the
/// 24-bit length field.
pub fn encode_request_fnf<A>(
    alloc: &A,
    stream_id: StreamId,
    follows: bool,
    metadata: Option<Bytes>,
    data: Bytes,
) -> Result<Bytes, IllegalArgument>
where
    A: BufferAllocator + ?Sized,
{
    encode_raw(
        alloc,
        stream_id,
        FrameType::RequestFnf,
        follows,
        false,
        None,
        metadata,
        data,
    )
}

/// Encode a `REQUEST_STREAM` frame.
///
/// # Errors
///
/// Returns [`IllegalArgument::RequestNNotPositive`] when
/// `initial_request_n < 1`, or [`IllegalArgument::MetadataTooLarge`].
pub fn encode_request_stream<A>(
    alloc: &A,
    stream_id: StreamId,
    follows: bool,
    initial_request_n: i64,
    metadata: Option<Bytes>,
    data: Bytes,
) -> Result<Bytes, IllegalArgument>
where
    A: BufferAllocator + ?Sized,
{
    let wire = encode_requested(initial_request_n)?;
    encode_raw(
        alloc,
        stream_id,
        FrameType::RequestStream,
        follows,
        false,
        Some(wire),
        metadata,
        data,
    )
}

/// Decode any of the four request frame types.
///
/// Data and metadata are zero-copy slices of `frame`.
///
/// # Errors
///
/// Fails with [`ProtocolViolation::UnexpectedFrameType`] when the header is
/// not a request type, or on a malformed body.
pub fn decode(frame: &Bytes) -> Result<RequestFrame, ProtocolViolation> {
    let header = header::decode(frame)?;
    if !header.frame_type().is_request() {
        return Err(ProtocolViolation::UnexpectedFrameType {
            expected: FrameType::RequestResponse,
            found: header.frame_type(),
        });
    }
    decode_body(header, frame)
}

pub(crate) fn decode_body(
    header: header::Header,
    frame: &Bytes,
) -> Result<RequestFrame, ProtocolViolation> {
    let frame_type = header.frame_type();
    let mut offset = header::HEADER_SIZE;
    let initial_request_n = if frame_type.has_initial_request_n() {
        let n = request_n::read_at(frame, offset)?;
        offset += request_n::REQUEST_N_SIZE;
        Some(n)
    } else {
        None
    };
    let (metadata, data) = body::split(frame.slice(offset..), header.has_metadata())?;
    Ok(RequestFrame {
        stream_id: header.stream_id(),
        frame_type,
        follows: header.follows(),
        complete: frame_type == FrameType::RequestChannel && header.is_complete(),
        initial_request_n,
        payload: Payload::new(data, metadata),
    })
}
