//! `PAYLOAD` frame codec.
//!
//! PAYLOAD frames carry `N` (a next item), `C` (stream complete) or both. A
//! frame with neither is malformed. Follow fragments are PAYLOAD frames too.

use bytes::Bytes;

use super::{FrameFlags, FrameType, body, header};
use crate::{
    alloc::BufferAllocator,
    error::{IllegalArgument, ProtocolViolation},
    payload::Payload,
    stream::StreamId,
};

/// Decoded `PAYLOAD` frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayloadFrame {
    stream_id: StreamId,
    follows: bool,
    complete: bool,
    next: bool,
    payload: Payload,
}

impl PayloadFrame {
    /// Stream carrying the payload.
    #[must_use]
    pub const fn stream_id(&self) -> StreamId { self.stream_id }

    /// `F` flag.
    #[must_use]
    pub const fn follows(&self) -> bool { self.follows }

    /// `C` flag.
    #[must_use]
    pub const fn is_complete(&self) -> bool { self.complete }

    /// `N` flag.
    #[must_use]
    pub const fn is_next(&self) -> bool { self.next }

    /// Frame payload; empty for a bare COMPLETE.
    #[must_use]
    pub fn payload(&self) -> &Payload { &self.payload }

    /// Consume the frame, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> Payload { self.payload }

    pub(crate) fn into_reassembled(self, payload: Payload, complete: bool) -> Self {
        Self {
            follows: false,
            complete,
            payload,
            ..self
        }
    }
}

/// Encode a `PAYLOAD` frame with explicit flags.
///
/// # Errors
///
/// Returns [`IllegalArgument::MissingPayloadFlags`] when neither `next` nor
/// `complete` is set, or [`IllegalArgument::MetadataTooLarge`].
pub fn encode<A>(
    alloc: &A,
    stream_id: StreamId,
    follows: bool,
    complete: bool,
    next: bool,
    metadata: Option<Bytes>,
    data: Bytes,
) -> Result<Bytes, IllegalArgument>
where
    A: BufferAllocator + ?Sized,
{
    if !next && !complete {
        return Err(IllegalArgument::MissingPayloadFlags);
    }
    body::check_metadata(metadata.as_ref())?;
    let mut flags = FrameFlags::empty();
    flags.set(FrameFlags::METADATA, metadata.is_some());
    flags.set(FrameFlags::FOLLOWS, follows);
    flags.set(FrameFlags::COMPLETE, complete);
    flags.set(FrameFlags::NEXT, next);
    let mut buf = header::encode(
        alloc,
        stream_id,
        FrameType::Payload,
        flags,
        body::encoded_len(metadata.as_ref(), &data),
    );
    body::put(&mut buf, metadata.as_ref(), &data);
    Ok(buf.freeze())
}

/// Encode a `PAYLOAD` frame delivering one item.
///
/// # Errors
///
/// Returns [`IllegalArgument::MetadataTooLarge`].
pub fn encode_next<A>(alloc: &A, stream_id: StreamId, payload: Payload) -> Result<Bytes, IllegalArgument>
where
    A: BufferAllocator + ?Sized,
{
    let (data, metadata) = payload.into_parts();
    encode(alloc, stream_id, false, false, true, metadata, data)
}

/// Encode a `PAYLOAD` frame delivering the final item and completing.
///
/// # Errors
///
/// Returns [`IllegalArgument::MetadataTooLarge`].
pub fn encode_next_complete<A>(
    alloc: &A,
    stream_id: StreamId,
    payload: Payload,
) -> Result<Bytes, IllegalArgument>
where
    A: BufferAllocator + ?Sized,
{
    let (data, metadata) = payload.into_parts();
    encode(alloc, stream_id, false, true, true, metadata, data)
}

/// Encode a bare COMPLETE signal.
#[must_use]
pub fn encode_complete<A>(alloc: &A, stream_id: StreamId) -> Bytes
where
    A: BufferAllocator + ?Sized,
{
    header::encode(
        alloc,
        stream_id,
        FrameType::Payload,
        FrameFlags::COMPLETE,
        0,
    )
    .freeze()
}

/// Decode a `PAYLOAD` frame.
///
/// # Errors
///
/// Fails on another frame type, a frame with neither `N` nor `C`, or a
/// malformed body.
pub fn decode(frame: &Bytes) -> Result<PayloadFrame, ProtocolViolation> {
    let header = header::ensure_frame_type(FrameType::Payload, frame)?;
    decode_body(header, frame)
}

pub(crate) fn decode_body(
    header: header::Header,
    frame: &Bytes,
) -> Result<PayloadFrame, ProtocolViolation> {
    if !header.is_next() && !header.is_complete() {
        return Err(ProtocolViolation::MissingPayloadFlags {
            stream_id: header.stream_id(),
        });
    }
    let (metadata, data) = body::split(frame.slice(header::HEADER_SIZE..), header.has_metadata())?;
    Ok(PayloadFrame {
        stream_id: header.stream_id(),
        follows: header.follows(),
        complete: header.is_complete(),
        next: header.is_next(),
        payload: Payload::new(data, metadata),
    })
}
