//! `REQUEST_N` frame codec.
//!
//! Body is exactly the 4-byte credit field.

use bytes::{BufMut, Bytes};

use super::{FrameFlags, FrameType, header};
use crate::{
    alloc::BufferAllocator,
    byte_order::{array_at, read_network_u32, write_network_u32},
    error::{IllegalArgument, ProtocolViolation},
    request_n::{MAX_WIRE_REQUEST_N, encode_requested, from_wire_value},
    stream::StreamId,
};

/// Size of a request-N field.
pub const REQUEST_N_SIZE: usize = 4;

/// Encode a `REQUEST_N` frame granting `request_n` more items.
///
/// Demand above the 31-bit wire maximum saturates to it.
///
/// # Errors
///
/// Returns [`IllegalArgument::RequestNNotPositive`] when `request_n < 1`.
///
/// # Examples
///
/// ```
/// use rsocket_core::{HeapAllocator, StreamId, frame::request_n};
///
/// let stream_id = StreamId::new(1).expect("valid id");
/// let frame = request_n::encode(&HeapAllocator, stream_id, i64::MAX).expect("encode");
/// assert_eq!(request_n::decode(&frame), Ok(rsocket_core::UNBOUNDED));
/// ```
pub fn encode<A>(alloc: &A, stream_id: StreamId, request_n: i64) -> Result<Bytes, IllegalArgument>
where
    A: BufferAllocator + ?Sized,
{
    let wire = encode_requested(request_n)?;
    let mut buf = header::encode(
        alloc,
        stream_id,
        FrameType::RequestN,
        FrameFlags::empty(),
        REQUEST_N_SIZE,
    );
    buf.put_slice(&write_network_u32(wire));
    Ok(buf.freeze())
}

/// Decode the credit carried by a `REQUEST_N` frame.
///
/// `frame` is only read; its contents and position are left untouched.
///
/// # Errors
///
/// Fails with [`ProtocolViolation::UnexpectedFrameType`] for other frame
/// types, [`ProtocolViolation::Truncated`] for a short body and
/// [`ProtocolViolation::InvalidRequestN`] for a zero or reserved-bit value.
pub fn decode(frame: &[u8]) -> Result<u64, ProtocolViolation> {
    header::ensure_frame_type(FrameType::RequestN, frame)?;
    read_at(frame, header::HEADER_SIZE)
}

/// Read and validate the credit field at `offset`.
pub(crate) fn read_at(src: &[u8], offset: usize) -> Result<u64, ProtocolViolation> {
    let raw = array_at::<REQUEST_N_SIZE>(src, offset)
        .map(read_network_u32)
        .ok_or(ProtocolViolation::Truncated {
            needed: offset + REQUEST_N_SIZE,
            available: src.len(),
        })?;
    if raw == 0 || raw > MAX_WIRE_REQUEST_N {
        return Err(ProtocolViolation::InvalidRequestN { value: raw });
    }
    Ok(from_wire_value(raw))
}
