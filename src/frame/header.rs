//! Frame header codec.
//!
//! Every frame starts with six bytes: a 31-bit stream id behind a reserved
//! zero bit, then a 16-bit word holding the 6-bit frame type and 10 flag bits.
//! Decoding is a pure read: the input slice is never advanced or retained.

use bytes::{BufMut, BytesMut};

use super::{FrameFlags, FrameType};
use crate::{
    alloc::BufferAllocator,
    byte_order::{array_at, read_network_u16, read_network_u32, write_network_u16, write_network_u32},
    error::ProtocolViolation,
    stream::StreamId,
};

/// Encoded header size in bytes.
pub const HEADER_SIZE: usize = 6;

const RESERVED_STREAM_BIT: u32 = 0x8000_0000;
const FRAME_TYPE_SHIFT: u16 = 10;

/// Decoded frame header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    stream_id: StreamId,
    frame_type: FrameType,
    flags: FrameFlags,
}

impl Header {
    /// Assemble a header from its parts.
    #[must_use]
    pub const fn new(stream_id: StreamId, frame_type: FrameType, flags: FrameFlags) -> Self {
        Self {
            stream_id,
            frame_type,
            flags,
        }
    }

    /// Stream the frame belongs to; `0` is the connection.
    #[must_use]
    pub const fn stream_id(&self) -> StreamId { self.stream_id }

    /// Frame type.
    #[must_use]
    pub const fn frame_type(&self) -> FrameType { self.frame_type }

    /// Flag bits.
    #[must_use]
    pub const fn flags(&self) -> FrameFlags { self.flags }

    /// `M` flag.
    #[must_use]
    pub const fn has_metadata(&self) -> bool { self.flags.contains(FrameFlags::METADATA) }

    /// `F` flag.
    #[must_use]
    pub const fn follows(&self) -> bool { self.flags.contains(FrameFlags::FOLLOWS) }

    /// `C` flag.
    #[must_use]
    pub const fn is_complete(&self) -> bool { self.flags.contains(FrameFlags::COMPLETE) }

    /// `N` flag.
    #[must_use]
    pub const fn is_next(&self) -> bool { self.flags.contains(FrameFlags::NEXT) }

    pub(crate) fn write(&self, dst: &mut BytesMut) {
        let type_and_flags =
            (u16::from(self.frame_type.code()) << FRAME_TYPE_SHIFT) | self.flags.bits();
        dst.put_slice(&write_network_u32(self.stream_id.get()));
        dst.put_slice(&write_network_u16(type_and_flags));
    }
}

/// Allocate a frame buffer and write its header.
///
/// The buffer is sized for the header plus `body_len` more bytes so the
/// caller can append the body without reallocating.
///
/// # Examples
///
/// ```
/// use rsocket_core::{FrameFlags, FrameType, HeapAllocator, StreamId, frame::header};
///
/// let stream_id = StreamId::new(5).expect("valid id");
/// let buf = header::encode(
///     &HeapAllocator,
///     stream_id,
///     FrameType::Cancel,
///     FrameFlags::empty(),
///     0,
/// );
/// assert_eq!(&buf[..], &[0, 0, 0, 5, 0x24, 0x00]);
/// ```
#[must_use]
pub fn encode<A>(
    alloc: &A,
    stream_id: StreamId,
    frame_type: FrameType,
    flags: FrameFlags,
    body_len: usize,
) -> BytesMut
where
    A: BufferAllocator + ?Sized,
{
    let mut buf = alloc.allocate(HEADER_SIZE + body_len);
    Header::new(stream_id, frame_type, flags).write(&mut buf);
    buf
}

/// Decode the header at the start of `src`.
///
/// # Errors
///
/// Returns a [`ProtocolViolation`] when fewer than six bytes are present, the
/// reserved stream-id bit is set, or the frame type code is unassigned.
pub fn decode(src: &[u8]) -> Result<Header, ProtocolViolation> {
    let (Some(id_bytes), Some(type_bytes)) = (array_at::<4>(src, 0), array_at::<2>(src, 4)) else {
        return Err(ProtocolViolation::Truncated {
            needed: HEADER_SIZE,
            available: src.len(),
        });
    };

    let raw_stream_id = read_network_u32(id_bytes);
    if raw_stream_id & RESERVED_STREAM_BIT != 0 {
        return Err(ProtocolViolation::ReservedBitSet);
    }

    let [type_byte, _] = type_bytes;
    let frame_type = FrameType::from_code(type_byte >> 2)?;
    let flags = FrameFlags::from_bits_truncate(read_network_u16(type_bytes));

    Ok(Header::new(
        StreamId::new_unchecked(raw_stream_id),
        frame_type,
        flags,
    ))
}

/// Decode the header and require a specific frame type.
///
/// # Errors
///
/// Fails as [`decode`] does, or with [`ProtocolViolation::UnexpectedFrameType`]
/// when the header names a different type.
pub fn ensure_frame_type(expected: FrameType, src: &[u8]) -> Result<Header, ProtocolViolation> {
    let header = decode(src)?;
    if header.frame_type() == expected {
        Ok(header)
    } else {
        Err(ProtocolViolation::UnexpectedFrameType {
            expected,
            found: header.frame_type(),
        })
    }
}
