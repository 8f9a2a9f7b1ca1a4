//! `METADATA_PUSH` frame codec.
//!
//! Always stream 0 with `M` set. The body is the raw metadata; unlike every
//! other frame it carries no metadata length prefix.

use bytes::{BufMut, Bytes};

use super::{FrameFlags, FrameType, header};
use crate::{alloc::BufferAllocator, error::ProtocolViolation, stream::StreamId};

/// Encode a `METADATA_PUSH` frame.
#[must_use]
pub fn encode<A>(alloc: &A, metadata: Bytes) -> Bytes
where
    A: BufferAllocator + ?Sized,
{
    let mut buf = header::encode(
        alloc,
        StreamId::CONNECTION,
        FrameType::MetadataPush,
        FrameFlags::METADATA,
        metadata.len(),
    );
    buf.put_slice(&metadata);
    buf.freeze()
}

/// Return the metadata carried by a `METADATA_PUSH` frame without copying.
///
/// # Errors
///
/// Fails if the header is invalid or names another frame type.
pub fn decode(frame: &Bytes) -> Result<Bytes, ProtocolViolation> {
    header::ensure_frame_type(FrameType::MetadataPush, frame)?;
    Ok(frame.slice(header::HEADER_SIZE..))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::HeapAllocator;

    #[test]
    fn metadata_push_has_no_length_prefix() {
        let frame = encode(&HeapAllocator, Bytes::from_static(b"routing"));
        let header = header::decode(&frame).expect("header");
        assert_eq!(header.stream_id(), StreamId::CONNECTION);
        assert!(header.has_metadata());
        assert_eq!(frame.len(), header::HEADER_SIZE + 7);
        assert_eq!(decode(&frame).as_deref(), Ok(&b"routing"[..]));
    }
}
