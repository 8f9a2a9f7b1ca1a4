//! `CANCEL` frame codec. Header only.

use bytes::Bytes;

use super::{FrameFlags, FrameType, header};
use crate::{alloc::BufferAllocator, stream::StreamId};

/// Encode a `CANCEL` frame for `stream_id`.
#[must_use]
pub fn encode<A>(alloc: &A, stream_id: StreamId) -> Bytes
where
    A: BufferAllocator + ?Sized,
{
    header::encode(alloc, stream_id, FrameType::Cancel, FrameFlags::empty(), 0).freeze()
}
