//! Buffer allocation seam supplied by the transport layer.
//!
//! Every encoder asks a [`BufferAllocator`] for exactly one buffer sized to
//! the finished frame, writes into it, and freezes it into [`bytes::Bytes`].
//! Ownership of the frozen frame moves to the caller; the codecs never keep a
//! reference to a buffer past the call.

use bytes::BytesMut;

/// Source of writable frame buffers.
///
/// Transports that pool memory implement this trait; everything else can use
/// [`HeapAllocator`].
pub trait BufferAllocator: Send + Sync {
    /// Return an empty buffer able to hold at least `capacity` bytes.
    fn allocate(&self, capacity: usize) -> BytesMut;
}

/// Allocator backed by the global heap.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapAllocator;

impl BufferAllocator for HeapAllocator {
    fn allocate(&self, capacity: usize) -> BytesMut { BytesMut::with_capacity(capacity) }
}

impl<A: BufferAllocator + ?Sized> BufferAllocator for &A {
    fn allocate(&self, capacity: usize) -> BytesMut { (**self).allocate(capacity) }
}

impl<A: BufferAllocator + ?Sized> BufferAllocator for std::sync::Arc<A> {
    fn allocate(&self, capacity: usize) -> BytesMut { (**self).allocate(capacity) }
}
