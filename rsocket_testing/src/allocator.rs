//! Allocator that counts the buffers it hands out.

use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::BytesMut;
use rsocket_core::BufferAllocator;

/// Heap allocator recording allocation count and requested capacity.
///
/// Encoders request exactly one buffer per frame, sized to the finished
/// frame, so tests can assert on both figures.
#[derive(Debug, Default)]
pub struct CountingAllocator {
    allocations: AtomicUsize,
    bytes: AtomicUsize,
}

impl CountingAllocator {
    /// Number of buffers handed out.
    #[must_use]
    pub fn allocations(&self) -> usize { self.allocations.load(Ordering::SeqCst) }

    /// Sum of requested capacities.
    #[must_use]
    pub fn bytes(&self) -> usize { self.bytes.load(Ordering::SeqCst) }
}

impl BufferAllocator for CountingAllocator {
    fn allocate(&self, capacity: usize) -> BytesMut {
        self.allocations.fetch_add(1, Ordering::SeqCst);
        self.bytes.fetch_add(capacity, Ordering::SeqCst);
        BytesMut::with_capacity(capacity)
    }
}
