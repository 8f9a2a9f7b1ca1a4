//! Callback seam between the demultiplexer and per-stream logic.

use crate::{error::Error, payload::Payload};

/// Receives the inbound signals of one stream.
///
/// Handlers are registered in a [`StreamRegistry`](super::StreamRegistry) as
/// `Arc<dyn FrameHandler>`; the registry identifies a handler by its `Arc`
/// allocation, not by value. Callbacks are never invoked while the registry
/// lock is held, so a handler may call back into the registry, for instance
/// to remove itself.
pub trait FrameHandler: Send + Sync {
    /// A complete (reassembled) payload arrived. `complete` reports whether
    /// the same frame also completed the stream.
    fn handle_next(&self, payload: Payload, complete: bool);

    /// The peer completed the stream without a further payload.
    fn handle_complete(&self);

    /// The peer granted `request_n` more items.
    /// [`UNBOUNDED`](crate::UNBOUNDED) lifts the limit.
    fn handle_request_n(&self, request_n: u64);

    /// The peer cancelled the stream.
    fn handle_cancel(&self);

    /// The stream failed, either by a peer ERROR frame, a local limit or the
    /// connection terminating.
    fn handle_error(&self, error: &Error);
}
