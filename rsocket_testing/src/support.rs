//! Assertions and shortcuts over the registry and demultiplexer.

use bytes::Bytes;
use rsocket_core::{Demultiplexer, Frame, Result, Routed, StreamId, StreamRegistry, frame};

/// Assert that `registry` holds no streams.
///
/// # Panics
///
/// Panics listing the ids still registered.
#[track_caller]
pub fn assert_no_active_streams(registry: &StreamRegistry) {
    let active = registry.active_stream_ids();
    assert!(active.is_empty(), "streams still registered: {active:?}");
}

/// Assert that `registry` holds `stream_id`.
///
/// # Panics
///
/// Panics if the id is not registered.
#[track_caller]
pub fn assert_has_stream(registry: &StreamRegistry, stream_id: StreamId) {
    assert!(
        registry.contains(stream_id),
        "stream {stream_id} not registered; active: {:?}",
        registry.active_stream_ids()
    );
}

/// Decode every frame, panicking on the first malformed one.
///
/// # Panics
///
/// Panics if any frame fails to decode.
#[must_use]
pub fn decode_all<I>(frames: I) -> Vec<Frame>
where
    I: IntoIterator<Item = Bytes>,
{
    frames
        .into_iter()
        .map(|bytes| frame::decode(bytes).expect("frame should decode"))
        .collect()
}

/// Route every frame through `demux`, stopping at the first error.
///
/// # Errors
///
/// Returns the first error [`Demultiplexer::route`] reports.
pub fn route_all<I>(demux: &mut Demultiplexer, frames: I) -> Result<Vec<Routed>>
where
    I: IntoIterator<Item = Bytes>,
{
    frames.into_iter().map(|bytes| demux.route(bytes)).collect()
}
