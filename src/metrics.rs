//! Metric helpers for `rsocket-core`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! every helper compiles to a no-op, so call sites need no `cfg` of their own.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the counter tracking encoded and decoded frames.
pub const FRAMES_PROCESSED: &str = "rsocket_frames_processed_total";
/// Name of the counter tracking frames produced or consumed as fragments.
pub const FRAGMENTS: &str = "rsocket_fragments_total";
/// Name of the gauge tracking registered streams.
pub const STREAMS_ACTIVE: &str = "rsocket_streams_active";
/// Name of the counter tracking errors, labelled by kind.
pub const ERRORS_TOTAL: &str = "rsocket_errors_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Frames received from the peer.
    Inbound,
    /// Frames sent to the peer.
    Outbound,
}

impl Direction {
    /// Label value for this direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Record a processed frame for the given direction.
pub fn inc_frames(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_PROCESSED, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record `count` fragments for the given direction.
pub fn add_fragments(direction: Direction, count: u64) {
    #[cfg(feature = "metrics")]
    counter!(FRAGMENTS, "direction" => direction.as_str()).increment(count);
    #[cfg(not(feature = "metrics"))]
    let _ = (direction, count);
}

/// Publish the number of registered streams.
pub fn set_active_streams(count: usize) {
    #[cfg(feature = "metrics")]
    {
        #[expect(
            clippy::cast_precision_loss,
            reason = "gauge values are f64; stream counts stay far below 2^52"
        )]
        gauge!(STREAMS_ACTIVE).set(count as f64);
    }
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}

/// Record an error occurrence of the given kind.
///
/// `kind` is normally [`Error::error_type`](crate::Error::error_type).
pub fn inc_errors(kind: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL, "kind" => kind).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}
