//! Test helpers for `rsocket-core`.
//!
//! The crate bundles what most integration tests need: deterministic and
//! generated payloads, a [`RecordingHandler`] that captures every signal a
//! stream receives, a [`CountingAllocator`], helpers that push frames through
//! a [`FrameLengthCodec`](rsocket_core::FrameLengthCodec) over an in-memory
//! duplex stream, and log and metrics capture.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use rsocket_core::{FrameHandler, StreamRegistry};
//! use rsocket_testing::{RecordingHandler, assert_no_active_streams};
//!
//! let registry = StreamRegistry::client();
//! let handler = Arc::new(RecordingHandler::default());
//! let id = registry
//!     .add_and_get_next_stream_id(handler.clone())
//!     .expect("free id");
//! let handler: Arc<dyn FrameHandler> = handler;
//! assert!(registry.remove(id, &handler));
//! assert_no_active_streams(&registry);
//! ```

pub mod allocator;
pub mod codec;
pub mod handler;
pub mod logging;
pub mod payloads;
pub mod recorder;
pub mod support;

pub use allocator::CountingAllocator;
pub use codec::{decode_stream, encode_frames, round_trip_frames};
pub use handler::{RecordingHandler, Signal};
pub use logging::{LoggerHandle, logger};
pub use payloads::{first_frame_strategy, patterned, payload, payload_strategy};
pub use recorder::{capture_metrics, counter_value, gauge_value};
pub use support::{assert_has_stream, assert_no_active_streams, decode_all, route_all};
