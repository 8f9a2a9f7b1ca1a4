#![doc(html_root_url = "https://docs.rs/rsocket-core/latest")]
//! Wire protocol and stream multiplexing core for RSocket 1.0.
//!
//! This crate encodes and decodes RSocket frames, splits oversized payloads
//! into MTU-bounded fragment sequences and stitches them back together, and
//! owns the registry that hands out stream identifiers for one connection.
//! Transports and the reactive execution engine sit outside the crate and
//! talk to it through [`BufferAllocator`], [`FrameHandler`] and plain
//! [`bytes::Bytes`] frames.

pub mod alloc;
pub mod byte_order;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod fragment;
pub mod frame;
pub mod metrics;
pub mod payload;
pub mod request_n;
pub mod stream;

pub use alloc::{BufferAllocator, HeapAllocator};
pub use codec::{FRAME_LENGTH_MASK, FRAME_LENGTH_SIZE, FrameLengthCodec};
pub use config::ConnectionConfig;
pub use connection::{ConnectionSupport, Demultiplexer, Routed};
pub use error::{Error, IllegalArgument, ProtocolViolation, RecoveryPolicy, Result};
pub use fragment::{FirstFrame, FragmentBatch, Fragmenter, Reassembler, Reassembly};
pub use frame::{ErrorCode, Frame, FrameFlags, FrameType, Header};
pub use payload::Payload;
pub use request_n::{UNBOUNDED, from_wire_value, to_wire_value};
pub use stream::{FrameHandler, Role, StreamId, StreamIdSupplier, StreamRegistry};
