//! Payload fragmentation and reassembly.
//!
//! Outbound payloads larger than the MTU are split by [`Fragmenter`] into a
//! first fragment of the real frame type followed by `PAYLOAD` continuation
//! frames. Inbound sequences are stitched back together per stream by
//! [`Reassembler`], bounded by a maximum payload size.

pub mod fragmenter;
pub mod reassembler;

pub use fragmenter::{
    FRAME_OFFSET,
    FirstFrame,
    FragmentBatch,
    Fragmenter,
    MIN_MTU,
    encode_first_fragment,
    encode_follows_fragment,
};
pub use reassembler::{Reassembler, Reassembly};
