//! Stream identity and lifecycle.
//!
//! [`StreamIdSupplier`] hands out role-specific ids, [`StreamRegistry`] maps
//! active ids to their [`FrameHandler`] and keeps the two consistent under
//! concurrent allocation and removal.

mod handler;
mod id;
mod registry;

pub use handler::FrameHandler;
pub use id::{Role, StreamId, StreamIdSupplier};
pub use registry::StreamRegistry;
