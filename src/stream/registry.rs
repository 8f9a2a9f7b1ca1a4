//! Registry of active streams for one connection.
//!
//! A single mutex guards the id supplier, the stream map and the terminated
//! marker, so finding a free id and registering it are one critical section.
//! Handler callbacks always run after the lock is released.

use std::{collections::HashMap, sync::Arc};
#[cfg(not(loom))]
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(loom)]
use loom::sync::{Mutex, MutexGuard};
#[cfg(loom)]
use std::sync::PoisonError;

use super::{FrameHandler, Role, StreamId, StreamIdSupplier};
use crate::{
    error::{Error, Result},
    metrics,
};

struct Inner {
    supplier: StreamIdSupplier,
    streams: HashMap<StreamId, Arc<dyn FrameHandler>>,
    terminated: Option<String>,
}

impl Inner {
    fn closed(&self) -> Option<Error> {
        self.terminated.as_ref().map(|reason| Error::ConnectionClosed {
            reason: reason.clone(),
        })
    }

    fn next_free(&mut self) -> Result<StreamId> {
        let Self {
            supplier, streams, ..
        } = self;
        supplier.next_stream_id(|id| streams.contains_key(&id))
    }
}

/// Map from stream id to the handler owning that stream.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use rsocket_core::{Error, FrameHandler, Payload, StreamRegistry};
///
/// struct Noop;
///
/// impl FrameHandler for Noop {
///     fn handle_next(&self, _: Payload, _: bool) {}
///     fn handle_complete(&self) {}
///     fn handle_request_n(&self, _: u64) {}
///     fn handle_cancel(&self) {}
///     fn handle_error(&self, _: &Error) {}
/// }
///
/// let registry = StreamRegistry::client();
/// let handler: Arc<dyn FrameHandler> = Arc::new(Noop);
/// let id = registry
///     .add_and_get_next_stream_id(Arc::clone(&handler))
///     .expect("free id");
/// assert_eq!(id.get(), 1);
/// assert!(registry.remove(id, &handler));
/// assert!(registry.is_empty());
/// ```
pub struct StreamRegistry {
    inner: Mutex<Inner>,
}

impl StreamRegistry {
    /// Registry allocating ids from `supplier`.
    #[must_use]
    pub fn new(supplier: StreamIdSupplier) -> Self {
        Self {
            inner: Mutex::new(Inner {
                supplier,
                streams: HashMap::new(),
                terminated: None,
            }),
        }
    }

    /// Registry allocating ids for `role`.
    #[must_use]
    pub fn for_role(role: Role) -> Self { Self::new(StreamIdSupplier::new(role)) }

    /// Registry allocating odd ids.
    #[must_use]
    pub fn client() -> Self { Self::for_role(Role::Client) }

    /// Registry allocating even ids.
    #[must_use]
    pub fn server() -> Self { Self::for_role(Role::Server) }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the next free id without registering it.
    ///
    /// A later [`add`](Self::add) is not guaranteed to find the id still
    /// free; use [`add_and_get_next_stream_id`](Self::add_and_get_next_stream_id)
    /// to allocate and register atomically.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] after [`terminate`](Self::terminate), or
    /// [`Error::RegistryExhausted`].
    pub fn next_stream_id(&self) -> Result<StreamId> {
        let mut inner = self.lock();
        if let Some(err) = inner.closed() {
            return Err(err);
        }
        inner.next_free()
    }

    /// Allocate a free id and register `handler` under it.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] after [`terminate`](Self::terminate), or
    /// [`Error::RegistryExhausted`]. On error nothing stays registered.
    pub fn add_and_get_next_stream_id(&self, handler: Arc<dyn FrameHandler>) -> Result<StreamId> {
        let mut inner = self.lock();
        let id = inner.next_free()?;
        inner.streams.insert(id, handler);
        if let Some(err) = inner.closed() {
            inner.streams.remove(&id);
            tracing::debug!(stream_id = %id, "registration rolled back on closed connection");
            return Err(err);
        }
        let active = inner.streams.len();
        drop(inner);

        metrics::set_active_streams(active);
        tracing::trace!(stream_id = %id, active, "stream registered");
        Ok(id)
    }

    /// Register `handler` under a peer-chosen `stream_id`.
    ///
    /// Returns `false`, leaving the registry unchanged, if the id is taken or
    /// the registry was terminated.
    pub fn add(&self, stream_id: StreamId, handler: Arc<dyn FrameHandler>) -> bool {
        let mut inner = self.lock();
        if inner.terminated.is_some() || inner.streams.contains_key(&stream_id) {
            return false;
        }
        inner.streams.insert(stream_id, handler);
        let active = inner.streams.len();
        drop(inner);

        metrics::set_active_streams(active);
        tracing::trace!(%stream_id, active, "stream registered");
        true
    }

    /// Handler registered for `stream_id`.
    #[must_use]
    pub fn get(&self, stream_id: StreamId) -> Option<Arc<dyn FrameHandler>> {
        self.lock().streams.get(&stream_id).cloned()
    }

    /// Remove `stream_id` if it is still owned by `handler`.
    ///
    /// Ownership is `Arc` identity; an equal but distinct handler does not
    /// match. Returns whether an entry was removed.
    pub fn remove(&self, stream_id: StreamId, handler: &Arc<dyn FrameHandler>) -> bool {
        let mut inner = self.lock();
        let owned = inner
            .streams
            .get(&stream_id)
            .is_some_and(|current| std::ptr::addr_eq(Arc::as_ptr(current), Arc::as_ptr(handler)));
        if !owned {
            return false;
        }
        inner.streams.remove(&stream_id);
        let active = inner.streams.len();
        drop(inner);

        metrics::set_active_streams(active);
        tracing::trace!(%stream_id, active, "stream removed");
        true
    }

    /// Whether `stream_id` is registered.
    #[must_use]
    pub fn contains(&self, stream_id: StreamId) -> bool { self.lock().streams.contains_key(&stream_id) }

    /// Number of registered streams.
    #[must_use]
    pub fn len(&self) -> usize { self.lock().streams.len() }

    /// Whether no stream is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Ids of all registered streams, sorted.
    #[must_use]
    pub fn active_stream_ids(&self) -> Vec<StreamId> {
        let mut ids: Vec<StreamId> = self.lock().streams.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Role whose ids this registry allocates.
    #[must_use]
    pub fn role(&self) -> Role { self.lock().supplier.role() }

    /// Whether `stream_id` is at or below the last id this registry handed
    /// out.
    #[must_use]
    pub fn is_before_or_current(&self, stream_id: StreamId) -> bool {
        self.lock().supplier.is_before_or_current(stream_id)
    }

    /// Whether [`terminate`](Self::terminate) has run.
    #[must_use]
    pub fn is_terminated(&self) -> bool { self.lock().terminated.is_some() }

    /// Fail every registered stream with `error` and refuse further
    /// allocations.
    ///
    /// Handlers are drained under the lock and notified after it is released.
    /// Only the first call records its reason; later calls still drain
    /// anything registered since. Returns the number of handlers notified.
    pub fn terminate(&self, error: &Error) -> usize {
        let mut inner = self.lock();
        if inner.terminated.is_none() {
            inner.terminated = Some(error.to_string());
        }
        let drained: Vec<(StreamId, Arc<dyn FrameHandler>)> = inner.streams.drain().collect();
        drop(inner);

        metrics::set_active_streams(0);
        tracing::debug!(streams = drained.len(), %error, "stream registry terminated");
        for (_, handler) in &drained {
            handler.handle_error(error);
        }
        drained.len()
    }
}

impl Default for StreamRegistry {
    fn default() -> Self { Self::client() }
}

impl std::fmt::Debug for StreamRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("StreamRegistry")
            .field("supplier", &inner.supplier)
            .field("active", &inner.streams.len())
            .field("terminated", &inner.terminated)
            .finish()
    }
}
