//! Per-connection wiring of the codecs, fragmentation and stream registry.
//!
//! [`ConnectionSupport`] owns the pieces shared by both directions of one
//! connection: the validated [`ConnectionConfig`], the buffer allocator, the
//! outbound [`Fragmenter`] and the [`StreamRegistry`]. The receive path takes
//! a [`Demultiplexer`] from it, which decodes each inbound frame, feeds it
//! through reassembly and hands the result to the owning [`FrameHandler`].
//!
//! Neither type touches a socket. Transports move `Bytes` in and out, for
//! instance through a [`FrameLengthCodec`](crate::FrameLengthCodec).

use std::sync::Arc;

use bytes::Bytes;

use crate::{
    alloc::{BufferAllocator, HeapAllocator},
    config::ConnectionConfig,
    error::{Error, IllegalArgument, ProtocolViolation, Result},
    fragment::{FirstFrame, FragmentBatch, Fragmenter, Reassembler, Reassembly},
    frame::{self, Frame},
    metrics::{self, Direction},
    payload::Payload,
    stream::{FrameHandler, StreamId, StreamRegistry},
};

/// Shared state for one connection.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use rsocket_core::{
///     ConnectionConfig, ConnectionSupport, FirstFrame, HeapAllocator, Payload, Role, Routed,
/// };
///
/// let client = ConnectionSupport::new(ConnectionConfig::default().with_mtu(64), HeapAllocator)
///     .expect("valid config");
/// let stream_id = client.registry().next_stream_id().expect("free id");
/// let batch = client
///     .encode_outbound(
///         stream_id,
///         FirstFrame::RequestResponse,
///         Payload::from_data(Bytes::from(vec![1_u8; 100])),
///     )
///     .expect("encode");
///
/// let server = ConnectionSupport::new(
///     ConnectionConfig::default().with_role(Role::Server),
///     HeapAllocator,
/// )
/// .expect("valid config");
/// let mut demux = server.demultiplexer();
/// let routed: Vec<Routed> = batch
///     .into_iter()
///     .map(|frame| demux.route(frame).expect("route"))
///     .collect();
/// assert_eq!(routed.first(), Some(&Routed::Pending));
/// assert!(matches!(routed.last(), Some(Routed::NewStream(_))));
/// ```
#[derive(Debug)]
pub struct ConnectionSupport<A = HeapAllocator> {
    config: ConnectionConfig,
    allocator: A,
    fragmenter: Fragmenter,
    registry: Arc<StreamRegistry>,
}

impl<A: BufferAllocator> ConnectionSupport<A> {
    /// Validate `config` and build the connection's registry and fragmenter.
    ///
    /// # Errors
    ///
    /// Returns the [`IllegalArgument`] reported by
    /// [`ConnectionConfig::validate`].
    pub fn new(config: ConnectionConfig, allocator: A) -> Result<Self, IllegalArgument> {
        config.validate()?;
        let fragmenter = config.fragmenter()?;
        tracing::debug!(
            role = ?config.role,
            mtu = config.mtu,
            max_frame_length = config.max_frame_length,
            max_inbound_payload_size = config.max_inbound_payload_size,
            "connection support created"
        );
        Ok(Self {
            config,
            allocator,
            fragmenter,
            registry: Arc::new(StreamRegistry::for_role(config.role)),
        })
    }

    /// Validated configuration.
    #[must_use]
    pub const fn config(&self) -> &ConnectionConfig { &self.config }

    /// Allocator used for outbound frames.
    #[must_use]
    pub const fn allocator(&self) -> &A { &self.allocator }

    /// Outbound fragmenter.
    #[must_use]
    pub const fn fragmenter(&self) -> &Fragmenter { &self.fragmenter }

    /// Stream registry shared with every [`Demultiplexer`] of this connection.
    #[must_use]
    pub fn registry(&self) -> &Arc<StreamRegistry> { &self.registry }

    /// Encode `payload` for `stream_id`, fragmenting per the configured MTU.
    ///
    /// # Errors
    ///
    /// Propagates the [`IllegalArgument`] errors of [`Fragmenter::fragment`].
    pub fn encode_outbound(
        &self,
        stream_id: StreamId,
        first: FirstFrame,
        payload: Payload,
    ) -> Result<FragmentBatch> {
        let batch = self
            .fragmenter
            .fragment(&self.allocator, stream_id, first, payload)
            .inspect_err(|err| metrics::inc_errors(err.error_type()))?;
        for _ in 0..batch.len() {
            metrics::inc_frames(Direction::Outbound);
        }
        Ok(batch)
    }

    /// Receive-path router sharing this connection's registry.
    #[must_use]
    pub fn demultiplexer(&self) -> Demultiplexer {
        Demultiplexer::new(
            Arc::clone(&self.registry),
            self.config.max_inbound_payload_size,
        )
    }

    /// Fail every registered stream with `error` and refuse further
    /// allocation. Returns the number of handlers notified.
    ///
    /// Each [`Demultiplexer`] drops its partial payloads on its next
    /// [`route`](Demultiplexer::route); [`Demultiplexer::terminate`] drops
    /// them at once.
    pub fn terminate(&self, error: &Error) -> usize {
        tracing::debug!(%error, "terminating connection streams");
        self.registry.terminate(error)
    }
}

/// What [`Demultiplexer::route`] did with a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Routed {
    /// Delivered to the handler registered for the frame's stream.
    Delivered,
    /// Buffered as part of an unfinished fragment sequence.
    Pending,
    /// A request for a stream with no handler; the caller decides whether to
    /// accept it and register one.
    NewStream(Frame),
    /// A stream 0 frame for the connection owner.
    Connection(Frame),
    /// A late frame for a stream that no longer exists, or a fragment for a
    /// stream nobody owns.
    Ignored,
}

/// Inbound frame router for one connection.
///
/// Owns the connection's [`Reassembler`], so it lives on the single receive
/// path and routes through `&mut self`.
#[derive(Debug)]
pub struct Demultiplexer {
    registry: Arc<StreamRegistry>,
    reassembler: Reassembler,
}

impl Demultiplexer {
    /// Router delivering into `registry`, bounding reassembled payloads at
    /// `max_inbound_payload_size` bytes.
    #[must_use]
    pub fn new(registry: Arc<StreamRegistry>, max_inbound_payload_size: usize) -> Self {
        Self {
            registry,
            reassembler: Reassembler::new(max_inbound_payload_size),
        }
    }

    /// Registry frames are delivered into.
    #[must_use]
    pub fn registry(&self) -> &Arc<StreamRegistry> { &self.registry }

    /// Number of streams with an unfinished fragment sequence.
    #[must_use]
    pub fn pending_streams(&self) -> usize { self.reassembler.len() }

    /// Decode one inbound frame and route it.
    ///
    /// Fragments are buffered only for streams with a registered handler and
    /// for requests the peer opens. Fragments for any other stream are
    /// dropped as [`Routed::Ignored`], together with any partial payload left
    /// behind by a stream that has since been removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolViolation`] for malformed frames, broken
    /// fragment sequences and peer requests on ids only this endpoint may
    /// allocate; the connection must be closed. Returns
    /// [`Error::PayloadTooLarge`] when a reassembled payload exceeds the
    /// bound; the affected handler has already been failed and removed, and
    /// the connection may continue.
    pub fn route(&mut self, bytes: Bytes) -> Result<Routed> {
        metrics::inc_frames(Direction::Inbound);
        let frame = frame::decode(bytes)
            .map_err(Error::from)
            .inspect_err(record)?;

        let stream_id = frame.stream_id();
        if stream_id.is_connection() {
            tracing::trace!(frame_type = %frame.frame_type(), "connection frame");
            return Ok(Routed::Connection(frame));
        }

        if !self.reassembler.is_empty() && self.registry.is_terminated() {
            self.drop_partials();
        }

        let handler = self.registry.get(stream_id);
        if handler.is_none()
            && let Some(routed) = self.route_unowned(&frame).inspect_err(record)?
        {
            return Ok(routed);
        }

        let frame = match self.reassembler.push(frame) {
            Ok(Reassembly::Complete(frame)) => frame,
            Ok(Reassembly::Pending) => return Ok(Routed::Pending),
            Err(err) => {
                record(&err);
                if matches!(err, Error::PayloadTooLarge { .. }) {
                    self.fail_stream(stream_id, &err);
                }
                return Err(err);
            }
        };

        match handler {
            Some(handler) => Ok(deliver(handler.as_ref(), frame)),
            None if frame.frame_type().is_request() => {
                tracing::trace!(%stream_id, frame_type = %frame.frame_type(), "new stream");
                Ok(Routed::NewStream(frame))
            }
            None => Ok(ignored(&frame)),
        }
    }

    /// Drop every partial payload and fail every registered stream with
    /// `error`. Returns the number of handlers notified.
    pub fn terminate(&mut self, error: &Error) -> usize {
        self.drop_partials();
        self.registry.terminate(error)
    }

    /// Decide the fate of a frame whose stream has no handler. `None` lets
    /// it continue into reassembly.
    fn route_unowned(&mut self, frame: &Frame) -> Result<Option<Routed>> {
        let stream_id = frame.stream_id();
        match self.reassembler.pending_frame_type(stream_id) {
            Some(opened_by) if opened_by.is_request() => return Ok(None),
            Some(opened_by) => {
                self.reassembler.discard(stream_id);
                tracing::debug!(
                    %stream_id,
                    frame_type = %opened_by,
                    "partial payload of removed stream discarded"
                );
                return Ok(Some(ignored(frame)));
            }
            None => {}
        }

        let frame_type = frame.frame_type();
        if !frame_type.is_request() {
            return Ok(Some(ignored(frame)));
        }
        if self.registry.role().originates(stream_id) {
            if self.registry.is_before_or_current(stream_id) {
                return Ok(Some(ignored(frame)));
            }
            return Err(ProtocolViolation::PeerUsedLocalStreamId {
                frame_type,
                stream_id,
            }
            .into());
        }
        Ok(None)
    }

    fn drop_partials(&mut self) {
        let dropped = self.reassembler.len();
        self.reassembler.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "partial payloads dropped on termination");
        }
    }

    fn fail_stream(&self, stream_id: StreamId, error: &Error) {
        let Some(handler) = self.registry.get(stream_id) else {
            return;
        };
        let removed = self.registry.remove(stream_id, &handler);
        tracing::debug!(%stream_id, %error, removed, "stream failed");
        handler.handle_error(error);
    }
}

fn ignored(frame: &Frame) -> Routed {
    tracing::trace!(
        stream_id = %frame.stream_id(),
        frame_type = %frame.frame_type(),
        "frame for unknown stream ignored"
    );
    Routed::Ignored
}

fn deliver(handler: &dyn FrameHandler, frame: Frame) -> Routed {
    match frame {
        Frame::Request(request) => {
            let complete = request.is_complete();
            handler.handle_next(request.into_payload(), complete);
        }
        Frame::Payload(payload) => {
            let complete = payload.is_complete();
            if payload.is_next() {
                handler.handle_next(payload.into_payload(), complete);
            } else {
                handler.handle_complete();
            }
        }
        Frame::RequestN { request_n, .. } => handler.handle_request_n(request_n),
        Frame::Cancel { .. } => handler.handle_cancel(),
        Frame::Error(error) => handler.handle_error(&error.into_error()),
        other @ (Frame::MetadataPush { .. } | Frame::Opaque { .. }) => {
            tracing::trace!(frame_type = %other.frame_type(), "stream frame not deliverable");
            return Routed::Ignored;
        }
    }
    Routed::Delivered
}

fn record(error: &Error) {
    tracing::debug!(%error, kind = error.error_type(), "inbound frame rejected");
    metrics::inc_errors(error.error_type());
}
