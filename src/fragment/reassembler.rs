//! Inbound helper that stitches fragment sequences back into frames.
//!
//! [`Reassembler`] mirrors the outbound [`Fragmenter`](super::Fragmenter): it
//! buffers the metadata and data slices of each stream's fragments in arrival
//! order and, on the fragment without `F`, rebuilds the first fragment's frame
//! around the concatenated payload. Accumulated size is capped by
//! `max_inbound_payload_size`; exceeding it drops the partial payload and
//! fails only that stream.
//!
//! Reassembly state belongs to the single receive path of a connection, so
//! the type takes `&mut self` and needs no locking.

use std::collections::{HashMap, hash_map::Entry};

use bytes::BytesMut;

use crate::{
    error::{Error, ProtocolViolation, Result},
    frame::{Frame, FrameType},
    metrics::{self, Direction},
    payload::Payload,
    stream::StreamId,
};

#[derive(Debug)]
struct PartialFrame {
    first: Frame,
    metadata: Option<BytesMut>,
    data: BytesMut,
    fragments: u64,
}

impl PartialFrame {
    fn new(first: Frame, payload: Payload) -> Self {
        let (data, metadata) = payload.into_parts();
        Self {
            first,
            metadata: metadata.map(|m| BytesMut::from(m.as_ref())),
            data: BytesMut::from(data.as_ref()),
            fragments: 1,
        }
    }

    fn push(&mut self, payload: Payload) {
        let (data, metadata) = payload.into_parts();
        if let Some(metadata) = metadata {
            self.metadata
                .get_or_insert_with(BytesMut::new)
                .extend_from_slice(&metadata);
        }
        self.data.extend_from_slice(&data);
        self.fragments += 1;
    }

    fn len(&self) -> usize { self.metadata.as_ref().map_or(0, BytesMut::len) + self.data.len() }

    fn finish(self, complete: bool) -> Frame {
        let payload = Payload::new(self.data.freeze(), self.metadata.map(BytesMut::freeze));
        match self.first {
            Frame::Request(frame) => Frame::Request(frame.into_reassembled(payload, complete)),
            Frame::Payload(frame) => Frame::Payload(frame.into_reassembled(payload, complete)),
            other => other,
        }
    }
}

/// Outcome of pushing one frame into the [`Reassembler`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reassembly {
    /// A frame ready for delivery: either unfragmented, the reassembled
    /// result of a completed sequence, or a signal that passes through.
    Complete(Frame),
    /// The frame was buffered as part of an unfinished sequence.
    Pending,
}

/// Stateful per-stream fragment reassembler.
#[derive(Debug)]
pub struct Reassembler {
    max_inbound_payload_size: usize,
    partials: HashMap<StreamId, PartialFrame>,
}

impl Reassembler {
    /// Create a reassembler rejecting payloads larger than
    /// `max_inbound_payload_size` bytes of metadata plus data.
    #[must_use]
    pub fn new(max_inbound_payload_size: usize) -> Self {
        Self {
            max_inbound_payload_size,
            partials: HashMap::new(),
        }
    }

    /// Configured payload bound.
    #[must_use]
    pub const fn max_inbound_payload_size(&self) -> usize { self.max_inbound_payload_size }

    /// Feed one decoded frame.
    ///
    /// While a stream has a partial payload:
    ///
    /// - `PAYLOAD` frames continue it;
    /// - `CANCEL` and `ERROR` discard it and pass through;
    /// - `REQUEST_N` passes through untouched;
    /// - anything else is a protocol violation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLarge`] when the accumulated payload would
    /// exceed the bound, and [`ProtocolViolation::UnexpectedFragment`] for a
    /// frame that cannot continue the pending sequence. Either way the
    /// partial payload is discarded.
    ///
    /// # Examples
    ///
    /// ```
    /// use bytes::Bytes;
    /// use rsocket_core::{
    ///     FirstFrame, Fragmenter, HeapAllocator, Payload, Reassembler, Reassembly, StreamId, frame,
    /// };
    ///
    /// let stream_id = StreamId::new(1).expect("valid id");
    /// let payload = Payload::from_data(Bytes::from(vec![1_u8; 150]));
    /// let batch = Fragmenter::new(64, 1024)
    ///     .expect("valid limits")
    ///     .fragment(&HeapAllocator, stream_id, FirstFrame::RequestResponse, payload.clone())
    ///     .expect("fragment");
    ///
    /// let mut reassembler = Reassembler::new(1024);
    /// let mut result = None;
    /// for bytes in batch {
    ///     let frame = frame::decode(bytes).expect("decode");
    ///     if let Reassembly::Complete(frame) = reassembler.push(frame).expect("push") {
    ///         result = Some(frame);
    ///     }
    /// }
    /// let Some(rsocket_core::Frame::Request(request)) = result else {
    ///     panic!("expected a request");
    /// };
    /// assert_eq!(request.into_payload(), payload);
    /// ```
    pub fn push(&mut self, frame: Frame) -> Result<Reassembly> {
        let stream_id = frame.stream_id();
        let limit = self.max_inbound_payload_size;

        match self.partials.entry(stream_id) {
            Entry::Vacant(entry) => {
                if !frame.follows() {
                    return Ok(Reassembly::Complete(frame));
                }
                let (first, payload) = split_payload(frame);
                let partial = PartialFrame::new(first, payload);
                check_size(stream_id, partial.len(), limit)?;
                tracing::trace!(%stream_id, bytes = partial.len(), "fragment sequence started");
                entry.insert(partial);
                Ok(Reassembly::Pending)
            }
            Entry::Occupied(mut entry) => match frame {
                Frame::Payload(fragment) => {
                    let follows = fragment.follows();
                    let complete = fragment.is_complete();
                    let attempted = entry.get().len() + fragment.payload().len();
                    if let Err(err) = check_size(stream_id, attempted, limit) {
                        entry.remove();
                        return Err(err);
                    }
                    entry.get_mut().push(fragment.into_payload());
                    if follows {
                        return Ok(Reassembly::Pending);
                    }
                    let partial = entry.remove();
                    metrics::add_fragments(Direction::Inbound, partial.fragments);
                    tracing::trace!(
                        %stream_id,
                        fragments = partial.fragments,
                        bytes = partial.len(),
                        "fragment sequence reassembled"
                    );
                    Ok(Reassembly::Complete(partial.finish(complete)))
                }
                Frame::RequestN { .. } => Ok(Reassembly::Complete(frame)),
                Frame::Cancel { .. } | Frame::Error(_) => {
                    entry.remove();
                    tracing::debug!(
                        %stream_id,
                        frame_type = %frame.frame_type(),
                        "partial payload discarded"
                    );
                    Ok(Reassembly::Complete(frame))
                }
                other => {
                    entry.remove();
                    Err(ProtocolViolation::UnexpectedFragment {
                        stream_id,
                        frame_type: other.frame_type(),
                    }
                    .into())
                }
            },
        }
    }

    /// Drop any partial payload for `stream_id`, returning whether one existed.
    pub fn discard(&mut self, stream_id: StreamId) -> bool {
        self.partials.remove(&stream_id).is_some()
    }

    /// Whether `stream_id` has an unfinished sequence.
    #[must_use]
    pub fn is_pending(&self, stream_id: StreamId) -> bool { self.partials.contains_key(&stream_id) }

    /// Type of the frame that opened `stream_id`'s unfinished sequence.
    #[must_use]
    pub fn pending_frame_type(&self, stream_id: StreamId) -> Option<FrameType> {
        self.partials
            .get(&stream_id)
            .map(|partial| partial.first.frame_type())
    }

    /// Number of streams with an unfinished sequence.
    #[must_use]
    pub fn len(&self) -> usize { self.partials.len() }

    /// Whether no sequence is in progress.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.partials.is_empty() }

    /// Drop every partial payload.
    pub fn clear(&mut self) { self.partials.clear(); }
}

fn check_size(stream_id: StreamId, attempted: usize, limit: usize) -> Result<()> {
    if attempted > limit {
        tracing::debug!(%stream_id, attempted, limit, "reassembled payload too large");
        return Err(Error::PayloadTooLarge {
            stream_id,
            attempted,
            limit,
        });
    }
    Ok(())
}

/// Separate a fragmentable frame from its payload, leaving an empty payload
/// in its place.
fn split_payload(frame: Frame) -> (Frame, Payload) {
    match frame {
        Frame::Request(request) => {
            let payload = request.payload().clone();
            (
                Frame::Request(request.into_reassembled(Payload::default(), false)),
                payload,
            )
        }
        Frame::Payload(fragment) => {
            let payload = fragment.payload().clone();
            (
                Frame::Payload(fragment.into_reassembled(Payload::default(), false)),
                payload,
            )
        }
        other => (other, Payload::default()),
    }
}
