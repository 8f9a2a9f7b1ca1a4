//! Outbound helper that splits payloads into MTU-bounded frame sequences.
//!
//! A fragmented payload becomes one first fragment of the caller's real frame
//! type, carrying its initiating fields with `F` set, followed by `PAYLOAD`
//! frames with `NEXT` carrying the rest. Each fragment is filled from the
//! remaining metadata first, then the remaining data, so every fragment but
//! the last is exactly `mtu` bytes once the length prefix is added.
//!
//! Slicing uses [`Bytes::split_to`], so fragment bodies share the caller's
//! buffers until they are copied into the encoded frame.

use bytes::Bytes;

use crate::{
    alloc::BufferAllocator,
    codec::{FRAME_LENGTH_MASK, FRAME_LENGTH_SIZE, MIN_FRAME_LENGTH},
    error::{IllegalArgument, Result},
    frame::{
        FrameType, HEADER_SIZE, METADATA_LENGTH_SIZE, REQUEST_N_SIZE, payload, request,
        request_channel,
    },
    metrics::{self, Direction},
    payload::Payload,
    request_n::encode_requested,
    stream::StreamId,
};

/// Bytes of every fragment spent before the body: length prefix plus header.
pub const FRAME_OFFSET: usize = FRAME_LENGTH_SIZE + HEADER_SIZE;

/// Smallest non-zero MTU.
pub const MIN_MTU: usize = 64;

/// The frame type and initiating fields of an outbound payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FirstFrame {
    /// `REQUEST_RESPONSE`.
    RequestResponse,
    /// `REQUEST_FNF`.
    RequestFireAndForget,
    /// `REQUEST_STREAM` with its initial credit.
    RequestStream {
        /// Initial demand; must be at least 1.
        initial_request_n: i64,
    },
    /// `REQUEST_CHANNEL` with its initial credit.
    RequestChannel {
        /// Initial demand; must be at least 1.
        initial_request_n: i64,
        /// Whether the requester's side of the channel completes with this
        /// payload.
        complete: bool,
    },
    /// `PAYLOAD` with `NEXT` on an established stream.
    Payload {
        /// Whether the stream completes with this payload.
        complete: bool,
    },
}

impl FirstFrame {
    /// Frame type of the first (or only) frame.
    #[must_use]
    pub const fn frame_type(self) -> FrameType {
        match self {
            Self::RequestResponse => FrameType::RequestResponse,
            Self::RequestFireAndForget => FrameType::RequestFnf,
            Self::RequestStream { .. } => FrameType::RequestStream,
            Self::RequestChannel { .. } => FrameType::RequestChannel,
            Self::Payload { .. } => FrameType::Payload,
        }
    }

    /// Initial credit carried by stream and channel requests.
    #[must_use]
    pub const fn initial_request_n(self) -> Option<i64> {
        match self {
            Self::RequestStream { initial_request_n }
            | Self::RequestChannel {
                initial_request_n, ..
            } => Some(initial_request_n),
            _ => None,
        }
    }

    /// Whether the last frame of the sequence sets `C`.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        match self {
            Self::RequestChannel { complete, .. } | Self::Payload { complete } => complete,
            _ => false,
        }
    }

    fn overhead(self, has_metadata: bool) -> usize {
        FRAME_OFFSET
            + self.initial_request_n().map_or(0, |_| REQUEST_N_SIZE)
            + if has_metadata { METADATA_LENGTH_SIZE } else { 0 }
    }

    /// Encode this frame type around `metadata` and `data`.
    ///
    /// `C` is only written when this frame ends the sequence.
    fn encode<A>(
        self,
        alloc: &A,
        stream_id: StreamId,
        follows: bool,
        metadata: Option<Bytes>,
        data: Bytes,
    ) -> Result<Bytes, IllegalArgument>
    where
        A: BufferAllocator + ?Sized,
    {
        let complete = !follows && self.is_complete();
        match self {
            Self::RequestResponse => {
                request::encode_request_response(alloc, stream_id, follows, metadata, data)
            }
            Self::RequestFireAndForget => {
                request::encode_request_fnf(alloc, stream_id, follows, metadata, data)
            }
            Self::RequestStream { initial_request_n } => request::encode_request_stream(
                alloc,
                stream_id,
                follows,
                initial_request_n,
                metadata,
                data,
            ),
            Self::RequestChannel {
                initial_request_n, ..
            } => request_channel::encode(
                alloc,
                stream_id,
                follows,
                complete,
                initial_request_n,
                metadata,
                data,
            ),
            Self::Payload { .. } => {
                payload::encode(alloc, stream_id, follows, complete, true, metadata, data)
            }
        }
    }
}

/// Splits outbound payloads into frames no larger than the MTU.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use rsocket_core::{FirstFrame, Fragmenter, HeapAllocator, Payload, StreamId};
///
/// let fragmenter = Fragmenter::new(64, 1024).expect("valid limits");
/// let payload = Payload::from_data(Bytes::from(vec![7_u8; 200]));
/// let batch = fragmenter
///     .fragment(
///         &HeapAllocator,
///         StreamId::new(1).expect("valid id"),
///         FirstFrame::RequestResponse,
///         payload,
///     )
///     .expect("fragment");
/// assert!(batch.is_fragmented());
/// assert!(batch.frames().iter().all(|frame| frame.len() + 3 <= 64));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fragmenter {
    mtu: usize,
    max_frame_length: usize,
}

impl Fragmenter {
    /// Create a fragmenter. An `mtu` of 0 disables fragmentation.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalArgument::InvalidMaxFrameLength`] when
    /// `max_frame_length` is outside `64..=0xFF_FFFF`, and
    /// [`IllegalArgument::InvalidMtu`] when a non-zero `mtu` is below
    /// [`MIN_MTU`] or above `max_frame_length`.
    pub fn new(mtu: usize, max_frame_length: usize) -> Result<Self, IllegalArgument> {
        if !(MIN_FRAME_LENGTH..=FRAME_LENGTH_MASK).contains(&max_frame_length) {
            return Err(IllegalArgument::InvalidMaxFrameLength {
                value: max_frame_length,
                min: MIN_FRAME_LENGTH,
                max: FRAME_LENGTH_MASK,
            });
        }
        if mtu != 0 && !(MIN_MTU..=max_frame_length).contains(&mtu) {
            return Err(IllegalArgument::InvalidMtu {
                mtu,
                min: MIN_MTU,
                max: max_frame_length,
            });
        }
        Ok(Self {
            mtu,
            max_frame_length,
        })
    }

    /// Configured MTU; 0 when fragmentation is disabled.
    #[must_use]
    pub const fn mtu(&self) -> usize { self.mtu }

    /// Configured maximum frame length.
    #[must_use]
    pub const fn max_frame_length(&self) -> usize { self.max_frame_length }

    /// Whether payloads may be split at all.
    #[must_use]
    pub const fn is_enabled(&self) -> bool { self.mtu > 0 }

    /// Whether `payload` needs more than one frame under this MTU.
    #[must_use]
    pub fn is_fragmentable(&self, first: FirstFrame, payload: &Payload) -> bool {
        self.is_enabled() && first.overhead(payload.has_metadata()) + payload.len() > self.mtu
    }

    /// Encode `payload` as one frame or as a fragment sequence.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalArgument::RequestNNotPositive`] for a non-positive
    /// initial credit, [`IllegalArgument::MetadataTooLarge`] for metadata the
    /// length field cannot describe, and
    /// [`IllegalArgument::PayloadExceedsFrameLength`] when fragmentation is
    /// disabled and the frame would exceed the maximum frame length.
    pub fn fragment<A>(
        &self,
        alloc: &A,
        stream_id: StreamId,
        first: FirstFrame,
        payload: Payload,
    ) -> Result<FragmentBatch>
    where
        A: BufferAllocator + ?Sized,
    {
        if let Some(n) = first.initial_request_n() {
            encode_requested(n)?;
        }

        if !self.is_fragmentable(first, &payload) {
            let size = first.overhead(payload.has_metadata()) + payload.len() - FRAME_LENGTH_SIZE;
            if size > self.max_frame_length {
                return Err(IllegalArgument::PayloadExceedsFrameLength {
                    size,
                    max: self.max_frame_length,
                }
                .into());
            }
            let (data, metadata) = payload.into_parts();
            let frame = first.encode(alloc, stream_id, false, metadata, data)?;
            return Ok(FragmentBatch::new(stream_id, vec![frame]));
        }

        let has_metadata = payload.has_metadata();
        let (mut data, metadata) = payload.into_parts();
        let mut metadata = metadata.unwrap_or_default();

        let mut frames = vec![encode_first_fragment(
            alloc,
            self.mtu,
            stream_id,
            first,
            has_metadata,
            &mut metadata,
            &mut data,
        )?];
        while !metadata.is_empty() || !data.is_empty() {
            frames.push(encode_follows_fragment(
                alloc,
                self.mtu,
                stream_id,
                first.is_complete(),
                &mut metadata,
                &mut data,
            )?);
        }

        metrics::add_fragments(Direction::Outbound, frames.len() as u64);
        tracing::trace!(
            %stream_id,
            frame_type = %first.frame_type(),
            fragments = frames.len(),
            mtu = self.mtu,
            "payload fragmented"
        );
        Ok(FragmentBatch::new(stream_id, frames))
    }
}

/// Encode the first fragment of a sequence, consuming the slices it carries
/// from the front of `metadata` and `data`.
///
/// `has_metadata` sets `M` even if `metadata` is empty, preserving the
/// distinction between empty and absent metadata.
///
/// # Errors
///
/// Returns [`IllegalArgument::RequestNNotPositive`] for a non-positive
/// initial credit.
pub fn encode_first_fragment<A>(
    alloc: &A,
    mtu: usize,
    stream_id: StreamId,
    first: FirstFrame,
    has_metadata: bool,
    metadata: &mut Bytes,
    data: &mut Bytes,
) -> Result<Bytes, IllegalArgument>
where
    A: BufferAllocator + ?Sized,
{
    let mut remaining = mtu.saturating_sub(first.overhead(has_metadata));
    let metadata_slice = has_metadata.then(|| take(metadata, &mut remaining));
    let data_slice = take(data, &mut remaining);
    first.encode(alloc, stream_id, true, metadata_slice, data_slice)
}

/// Encode a follow fragment, consuming the slices it carries from the front
/// of `metadata` and `data`.
///
/// Follow fragments are `PAYLOAD` frames with `NEXT`. `M` is set only while
/// metadata remains, `F` while anything remains after this fragment, and `C`
/// on the last fragment when `complete` is true.
///
/// # Errors
///
/// Never fails for slices bounded by a valid MTU; the result type mirrors the
/// payload encoder.
pub fn encode_follows_fragment<A>(
    alloc: &A,
    mtu: usize,
    stream_id: StreamId,
    complete: bool,
    metadata: &mut Bytes,
    data: &mut Bytes,
) -> Result<Bytes, IllegalArgument>
where
    A: BufferAllocator + ?Sized,
{
    let has_metadata = !metadata.is_empty();
    let mut remaining = mtu.saturating_sub(
        FRAME_OFFSET + if has_metadata { METADATA_LENGTH_SIZE } else { 0 },
    );
    let metadata_slice = has_metadata.then(|| take(metadata, &mut remaining));
    let data_slice = take(data, &mut remaining);
    let follows = !metadata.is_empty() || !data.is_empty();
    payload::encode(
        alloc,
        stream_id,
        follows,
        complete && !follows,
        true,
        metadata_slice,
        data_slice,
    )
}

fn take(src: &mut Bytes, budget: &mut usize) -> Bytes {
    let len = src.len().min(*budget);
    *budget -= len;
    src.split_to(len)
}

/// Frames produced for one outbound payload, in send order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentBatch {
    stream_id: StreamId,
    frames: Vec<Bytes>,
}

impl FragmentBatch {
    fn new(stream_id: StreamId, frames: Vec<Bytes>) -> Self {
        debug_assert!(!frames.is_empty(), "fragment batches must not be empty");
        Self { stream_id, frames }
    }

    /// Stream shared by every frame.
    #[must_use]
    pub const fn stream_id(&self) -> StreamId { self.stream_id }

    /// Encoded frames, without length prefixes.
    #[must_use]
    pub fn frames(&self) -> &[Bytes] { self.frames.as_slice() }

    /// Number of frames in the batch.
    #[expect(
        clippy::len_without_is_empty,
        reason = "batches are guaranteed non-empty"
    )]
    #[must_use]
    pub fn len(&self) -> usize { self.frames.len() }

    /// Whether the payload required more than one frame.
    #[must_use]
    pub fn is_fragmented(&self) -> bool { self.frames.len() > 1 }

    /// Consume the batch, returning the frames.
    #[must_use]
    pub fn into_frames(self) -> Vec<Bytes> { self.frames }
}

impl IntoIterator for FragmentBatch {
    type Item = Bytes;
    type IntoIter = std::vec::IntoIter<Bytes>;

    fn into_iter(self) -> Self::IntoIter { self.frames.into_iter() }
}
