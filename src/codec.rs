//! Length-prefixed framing for stream-oriented transports.
//!
//! Byte-stream transports such as TCP carry each RSocket frame behind a
//! 24-bit big-endian length prefix. [`FrameLengthCodec`] adds and strips that
//! prefix on top of `tokio_util`'s `LengthDelimitedCodec`, enforcing the
//! configured maximum frame length and reporting truncated input at EOF with
//! a structured [`EofError`]. Message-oriented transports (WebSocket) skip
//! this layer and exchange bare frames.

use std::io;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::byte_order::{U24_MAX, array_at, read_network_u24};

pub mod error;

pub use error::{CodecError, EofError, FramingError};

/// Size of the frame length prefix in bytes.
pub const FRAME_LENGTH_SIZE: usize = 3;

/// Largest frame length the 24-bit prefix can express.
pub const FRAME_LENGTH_MASK: usize = U24_MAX as usize;

/// Smallest maximum frame length accepted by the codec.
///
/// Matches the smallest MTU so a fragment always fits a frame.
pub const MIN_FRAME_LENGTH: usize = 64;

pub(crate) fn clamp_frame_length(value: usize) -> usize {
    value.clamp(MIN_FRAME_LENGTH, FRAME_LENGTH_MASK)
}

/// Encoder and decoder for the RSocket frame length prefix.
///
/// # Examples
///
/// ```
/// use bytes::{Bytes, BytesMut};
/// use rsocket_core::FrameLengthCodec;
/// use tokio_util::codec::{Decoder, Encoder};
///
/// let mut codec = FrameLengthCodec::new(1024);
/// let mut wire = BytesMut::new();
/// codec
///     .encode(Bytes::from_static(b"frame"), &mut wire)
///     .expect("encode");
/// assert_eq!(&wire[..3], &[0, 0, 5]);
///
/// let frame = codec.decode(&mut wire).expect("decode").expect("frame");
/// assert_eq!(&frame[..], b"frame");
/// ```
#[derive(Debug)]
pub struct FrameLengthCodec {
    inner: LengthDelimitedCodec,
    max_frame_length: usize,
    /// Body length announced by a prefix the inner codec already consumed.
    pending: Option<usize>,
}

impl FrameLengthCodec {
    /// Construct a codec accepting frames of at most `max_frame_length` bytes.
    ///
    /// The limit is clamped to `MIN_FRAME_LENGTH..=FRAME_LENGTH_MASK`.
    #[must_use]
    pub fn new(max_frame_length: usize) -> Self {
        let max_frame_length = clamp_frame_length(max_frame_length);
        let inner = LengthDelimitedCodec::builder()
            .length_field_length(FRAME_LENGTH_SIZE)
            .max_frame_length(max_frame_length)
            .new_codec();
        Self {
            inner,
            max_frame_length,
            pending: None,
        }
    }

    /// Return the maximum frame length accepted by this codec.
    #[must_use]
    pub fn max_frame_length(&self) -> usize { self.max_frame_length }

    /// Build the EOF error matching how far the truncated frame got.
    ///
    /// - [`EofError::MidHeader`]: fewer than three prefix bytes arrived.
    /// - [`EofError::MidFrame`]: the prefix arrived but the frame body did not.
    fn build_eof_error(&self, src: &BytesMut) -> io::Error {
        let bytes_received = src.len();
        tracing::debug!(
            bytes_received,
            expected = ?self.pending,
            "stream ended inside a frame"
        );
        match self.pending {
            Some(expected) => CodecError::Eof(EofError::MidFrame {
                bytes_received,
                expected,
            })
            .into(),
            None => CodecError::Eof(EofError::MidHeader {
                bytes_received,
                header_size: FRAME_LENGTH_SIZE,
            })
            .into(),
        }
    }
}

impl Default for FrameLengthCodec {
    fn default() -> Self { Self::new(FRAME_LENGTH_MASK) }
}

impl Decoder for FrameLengthCodec {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let before = src.len();
        let announced = array_at::<FRAME_LENGTH_SIZE>(src, 0).map(|prefix| read_network_u24(prefix) as usize);
        let frame = self.inner.decode(src)?;
        match frame {
            Some(_) => self.pending = None,
            // The inner codec consumed the prefix and is waiting for the body.
            None if src.len() < before => self.pending = announced,
            None => {}
        }
        Ok(frame.map(BytesMut::freeze))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Clean close: no data remaining at frame boundary
        if src.is_empty() && self.pending.is_none() {
            return Ok(None);
        }

        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => Err(self.build_eof_error(src)),
        }
    }
}

impl Encoder<Bytes> for FrameLengthCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > self.max_frame_length {
            return Err(CodecError::Framing(FramingError::OversizedFrame {
                size: item.len(),
                max: self.max_frame_length,
            })
            .into());
        }
        self.inner.encode(item, dst)
    }
}
