//! Logical request/response payloads.

use bytes::Bytes;

/// Data plus optional metadata carried by request and payload frames.
///
/// Metadata presence is tracked explicitly: `Some(Bytes::new())` encodes the
/// metadata flag with a zero-length section, `None` omits it entirely.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use rsocket_core::Payload;
///
/// let payload = Payload::new(
///     Bytes::from_static(b"testData"),
///     Some(Bytes::from_static(b"testMetadata")),
/// );
/// assert!(payload.has_metadata());
/// assert_eq!(payload.len(), 20);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Payload {
    data: Bytes,
    metadata: Option<Bytes>,
}

impl Payload {
    /// Construct a payload from data and optional metadata.
    #[must_use]
    pub fn new(data: impl Into<Bytes>, metadata: Option<Bytes>) -> Self {
        Self {
            data: data.into(),
            metadata,
        }
    }

    /// Construct a payload without metadata.
    #[must_use]
    pub fn from_data(data: impl Into<Bytes>) -> Self { Self::new(data, None) }

    /// Whether the metadata flag should be set for this payload.
    #[must_use]
    pub const fn has_metadata(&self) -> bool { self.metadata.is_some() }

    /// Borrow the data section.
    #[must_use]
    pub fn data(&self) -> &Bytes { &self.data }

    /// Borrow the metadata section, if present.
    #[must_use]
    pub fn metadata(&self) -> Option<&Bytes> { self.metadata.as_ref() }

    /// Combined size of metadata and data in bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.data.len() + self.metadata.as_ref().map_or(0, Bytes::len) }

    /// Whether both sections are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Consume the payload, returning `(data, metadata)`.
    #[must_use]
    pub fn into_parts(self) -> (Bytes, Option<Bytes>) { (self.data, self.metadata) }
}
