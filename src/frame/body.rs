//! Shared `[metadata length][metadata][data]` body layout.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    byte_order::{U24_MAX, array_at, read_network_u24, write_network_u24},
    error::{IllegalArgument, ProtocolViolation},
};

/// Size of the metadata length prefix.
pub const METADATA_LENGTH_SIZE: usize = 3;

/// Largest metadata section the length prefix can describe.
pub const MAX_METADATA_LENGTH: usize = U24_MAX as usize;

/// Bytes needed to encode `metadata` and `data`, including the length prefix.
pub(crate) fn encoded_len(metadata: Option<&Bytes>, data: &Bytes) -> usize {
    metadata.map_or(0, |m| METADATA_LENGTH_SIZE + m.len()) + data.len()
}

pub(crate) fn check_metadata(metadata: Option<&Bytes>) -> Result<(), IllegalArgument> {
    match metadata {
        Some(m) if m.len() > MAX_METADATA_LENGTH => {
            Err(IllegalArgument::MetadataTooLarge { size: m.len() })
        }
        _ => Ok(()),
    }
}

/// Append the body. Callers run [`check_metadata`] first.
pub(crate) fn put(dst: &mut BytesMut, metadata: Option<&Bytes>, data: &Bytes) {
    if let Some(metadata) = metadata {
        let len = u32::try_from(metadata.len()).unwrap_or(U24_MAX);
        dst.put_slice(&write_network_u24(len));
        dst.put_slice(metadata);
    }
    dst.put_slice(data);
}

/// Split a body into its metadata and data sections without copying.
pub(crate) fn split(
    mut body: Bytes,
    has_metadata: bool,
) -> Result<(Option<Bytes>, Bytes), ProtocolViolation> {
    if !has_metadata {
        return Ok((None, body));
    }
    let len = array_at::<METADATA_LENGTH_SIZE>(&body, 0)
        .map(|prefix| read_network_u24(prefix) as usize)
        .ok_or(ProtocolViolation::Truncated {
            needed: METADATA_LENGTH_SIZE,
            available: body.len(),
        })?;
    let needed = METADATA_LENGTH_SIZE + len;
    if body.len() < needed {
        return Err(ProtocolViolation::Truncated {
            needed,
            available: body.len(),
        });
    }
    let mut metadata = body.split_to(needed);
    let metadata = metadata.split_off(METADATA_LENGTH_SIZE);
    Ok((Some(metadata), body))
}
