//! Helpers for explicit network byte-order conversions.
//!
//! RSocket mixes 24-bit fields (frame length, metadata length) with 16- and
//! 32-bit fields, all big-endian. These helpers keep Clippy expectations scoped
//! to the conversion points so codec code stays explicit about wire endianness
//! without repeating lint annotations.

/// Largest value representable in a 24-bit field.
pub const U24_MAX: u32 = 0x00FF_FFFF;

/// Serialise a `u16` in network byte order (big-endian).
///
/// # Examples
///
/// ```
/// use rsocket_core::byte_order::write_network_u16;
///
/// assert_eq!(write_network_u16(0x1234), [0x12, 0x34]);
/// ```
#[must_use]
pub fn write_network_u16(value: u16) -> [u8; 2] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    value.to_be_bytes()
}

/// Parse a network-order `u16` from its on-wire representation.
///
/// # Examples
///
/// ```
/// use rsocket_core::byte_order::read_network_u16;
///
/// assert_eq!(read_network_u16([0x12, 0x34]), 0x1234);
/// ```
#[must_use]
pub fn read_network_u16(bytes: [u8; 2]) -> u16 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    u16::from_be_bytes(bytes)
}

/// Serialise the low 24 bits of `value` in network byte order.
///
/// Bits above [`U24_MAX`] are discarded; callers validate the range first.
///
/// # Examples
///
/// ```
/// use rsocket_core::byte_order::write_network_u24;
///
/// assert_eq!(write_network_u24(0x12_3456), [0x12, 0x34, 0x56]);
/// ```
#[must_use]
pub fn write_network_u24(value: u32) -> [u8; 3] {
    let [_, high, mid, low] = write_network_u32(value & U24_MAX);
    [high, mid, low]
}

/// Parse a network-order 24-bit unsigned integer.
///
/// # Examples
///
/// ```
/// use rsocket_core::byte_order::read_network_u24;
///
/// assert_eq!(read_network_u24([0x12, 0x34, 0x56]), 0x12_3456);
/// ```
#[must_use]
pub fn read_network_u24(bytes: [u8; 3]) -> u32 {
    let [high, mid, low] = bytes;
    read_network_u32([0, high, mid, low])
}

/// Serialise a `u32` in network byte order (big-endian).
///
/// # Examples
///
/// ```
/// use rsocket_core::byte_order::write_network_u32;
///
/// assert_eq!(write_network_u32(0x1234_5678), [0x12, 0x34, 0x56, 0x78]);
/// ```
#[must_use]
pub fn write_network_u32(value: u32) -> [u8; 4] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    value.to_be_bytes()
}

/// Parse a network-order `u32` from its on-wire representation.
///
/// # Examples
///
/// ```
/// use rsocket_core::byte_order::read_network_u32;
///
/// assert_eq!(read_network_u32([0x12, 0x34, 0x56, 0x78]), 0x1234_5678);
/// ```
#[must_use]
pub fn read_network_u32(bytes: [u8; 4]) -> u32 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    u32::from_be_bytes(bytes)
}

/// Copy `N` bytes starting at `offset` out of `src`, if present.
pub(crate) fn array_at<const N: usize>(src: &[u8], offset: usize) -> Option<[u8; N]> {
    src.get(offset..offset.checked_add(N)?)
        .and_then(|slice| <[u8; N]>::try_from(slice).ok())
}
