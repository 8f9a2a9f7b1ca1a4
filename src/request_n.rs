//! Flow-control credit conversion between logical demand and the wire field.
//!
//! Demand is accounted as a `u64` where [`UNBOUNDED`] means "no limit". The
//! wire carries a 31-bit positive value. Every credit-carrying frame codec
//! goes through [`to_wire_value`] and [`from_wire_value`] so saturation is
//! identical everywhere.

use crate::error::IllegalArgument;

/// Largest credit the wire can express; also the wire form of [`UNBOUNDED`].
pub const MAX_WIRE_REQUEST_N: u32 = 0x7FFF_FFFF;

/// Logical sentinel for unbounded demand.
pub const UNBOUNDED: u64 = u64::MAX;

/// Clamp logical demand into the 31-bit wire field.
///
/// # Examples
///
/// ```
/// use rsocket_core::{UNBOUNDED, to_wire_value};
///
/// assert_eq!(to_wire_value(3), 3);
/// assert_eq!(to_wire_value(UNBOUNDED), 0x7FFF_FFFF);
/// ```
#[must_use]
pub fn to_wire_value(logical: u64) -> u32 {
    u32::try_from(logical.min(u64::from(MAX_WIRE_REQUEST_N))).unwrap_or(MAX_WIRE_REQUEST_N)
}

/// Promote a wire credit back to logical demand.
///
/// Exactly [`MAX_WIRE_REQUEST_N`] becomes [`UNBOUNDED`]; all other values pass
/// through unchanged.
///
/// # Examples
///
/// ```
/// use rsocket_core::{UNBOUNDED, from_wire_value};
///
/// assert_eq!(from_wire_value(42), 42);
/// assert_eq!(from_wire_value(0x7FFF_FFFF), UNBOUNDED);
/// ```
#[must_use]
pub fn from_wire_value(wire: u32) -> u64 {
    if wire == MAX_WIRE_REQUEST_N {
        UNBOUNDED
    } else {
        u64::from(wire)
    }
}

/// Validate caller-supplied signed demand and convert it to its wire form.
///
/// Values of `i64::MAX` and anything above the wire maximum saturate.
///
/// # Errors
///
/// Returns [`IllegalArgument::RequestNNotPositive`] when `request_n < 1`.
pub(crate) fn encode_requested(request_n: i64) -> Result<u32, IllegalArgument> {
    let logical = u64::try_from(request_n)
        .ok()
        .filter(|n| *n >= 1)
        .ok_or(IllegalArgument::RequestNNotPositive { value: request_n })?;
    Ok(to_wire_value(logical))
}
