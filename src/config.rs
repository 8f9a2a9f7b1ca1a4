//! Per-connection limits.
//!
//! [`ConnectionConfig`] gathers the values a connection needs before any
//! frame flows: which side allocates odd or even stream ids, the MTU for
//! outbound fragmentation, the frame length ceiling, and the bound on
//! reassembled inbound payloads. It derives `serde` traits with field
//! defaults so it can be embedded in an application's own configuration
//! file.

use serde::{Deserialize, Serialize};

use crate::{
    codec::FRAME_LENGTH_MASK,
    error::IllegalArgument,
    fragment::Fragmenter,
    stream::Role,
};

/// Smallest accepted `max_inbound_payload_size`.
pub const MIN_INBOUND_PAYLOAD_SIZE: usize = 64;

/// Default bound on reassembled inbound payloads.
pub const DEFAULT_MAX_INBOUND_PAYLOAD_SIZE: usize = 0x7FFF_FFFF;

/// Limits applied to one RSocket connection.
///
/// # Examples
///
/// ```
/// use rsocket_core::{ConnectionConfig, Role};
///
/// let config = ConnectionConfig::default()
///     .with_role(Role::Server)
///     .with_mtu(1_500)
///     .with_max_inbound_payload_size(1 << 20);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Which side of the connection this is.
    pub role: Role,
    /// Outbound fragment size including the length prefix; 0 disables
    /// fragmentation.
    pub mtu: usize,
    /// Largest frame, excluding the length prefix.
    pub max_frame_length: usize,
    /// Largest reassembled payload accepted from the peer.
    pub max_inbound_payload_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            role: Role::default(),
            mtu: 0,
            max_frame_length: FRAME_LENGTH_MASK,
            max_inbound_payload_size: DEFAULT_MAX_INBOUND_PAYLOAD_SIZE,
        }
    }
}

impl ConnectionConfig {
    /// Set the connection role.
    #[must_use]
    pub const fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Set the outbound MTU.
    #[must_use]
    pub const fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    /// Set the maximum frame length.
    #[must_use]
    pub const fn with_max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.max_frame_length = max_frame_length;
        self
    }

    /// Set the inbound reassembly bound.
    #[must_use]
    pub const fn with_max_inbound_payload_size(mut self, size: usize) -> Self {
        self.max_inbound_payload_size = size;
        self
    }

    /// Build the outbound fragmenter these limits describe.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalArgument::InvalidMaxFrameLength`] or
    /// [`IllegalArgument::InvalidMtu`] for out-of-range limits.
    pub fn fragmenter(&self) -> Result<Fragmenter, IllegalArgument> {
        Fragmenter::new(self.mtu, self.max_frame_length)
    }

    /// Check every limit.
    ///
    /// # Errors
    ///
    /// Returns the first [`IllegalArgument`] found: frame length, then MTU,
    /// then inbound payload size.
    pub fn validate(&self) -> Result<(), IllegalArgument> {
        self.fragmenter()?;
        if self.max_inbound_payload_size < MIN_INBOUND_PAYLOAD_SIZE {
            return Err(IllegalArgument::InvalidMaxInboundPayloadSize {
                value: self.max_inbound_payload_size,
                min: MIN_INBOUND_PAYLOAD_SIZE,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ConnectionConfig::default();
        assert_eq!(config.role, Role::Client);
        assert_eq!(config.mtu, 0);
        assert_eq!(config.max_frame_length, 0xFF_FFFF);
        assert_eq!(config.validate(), Ok(()));
    }

    #[rstest]
    #[case::mtu_below_minimum(
        ConnectionConfig::default().with_mtu(63),
        IllegalArgument::InvalidMtu { mtu: 63, min: 64, max: 0xFF_FFFF }
    )]
    #[case::mtu_above_frame_length(
        ConnectionConfig::default().with_max_frame_length(1_024).with_mtu(1_500),
        IllegalArgument::InvalidMtu { mtu: 1_500, min: 64, max: 1_024 }
    )]
    #[case::frame_length_too_large(
        ConnectionConfig::default().with_max_frame_length(0x0100_0000),
        IllegalArgument::InvalidMaxFrameLength { value: 0x0100_0000, min: 64, max: 0xFF_FFFF }
    )]
    #[case::inbound_too_small(
        ConnectionConfig::default().with_max_inbound_payload_size(10),
        IllegalArgument::InvalidMaxInboundPayloadSize { value: 10, min: 64 }
    )]
    fn invalid_limits_are_rejected(
        #[case] config: ConnectionConfig,
        #[case] expected: IllegalArgument,
    ) {
        assert_eq!(config.validate(), Err(expected));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: ConnectionConfig =
            serde_json::from_str(r#"{ "role": "server", "mtu": 1500 }"#).expect("deserialize");
        assert_eq!(
            config,
            ConnectionConfig::default()
                .with_role(Role::Server)
                .with_mtu(1_500)
        );
    }

    #[test]
    fn serializes_role_in_lowercase() {
        let json = serde_json::to_value(ConnectionConfig::default()).expect("serialize");
        assert_eq!(json["role"], "client");
        assert_eq!(json["max_inbound_payload_size"], 0x7FFF_FFFF);
    }
}
