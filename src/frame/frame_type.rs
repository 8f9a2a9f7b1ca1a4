//! The 6-bit frame type field.

use std::fmt;

use crate::error::ProtocolViolation;

/// Frame types assigned by RSocket 1.0.
///
/// # Examples
///
/// ```
/// use rsocket_core::FrameType;
///
/// let ty = FrameType::from_code(0x07).expect("known code");
/// assert_eq!(ty, FrameType::RequestChannel);
/// assert_eq!(ty.to_string(), "REQUEST_CHANNEL");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Reserved code `0x00`; never sent by a conforming peer.
    Reserved,
    /// Connection setup.
    Setup,
    /// Lease grant.
    Lease,
    /// Connection keepalive.
    Keepalive,
    /// Single request, single response.
    RequestResponse,
    /// Fire-and-forget request.
    RequestFnf,
    /// Request a finite or infinite stream.
    RequestStream,
    /// Open a bidirectional channel.
    RequestChannel,
    /// Additional flow-control credit.
    RequestN,
    /// Cancel an outstanding request.
    Cancel,
    /// Payload on an active stream, also used for follow fragments.
    Payload,
    /// Connection or stream error.
    Error,
    /// Connection-level metadata.
    MetadataPush,
    /// Resumption request.
    Resume,
    /// Resumption acknowledgement.
    ResumeOk,
    /// Extension frame.
    Ext,
}

impl FrameType {
    /// Every assigned frame type, in code order.
    pub const ALL: [Self; 16] = [
        Self::Reserved,
        Self::Setup,
        Self::Lease,
        Self::Keepalive,
        Self::RequestResponse,
        Self::RequestFnf,
        Self::RequestStream,
        Self::RequestChannel,
        Self::RequestN,
        Self::Cancel,
        Self::Payload,
        Self::Error,
        Self::MetadataPush,
        Self::Resume,
        Self::ResumeOk,
        Self::Ext,
    ];

    /// Resolve a 6-bit wire code.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolViolation::UnknownFrameType`] for unassigned codes.
    pub const fn from_code(code: u8) -> Result<Self, ProtocolViolation> {
        let ty = match code {
            0x00 => Self::Reserved,
            0x01 => Self::Setup,
            0x02 => Self::Lease,
            0x03 => Self::Keepalive,
            0x04 => Self::RequestResponse,
            0x05 => Self::RequestFnf,
            0x06 => Self::RequestStream,
            0x07 => Self::RequestChannel,
            0x08 => Self::RequestN,
            0x09 => Self::Cancel,
            0x0A => Self::Payload,
            0x0B => Self::Error,
            0x0C => Self::MetadataPush,
            0x0D => Self::Resume,
            0x0E => Self::ResumeOk,
            0x3F => Self::Ext,
            _ => return Err(ProtocolViolation::UnknownFrameType { code }),
        };
        Ok(ty)
    }

    /// The 6-bit wire code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Reserved => 0x00,
            Self::Setup => 0x01,
            Self::Lease => 0x02,
            Self::Keepalive => 0x03,
            Self::RequestResponse => 0x04,
            Self::RequestFnf => 0x05,
            Self::RequestStream => 0x06,
            Self::RequestChannel => 0x07,
            Self::RequestN => 0x08,
            Self::Cancel => 0x09,
            Self::Payload => 0x0A,
            Self::Error => 0x0B,
            Self::MetadataPush => 0x0C,
            Self::Resume => 0x0D,
            Self::ResumeOk => 0x0E,
            Self::Ext => 0x3F,
        }
    }

    /// Name as written in the protocol documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reserved => "RESERVED",
            Self::Setup => "SETUP",
            Self::Lease => "LEASE",
            Self::Keepalive => "KEEPALIVE",
            Self::RequestResponse => "REQUEST_RESPONSE",
            Self::RequestFnf => "REQUEST_FNF",
            Self::RequestStream => "REQUEST_STREAM",
            Self::RequestChannel => "REQUEST_CHANNEL",
            Self::RequestN => "REQUEST_N",
            Self::Cancel => "CANCEL",
            Self::Payload => "PAYLOAD",
            Self::Error => "ERROR",
            Self::MetadataPush => "METADATA_PUSH",
            Self::Resume => "RESUME",
            Self::ResumeOk => "RESUME_OK",
            Self::Ext => "EXT",
        }
    }

    /// Whether this type opens a new stream.
    #[must_use]
    pub const fn is_request(self) -> bool {
        matches!(
            self,
            Self::RequestResponse | Self::RequestFnf | Self::RequestStream | Self::RequestChannel
        )
    }

    /// Whether the body starts with an initial request-N field.
    #[must_use]
    pub const fn has_initial_request_n(self) -> bool {
        matches!(self, Self::RequestStream | Self::RequestChannel)
    }

    /// Whether frames of this type may carry the FOLLOWS flag.
    #[must_use]
    pub const fn is_fragmentable(self) -> bool { self.is_request() || matches!(self, Self::Payload) }

    /// Whether frames of this type must travel on stream 0.
    #[must_use]
    pub const fn is_connection_level(self) -> bool {
        matches!(
            self,
            Self::Setup
                | Self::Lease
                | Self::Keepalive
                | Self::MetadataPush
                | Self::Resume
                | Self::ResumeOk
        )
    }

    /// Whether frames of this type must travel on a non-zero stream.
    #[must_use]
    pub const fn is_stream_level(self) -> bool {
        self.is_fragmentable() || matches!(self, Self::RequestN | Self::Cancel)
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}
