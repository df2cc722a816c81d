use crate::types::PacketType;

/// Errors which can occur while decoding a property block.
///
/// Both kinds are terminal for the enclosing packet: the caller must treat the
/// whole packet as unparseable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Malformed encoding
    #[error("Format error: {0}")]
    Format(#[from] FormatError),
    /// Well formed encoding carrying content not allowed by the protocol
    #[error("Protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("Malformed variable length integer")]
    MalformedVariableLength,
    #[error("Invalid length")]
    InvalidLength,
    #[error("Max size exceeded, declared: {declared}, max: {max}")]
    MaxSizeExceeded { declared: u32, max: u32 },
    #[error("utf8 error")]
    Utf8Error,
    #[error("Unsupported packet type: {0}")]
    UnsupportedPacketType(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("Invalid property type {property} for packet {packet_type}")]
    PropertyNotAllowed { property: u8, packet_type: PacketType },
    #[error("Unknown property type {0}")]
    UnknownProperty(u8),
    #[error("Property {property} is set twice in packet {packet_type}")]
    DuplicateProperty { property: u8, packet_type: PacketType },
}

prim_enum! {
    /// Reason codes an outer layer uses when a property block is rejected
    pub enum ReasonCode {
        MalformedPacket = 0x81,
        ProtocolError = 0x82
    }
}

impl DecodeError {
    #[inline]
    pub fn is_format_error(&self) -> bool {
        matches!(self, DecodeError::Format(_))
    }

    #[inline]
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, DecodeError::Protocol(_))
    }

    /// Reason code for the DISCONNECT (or CONNACK) sent after this error.
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            DecodeError::Format(_) => ReasonCode::MalformedPacket,
            DecodeError::Protocol(_) => ReasonCode::ProtocolError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("Invalid length")]
    InvalidLength,
}
