use std::fmt;
use std::str::FromStr;

use crate::error::{DecodeError, FormatError};

prim_enum! {
    /// MQTT control packet type, the kind of packet enclosing a property block
    #[derive(serde::Serialize, serde::Deserialize, PartialOrd, Ord, Hash)]
    #[serde(rename_all = "lowercase")]
    pub enum PacketType {
        /// Client request to connect to Server
        Connect = 1,
        /// Connect acknowledgment
        ConnAck = 2,
        /// Publish message
        Publish = 3,
        /// Publish acknowledgment
        PubAck = 4,
        /// Publish received (assured delivery part 1)
        PubRec = 5,
        /// Publish release (assured delivery part 2)
        PubRel = 6,
        /// Publish complete (assured delivery part 3)
        PubComp = 7,
        /// Client subscribe request
        Subscribe = 8,
        /// Subscribe acknowledgment
        SubAck = 9,
        /// Unsubscribe request
        Unsubscribe = 10,
        /// Unsubscribe acknowledgment
        UnsubAck = 11,
        /// PING request
        PingReq = 12,
        /// PING response
        PingResp = 13,
        /// Disconnection is advertised
        Disconnect = 14,
        /// Auth exchange
        Auth = 15
    }
}

impl PacketType {
    pub const ALL: [PacketType; 15] = [
        PacketType::Connect,
        PacketType::ConnAck,
        PacketType::Publish,
        PacketType::PubAck,
        PacketType::PubRec,
        PacketType::PubRel,
        PacketType::PubComp,
        PacketType::Subscribe,
        PacketType::SubAck,
        PacketType::Unsubscribe,
        PacketType::UnsubAck,
        PacketType::PingReq,
        PacketType::PingResp,
        PacketType::Disconnect,
        PacketType::Auth,
    ];

    /// Packet type from the first byte of a fixed header.
    #[inline]
    pub fn from_first_byte(first_byte: u8) -> Result<PacketType, DecodeError> {
        PacketType::try_from(first_byte >> 4).map_err(|v| FormatError::UnsupportedPacketType(v).into())
    }

    #[inline]
    pub const fn flag(self) -> PacketTypes {
        PacketTypes::from_bits_retain(1 << (self as u16))
    }

    /// Whether packets of this type carry a property block at all.
    #[inline]
    pub fn has_properties(self) -> bool {
        PacketTypes::WITH_PROPERTIES.contains(self.flag())
    }

    pub fn name(self) -> &'static str {
        match self {
            PacketType::Connect => "CONNECT",
            PacketType::ConnAck => "CONNACK",
            PacketType::Publish => "PUBLISH",
            PacketType::PubAck => "PUBACK",
            PacketType::PubRec => "PUBREC",
            PacketType::PubRel => "PUBREL",
            PacketType::PubComp => "PUBCOMP",
            PacketType::Subscribe => "SUBSCRIBE",
            PacketType::SubAck => "SUBACK",
            PacketType::Unsubscribe => "UNSUBSCRIBE",
            PacketType::UnsubAck => "UNSUBACK",
            PacketType::PingReq => "PINGREQ",
            PacketType::PingResp => "PINGRESP",
            PacketType::Disconnect => "DISCONNECT",
            PacketType::Auth => "AUTH",
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PacketType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PacketType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown packet type: {s}"))
    }
}

bitflags::bitflags! {
    /// Set of packet types
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct PacketTypes: u16 {
        const CONNECT     = 1 << 1;
        const CONNACK     = 1 << 2;
        const PUBLISH     = 1 << 3;
        const PUBACK      = 1 << 4;
        const PUBREC      = 1 << 5;
        const PUBREL      = 1 << 6;
        const PUBCOMP     = 1 << 7;
        const SUBSCRIBE   = 1 << 8;
        const SUBACK      = 1 << 9;
        const UNSUBSCRIBE = 1 << 10;
        const UNSUBACK    = 1 << 11;
        const PINGREQ     = 1 << 12;
        const PINGRESP    = 1 << 13;
        const DISCONNECT  = 1 << 14;
        const AUTH        = 1 << 15;

        const WITH_PROPERTIES = !(Self::PINGREQ.bits() | Self::PINGRESP.bits()) & !1;
    }
}

impl PacketTypes {
    /// Iterates the packet types contained in the set, in control code order.
    pub fn packet_types(self) -> impl Iterator<Item = PacketType> {
        PacketType::ALL.into_iter().filter(move |t| self.contains(t.flag()))
    }
}
