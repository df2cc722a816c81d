//! Property catalogue and registry.
//!
//! [`PropertyId::def`] is the single table every other part of the crate is driven
//! from: the packer walks it to decide what to emit for a packet type, the unpacker
//! consults it to validate and type each tag, and [`is_valid`] is a lookup into it.

use bytes::{BufMut, Bytes, BytesMut};
use bytestring::ByteString;

use crate::error::DecodeError;
use crate::types::{PacketType, PacketTypes};
use crate::utils::{self, decode_variable_length_cursor, Decode, Encode, MAX_VARIABLE_LENGTH};

prim_enum! {
    /// MQTT v5 property identifier
    #[derive(serde::Serialize, serde::Deserialize, PartialOrd, Ord, Hash)]
    pub enum PropertyId {
        PayloadFormat = 0x01,
        MessageExpiry = 0x02,
        ContentType = 0x03,
        ResponseTopic = 0x08,
        CorrelationData = 0x09,
        SubscriptionIdentifier = 0x0B,
        SessionExpiryInterval = 0x11,
        AssignedClientId = 0x12,
        ServerKeepAlive = 0x13,
        AuthMethod = 0x15,
        AuthData = 0x16,
        RequestProblemInfo = 0x17,
        WillDelayInterval = 0x18,
        RequestResponseInfo = 0x19,
        ResponseInfo = 0x1A,
        ServerReference = 0x1C,
        ReasonString = 0x1F,
        ReceiveMaximum = 0x21,
        TopicAliasMaximum = 0x22,
        TopicAlias = 0x23,
        MaximumQos = 0x24,
        RetainAvailable = 0x25,
        UserProperty = 0x26,
        MaximumPacketSize = 0x27,
        WildcardSubAvailable = 0x28,
        SubIdAvailable = 0x29,
        SharedSubAvailable = 0x2A
    }
}

/// Encoding of a property value on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Byte,
    TwoByteInteger,
    FourByteInteger,
    VariableByteInteger,
    Utf8String,
    BinaryData,
    Utf8StringPair,
}

/// Catalogue entry of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDef {
    pub name: &'static str,
    pub wire_type: WireType,
    /// packet types the property may appear in
    pub legal_in: PacketTypes,
}

impl PropertyId {
    /// All identifiers, in ascending order; the order properties are packed in.
    pub const ALL: [PropertyId; 27] = [
        PropertyId::PayloadFormat,
        PropertyId::MessageExpiry,
        PropertyId::ContentType,
        PropertyId::ResponseTopic,
        PropertyId::CorrelationData,
        PropertyId::SubscriptionIdentifier,
        PropertyId::SessionExpiryInterval,
        PropertyId::AssignedClientId,
        PropertyId::ServerKeepAlive,
        PropertyId::AuthMethod,
        PropertyId::AuthData,
        PropertyId::RequestProblemInfo,
        PropertyId::WillDelayInterval,
        PropertyId::RequestResponseInfo,
        PropertyId::ResponseInfo,
        PropertyId::ServerReference,
        PropertyId::ReasonString,
        PropertyId::ReceiveMaximum,
        PropertyId::TopicAliasMaximum,
        PropertyId::TopicAlias,
        PropertyId::MaximumQos,
        PropertyId::RetainAvailable,
        PropertyId::UserProperty,
        PropertyId::MaximumPacketSize,
        PropertyId::WildcardSubAvailable,
        PropertyId::SubIdAvailable,
        PropertyId::SharedSubAvailable,
    ];

    pub fn def(self) -> PropertyDef {
        use PacketTypes as P;
        use WireType::*;

        let (name, wire_type, legal_in) = match self {
            PropertyId::PayloadFormat => ("payload_format", Byte, P::PUBLISH),
            PropertyId::MessageExpiry => ("message_expiry", FourByteInteger, P::PUBLISH),
            PropertyId::ContentType => ("content_type", Utf8String, P::PUBLISH),
            PropertyId::ResponseTopic => ("response_topic", Utf8String, P::PUBLISH),
            PropertyId::CorrelationData => ("correlation_data", BinaryData, P::PUBLISH),
            PropertyId::SubscriptionIdentifier => {
                ("subscription_identifier", VariableByteInteger, P::PUBLISH | P::SUBSCRIBE)
            }
            PropertyId::SessionExpiryInterval => {
                ("session_expiry_interval", FourByteInteger, P::CONNECT | P::DISCONNECT)
            }
            PropertyId::AssignedClientId => ("assigned_client_id", Utf8String, P::CONNACK),
            PropertyId::ServerKeepAlive => ("server_keep_alive", TwoByteInteger, P::CONNACK),
            PropertyId::AuthMethod => ("auth_method", Utf8String, P::CONNECT | P::CONNACK | P::AUTH),
            PropertyId::AuthData => ("auth_data", BinaryData, P::CONNECT | P::CONNACK | P::AUTH),
            PropertyId::RequestProblemInfo => ("request_problem_info", Byte, P::CONNECT),
            PropertyId::WillDelayInterval => ("will_delay_interval", FourByteInteger, P::CONNECT),
            PropertyId::RequestResponseInfo => ("request_response_info", Byte, P::CONNECT),
            PropertyId::ResponseInfo => ("response_info", Utf8String, P::CONNACK),
            PropertyId::ServerReference => ("server_reference", Utf8String, P::CONNACK | P::DISCONNECT),
            PropertyId::ReasonString => {
                ("reason_string", Utf8String, P::WITH_PROPERTIES.difference(P::CONNECT))
            }
            PropertyId::ReceiveMaximum => ("receive_maximum", TwoByteInteger, P::CONNECT | P::CONNACK),
            PropertyId::TopicAliasMaximum => {
                ("topic_alias_maximum", TwoByteInteger, P::CONNECT | P::CONNACK)
            }
            PropertyId::TopicAlias => ("topic_alias", TwoByteInteger, P::PUBLISH),
            PropertyId::MaximumQos => ("maximum_qos", Byte, P::CONNECT | P::CONNACK),
            PropertyId::RetainAvailable => ("retain_available", Byte, P::CONNACK),
            PropertyId::UserProperty => ("user", Utf8StringPair, P::WITH_PROPERTIES),
            PropertyId::MaximumPacketSize => {
                ("maximum_packet_size", FourByteInteger, P::CONNECT | P::CONNACK)
            }
            PropertyId::WildcardSubAvailable => ("wildcard_sub_available", Byte, P::CONNACK),
            PropertyId::SubIdAvailable => ("sub_id_available", Byte, P::CONNACK),
            PropertyId::SharedSubAvailable => ("shared_sub_available", Byte, P::CONNACK),
        };
        PropertyDef { name, wire_type, legal_in }
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.def().name
    }

    #[inline]
    pub fn wire_type(self) -> WireType {
        self.def().wire_type
    }

    #[inline]
    pub fn legal_in(self) -> PacketTypes {
        self.def().legal_in
    }

    #[inline]
    pub fn is_allowed_in(self, packet_type: PacketType) -> bool {
        self.legal_in().contains(packet_type.flag())
    }

    /// Only user properties may occur more than once in a block.
    #[inline]
    pub fn allows_repeat(self) -> bool {
        matches!(self, PropertyId::UserProperty)
    }
}

/// Checks whether the raw property identifier `id` may appear in a packet of `packet_type`.
///
/// Unknown identifiers are never valid.
#[inline]
pub fn is_valid(packet_type: PacketType, id: u8) -> bool {
    PropertyId::try_from(id).is_ok_and(|id| id.is_allowed_in(packet_type))
}

/// Properties that may appear in a packet of `packet_type`, in packing order.
pub fn legal_properties(packet_type: PacketType) -> impl Iterator<Item = PropertyId> {
    PropertyId::ALL.into_iter().filter(move |id| id.is_allowed_in(packet_type))
}

/// Typed property value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Byte(u8),
    TwoByteInteger(u16),
    FourByteInteger(u32),
    VariableByteInteger(u32),
    Utf8String(ByteString),
    BinaryData(Bytes),
    Utf8StringPair(ByteString, ByteString),
}

impl PropertyValue {
    pub fn wire_type(&self) -> WireType {
        match self {
            PropertyValue::Byte(_) => WireType::Byte,
            PropertyValue::TwoByteInteger(_) => WireType::TwoByteInteger,
            PropertyValue::FourByteInteger(_) => WireType::FourByteInteger,
            PropertyValue::VariableByteInteger(_) => WireType::VariableByteInteger,
            PropertyValue::Utf8String(_) => WireType::Utf8String,
            PropertyValue::BinaryData(_) => WireType::BinaryData,
            PropertyValue::Utf8StringPair(_, _) => WireType::Utf8StringPair,
        }
    }

    pub(crate) fn decode(wire_type: WireType, src: &mut Bytes) -> Result<Self, DecodeError> {
        let v = match wire_type {
            WireType::Byte => PropertyValue::Byte(u8::decode(src)?),
            WireType::TwoByteInteger => PropertyValue::TwoByteInteger(u16::decode(src)?),
            WireType::FourByteInteger => PropertyValue::FourByteInteger(u32::decode(src)?),
            WireType::VariableByteInteger => {
                PropertyValue::VariableByteInteger(decode_variable_length_cursor(src)?)
            }
            WireType::Utf8String => PropertyValue::Utf8String(ByteString::decode(src)?),
            WireType::BinaryData => PropertyValue::BinaryData(Bytes::decode(src)?),
            WireType::Utf8StringPair => {
                let (key, val) = <(ByteString, ByteString)>::decode(src)?;
                PropertyValue::Utf8StringPair(key, val)
            }
        };
        Ok(v)
    }
}

impl Encode for PropertyValue {
    fn encoded_size(&self) -> usize {
        match self {
            PropertyValue::Byte(v) => v.encoded_size(),
            PropertyValue::TwoByteInteger(v) => v.encoded_size(),
            PropertyValue::FourByteInteger(v) => v.encoded_size(),
            PropertyValue::VariableByteInteger(v) => utils::var_int_len(*v as usize),
            PropertyValue::Utf8String(v) => v.encoded_size(),
            PropertyValue::BinaryData(v) => v.encoded_size(),
            PropertyValue::Utf8StringPair(k, v) => k.encoded_size() + v.encoded_size(),
        }
    }

    fn is_encodable(&self) -> bool {
        match self {
            PropertyValue::VariableByteInteger(v) => *v <= MAX_VARIABLE_LENGTH,
            PropertyValue::Utf8String(v) => v.is_encodable(),
            PropertyValue::BinaryData(v) => v.is_encodable(),
            PropertyValue::Utf8StringPair(k, v) => k.is_encodable() && v.is_encodable(),
            _ => true,
        }
    }

    fn encode(&self, buf: &mut BytesMut) {
        match self {
            PropertyValue::Byte(v) => buf.put_u8(*v),
            PropertyValue::TwoByteInteger(v) => v.encode(buf),
            PropertyValue::FourByteInteger(v) => v.encode(buf),
            PropertyValue::VariableByteInteger(v) => {
                // is_encodable() is checked by the packer before encoding
                let _ = utils::write_variable_length(*v, buf);
            }
            PropertyValue::Utf8String(v) => v.encode(buf),
            PropertyValue::BinaryData(v) => v.encode(buf),
            PropertyValue::Utf8StringPair(k, v) => {
                k.encode(buf);
                v.encode(buf)
            }
        }
    }
}
