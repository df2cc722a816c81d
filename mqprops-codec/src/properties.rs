use bytes::{Bytes, BytesMut};
use bytestring::ByteString;
use serde::{Deserialize, Serialize};

use crate::error::EncodeError;
use crate::property::{PropertyId, PropertyValue};
use crate::types::PacketType;

pub type UserProperty = (ByteString, ByteString);
pub type UserProperties = Vec<UserProperty>;

/// Properties of a single MQTT v5 packet.
///
/// The same type is used for every packet type; which properties are legal
/// depends on the enclosing packet (see [`PropertyId::is_allowed_in`]).
#[derive(Debug, Default, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Properties {
    /// 0 is unspecified bytes, 1 is UTF-8 encoded character data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_format: Option<u8>,
    /// lifetime of the message, unit: seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_expiry: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ByteString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_topic: Option<ByteString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_data: Option<Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_identifier: Option<u32>,
    /// unit: seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_expiry_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_client_id: Option<ByteString>,
    /// unit: seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_keep_alive: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<ByteString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_data: Option<Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_problem_info: Option<u8>,
    /// unit: seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub will_delay_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_response_info: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_info: Option<ByteString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_reference: Option<ByteString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_string: Option<ByteString>,
    /// maximum number of unacknowledged QoS 1 and QoS 2 messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receive_maximum: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_alias_maximum: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_alias: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_qos: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retain_available: Option<u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user: UserProperties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_packet_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wildcard_sub_available: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_id_available: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_sub_available: Option<u8>,
}

macro_rules! setters {
    ($( $field:ident: into $ty:ty ),+ $(,)?) => {
        $(
            #[inline]
            pub fn $field(mut self, v: impl Into<$ty>) -> Self {
                self.$field = Some(v.into());
                self
            }
        )+
    };
    ($( $field:ident: $ty:ty ),+ $(,)?) => {
        $(
            #[inline]
            pub fn $field(mut self, v: $ty) -> Self {
                self.$field = Some(v);
                self
            }
        )+
    };
}

impl Properties {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    setters! {
        payload_format: u8,
        message_expiry: u32,
        subscription_identifier: u32,
        session_expiry_interval: u32,
        server_keep_alive: u16,
        request_problem_info: u8,
        will_delay_interval: u32,
        request_response_info: u8,
        receive_maximum: u16,
        topic_alias_maximum: u16,
        topic_alias: u16,
        maximum_qos: u8,
        retain_available: u8,
        maximum_packet_size: u32,
        wildcard_sub_available: u8,
        sub_id_available: u8,
        shared_sub_available: u8,
    }

    setters! {
        content_type: into ByteString,
        response_topic: into ByteString,
        correlation_data: into Bytes,
        assigned_client_id: into ByteString,
        auth_method: into ByteString,
        auth_data: into Bytes,
        response_info: into ByteString,
        server_reference: into ByteString,
        reason_string: into ByteString,
    }

    /// Sets user property `key`, replacing every entry already stored under it.
    #[inline]
    pub fn user_property(mut self, key: impl Into<ByteString>, val: impl Into<ByteString>) -> Self {
        self.set_user_property(key, val);
        self
    }

    /// Merges `props` entry by entry, with the same replace semantics as [`Properties::user_property`].
    pub fn user_properties<I, K, V>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<ByteString>,
        V: Into<ByteString>,
    {
        for (key, val) in props {
            self.set_user_property(key, val);
        }
        self
    }

    pub fn set_user_property(&mut self, key: impl Into<ByteString>, val: impl Into<ByteString>) {
        let key = key.into();
        self.user.retain(|(k, _)| *k != key);
        self.user.push((key, val.into()));
    }

    /// Appends a user property, keeping entries already stored under the same key.
    #[inline]
    pub fn push_user_property(&mut self, key: impl Into<ByteString>, val: impl Into<ByteString>) {
        self.user.push((key.into(), val.into()));
    }

    /// First value stored under `key`.
    pub fn get_user_property(&self, key: &str) -> Option<&ByteString> {
        self.user.iter().find(|(k, _)| &**k == key).map(|(_, v)| v)
    }

    /// Value of the property `id`, `None` when absent.
    ///
    /// User properties are a collection and are never returned here; see [`Properties::user`].
    pub fn get(&self, id: PropertyId) -> Option<PropertyValue> {
        use PropertyValue::*;

        match id {
            PropertyId::PayloadFormat => self.payload_format.map(Byte),
            PropertyId::MessageExpiry => self.message_expiry.map(FourByteInteger),
            PropertyId::ContentType => self.content_type.clone().map(Utf8String),
            PropertyId::ResponseTopic => self.response_topic.clone().map(Utf8String),
            PropertyId::CorrelationData => self.correlation_data.clone().map(BinaryData),
            PropertyId::SubscriptionIdentifier => self.subscription_identifier.map(VariableByteInteger),
            PropertyId::SessionExpiryInterval => self.session_expiry_interval.map(FourByteInteger),
            PropertyId::AssignedClientId => self.assigned_client_id.clone().map(Utf8String),
            PropertyId::ServerKeepAlive => self.server_keep_alive.map(TwoByteInteger),
            PropertyId::AuthMethod => self.auth_method.clone().map(Utf8String),
            PropertyId::AuthData => self.auth_data.clone().map(BinaryData),
            PropertyId::RequestProblemInfo => self.request_problem_info.map(Byte),
            PropertyId::WillDelayInterval => self.will_delay_interval.map(FourByteInteger),
            PropertyId::RequestResponseInfo => self.request_response_info.map(Byte),
            PropertyId::ResponseInfo => self.response_info.clone().map(Utf8String),
            PropertyId::ServerReference => self.server_reference.clone().map(Utf8String),
            PropertyId::ReasonString => self.reason_string.clone().map(Utf8String),
            PropertyId::ReceiveMaximum => self.receive_maximum.map(TwoByteInteger),
            PropertyId::TopicAliasMaximum => self.topic_alias_maximum.map(TwoByteInteger),
            PropertyId::TopicAlias => self.topic_alias.map(TwoByteInteger),
            PropertyId::MaximumQos => self.maximum_qos.map(Byte),
            PropertyId::RetainAvailable => self.retain_available.map(Byte),
            PropertyId::UserProperty => None,
            PropertyId::MaximumPacketSize => self.maximum_packet_size.map(FourByteInteger),
            PropertyId::WildcardSubAvailable => self.wildcard_sub_available.map(Byte),
            PropertyId::SubIdAvailable => self.sub_id_available.map(Byte),
            PropertyId::SharedSubAvailable => self.shared_sub_available.map(Byte),
        }
    }

    /// Stores `value` as property `id`, overwriting a previous value.
    ///
    /// A user property value is appended to the collection. Returns `false` and
    /// leaves `self` untouched when the value type does not match the property.
    pub fn set(&mut self, id: PropertyId, value: PropertyValue) -> bool {
        use PropertyValue::*;

        match (id, value) {
            (PropertyId::PayloadFormat, Byte(v)) => self.payload_format = Some(v),
            (PropertyId::MessageExpiry, FourByteInteger(v)) => self.message_expiry = Some(v),
            (PropertyId::ContentType, Utf8String(v)) => self.content_type = Some(v),
            (PropertyId::ResponseTopic, Utf8String(v)) => self.response_topic = Some(v),
            (PropertyId::CorrelationData, BinaryData(v)) => self.correlation_data = Some(v),
            (PropertyId::SubscriptionIdentifier, VariableByteInteger(v)) => {
                self.subscription_identifier = Some(v)
            }
            (PropertyId::SessionExpiryInterval, FourByteInteger(v)) => self.session_expiry_interval = Some(v),
            (PropertyId::AssignedClientId, Utf8String(v)) => self.assigned_client_id = Some(v),
            (PropertyId::ServerKeepAlive, TwoByteInteger(v)) => self.server_keep_alive = Some(v),
            (PropertyId::AuthMethod, Utf8String(v)) => self.auth_method = Some(v),
            (PropertyId::AuthData, BinaryData(v)) => self.auth_data = Some(v),
            (PropertyId::RequestProblemInfo, Byte(v)) => self.request_problem_info = Some(v),
            (PropertyId::WillDelayInterval, FourByteInteger(v)) => self.will_delay_interval = Some(v),
            (PropertyId::RequestResponseInfo, Byte(v)) => self.request_response_info = Some(v),
            (PropertyId::ResponseInfo, Utf8String(v)) => self.response_info = Some(v),
            (PropertyId::ServerReference, Utf8String(v)) => self.server_reference = Some(v),
            (PropertyId::ReasonString, Utf8String(v)) => self.reason_string = Some(v),
            (PropertyId::ReceiveMaximum, TwoByteInteger(v)) => self.receive_maximum = Some(v),
            (PropertyId::TopicAliasMaximum, TwoByteInteger(v)) => self.topic_alias_maximum = Some(v),
            (PropertyId::TopicAlias, TwoByteInteger(v)) => self.topic_alias = Some(v),
            (PropertyId::MaximumQos, Byte(v)) => self.maximum_qos = Some(v),
            (PropertyId::RetainAvailable, Byte(v)) => self.retain_available = Some(v),
            (PropertyId::UserProperty, Utf8StringPair(k, v)) => self.user.push((k, v)),
            (PropertyId::MaximumPacketSize, FourByteInteger(v)) => self.maximum_packet_size = Some(v),
            (PropertyId::WildcardSubAvailable, Byte(v)) => self.wildcard_sub_available = Some(v),
            (PropertyId::SubIdAvailable, Byte(v)) => self.sub_id_available = Some(v),
            (PropertyId::SharedSubAvailable, Byte(v)) => self.shared_sub_available = Some(v),
            _ => return false,
        }
        true
    }

    #[inline]
    pub fn is_set(&self, id: PropertyId) -> bool {
        match id {
            PropertyId::UserProperty => !self.user.is_empty(),
            _ => self.get(id).is_some(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !PropertyId::ALL.into_iter().any(|id| self.is_set(id))
    }

    /// Properties which are set but not legal for `packet_type`, i.e. those
    /// [`Properties::pack`] leaves out.
    pub fn illegal_for(&self, packet_type: PacketType) -> Vec<PropertyId> {
        PropertyId::ALL
            .into_iter()
            .filter(|id| self.is_set(*id) && !id.is_allowed_in(packet_type))
            .collect()
    }

    /// Property block body for `packet_type`, without its length prefix.
    #[inline]
    pub fn pack(&self, packet_type: PacketType) -> Bytes {
        crate::pack::pack(Some(self), packet_type)
    }

    /// Writes the length prefixed property block for `packet_type` into `buf`.
    #[inline]
    pub fn encode(&self, packet_type: PacketType, buf: &mut BytesMut) -> Result<(), EncodeError> {
        crate::pack::encode_block(self, packet_type, buf)
    }
}
