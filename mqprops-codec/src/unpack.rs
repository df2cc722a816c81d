use bytes::{Buf, Bytes};
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, ProtocolViolation};
use crate::properties::Properties;
use crate::property::{PropertyId, PropertyValue};
use crate::types::PacketType;
use crate::utils::{take_properties, MAX_VARIABLE_LENGTH};

/// What to do when a property which may occur only once is received twice.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail with [`ProtocolViolation::DuplicateProperty`]
    #[default]
    Reject,
    /// Keep the last value received
    Overwrite,
}

/// Property block decoder.
///
/// ```
/// use mqprops_codec::{PacketType, Unpacker};
///
/// let mut src: &[u8] = b"\x0d\x03\x00\x0atext/plain";
/// let props = Unpacker::new().unpack(&mut src, PacketType::Publish).unwrap();
/// assert_eq!(props.content_type.as_deref(), Some("text/plain"));
/// assert!(src.is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unpacker {
    duplicates: DuplicatePolicy,
    max_block_size: u32,
}

impl Default for Unpacker {
    fn default() -> Self {
        Self { duplicates: DuplicatePolicy::default(), max_block_size: MAX_VARIABLE_LENGTH }
    }
}

impl Unpacker {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    /// Largest declared block length accepted, in bytes.
    #[inline]
    pub fn max_block_size(mut self, max: u32) -> Self {
        self.max_block_size = max;
        self
    }

    /// Reads one length prefixed property block for `packet_type` from `src`.
    ///
    /// On success `src` is advanced past the block and nothing more. Any error
    /// is fatal for the enclosing packet.
    pub fn unpack<B: Buf>(&self, src: &mut B, packet_type: PacketType) -> Result<Properties, DecodeError> {
        self.unpack_block(src, packet_type)
            .inspect_err(|e| log::debug!("rejecting {} properties: {}", packet_type, e))
    }

    fn unpack_block<B: Buf>(&self, src: &mut B, packet_type: PacketType) -> Result<Properties, DecodeError> {
        let prop_src = &mut take_properties(src, self.max_block_size)?;
        let mut props = Properties::default();
        while prop_src.has_remaining() {
            let tag = prop_src.get_u8();
            let id = PropertyId::try_from(tag).map_err(ProtocolViolation::UnknownProperty)?;
            ensure!(
                id.is_allowed_in(packet_type),
                ProtocolViolation::PropertyNotAllowed { property: tag, packet_type }
            );
            self.read_value(&mut props, id, prop_src, packet_type)?;
        }
        Ok(props)
    }

    fn read_value(
        &self,
        props: &mut Properties,
        id: PropertyId,
        src: &mut Bytes,
        packet_type: PacketType,
    ) -> Result<(), DecodeError> {
        let value = PropertyValue::decode(id.wire_type(), src)?;
        if !id.allows_repeat() && props.is_set(id) {
            // property is set twice while not allowed
            ensure!(
                self.duplicates == DuplicatePolicy::Overwrite,
                ProtocolViolation::DuplicateProperty { property: id.into(), packet_type }
            );
        }
        log::trace!("{} property {:?}: {:?}", packet_type, id, value);
        props.set(id, value);
        Ok(())
    }
}

/// Reads a property block with the default [`Unpacker`].
#[inline]
pub fn unpack<B: Buf>(src: &mut B, packet_type: PacketType) -> Result<Properties, DecodeError> {
    Unpacker::default().unpack(src, packet_type)
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use bytestring::ByteString;

    use super::*;
    use crate::error::FormatError;
    use crate::pack::encode_block;
    use crate::property::WireType;

    fn sample_value(wire_type: WireType) -> PropertyValue {
        match wire_type {
            WireType::Byte => PropertyValue::Byte(1),
            WireType::TwoByteInteger => PropertyValue::TwoByteInteger(0x0102),
            WireType::FourByteInteger => PropertyValue::FourByteInteger(0x01020304),
            WireType::VariableByteInteger => PropertyValue::VariableByteInteger(321),
            WireType::Utf8String => PropertyValue::Utf8String("text".into()),
            WireType::BinaryData => PropertyValue::BinaryData(Bytes::from_static(b"\x00\x01\xfe")),
            WireType::Utf8StringPair => PropertyValue::Utf8StringPair("key".into(), "val".into()),
        }
    }

    fn sample_value_bytes(wire_type: WireType) -> &'static [u8] {
        match wire_type {
            WireType::Byte => b"\x01",
            WireType::TwoByteInteger => b"\x01\x02",
            WireType::FourByteInteger => b"\x01\x02\x03\x04",
            WireType::VariableByteInteger => b"\xc1\x02",
            WireType::Utf8String => b"\x00\x04text",
            WireType::BinaryData => b"\x00\x03\x00\x01\xfe",
            WireType::Utf8StringPair => b"\x00\x03key\x00\x03val",
        }
    }

    fn block(body: &[u8]) -> Bytes {
        assert!(body.len() < 128);
        let mut buf = vec![body.len() as u8];
        buf.extend_from_slice(body);
        Bytes::from(buf)
    }

    fn legal_sample(packet_type: PacketType) -> Properties {
        let mut props = Properties::new();
        for id in crate::property::legal_properties(packet_type) {
            assert!(props.set(id, sample_value(id.wire_type())));
        }
        if PropertyId::UserProperty.is_allowed_in(packet_type) {
            props.push_user_property("key", "other");
            props.push_user_property("k2", "v2");
        }
        props
    }

    #[test]
    fn test_unpack_content_type() {
        let mut src = Bytes::from_static(b"\x0d\x03\x00\x0atext/plain");
        let props = unpack(&mut src, PacketType::Publish).unwrap();
        assert_eq!(props, Properties::new().content_type("text/plain"));
        assert!(src.is_empty());
    }

    #[test]
    fn test_unpack_zero_length() {
        let mut src = Bytes::from_static(b"\x00\x03\x00");
        for kind in PacketType::ALL {
            let mut cur = src.clone();
            assert_eq!(unpack(&mut cur, kind).unwrap(), Properties::default());
            assert_eq!(cur, b"\x03\x00".as_ref());
        }
        unpack(&mut src, PacketType::PingReq).unwrap();
    }

    #[test]
    fn test_unpack_leaves_trailing_bytes() {
        let mut src: &[u8] = b"\x03\x23\x00\x05\xaa\xbb";
        let props = unpack(&mut src, PacketType::Publish).unwrap();
        assert_eq!(props.topic_alias, Some(5));
        assert_eq!(src, b"\xaa\xbb");
    }

    #[test]
    fn test_unknown_property() {
        let mut src = block(b"\x04\x01");
        assert_eq!(
            unpack(&mut src, PacketType::Publish),
            Err(DecodeError::Protocol(ProtocolViolation::UnknownProperty(0x04)))
        );

        // unknown is reported as unknown, even after a valid property
        let mut src = block(b"\x23\x00\x01\x7f");
        assert!(matches!(
            unpack(&mut src, PacketType::Publish),
            Err(DecodeError::Protocol(ProtocolViolation::UnknownProperty(0x7f)))
        ));
    }

    #[test]
    fn test_property_not_allowed() {
        let mut src = block(b"\x21\x00\x0a");
        assert_eq!(
            unpack(&mut src, PacketType::Publish),
            Err(DecodeError::Protocol(ProtocolViolation::PropertyNotAllowed {
                property: 0x21,
                packet_type: PacketType::Publish
            }))
        );
    }

    #[test]
    fn test_legality_enforced_for_every_kind() {
        for kind in PacketType::ALL {
            for id in PropertyId::ALL {
                let mut body = vec![u8::from(id)];
                body.extend_from_slice(sample_value_bytes(id.wire_type()));
                let res = unpack(&mut block(&body), kind);
                if id.is_allowed_in(kind) {
                    let props = res.unwrap();
                    assert!(props.is_set(id), "{id:?} in {kind}");
                } else {
                    assert_eq!(
                        res,
                        Err(DecodeError::Protocol(ProtocolViolation::PropertyNotAllowed {
                            property: id.into(),
                            packet_type: kind
                        })),
                        "{id:?} in {kind}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_sample_values_decode() {
        for id in PropertyId::ALL {
            let mut src = Bytes::from_static(sample_value_bytes(id.wire_type()));
            assert_eq!(PropertyValue::decode(id.wire_type(), &mut src).unwrap(), sample_value(id.wire_type()));
            assert!(src.is_empty());
        }
    }

    #[test]
    fn test_duplicate_property() {
        let body = b"\x02\x00\x00\x00\x01\x02\x00\x00\x00\x02";
        assert_eq!(
            unpack(&mut block(body), PacketType::Publish),
            Err(DecodeError::Protocol(ProtocolViolation::DuplicateProperty {
                property: 0x02,
                packet_type: PacketType::Publish
            }))
        );

        let props = Unpacker::new()
            .duplicates(DuplicatePolicy::Overwrite)
            .unpack(&mut block(body), PacketType::Publish)
            .unwrap();
        assert_eq!(props.message_expiry, Some(2));
    }

    #[test]
    fn test_repeated_user_properties() {
        let body = b"\x26\x00\x01a\x00\x011\x26\x00\x01a\x00\x012";
        let props = unpack(&mut block(body), PacketType::UnsubAck).unwrap();
        assert_eq!(props.user, vec![("a".into(), "1".into()), ("a".into(), "2".into())]);
    }

    #[test]
    fn test_truncated_blocks() {
        // value cut by the end of the block
        let mut src = Bytes::from_static(b"\x03\x02\x00\x00\x00\x00");
        assert_eq!(unpack(&mut src, PacketType::Publish), Err(DecodeError::Format(FormatError::InvalidLength)));

        // declared length over what is left
        let mut src = Bytes::from_static(b"\x05\x23\x00");
        assert_eq!(unpack(&mut src, PacketType::Publish), Err(DecodeError::Format(FormatError::InvalidLength)));

        // string length over the block
        let mut src = Bytes::from_static(b"\x04\x03\x00\x05a");
        assert!(matches!(unpack(&mut src, PacketType::Publish), Err(DecodeError::Format(_))));

        // varint value with no end
        let mut src = Bytes::from_static(b"\x06\x0b\xff\xff\xff\xff\x01");
        assert_eq!(
            unpack(&mut src, PacketType::Subscribe),
            Err(DecodeError::Format(FormatError::MalformedVariableLength))
        );

        // block length with no end
        let mut src = Bytes::from_static(b"\xff\xff\xff\xff\x01");
        assert_eq!(
            unpack(&mut src, PacketType::Publish),
            Err(DecodeError::Format(FormatError::MalformedVariableLength))
        );

        let mut src = Bytes::new();
        assert_eq!(unpack(&mut src, PacketType::Publish), Err(DecodeError::Format(FormatError::InvalidLength)));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut src = block(b"\x1f\x00\x02\xc3\x28");
        let err = unpack(&mut src, PacketType::PubAck).unwrap_err();
        assert_eq!(err, DecodeError::Format(FormatError::Utf8Error));
        assert_eq!(u8::from(err.reason_code()), 0x81);
    }

    #[test]
    fn test_max_block_size() {
        let unpacker = Unpacker::new().max_block_size(8);
        let mut src = Bytes::from_static(b"\x0d\x03\x00\x0atext/plain");
        assert_eq!(
            unpacker.unpack(&mut src, PacketType::Publish),
            Err(DecodeError::Format(FormatError::MaxSizeExceeded { declared: 13, max: 8 }))
        );

        let mut src = Bytes::from_static(b"\x03\x23\x00\x01");
        assert!(unpacker.unpack(&mut src, PacketType::Publish).is_ok());
    }

    #[test]
    fn test_round_trip_every_kind() {
        for kind in PacketType::ALL {
            let props = legal_sample(kind);
            let mut buf = BytesMut::new();
            encode_block(&props, kind, &mut buf).unwrap();

            let mut src = buf.freeze();
            let mut decoded = unpack(&mut src, kind).unwrap();
            assert!(src.is_empty());

            let mut expected = props.clone();
            expected.user.sort();
            decoded.user.sort();
            assert_eq!(decoded, expected, "{kind}");
        }
    }

    #[test]
    fn test_round_trip_drops_illegal() {
        let props = Properties::new().content_type("a").receive_maximum(7).reason_string("why").user_property("k", "v");

        let mut buf = BytesMut::new();
        props.encode(PacketType::Connect, &mut buf).unwrap();
        let decoded = unpack(&mut buf.freeze(), PacketType::Connect).unwrap();
        assert_eq!(decoded, Properties::new().receive_maximum(7).user_property("k", "v"));
    }

    #[test]
    fn test_round_trip_two_byte_block_length() {
        let props = Properties::new().reason_string("r".repeat(200)).user_property("k", "v");
        let mut buf = BytesMut::new();
        props.encode(PacketType::SubAck, &mut buf).unwrap();
        // 203 + 7 body bytes behind a two byte length prefix
        assert_eq!(&buf[..2], b"\xd2\x01");
        assert_eq!(buf.len(), 212);

        let mut src = buf.freeze();
        assert_eq!(unpack(&mut src, PacketType::SubAck).unwrap(), props);
        assert!(src.is_empty());
    }

    #[test]
    fn test_round_trip_empty_values() {
        let props = Properties::new().correlation_data(Bytes::new()).response_topic("");
        let mut buf = BytesMut::new();
        props.encode(PacketType::Publish, &mut buf).unwrap();
        assert_eq!(buf, b"\x06\x08\x00\x00\x09\x00\x00".as_ref());
        assert_eq!(unpack(&mut buf.freeze(), PacketType::Publish).unwrap(), props);
    }

    #[test]
    fn test_user_properties_round_trip() {
        let props = Properties::new().user_property("k1", "v1").user_property("k2", "v2");
        let mut buf = BytesMut::new();
        props.encode(PacketType::Publish, &mut buf).unwrap();
        let decoded = unpack(&mut buf.freeze(), PacketType::Publish).unwrap();

        let mut user = decoded.user.clone();
        user.sort();
        assert_eq!(
            user,
            vec![
                (ByteString::from_static("k1"), ByteString::from_static("v1")),
                (ByteString::from_static("k2"), ByteString::from_static("v2"))
            ]
        );
        assert_eq!(decoded.get_user_property("k2"), Some(&ByteString::from_static("v2")));
    }
}
