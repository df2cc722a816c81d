use bytes::{BufMut, Bytes, BytesMut};

use crate::error::EncodeError;
use crate::properties::Properties;
use crate::property::{legal_properties, PropertyId, PropertyValue};
use crate::types::PacketType;
use crate::utils::{var_int_len, write_variable_length, Encode, MAX_VARIABLE_LENGTH};

/// Properties of `props` that end up in the block for `packet_type`, in wire order.
///
/// Illegal and absent properties are left out. So are values that do not fit
/// their wire encoding, with a warning.
fn packed(props: &Properties, packet_type: PacketType) -> impl Iterator<Item = (PropertyId, PropertyValue)> + '_ {
    let singles = legal_properties(packet_type)
        .filter(|id| !id.allows_repeat())
        .filter_map(move |id| props.get(id).map(|v| (id, v)));

    let users = PropertyId::UserProperty
        .is_allowed_in(packet_type)
        .then(move || {
            props.user.iter().map(|(k, v)| (PropertyId::UserProperty, PropertyValue::Utf8StringPair(k.clone(), v.clone())))
        })
        .into_iter()
        .flatten();

    singles.chain(users).filter(move |(id, v)| {
        if v.is_encodable() {
            true
        } else {
            log::warn!("{:?} value does not fit its wire encoding, omitted from {} properties", id, packet_type);
            false
        }
    })
}

/// Serializes `props` into the property block body for `packet_type`.
///
/// The length prefix is not included; see [`encode_block`] for the form embedded in a packet.
/// Properties not allowed in `packet_type` are omitted and `None` packs to an empty body.
///
/// ```
/// use mqprops_codec::{pack, PacketType, Properties};
///
/// let props = Properties::new().content_type("text/plain").receive_maximum(10);
/// assert_eq!(pack(Some(&props), PacketType::Publish), b"\x03\x00\x0atext/plain".as_ref());
/// assert!(pack(None, PacketType::Publish).is_empty());
/// ```
pub fn pack(props: Option<&Properties>, packet_type: PacketType) -> Bytes {
    let Some(props) = props else {
        return Bytes::new();
    };
    let mut buf = BytesMut::with_capacity(encoded_size(props, packet_type));
    write_body(props, packet_type, &mut buf);
    buf.freeze()
}

/// Length of the body [`pack`] would produce.
pub fn encoded_size(props: &Properties, packet_type: PacketType) -> usize {
    packed(props, packet_type).map(|(_, v)| 1 + v.encoded_size()).sum()
}

/// Length of the block including its variable byte integer length prefix.
#[inline]
pub fn block_size(props: &Properties, packet_type: PacketType) -> usize {
    let len = encoded_size(props, packet_type);
    var_int_len(len) + len
}

/// Writes the length prefixed property block for `packet_type` into `buf`.
pub fn encode_block(props: &Properties, packet_type: PacketType, buf: &mut BytesMut) -> Result<(), EncodeError> {
    let len = encoded_size(props, packet_type);
    ensure!(len <= MAX_VARIABLE_LENGTH as usize, EncodeError::InvalidLength);
    buf.reserve(var_int_len(len) + len);
    write_variable_length(len as u32, buf)?;
    write_body(props, packet_type, buf);
    Ok(())
}

fn write_body(props: &Properties, packet_type: PacketType, buf: &mut BytesMut) {
    for (id, v) in packed(props, packet_type) {
        buf.put_u8(id.into());
        v.encode(buf);
    }
}

#[cfg(test)]
mod tests {
    use bytestring::ByteString;

    use super::*;

    #[test]
    fn test_pack_content_type() {
        let props = Properties::new().content_type("text/plain");
        let packed = props.pack(PacketType::Publish);
        assert_eq!(packed, b"\x03\x00\x0atext/plain".as_ref());
        assert_eq!(packed.len(), 13);
        assert_eq!(encoded_size(&props, PacketType::Publish), 13);
    }

    #[test]
    fn test_pack_omits_illegal() {
        let props = Properties::new().receive_maximum(10);
        assert!(props.pack(PacketType::Publish).is_empty());
        assert_eq!(props.pack(PacketType::Connect), b"\x21\x00\x0a".as_ref());
        assert_eq!(props.pack(PacketType::ConnAck), b"\x21\x00\x0a".as_ref());

        let props = Properties::new().reason_string("bye");
        assert!(props.pack(PacketType::Connect).is_empty());
        assert_eq!(props.pack(PacketType::Disconnect), b"\x1f\x00\x03bye".as_ref());
    }

    #[test]
    fn test_pack_empty() {
        for kind in PacketType::ALL {
            assert!(pack(None, kind).is_empty());
            assert!(Properties::new().pack(kind).is_empty());
        }

        let props = Properties::new().user_property("k", "v").content_type("c");
        assert!(props.pack(PacketType::PingReq).is_empty());
        assert!(props.pack(PacketType::PingResp).is_empty());
    }

    #[test]
    fn test_pack_wire_order() {
        let props = Properties::new()
            .user_property("k", "v")
            .topic_alias(5)
            .payload_format(1)
            .subscription_identifier(200)
            .correlation_data(Bytes::from_static(b"\x01"))
            .reason_string("");

        assert_eq!(
            props.pack(PacketType::Publish),
            b"\x01\x01\x09\x00\x01\x01\x0b\xc8\x01\x1f\x00\x00\x23\x00\x05\x26\x00\x01k\x00\x01v".as_ref()
        );
        assert_eq!(props.pack(PacketType::Subscribe), b"\x0b\xc8\x01\x1f\x00\x00\x26\x00\x01k\x00\x01v".as_ref());
    }

    #[test]
    fn test_pack_user_properties_keep_order() {
        let mut props = Properties::new();
        props.push_user_property("a", "1");
        props.push_user_property("a", "2");
        assert_eq!(
            props.pack(PacketType::PubAck),
            b"\x26\x00\x01a\x00\x011\x26\x00\x01a\x00\x012".as_ref()
        );
    }

    #[test]
    fn test_pack_skips_unencodable() {
        let props = Properties::new()
            .content_type(ByteString::from("x".repeat(70_000)))
            .subscription_identifier(MAX_VARIABLE_LENGTH + 1)
            .topic_alias(1);
        assert_eq!(props.pack(PacketType::Publish), b"\x23\x00\x01".as_ref());
    }

    #[test]
    fn test_encode_block() {
        let props = Properties::new().session_expiry_interval(30).auth_method("SCRAM");
        let mut buf = BytesMut::new();
        encode_block(&props, PacketType::Connect, &mut buf).unwrap();
        assert_eq!(buf, b"\x0d\x11\x00\x00\x00\x1e\x15\x00\x05SCRAM".as_ref());
        assert_eq!(buf.len(), block_size(&props, PacketType::Connect));

        let mut buf = BytesMut::new();
        Properties::new().encode(PacketType::PubComp, &mut buf).unwrap();
        assert_eq!(buf, b"\x00".as_ref());
    }

    #[test]
    fn test_block_size_long_body() {
        let props = Properties::new().reason_string("r".repeat(200));
        // tag + length + 200 bytes, behind a two byte length prefix
        assert_eq!(encoded_size(&props, PacketType::SubAck), 203);
        assert_eq!(block_size(&props, PacketType::SubAck), 205);
    }
}
