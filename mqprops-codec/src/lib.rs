#![deny(unsafe_code)]

//! MQTT v5.0 property block codec
//!
//! ## Core Features:
//! - **Property Set**: [`Properties`] models all 27 properties with explicit presence
//! - **Registry**: [`is_valid`] and [`PropertyId::legal_in`] answer which property may appear in which packet
//! - **Packer**: [`pack`] serializes a set for a packet type, leaving out what that packet may not carry
//! - **Unpacker**: [`unpack`] / [`Unpacker`] parse a received block and reject illegal content
//! - **Zero-Copy Decoding**: string and binary values share the received `bytes::Bytes` buffer
//!
//! ```
//! use bytes::BytesMut;
//! use mqprops_codec::{unpack, PacketType, Properties};
//!
//! let props = Properties::new().content_type("text/plain").user_property("k1", "v1");
//! let mut buf = BytesMut::new();
//! props.encode(PacketType::Publish, &mut buf).unwrap();
//!
//! let decoded = unpack(&mut buf.freeze(), PacketType::Publish).unwrap();
//! assert_eq!(decoded, props);
//! ```

#[macro_use]
mod utils;

/// Error types for encoding/decoding operations
pub mod error;

/// Packet types and packet type sets
pub mod types;

/// Property identifiers, wire types and the legality table
pub mod property;

/// The property set
pub mod properties;

/// Serialization of a property set
pub mod pack;

/// Parsing of a property block
pub mod unpack;

pub use self::error::{DecodeError, EncodeError, FormatError, ProtocolViolation, ReasonCode};
pub use self::pack::{block_size, encode_block, encoded_size, pack};
pub use self::properties::{Properties, UserProperties, UserProperty};
pub use self::property::{is_valid, legal_properties, PropertyDef, PropertyId, PropertyValue, WireType};
pub use self::types::{PacketType, PacketTypes};
pub use self::unpack::{unpack, DuplicatePolicy, Unpacker};
pub use self::utils::MAX_VARIABLE_LENGTH;
