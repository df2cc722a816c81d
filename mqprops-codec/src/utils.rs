use bytes::{Buf, BufMut, Bytes, BytesMut};
use bytestring::ByteString;

use crate::error::{DecodeError, EncodeError, FormatError};

/// Largest value a variable byte integer can carry.
pub const MAX_VARIABLE_LENGTH: u32 = 268_435_455;

macro_rules! ensure {
    ($cond:expr, $e:expr) => {
        if !($cond) {
            return Err($e.into());
        }
    };
}

macro_rules! prim_enum {
    (
        $( #[$enum_attr:meta] )*
        pub enum $name:ident {
            $(
                $( #[$enum_item_attr:meta] )*
                $var:ident=$val:expr
            ),+
        }) => {
        $( #[$enum_attr] )*
        #[repr(u8)]
        #[derive(Debug, Eq, PartialEq, Copy, Clone)]
        pub enum $name {
            $(
                $( #[$enum_item_attr] )*
                $var = $val
            ),+
        }
        impl std::convert::TryFrom<u8> for $name {
            /// the unrecognized raw value
            type Error = u8;
            fn try_from(v: u8) -> Result<Self, Self::Error> {
                match v {
                    $($val => Ok($name::$var)),+
                    ,_ => Err(v)
                }
            }
        }
        impl From<$name> for u8 {
            #[inline]
            fn from(v: $name) -> Self {
                v as u8
            }
        }
    };
}

pub(crate) trait Decode: Sized {
    fn decode(src: &mut Bytes) -> Result<Self, DecodeError>;
}

impl Decode for u8 {
    fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        ensure!(src.has_remaining(), FormatError::InvalidLength); // expected more data within the field
        Ok(src.get_u8())
    }
}

impl Decode for u16 {
    fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        ensure!(src.remaining() >= 2, FormatError::InvalidLength);
        Ok(src.get_u16())
    }
}

impl Decode for u32 {
    fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        ensure!(src.remaining() >= 4, FormatError::InvalidLength); // expected more data within the field
        Ok(src.get_u32())
    }
}

impl Decode for Bytes {
    fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let len = u16::decode(src)? as usize;
        ensure!(src.remaining() >= len, FormatError::InvalidLength);
        Ok(src.split_to(len))
    }
}

impl Decode for ByteString {
    fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        ByteString::try_from(Bytes::decode(src)?).map_err(|_| FormatError::Utf8Error.into())
    }
}

impl Decode for (ByteString, ByteString) {
    fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let key = ByteString::decode(src)?;
        let val = ByteString::decode(src)?;
        Ok((key, val))
    }
}

/// Reads the variable byte integer length prefix and splits off the property bytes.
///
/// Returns an empty buffer without touching `src` further when the declared length is 0.
pub(crate) fn take_properties<B: Buf>(src: &mut B, max_size: u32) -> Result<Bytes, DecodeError> {
    let prop_len = decode_variable_length_cursor(src)?;
    if prop_len == 0 {
        return Ok(Bytes::new());
    }
    ensure!(prop_len <= max_size, FormatError::MaxSizeExceeded { declared: prop_len, max: max_size });
    ensure!(src.remaining() >= prop_len as usize, FormatError::InvalidLength);

    Ok(src.copy_to_bytes(prop_len as usize))
}

#[allow(clippy::cast_lossless)] // safe: allow cast through `as` because it is type-safe
pub(crate) fn decode_variable_length_cursor<B: Buf>(src: &mut B) -> Result<u32, DecodeError> {
    let mut shift: u32 = 0;
    let mut len: u32 = 0;
    loop {
        ensure!(src.has_remaining(), FormatError::InvalidLength);
        let val = src.get_u8();
        len += ((val & 0b0111_1111u8) as u32) << shift;
        if val & 0b1000_0000 == 0 {
            return Ok(len);
        } else {
            ensure!(shift < 21, FormatError::MalformedVariableLength);
            shift += 7;
        }
    }
}

pub(crate) trait Encode {
    fn encoded_size(&self) -> usize;

    /// Whether the value fits the length field of its wire encoding.
    fn is_encodable(&self) -> bool {
        true
    }

    fn encode(&self, buf: &mut BytesMut);
}

impl Encode for u8 {
    fn encoded_size(&self) -> usize {
        1
    }
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(*self);
    }
}

impl Encode for u16 {
    fn encoded_size(&self) -> usize {
        2
    }
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(*self);
    }
}

impl Encode for u32 {
    fn encoded_size(&self) -> usize {
        4
    }
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(*self);
    }
}

impl Encode for [u8] {
    fn encoded_size(&self) -> usize {
        2 + self.len()
    }
    fn is_encodable(&self) -> bool {
        self.len() <= u16::MAX as usize
    }
    fn encode(&self, buf: &mut BytesMut) {
        debug_assert!(self.is_encodable());
        buf.put_u16(self.len() as u16);
        buf.extend_from_slice(self);
    }
}

impl Encode for Bytes {
    fn encoded_size(&self) -> usize {
        self.as_ref().encoded_size()
    }
    fn is_encodable(&self) -> bool {
        self.as_ref().is_encodable()
    }
    fn encode(&self, buf: &mut BytesMut) {
        self.as_ref().encode(buf)
    }
}

impl Encode for ByteString {
    fn encoded_size(&self) -> usize {
        self.as_bytes().encoded_size()
    }
    fn is_encodable(&self) -> bool {
        self.as_bytes().is_encodable()
    }
    fn encode(&self, buf: &mut BytesMut) {
        self.as_bytes().encode(buf)
    }
}

impl Encode for (ByteString, ByteString) {
    fn encoded_size(&self) -> usize {
        self.0.encoded_size() + self.1.encoded_size()
    }
    fn is_encodable(&self) -> bool {
        self.0.is_encodable() && self.1.is_encodable()
    }
    fn encode(&self, buf: &mut BytesMut) {
        self.0.encode(buf);
        self.1.encode(buf)
    }
}

pub(crate) fn write_variable_length(len: u32, dst: &mut BytesMut) -> Result<(), EncodeError> {
    match len {
        0..=127 => dst.put_u8(len as u8),
        128..=16_383 => dst.put_slice(&[((len & 0b0111_1111) | 0b1000_0000) as u8, (len >> 7) as u8]),
        16_384..=2_097_151 => {
            dst.put_slice(&[
                ((len & 0b0111_1111) | 0b1000_0000) as u8,
                (((len >> 7) & 0b0111_1111) | 0b1000_0000) as u8,
                (len >> 14) as u8,
            ]);
        }
        2_097_152..=MAX_VARIABLE_LENGTH => {
            dst.put_slice(&[
                ((len & 0b0111_1111) | 0b1000_0000) as u8,
                (((len >> 7) & 0b0111_1111) | 0b1000_0000) as u8,
                (((len >> 14) & 0b0111_1111) | 0b1000_0000) as u8,
                (len >> 21) as u8,
            ]);
        }
        _ => return Err(EncodeError::InvalidLength),
    }
    Ok(())
}

/// Calculates length of variable length integer based on its value
pub(crate) fn var_int_len(val: usize) -> usize {
    match val {
        0..=127 => 1,
        128..=16_383 => 2,
        16_384..=2_097_151 => 3,
        _ => 4,
    }
}
