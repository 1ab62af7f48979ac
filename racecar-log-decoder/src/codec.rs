//! Field codec
//!
//! Extracts fixed-width integers from byte ranges of a hex payload. The
//! functions here are pure; scaling to physical units happens at the decode
//! site in [`crate::messages`].

use crate::types::CodecError;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Byte order of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// Least significant byte first (Intel)
    Little,
    /// Most significant byte first (Motorola)
    Big,
}

/// Signedness of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Unsigned,
    /// Two's complement over the field width
    Signed,
}

/// A fixed field inside a frame payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// First byte of the field
    pub offset: usize,
    /// Width in bytes (1, 2, 4 or 8)
    pub width: usize,
    pub endianness: Endianness,
    pub value_type: ValueType,
}

impl Field {
    pub const fn u8(offset: usize) -> Self {
        Self::new(offset, 1, Endianness::Little, ValueType::Unsigned)
    }

    pub const fn i8(offset: usize) -> Self {
        Self::new(offset, 1, Endianness::Little, ValueType::Signed)
    }

    pub const fn le_u16(offset: usize) -> Self {
        Self::new(offset, 2, Endianness::Little, ValueType::Unsigned)
    }

    pub const fn le_i16(offset: usize) -> Self {
        Self::new(offset, 2, Endianness::Little, ValueType::Signed)
    }

    pub const fn be_u16(offset: usize) -> Self {
        Self::new(offset, 2, Endianness::Big, ValueType::Unsigned)
    }

    pub const fn be_i16(offset: usize) -> Self {
        Self::new(offset, 2, Endianness::Big, ValueType::Signed)
    }

    pub const fn new(offset: usize, width: usize, endianness: Endianness, value_type: ValueType) -> Self {
        Self {
            offset,
            width,
            endianness,
            value_type,
        }
    }

    /// Read this field from a hex payload
    pub fn read(&self, payload: &str) -> Result<i64, CodecError> {
        read_int(payload, self.offset, self.width, self.endianness, self.value_type)
    }

    /// Read this field and return it as a float for scaling
    pub fn read_f64(&self, payload: &str) -> Result<f64, CodecError> {
        self.read(payload).map(|v| v as f64)
    }
}

/// Interpret `width` bytes starting at byte `offset` of a hex payload as an integer
///
/// # Arguments
/// * `payload` - Hex digits, two per byte
/// * `offset` - Index of the first byte of the field
/// * `width` - Field width in bytes (1, 2, 4 or 8)
/// * `endianness` - Byte order of the field
/// * `value_type` - Signed fields use two's complement over the field width
///
/// # Returns
/// * `Err(CodecError)` if the range is outside the payload or not valid hex
pub fn read_int(
    payload: &str,
    offset: usize,
    width: usize,
    endianness: Endianness,
    value_type: ValueType,
) -> Result<i64, CodecError> {
    if !matches!(width, 1 | 2 | 4 | 8) {
        return Err(CodecError::UnsupportedWidth(width));
    }

    let bytes = payload_bytes(payload, offset, width)?;

    let raw: u64 = match (width, endianness) {
        (1, _) => bytes[0] as u64,
        (2, Endianness::Little) => LittleEndian::read_u16(&bytes) as u64,
        (2, Endianness::Big) => BigEndian::read_u16(&bytes) as u64,
        (4, Endianness::Little) => LittleEndian::read_u32(&bytes) as u64,
        (4, Endianness::Big) => BigEndian::read_u32(&bytes) as u64,
        (_, Endianness::Little) => LittleEndian::read_u64(&bytes),
        (_, Endianness::Big) => BigEndian::read_u64(&bytes),
    };

    Ok(match value_type {
        ValueType::Unsigned => raw as i64,
        ValueType::Signed => sign_extend(raw, width * 8),
    })
}

/// Decode the bytes `offset..offset + width` of a hex payload
pub fn payload_bytes(payload: &str, offset: usize, width: usize) -> Result<Vec<u8>, CodecError> {
    let end = offset + width;
    let available = payload.len() / 2;
    if end > available {
        return Err(CodecError::OutOfRange {
            offset,
            end,
            available,
        });
    }

    let digits = payload
        .get(offset * 2..end * 2)
        .ok_or_else(|| CodecError::InvalidHex(payload.to_string()))?;

    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| match (hex_nibble(pair[0]), hex_nibble(pair[1])) {
            (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
            _ => Err(CodecError::InvalidHex(digits.to_string())),
        })
        .collect()
}

fn hex_nibble(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

/// Sign-extend a value from N bits to 64 bits
///
/// If the value's MSB is 1, fill the upper bits with 1s.
fn sign_extend(value: u64, bit_length: usize) -> i64 {
    if bit_length >= 64 {
        return value as i64;
    }

    let sign_bit = 1u64 << (bit_length - 1);
    if (value & sign_bit) != 0 {
        let mask = !0u64 << bit_length;
        (value | mask) as i64
    } else {
        value as i64
    }
}
