//! Byte-offset field extraction for EPS native records.
//!
//! All binary fields are big-endian. Record layouts are described as tables of
//! [`FieldSpec`] entries and decoded through one generic routine, so every
//! offset used by the node decoders lives in a table whose extent can be
//! checked against the record size at compile time.

use byteorder::{BigEndian, ByteOrder};
use num_traits::AsPrimitive;

use crate::types::{ScatError, ScatResult};

/// Longest ASCII field accepted by the header parser
const MAX_ASCII_WIDTH: usize = 16;

/// Binary representation of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
}

impl FieldKind {
    /// Width in bytes
    pub const fn width(self) -> usize {
        match self {
            FieldKind::U8 | FieldKind::I8 => 1,
            FieldKind::U16 | FieldKind::I16 => 2,
            FieldKind::U32 | FieldKind::I32 => 4,
        }
    }
}

/// One entry of a record layout table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Byte offset of element 0, counted from the start of the record (GRH included)
    pub offset: usize,
    pub kind: FieldKind,
    /// Number of consecutive elements
    pub count: usize,
    /// Factor turning the raw integer into a physical value
    pub scale: f64,
}

impl FieldSpec {
    pub const fn new(name: &'static str, offset: usize, kind: FieldKind, count: usize, scale: f64) -> Self {
        Self { name, offset, kind, count, scale }
    }

    /// One past the last byte covered by this field
    pub const fn extent(&self) -> usize {
        self.offset + self.count * self.kind.width()
    }

    fn element_offset(&self, index: usize) -> ScatResult<usize> {
        if index >= self.count {
            return Err(ScatError::BoundsViolation(format!(
                "{}: element {} outside [0, {})",
                self.name, index, self.count
            )));
        }
        Ok(self.offset + index * self.kind.width())
    }

    /// Raw integer value of element `index`
    pub fn decode_raw(&self, buf: &[u8], index: usize) -> ScatResult<i64> {
        let offset = self.element_offset(index)?;
        read_kind(buf, offset, self.kind)
    }

    /// Scaled physical value of element `index`
    pub fn decode(&self, buf: &[u8], index: usize) -> ScatResult<f64> {
        Ok(scaled(self.decode_raw(buf, index)?, self.scale))
    }

    /// Unscaled byte value of element `index` (flag fields)
    pub fn decode_byte(&self, buf: &[u8], index: usize) -> ScatResult<u8> {
        if self.kind != FieldKind::U8 {
            return Err(ScatError::StructuralMismatch(format!(
                "{} is not a byte field",
                self.name
            )));
        }
        read_u8(buf, self.element_offset(index)?)
    }

    /// Fore/mid/aft values of triplet `index` (elements 3i, 3i+1, 3i+2)
    pub fn decode_triplet(&self, buf: &[u8], index: usize) -> ScatResult<[f64; 3]> {
        let first = index * 3;
        Ok([
            self.decode(buf, first)?,
            self.decode(buf, first + 1)?,
            self.decode(buf, first + 2)?,
        ])
    }

    /// Raw byte triplet `index`
    pub fn decode_byte_triplet(&self, buf: &[u8], index: usize) -> ScatResult<[u8; 3]> {
        let first = index * 3;
        Ok([
            self.decode_byte(buf, first)?,
            self.decode_byte(buf, first + 1)?,
            self.decode_byte(buf, first + 2)?,
        ])
    }
}

/// Largest extent of a layout table
pub const fn layout_extent(fields: &[FieldSpec]) -> usize {
    let mut max = 0;
    let mut i = 0;
    while i < fields.len() {
        let end = fields[i].extent();
        if end > max {
            max = end;
        }
        i += 1;
    }
    max
}

/// Multiply a raw integer by a scale factor
pub fn scaled<T: AsPrimitive<f64>>(raw: T, factor: f64) -> f64 {
    raw.as_() * factor
}

fn window(buf: &[u8], offset: usize, width: usize) -> ScatResult<&[u8]> {
    offset
        .checked_add(width)
        .and_then(|end| buf.get(offset..end))
        .ok_or_else(|| {
            ScatError::BoundsViolation(format!(
                "{} byte field at offset {} exceeds buffer of {} bytes",
                width,
                offset,
                buf.len()
            ))
        })
}

fn read_kind(buf: &[u8], offset: usize, kind: FieldKind) -> ScatResult<i64> {
    Ok(match kind {
        FieldKind::U8 => i64::from(read_u8(buf, offset)?),
        FieldKind::I8 => i64::from(read_i8(buf, offset)?),
        FieldKind::U16 => i64::from(read_u16(buf, offset)?),
        FieldKind::I16 => i64::from(read_i16(buf, offset)?),
        FieldKind::U32 => i64::from(read_u32(buf, offset)?),
        FieldKind::I32 => i64::from(read_i32(buf, offset)?),
    })
}

pub fn read_u8(buf: &[u8], offset: usize) -> ScatResult<u8> {
    Ok(window(buf, offset, 1)?[0])
}

pub fn read_i8(buf: &[u8], offset: usize) -> ScatResult<i8> {
    Ok(window(buf, offset, 1)?[0] as i8)
}

pub fn read_u16(buf: &[u8], offset: usize) -> ScatResult<u16> {
    Ok(BigEndian::read_u16(window(buf, offset, 2)?))
}

pub fn read_i16(buf: &[u8], offset: usize) -> ScatResult<i16> {
    Ok(BigEndian::read_i16(window(buf, offset, 2)?))
}

/// Unsigned 32-bit read; a leading byte >= 0x80 is rejected, not wrapped
pub fn read_u32(buf: &[u8], offset: usize) -> ScatResult<u32> {
    let bytes = window(buf, offset, 4)?;
    if bytes[0] >= 0x80 {
        return Err(ScatError::BoundsViolation(format!(
            "unsigned 32-bit field at offset {} has leading byte {:#04x}",
            offset, bytes[0]
        )));
    }
    Ok(BigEndian::read_u32(bytes))
}

pub fn read_i32(buf: &[u8], offset: usize) -> ScatResult<i32> {
    Ok(BigEndian::read_i32(window(buf, offset, 4)?))
}

pub fn read_u16_scaled(buf: &[u8], offset: usize, factor: f64) -> ScatResult<f64> {
    Ok(scaled(read_u16(buf, offset)?, factor))
}

pub fn read_i16_scaled(buf: &[u8], offset: usize, factor: f64) -> ScatResult<f64> {
    Ok(scaled(read_i16(buf, offset)?, factor))
}

pub fn read_u32_scaled(buf: &[u8], offset: usize, factor: f64) -> ScatResult<f64> {
    Ok(scaled(read_u32(buf, offset)?, factor))
}

pub fn read_i32_scaled(buf: &[u8], offset: usize, factor: f64) -> ScatResult<f64> {
    Ok(scaled(read_i32(buf, offset)?, factor))
}

/// Three consecutive scaled values of the same kind starting at `offset`
pub fn read_triplet(buf: &[u8], offset: usize, kind: FieldKind, factor: f64) -> ScatResult<[f64; 3]> {
    let width = kind.width();
    Ok([
        scaled(read_kind(buf, offset, kind)?, factor),
        scaled(read_kind(buf, offset + width, kind)?, factor),
        scaled(read_kind(buf, offset + 2 * width, kind)?, factor),
    ])
}

/// Copy an `n` byte ASCII field, stopping at the first NUL
pub fn ascii_str(buf: &[u8], offset: usize, n: usize) -> ScatResult<String> {
    if n == 0 || n >= MAX_ASCII_WIDTH {
        return Err(ScatError::ParseFailure(format!(
            "ASCII field width {} at offset {} outside [1, {})",
            n, offset, MAX_ASCII_WIDTH
        )));
    }
    let bytes = window(buf, offset, n)?;
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(n);
    Ok(bytes[..end].iter().map(|&b| char::from(b)).collect())
}

/// Parse an `n` byte ASCII decimal integer
pub fn ascii_int(buf: &[u8], offset: usize, n: usize) -> ScatResult<i64> {
    let text = ascii_str(buf, offset, n)?;
    text.trim().parse::<i64>().map_err(|e| {
        ScatError::ParseFailure(format!(
            "invalid integer {:?} at offset {}: {}",
            text, offset, e
        ))
    })
}

/// Parse an `n` byte ASCII decimal number
pub fn ascii_float(buf: &[u8], offset: usize, n: usize) -> ScatResult<f64> {
    let text = ascii_str(buf, offset, n)?;
    text.trim().parse::<f64>().map_err(|e| {
        ScatError::ParseFailure(format!(
            "invalid number {:?} at offset {}: {}",
            text, offset, e
        ))
    })
}

/// Parse a 6 byte ASCII count; negative values are rejected
pub fn ascii_count(buf: &[u8], offset: usize) -> ScatResult<u32> {
    let value = ascii_int(buf, offset, 6)?;
    u32::try_from(value).map_err(|_| {
        ScatError::ParseFailure(format!(
            "count field at offset {} must be non-negative, got {}",
            offset, value
        ))
    })
}
