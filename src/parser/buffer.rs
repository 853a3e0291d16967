//! Byte stream over a printable-character buffer.
//!
//! Every character of an encoded buffer carries one 6-bit unit:
//! `unit = character code - PRINTABLE_OFFSET`. Integers are stored either as
//! VarInts (5 data bits per unit, 0x20 continuation flag, low bits first) or as
//! fixed-width little-endian fields of 6-bit units.

use crate::utils::config::{
    FIXED_UNIT_BITS, INT30_UNITS, INT36_UNITS, MAX_UNIT_VALUE, PRINTABLE_OFFSET,
    VARINT_CONTINUATION, VARINT_DATA_BITS, VARINT_DATA_MASK, VARINT_MAX_UNITS,
};
use crate::utils::error::{DecodeError, DecodeResult};
use std::sync::Arc;

/// Anything that yields a sequence of unsigned VarInts
pub trait VarIntSource {
    /// Decode the next value
    fn next_var_int(&mut self) -> DecodeResult<u32>;

    /// Position of the underlying cursor, for diagnostics
    fn position(&self) -> usize;
}

impl<T: VarIntSource + ?Sized> VarIntSource for &mut T {
    fn next_var_int(&mut self) -> DecodeResult<u32> {
        (**self).next_var_int()
    }

    fn position(&self) -> usize {
        (**self).position()
    }
}

/// Cursor over an immutable, shareable encoded buffer
///
/// Cloning is cheap: clones share the backing storage and own their cursor.
#[derive(Debug, Clone)]
pub struct ByteStream {
    data: Arc<[u8]>,
    pos: usize,
}

impl ByteStream {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    /// Share the backing storage with a cursor placed at `pos`
    pub fn at(&self, pos: usize) -> Self {
        Self {
            data: Arc::clone(&self.data),
            pos,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn has_more(&self) -> bool {
        self.pos < self.data.len()
    }

    /// Move the cursor; nothing is read or validated
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Unit value at an absolute position
    pub fn byte_at(&self, pos: usize) -> DecodeResult<u8> {
        let ch = *self
            .data
            .get(pos)
            .ok_or(DecodeError::Truncated { offset: pos })?;
        match ch.checked_sub(PRINTABLE_OFFSET) {
            Some(unit) if unit <= MAX_UNIT_VALUE => Ok(unit),
            _ => Err(DecodeError::InvalidByte {
                offset: pos,
                byte: ch,
            }),
        }
    }

    /// Decode a VarInt starting at `pos`, returning the value and the
    /// position just past it
    fn decode_var_int(&self, mut pos: usize) -> DecodeResult<(u32, usize)> {
        let start = pos;
        let mut value: u64 = 0;
        let mut shift = 0;
        for _ in 0..VARINT_MAX_UNITS {
            let unit = self.byte_at(pos)?;
            pos += 1;
            value |= u64::from(unit & VARINT_DATA_MASK) << shift;
            shift += VARINT_DATA_BITS;
            if unit & VARINT_CONTINUATION == 0 {
                return u32::try_from(value)
                    .map(|v| (v, pos))
                    .map_err(|_| DecodeError::VarIntOverflow { offset: start });
            }
        }
        Err(DecodeError::VarIntOverflow { offset: start })
    }

    /// Consume one unsigned VarInt
    pub fn next_var_int(&mut self) -> DecodeResult<u32> {
        let (value, next) = self.decode_var_int(self.pos)?;
        self.pos = next;
        Ok(value)
    }

    /// Consume one signed VarInt; the lowest decoded bit is the sign
    pub fn next_signed_var_int(&mut self) -> DecodeResult<i32> {
        let raw = self.next_var_int()?;
        let magnitude = (raw >> 1) as i32;
        Ok(if raw & 1 == 0 { magnitude } else { -magnitude })
    }

    /// Read a VarInt at `pos` without moving the cursor
    pub fn var_int_at(&self, pos: usize) -> DecodeResult<u32> {
        self.decode_var_int(pos).map(|(value, _)| value)
    }

    fn fixed_at(&self, pos: usize, units: usize) -> DecodeResult<u64> {
        let mut value = 0u64;
        for i in 0..units {
            value |= u64::from(self.byte_at(pos + i)?) << (FIXED_UNIT_BITS * i as u32);
        }
        Ok(value)
    }

    /// Fixed-width 30-bit field at `pos`
    pub fn int30_at(&self, pos: usize) -> DecodeResult<u32> {
        self.fixed_at(pos, INT30_UNITS).map(|v| v as u32)
    }

    /// Fixed-width 36-bit field at `pos`
    pub fn int36_at(&self, pos: usize) -> DecodeResult<u64> {
        self.fixed_at(pos, INT36_UNITS)
    }
}

impl VarIntSource for ByteStream {
    fn next_var_int(&mut self) -> DecodeResult<u32> {
        ByteStream::next_var_int(self)
    }

    fn position(&self) -> usize {
        self.pos
    }
}

impl From<&str> for ByteStream {
    fn from(encoded: &str) -> Self {
        Self::new(encoded.as_bytes())
    }
}

impl From<String> for ByteStream {
    fn from(encoded: String) -> Self {
        Self::new(encoded.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(units: &[u8]) -> ByteStream {
        let chars: Vec<u8> = units.iter().map(|u| u + PRINTABLE_OFFSET).collect();
        ByteStream::new(chars)
    }

    #[test]
    fn test_single_unit_varint() {
        let mut s = stream(&[0, 31]);
        assert_eq!(s.next_var_int().unwrap(), 0);
        assert_eq!(s.next_var_int().unwrap(), 31);
        assert!(!s.has_more());
    }

    #[test]
    fn test_multi_unit_varint_is_little_endian() {
        // 0x21 carries 1 with continuation, then 1 << 5
        let mut s = stream(&[0x21, 0x01]);
        assert_eq!(s.next_var_int().unwrap(), 1 + 32);
        assert_eq!(s.pos(), 2);
    }

    #[test]
    fn test_signed_varint() {
        let mut s = stream(&[6, 7, 1]);
        assert_eq!(s.next_signed_var_int().unwrap(), 3);
        assert_eq!(s.next_signed_var_int().unwrap(), -3);
        assert_eq!(s.next_signed_var_int().unwrap(), 0);
    }

    #[test]
    fn test_truncated_varint() {
        let mut s = stream(&[0x21]);
        assert_eq!(
            s.next_var_int(),
            Err(DecodeError::Truncated { offset: 1 })
        );
    }

    #[test]
    fn test_invalid_character() {
        let mut s = ByteStream::new(b"A ".to_vec());
        assert_eq!(s.next_var_int().unwrap(), 2);
        assert!(matches!(
            s.next_var_int(),
            Err(DecodeError::InvalidByte { offset: 1, .. })
        ));
    }

    #[test]
    fn test_overflowing_varint() {
        let mut s = stream(&[0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x1F]);
        assert_eq!(
            s.next_var_int(),
            Err(DecodeError::VarIntOverflow { offset: 0 })
        );
    }

    #[test]
    fn test_seek_and_peek_do_not_disturb_cursor() {
        let mut s = stream(&[5, 9, 0x21, 0x01]);
        assert_eq!(s.var_int_at(2).unwrap(), 33);
        assert_eq!(s.pos(), 0);
        s.seek(1);
        assert_eq!(s.next_var_int().unwrap(), 9);
    }

    #[test]
    fn test_fixed_width_fields() {
        let s = stream(&[1, 2, 0, 0, 0, 63]);
        assert_eq!(s.int30_at(0).unwrap(), 1 + (2 << 6));
        assert_eq!(s.int36_at(0).unwrap(), 1 + (2 << 6) + (63u64 << 30));
        assert!(s.int30_at(2).is_err());
    }
}
