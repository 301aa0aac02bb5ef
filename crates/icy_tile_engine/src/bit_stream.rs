//! Bit-granular sequential access over byte buffers.
//!
//! [`BitReader`] and [`BitWriter`] borrow their buffer instead of copying it and keep an
//! absolute bit cursor. Every access is checked against the logical bit length the stream
//! was opened with, so a codec can never read or write past its storage size.

use crate::{EngineError, Result};

/// Order in which the bits of a single byte are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitOrder {
    /// Bit 7 is consumed first, values are assembled most significant bit first.
    #[default]
    MsbFirst,
    /// Bit 0 is consumed first, values are assembled least significant bit first.
    LsbFirst,
}

/// Number of bytes required to hold `bits` bits.
#[inline]
pub const fn bytes_for_bits(bits: usize) -> usize {
    bits.div_ceil(8)
}

fn check_count(count: usize) -> Result<()> {
    if count == 0 || count > 32 {
        return Err(EngineError::InvalidBitCount { count });
    }
    Ok(())
}

fn check_range(cursor: usize, requested: usize, length: usize) -> Result<()> {
    if cursor + requested > length {
        return Err(EngineError::BitStreamOutOfRange { cursor, requested, length });
    }
    Ok(())
}

fn check_length(length: usize, buffer_len: usize) -> Result<()> {
    if length > buffer_len * 8 {
        return Err(EngineError::BitStreamTooLong {
            length,
            capacity: buffer_len * 8,
        });
    }
    Ok(())
}

pub struct BitReader<'a> {
    data: &'a [u8],
    length: usize,
    cursor: usize,
    order: BitOrder,
}

impl<'a> BitReader<'a> {
    /// Binds a read cursor to `data`, limited to the first `bit_length` bits.
    pub fn open(data: &'a [u8], bit_length: usize) -> Result<Self> {
        Self::with_order(data, bit_length, BitOrder::MsbFirst)
    }

    pub fn with_order(data: &'a [u8], bit_length: usize, order: BitOrder) -> Result<Self> {
        check_length(bit_length, data.len())?;
        Ok(Self {
            data,
            length: bit_length,
            cursor: 0,
            order,
        })
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.length - self.cursor
    }

    pub fn seek_absolute(&mut self, bit_offset: usize) -> Result<()> {
        if bit_offset > self.length {
            return Err(EngineError::BitStreamOutOfRange {
                cursor: bit_offset,
                requested: 0,
                length: self.length,
            });
        }
        self.cursor = bit_offset;
        Ok(())
    }

    pub fn seek_relative(&mut self, bits: isize) -> Result<()> {
        let target = self.cursor as isize + bits;
        if target < 0 {
            return Err(EngineError::BitStreamOutOfRange {
                cursor: self.cursor,
                requested: bits.unsigned_abs(),
                length: self.length,
            });
        }
        self.seek_absolute(target as usize)
    }

    /// Returns the next `count` bits (1..=32) and advances the cursor.
    pub fn read_bits(&mut self, count: usize) -> Result<u32> {
        let value = self.peek_bits(count)?;
        self.cursor += count;
        Ok(value)
    }

    /// Returns the next `count` bits without moving the cursor.
    pub fn peek_bits(&self, count: usize) -> Result<u32> {
        check_count(count)?;
        check_range(self.cursor, count, self.length)?;

        let mut value = 0u32;
        for i in 0..count {
            let pos = self.cursor + i;
            let byte = self.data[pos >> 3];
            match self.order {
                BitOrder::MsbFirst => {
                    let bit = (byte >> (7 - (pos & 7))) & 1;
                    value = (value << 1) | bit as u32;
                }
                BitOrder::LsbFirst => {
                    let bit = (byte >> (pos & 7)) & 1;
                    value |= (bit as u32) << i;
                }
            }
        }
        Ok(value)
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        // byte aligned reads in msb order are a plain copy
        if self.order == BitOrder::MsbFirst && self.cursor & 7 == 0 {
            check_range(self.cursor, 8, self.length)?;
            let value = self.data[self.cursor >> 3];
            self.cursor += 8;
            return Ok(value);
        }
        Ok(self.read_bits(8)? as u8)
    }
}

pub struct BitWriter<'a> {
    data: &'a mut [u8],
    length: usize,
    cursor: usize,
    order: BitOrder,
}

impl<'a> BitWriter<'a> {
    /// Binds a write cursor to `data`, limited to the first `bit_length` bits.
    ///
    /// Written bits are OR-ed into the destination, callers clear the buffer beforehand
    /// when it is reused.
    pub fn open(data: &'a mut [u8], bit_length: usize) -> Result<Self> {
        Self::with_order(data, bit_length, BitOrder::MsbFirst)
    }

    pub fn with_order(data: &'a mut [u8], bit_length: usize, order: BitOrder) -> Result<Self> {
        check_length(bit_length, data.len())?;
        Ok(Self {
            data,
            length: bit_length,
            cursor: 0,
            order,
        })
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn seek_absolute(&mut self, bit_offset: usize) -> Result<()> {
        if bit_offset > self.length {
            return Err(EngineError::BitStreamOutOfRange {
                cursor: bit_offset,
                requested: 0,
                length: self.length,
            });
        }
        self.cursor = bit_offset;
        Ok(())
    }

    /// Writes the low `count` bits (1..=32) of `value` and advances the cursor.
    pub fn write_bits(&mut self, value: u32, count: usize) -> Result<()> {
        check_count(count)?;
        check_range(self.cursor, count, self.length)?;

        for i in 0..count {
            let pos = self.cursor + i;
            let bit = match self.order {
                BitOrder::MsbFirst => (value >> (count - 1 - i)) & 1,
                BitOrder::LsbFirst => (value >> i) & 1,
            };
            if bit != 0 {
                let shift = match self.order {
                    BitOrder::MsbFirst => 7 - (pos & 7),
                    BitOrder::LsbFirst => pos & 7,
                };
                self.data[pos >> 3] |= 1 << shift;
            }
        }
        self.cursor += count;
        Ok(())
    }

    pub fn write_byte(&mut self, value: u8) -> Result<()> {
        self.write_bits(value as u32, 8)
    }
}

/// Copies `bits` bits starting at bit `src_offset` of `src` into `dest`, so that the first
/// copied bit becomes the most significant bit of `dest[0]`. Trailing bits of the last
/// destination byte are cleared.
pub fn copy_bits_unshifted(src: &[u8], src_offset: usize, bits: usize, dest: &mut [u8]) -> Result<()> {
    let needed = bytes_for_bits(bits);
    if dest.len() < needed {
        return Err(EngineError::BitStreamTooLong {
            length: bits,
            capacity: dest.len() * 8,
        });
    }
    if src_offset & 7 == 0 {
        let start = src_offset >> 3;
        check_range(src_offset, bits, src.len() * 8)?;
        dest[..needed].copy_from_slice(&src[start..start + needed]);
        if bits & 7 != 0 {
            dest[needed - 1] &= 0xFF << (8 - (bits & 7));
        }
        return Ok(());
    }

    let mut reader = BitReader::open(src, src.len() * 8)?;
    reader.seek_absolute(src_offset)?;
    dest[..needed].fill(0);
    let mut writer = BitWriter::open(&mut dest[..needed], bits)?;
    let mut remaining = bits;
    while remaining > 0 {
        let chunk = remaining.min(8);
        let value = reader.read_bits(chunk)?;
        writer.write_bits(value, chunk)?;
        remaining -= chunk;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_msb_first() {
        let data = [0b1010_0000, 0xFF];
        let mut reader = BitReader::open(&data, 16).unwrap();
        assert_eq!(1, reader.read_bits(1).unwrap());
        assert_eq!(0b01, reader.read_bits(2).unwrap());
        assert_eq!(0, reader.read_bits(5).unwrap());
        assert_eq!(0xFF, reader.read_byte().unwrap());
        assert_eq!(0, reader.remaining());
    }

    #[test]
    fn test_read_lsb_first() {
        let data = [0b0000_0110];
        let mut reader = BitReader::with_order(&data, 8, BitOrder::LsbFirst).unwrap();
        assert_eq!(0b10, reader.read_bits(2).unwrap());
        assert_eq!(0b1, reader.read_bits(1).unwrap());
    }

    #[test]
    fn test_peek_does_not_advance() {
        let data = [0xAB, 0xCD];
        let mut reader = BitReader::open(&data, 16).unwrap();
        assert_eq!(0xA, reader.peek_bits(4).unwrap());
        assert_eq!(0xA, reader.peek_bits(4).unwrap());
        assert_eq!(0xABC, reader.read_bits(12).unwrap());
    }

    #[test]
    fn test_copy_bits_unshifted() {
        let src = [0b0000_1111, 0b0000_1111];
        let mut dest = [0u8; 1];
        copy_bits_unshifted(&src, 4, 8, &mut dest).unwrap();
        assert_eq!(0b1111_0000, dest[0]);

        let mut dest = [0xFFu8; 1];
        copy_bits_unshifted(&src, 0, 4, &mut dest).unwrap();
        assert_eq!(0, dest[0]);
    }

    #[test]
    fn test_length_larger_than_buffer() {
        let data = [0u8; 2];
        assert!(BitReader::open(&data, 17).is_err());
    }
}
