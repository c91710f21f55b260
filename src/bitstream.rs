//! Bit-addressable buffer used to pack and unpack variable-width LZW codes.
//!
//! Bits are stored least-significant first, both inside a byte and across
//! byte boundaries, which is the order GIF uses for its code stream.

use bitter::{BitReader, LittleEndianReader};

use crate::errors::{GifError, Result};

/// Growable write-side bit buffer.
///
/// A fresh stream holds a single zero byte. The final byte is always
/// zero-padded above the last written bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStream {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl Default for BitStream {
    fn default() -> Self {
        Self::new()
    }
}

impl BitStream {
    pub fn new() -> Self {
        BitStream {
            bytes: vec![0],
            bit_len: 0,
        }
    }

    /// Wraps a completed buffer. Every bit of every byte counts as written.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let bit_len = bytes.len() * 8;
        BitStream { bytes, bit_len }
    }

    /// Appends the low `bit_count` bits of `value`.
    ///
    /// # Panics
    ///
    /// If `bit_count` is larger than 32.
    pub fn write(&mut self, value: u32, bit_count: u32) {
        assert!(bit_count <= 32, "cannot write {} bits at once", bit_count);
        let mut value = value;
        let mut remaining = bit_count;

        while remaining > 0 {
            let offset = (self.bit_len % 8) as u32;
            if offset == 0 && self.bytes.len() * 8 == self.bit_len {
                self.bytes.push(0);
            }
            let take = (8 - offset).min(remaining);
            let chunk = (value & ((1u32 << take) - 1)) as u8;
            if let Some(last) = self.bytes.last_mut() {
                *last |= chunk << offset;
            }
            value >>= take;
            remaining -= take;
            self.bit_len += take as usize;
        }
    }

    /// The buffer written so far, including the padded final byte.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of bits written.
    pub fn len(&self) -> usize {
        self.bit_len
    }

    pub fn is_empty(&self) -> bool {
        self.bit_len == 0
    }

    /// A fresh read cursor over exactly the bits written so far.
    pub fn at_head(&self) -> BitCursor<'_> {
        BitCursor {
            reader: LittleEndianReader::new(&self.bytes),
            position: 0,
            len: self.bit_len,
        }
    }
}

/// Independent read cursor over an immutable byte snapshot.
pub struct BitCursor<'a> {
    reader: LittleEndianReader<'a>,
    position: usize,
    len: usize,
}

impl<'a> BitCursor<'a> {
    /// Cursor over every bit of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        BitCursor {
            reader: LittleEndianReader::new(bytes),
            position: 0,
            len: bytes.len() * 8,
        }
    }

    /// Reads the next `bit_count` (at most 32) bits.
    pub fn read(&mut self, bit_count: u32) -> Result<u32> {
        if bit_count == 0 {
            return Ok(0);
        }
        let out_of_range = GifError::OutOfRange {
            position: self.position,
            requested: bit_count,
            len: self.len,
        };
        if bit_count > 32 || self.position + bit_count as usize > self.len {
            return Err(out_of_range);
        }
        let value = self.reader.read_bits(bit_count).ok_or(out_of_range)?;
        self.position += bit_count as usize;
        Ok(value as u32)
    }

    /// Bit offset of the next read.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.len - self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_stream_is_one_zero_byte() {
        let stream = BitStream::new();
        assert_eq!(stream.bytes(), &[0]);
        assert!(stream.is_empty());
    }

    #[test]
    fn writes_cross_byte_boundaries() {
        let mut sink = BitStream::new();
        sink.write(0b11, 2);
        assert_eq!(sink.bytes(), &[0b11]);
        sink.write(0b0, 1);
        assert_eq!(sink.bytes(), &[0b011]);
        sink.write(0b0101, 4);
        assert_eq!(sink.bytes(), &[0b0101011]);
        sink.write(0b101, 3);
        assert_eq!(sink.bytes(), &[0b10101011, 0b10]);
        assert_eq!(sink.len(), 10);

        let mut source = sink.at_head();
        assert_eq!(source.read(2).unwrap(), 0b11);
        assert_eq!(source.read(1).unwrap(), 0b0);
        assert_eq!(source.read(4).unwrap(), 0b0101);
        assert_eq!(source.read(3).unwrap(), 0b101);
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn sixteen_bit_value() {
        let mut sink = BitStream::new();
        sink.write(0xABCD, 16);
        assert_eq!(sink.bytes(), &[0xCD, 0xAB]);

        let mut source = sink.at_head();
        assert_eq!(source.read(16).unwrap(), 0xABCD);
    }

    #[test]
    fn full_byte_does_not_grow_buffer() {
        let mut sink = BitStream::new();
        sink.write(0xFF, 8);
        assert_eq!(sink.bytes(), &[0xFF]);
        sink.write(1, 1);
        assert_eq!(sink.bytes(), &[0xFF, 0x01]);
    }

    #[test]
    fn zero_bit_write_is_noop() {
        let mut sink = BitStream::new();
        sink.write(0xFFFF, 0);
        assert_eq!(sink.bytes(), &[0]);
        assert_eq!(sink.len(), 0);
    }

    #[test]
    fn only_low_bits_are_written() {
        let mut sink = BitStream::new();
        sink.write(0b1111_0110, 3);
        assert_eq!(sink.bytes(), &[0b110]);
    }

    #[test]
    fn full_width_value() {
        let mut sink = BitStream::new();
        sink.write(1, 1);
        sink.write(0xDEAD_BEEF, 32);
        let mut source = sink.at_head();
        assert_eq!(source.read(1).unwrap(), 1);
        assert_eq!(source.read(32).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn reading_past_end_is_out_of_range() {
        let mut sink = BitStream::new();
        sink.write(0b101, 3);
        let mut source = sink.at_head();
        assert!(matches!(
            source.read(4),
            Err(GifError::OutOfRange {
                position: 0,
                requested: 4,
                len: 3
            })
        ));
        // A failed read leaves the cursor where it was.
        assert_eq!(source.read(3).unwrap(), 0b101);
    }

    #[test]
    fn cursors_are_independent() {
        let mut sink = BitStream::new();
        sink.write(0x5A, 8);
        let mut first = sink.at_head();
        let mut second = sink.at_head();
        assert_eq!(first.read(4).unwrap(), 0xA);
        assert_eq!(second.read(8).unwrap(), 0x5A);
        assert_eq!(first.read(4).unwrap(), 0x5);
    }

    #[test]
    fn from_bytes_counts_every_bit() {
        let stream = BitStream::from_bytes(vec![0x01, 0x80]);
        assert_eq!(stream.len(), 16);
        let mut source = BitCursor::new(stream.bytes());
        assert_eq!(source.read(1).unwrap(), 1);
        assert_eq!(source.read(14).unwrap(), 0);
        assert_eq!(source.read(1).unwrap(), 1);
    }
}
