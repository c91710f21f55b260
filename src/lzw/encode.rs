use std::collections::HashMap;

use super::types::{CodeSpace, MAX_CODES, MAX_CODE_SIZE};
use crate::bitstream::BitStream;
use crate::errors::{GifError, Result};

/// LZW output: the minimum code size byte followed by the packed code bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    pub min_code_size: u8,
    pub data: Vec<u8>,
}

/// Incremental GIF LZW encoder.
///
/// The clear code is written on construction; indices are fed one at a
/// time and [`LzwEncoder::finish`] flushes the pending sequence and the end
/// code.
#[derive(Debug)]
pub struct LzwEncoder {
    space: CodeSpace,
    color_count: usize,
    code_size: u32,
    next_code: u16,
    // (prefix code, next index) -> code
    dictionary: HashMap<(u16, u8), u16>,
    current: Option<u16>,
    sink: BitStream,
}

impl LzwEncoder {
    pub fn new(color_count: usize) -> Result<Self> {
        let space = CodeSpace::new(super::min_code_size(color_count))?;
        let mut encoder = LzwEncoder {
            space,
            color_count,
            code_size: space.initial_code_size(),
            next_code: space.first_code(),
            dictionary: HashMap::new(),
            current: None,
            sink: BitStream::new(),
        };
        encoder.emit(space.clear_code());
        Ok(encoder)
    }

    pub fn min_code_size(&self) -> u8 {
        self.space.min_code_size
    }

    pub fn push(&mut self, index: u8) -> Result<()> {
        if index as usize >= self.color_count {
            return Err(GifError::IndexOutOfPalette {
                index,
                color_count: self.color_count,
            });
        }
        let prefix = match self.current {
            None => {
                self.current = Some(index as u16);
                return Ok(());
            }
            Some(prefix) => prefix,
        };
        if let Some(&code) = self.dictionary.get(&(prefix, index)) {
            self.current = Some(code);
            return Ok(());
        }

        self.emit(prefix);
        if self.next_code as usize == MAX_CODES {
            self.emit(self.space.clear_code());
            self.reset();
        } else {
            self.dictionary.insert((prefix, index), self.next_code);
            self.next_code += 1;
        }
        self.current = Some(index as u16);
        Ok(())
    }

    pub fn finish(mut self) -> Compressed {
        if let Some(prefix) = self.current.take() {
            self.emit(prefix);
        }
        self.emit(self.space.end_code());
        Compressed {
            min_code_size: self.space.min_code_size,
            data: self.sink.into_bytes(),
        }
    }

    // The width grows once the dictionary fills the current code space. The
    // check runs after each emitted code, which keeps the encoder in step with
    // a decoder that adds its entry one code later.
    fn emit(&mut self, code: u16) {
        self.sink.write(code as u32, self.code_size);
        if self.next_code as usize == 1 << self.code_size && self.code_size < MAX_CODE_SIZE {
            self.code_size += 1;
        }
    }

    fn reset(&mut self) {
        self.dictionary.clear();
        self.next_code = self.space.first_code();
        self.code_size = self.space.initial_code_size();
    }
}

/// Compresses a palette index sequence for a palette of `color_count` colors.
pub fn compress(indices: &[u8], color_count: usize) -> Result<Compressed> {
    let mut encoder = LzwEncoder::new(color_count)?;
    for &index in indices {
        encoder.push(index)?;
    }
    Ok(encoder.finish())
}
