//! GIF flavoured LZW over palette indices.
//!
//! Codes are packed least-significant bit first through [`BitStream`],
//! start at `min_code_size + 1` bits and grow up to 12 bits. The clear code
//! is `1 << min_code_size` and the end code follows it.
//!
//! [`BitStream`]: crate::bitstream::BitStream
mod decode;
mod encode;
mod types;

pub use decode::decompress;
pub use encode::{compress, Compressed, LzwEncoder};
pub use types::{MAX_CODES, MAX_CODE_SIZE};

/// Smallest code size able to hold `color_count` roots, never below 2.
pub fn min_code_size(color_count: usize) -> u8 {
    let count = color_count.max(4);
    (usize::BITS - (count - 1).leading_zeros()) as u8
}
