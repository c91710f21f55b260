//! Single-byte packed fields used by the GIF header flag bytes.

/// Accumulates narrow fields into one byte, filling bit 7 first.
///
/// Appending more than 8 bits in total is a caller bug and panics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PackedField {
    raw: u8,
    used: u32,
}

impl PackedField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the low `bits` bits of `value` below the fields already present.
    pub fn push(mut self, value: u8, bits: u32) -> Self {
        assert!(
            self.used + bits <= 8,
            "packed field overflow: {} bits used, {} more requested",
            self.used,
            bits
        );
        if bits == 0 {
            return self;
        }
        let mask = ((1u16 << bits) - 1) as u8;
        self.used += bits;
        self.raw |= (value & mask) << (8 - self.used);
        self
    }

    pub fn push_flag(self, flag: bool) -> Self {
        self.push(flag as u8, 1)
    }

    pub fn byte(self) -> u8 {
        self.raw
    }
}
