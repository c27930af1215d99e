//! Bit-field codec for 32-bit register words
//!
//! A field is described by its bit position and width. The mask is derived as
//! `((1 << width) - 1) << position`.

/// Extract a field from `word`
#[must_use]
pub const fn extract(word: u32, pos: u32, mask: u32) -> u32 {
    (word & mask) >> pos
}

/// Insert `value` into the field of `word` selected by `pos` and `mask`
///
/// Bits of `value` that do not fit the mask are discarded.
#[must_use]
pub const fn insert(word: u32, value: u32, pos: u32, mask: u32) -> u32 {
    (word & !mask) | (value.wrapping_shl(pos) & mask)
}

/// Position and width of a named field inside a 32-bit register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitField {
    /// Least significant bit of the field
    pub position: u32,
    /// Number of bits in the field (1..=32)
    pub width: u32,
}

impl BitField {
    /// Create a field descriptor
    #[must_use]
    pub const fn new(position: u32, width: u32) -> Self {
        Self { position, width }
    }

    /// Mask selecting the field inside a register word
    #[must_use]
    pub const fn mask(self) -> u32 {
        let low = if self.width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        };
        low << self.position
    }

    /// Largest value the field can hold
    #[must_use]
    pub const fn max_value(self) -> u32 {
        self.mask() >> self.position
    }

    /// Read this field out of `word`
    #[must_use]
    pub const fn get(self, word: u32) -> u32 {
        extract(word, self.position, self.mask())
    }

    /// Return `word` with this field replaced by `value`
    #[must_use]
    pub const fn set(self, word: u32, value: u32) -> u32 {
        insert(word, value, self.position, self.mask())
    }
}
