//! Bit-field helpers shared by every packed record
//!
//! Records are stored as arrays of little-endian `u64` words. A [`Field`]
//! names one sub-field (word, shift, width) so that all shift and mask
//! arithmetic lives here instead of in each accessor.

use log::{log, Level};

use crate::error::{Error, Result};

/// All-ones mask of `width` bits
pub const fn low_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Write `src` into element `position` of a packed array of `width`-bit
/// elements held in `dst`, preserving all other bits.
///
/// `src` is not range checked: callers must ensure `src < 2^width` and
/// `(position + 1) * width <= 64`.
pub const fn overwrite(dst: u64, src: u64, position: u32, width: u32) -> u64 {
    let shift = position * width;
    let mask = low_mask(width) << shift;
    (dst & !mask) | (src << shift)
}

/// Read element `position` of a packed array of `width`-bit elements
pub const fn read(src: u64, position: u32, width: u32) -> u64 {
    (src >> (position * width)) & low_mask(width)
}

/// A named sub-field of a multi-word record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub word: usize,
    pub shift: u32,
    pub width: u32,
}

impl Field {
    pub const fn new(word: usize, shift: u32, width: u32) -> Self {
        Self { word, shift, width }
    }

    /// Largest value the field can hold
    pub const fn max(&self) -> u64 {
        low_mask(self.width)
    }

    pub fn get(&self, words: &[u64]) -> u64 {
        (words[self.word] >> self.shift) & self.max()
    }

    /// Store `value`, truncated to the field width
    pub fn set(&self, words: &mut [u64], value: u64) {
        let mask = self.max() << self.shift;
        let word = &mut words[self.word];
        *word = (*word & !mask) | ((value & self.max()) << self.shift);
    }

    pub fn get_bool(&self, words: &[u64]) -> bool {
        self.get(words) != 0
    }

    pub fn set_bool(&self, words: &mut [u64], value: bool) {
        self.set(words, value as u64);
    }
}

/// What a setter does with a value above its limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// The value cannot be represented; the record is left untouched
    Fail,
    /// Store the limit instead
    Clamp(Level),
    /// Store `value & limit` (limit must be an all-ones mask)
    Mask(Level),
    /// Leave the record untouched
    Drop(Level),
}

impl Overflow {
    /// Resolve `value` against `limit`.
    ///
    /// Returns `Ok(Some(v))` with the value to store, `Ok(None)` when the
    /// update must be skipped, or an error for [`Overflow::Fail`].
    pub fn apply(self, field: &'static str, value: u64, limit: u64) -> Result<Option<u64>> {
        if value <= limit {
            return Ok(Some(value));
        }
        match self {
            Overflow::Fail => Err(Error::FieldOverflow {
                field,
                value,
                max: limit,
            }),
            Overflow::Clamp(level) => {
                log!(level, "{field} exceeds max: {value}, storing {limit}");
                Ok(Some(limit))
            }
            Overflow::Mask(level) => {
                log!(level, "{field} exceeds maximum allowed: {value}, masking to {limit}");
                Ok(Some(value & limit))
            }
            Overflow::Drop(level) => {
                log!(level, "{field} {value} exceeds max {limit} - skip");
                Ok(None)
            }
        }
    }
}
