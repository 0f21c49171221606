//! Implementation of a saturating counter.

use serde::{Deserialize, Serialize};

/// Configuration for building a [`SaturatingCounter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaturatingCounterConfig {
    pub max: u16,
    pub default: u16,
}

impl SaturatingCounterConfig {
    /// A counter of `bits` width starting at `default`
    pub fn with_bits(bits: u8, default: u16) -> Self {
        Self {
            max: (1u16 << bits) - 1,
            default,
        }
    }

    /// A counter of `bits` width starting at its midpoint
    pub fn centred(bits: u8) -> Self {
        let max = (1u16 << bits) - 1;
        Self {
            max,
            default: (max + 1) / 2,
        }
    }

    pub fn storage_bits(&self) -> usize {
        (u16::BITS - self.max.leading_zeros()) as usize
    }

    pub fn build(self) -> SaturatingCounter {
        SaturatingCounter {
            value: self.default.min(self.max),
            max: self.max,
        }
    }
}

/// An N-bit counter which clamps at zero and at its maximum instead of wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaturatingCounter {
    value: u16,
    max: u16,
}

impl SaturatingCounter {
    pub fn increment(&mut self) {
        if self.value < self.max {
            self.value += 1;
        }
    }

    pub fn decrement(&mut self) {
        self.value = self.value.saturating_sub(1);
    }

    /// Set the counter, clamping to its range.
    pub fn set(&mut self, value: u16) {
        self.value = value.min(self.max);
    }

    pub fn value(&self) -> u16 {
        self.value
    }

    pub fn max(&self) -> u16 {
        self.max
    }

    /// The first value of the upper half of the range, e.g. 2 for a 2-bit counter, 512 for 10 bits
    pub fn midpoint(&self) -> u16 {
        (self.max + 1) / 2
    }

    pub fn is_saturated(&self) -> bool {
        self.value == self.max
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }
}
