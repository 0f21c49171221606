//! Bounds how long a streaming set may bypass.
//!
//! When a set starts streaming it is granted `length` bypasses. Once they are spent the set keeps
//! filling (at distant RRPV) until the stream breaks and a new one is detected, which re-arms the
//! window. This caps the damage of a stream that was misdetected and is actually being reused.

#[derive(Debug, Clone)]
pub struct BypassWindow {
    remaining: Vec<u32>,
    streaming: Vec<bool>,
    length: u32,
}

impl BypassWindow {
    pub fn new(sets: usize, length: u32) -> Self {
        Self {
            remaining: vec![0; sets],
            streaming: vec![false; sets],
            length,
        }
    }

    /// Follows the set's streaming state after each access, arming the window on a new stream
    pub fn observe(&mut self, set: usize, streaming: bool) {
        if streaming && !self.streaming[set] {
            self.remaining[set] = self.length;
        } else if !streaming {
            self.remaining[set] = 0;
        }
        self.streaming[set] = streaming;
    }

    pub fn is_open(&self, set: usize) -> bool {
        self.remaining[set] > 0
    }

    pub fn remaining(&self, set: usize) -> u32 {
        self.remaining[set]
    }

    /// Spends one bypass
    pub fn consume(&mut self, set: usize) {
        self.remaining[set] = self.remaining[set].saturating_sub(1);
    }
}
