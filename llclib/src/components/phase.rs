//! Per-set reuse phase tracking.
//!
//! Each set carries a small counter that hits raise and a periodic sweep lowers. A set whose
//! counter has sunk to the low threshold is in a low-reuse phase: fills that would otherwise take
//! the dueling or baseline insertion go in at distant RRPV instead.

use tracing::trace;

use crate::components::counter::{SaturatingCounter, SaturatingCounterConfig};
use crate::config::PhaseConfig;

#[derive(Debug, Clone)]
pub struct SetReuseTable {
    counters: Vec<SaturatingCounter>,
    low_threshold: u16,
    decay_period: u64,
    accesses: u64,
}

impl SetReuseTable {
    pub fn new(sets: usize, config: &PhaseConfig) -> Self {
        let counter = SaturatingCounterConfig::with_bits(config.counter_bits, config.initial).build();
        Self {
            counters: vec![counter; sets],
            low_threshold: config.low_threshold,
            decay_period: config.decay_period,
            accesses: 0,
        }
    }

    /// Counts an access, every `decay_period` accesses all sets step down by one
    pub fn on_access(&mut self) {
        self.accesses += 1;
        if self.accesses % self.decay_period == 0 {
            trace!(accesses = self.accesses, "Decaying set reuse counters");
            self.counters.iter_mut().for_each(SaturatingCounter::decrement);
        }
    }

    pub fn on_hit(&mut self, set: usize) {
        self.counters[set].increment();
    }

    pub fn reuse(&self, set: usize) -> u16 {
        self.counters[set].value()
    }

    pub fn is_low(&self, set: usize) -> bool {
        self.counters[set].value() <= self.low_threshold
    }

    pub fn low_sets(&self) -> usize {
        (0..self.counters.len()).filter(|&set| self.is_low(set)).count()
    }
}
