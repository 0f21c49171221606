//! Dead-block approximation: one saturating counter per physical line slot.
//!
//! Polarity is fixed: 0 is live (and the neutral value a fill starts from), the maximum is dead.
//! A hit resets the slot to live. Every miss to the set pushes each resident line that has not
//! been hit since its fill one step towards dead, so a line that sits untouched while its set
//! keeps missing ends up flagged. A periodic sweep relaxes every slot one step towards live so
//! nothing stays pinned as dead beyond the decay window.

use tracing::trace;

use crate::components::counter::{SaturatingCounter, SaturatingCounterConfig};
use crate::config::DeadBlockConfig;

#[derive(Debug, Clone)]
pub struct DeadBlockTable {
    counters: Vec<SaturatingCounter>,
    ways: usize,
    decay_period: u64,
    fills: u64,
}

impl DeadBlockTable {
    pub fn new(sets: usize, ways: usize, config: &DeadBlockConfig) -> Self {
        let counter = SaturatingCounterConfig::with_bits(config.counter_bits, 0).build();
        Self {
            counters: vec![counter; sets * ways],
            ways,
            decay_period: config.decay_period,
            fills: 0,
        }
    }

    pub fn counter(&self, set: usize, way: usize) -> u16 {
        self.counters[set * self.ways + way].value()
    }

    /// The slot's counter has saturated at dead
    pub fn is_dead(&self, set: usize, way: usize) -> bool {
        self.counters[set * self.ways + way].is_saturated()
    }

    pub fn on_hit(&mut self, set: usize, way: usize) {
        self.counters[set * self.ways + way].set(0);
    }

    /// A miss to `set`: every way for which `stale` holds (resident, not hit since its fill)
    /// moves one step towards dead
    pub fn on_miss(&mut self, set: usize, stale: impl Fn(usize) -> bool) {
        let lines = &mut self.counters[set * self.ways..(set + 1) * self.ways];
        for (way, counter) in lines.iter_mut().enumerate() {
            if stale(way) {
                counter.increment();
            }
        }
    }

    /// A new line was placed in the slot. Its counter restarts from neutral, and the fill is
    /// counted towards the decay sweep.
    pub fn on_fill(&mut self, set: usize, way: usize) {
        self.counters[set * self.ways + way].set(0);
        self.fills += 1;
        if self.fills % self.decay_period == 0 {
            trace!(fills = self.fills, "Decaying dead-block counters");
            self.counters.iter_mut().for_each(SaturatingCounter::decrement);
        }
    }

    pub fn dead_lines(&self) -> usize {
        self.counters.iter().filter(|c| c.is_saturated()).count()
    }
}
