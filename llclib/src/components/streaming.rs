//! Per-set constant-stride detector.
//!
//! Each set remembers the block address of its last access and the delta that led to it. A
//! repeated non-zero delta raises the set's confidence, anything else lowers it and replaces the
//! remembered delta. Once confidence reaches the threshold the set is considered to be streaming:
//! lines filled into it are unlikely to be touched again before they leave the cache.

use crate::components::counter::{SaturatingCounter, SaturatingCounterConfig};
use crate::config::StreamingConfig;

#[derive(Debug, Clone, Copy)]
struct StreamEntry {
    // None until the set has been accessed once
    last_block: Option<u64>,
    last_delta: i64,
    confidence: SaturatingCounter,
}

#[derive(Debug, Clone)]
pub struct StreamDetector {
    entries: Vec<StreamEntry>,
    block_bits: u32,
    threshold: u16,
    reset_interval: Option<u64>,
    accesses: u64,
}

impl StreamDetector {
    pub fn new(sets: usize, line_size: u64, config: &StreamingConfig) -> Self {
        let entry = StreamEntry {
            last_block: None,
            last_delta: 0,
            confidence: SaturatingCounterConfig::with_bits(config.confidence_bits, 0).build(),
        };
        Self {
            entries: vec![entry; sets],
            block_bits: line_size.trailing_zeros(),
            threshold: config.threshold,
            reset_interval: config.reset_interval,
            accesses: 0,
        }
    }

    /// Records an access to a set and returns whether the set is now streaming
    ///
    /// # Arguments
    ///
    /// * `set`: The cache set
    /// * `address`: The physical byte address of the access
    ///
    /// returns: bool
    pub fn observe(&mut self, set: usize, address: u64) -> bool {
        self.accesses += 1;
        if let Some(interval) = self.reset_interval {
            if self.accesses % interval == 0 {
                self.entries.iter_mut().for_each(|e| e.confidence.set(0));
            }
        }

        let block = address >> self.block_bits;
        let entry = &mut self.entries[set];
        if let Some(last) = entry.last_block {
            // Wrapping then reinterpreting keeps descending streams negative
            let delta = block.wrapping_sub(last) as i64;
            if delta != 0 && delta == entry.last_delta {
                entry.confidence.increment();
            } else {
                entry.confidence.decrement();
                entry.last_delta = delta;
            }
        }
        entry.last_block = Some(block);
        entry.confidence.value() >= self.threshold
    }

    pub fn is_streaming(&self, set: usize) -> bool {
        self.entries[set].confidence.value() >= self.threshold
    }

    pub fn confidence(&self, set: usize) -> u16 {
        self.entries[set].confidence.value()
    }

    pub fn last_delta(&self, set: usize) -> i64 {
        self.entries[set].last_delta
    }

    pub fn streaming_sets(&self) -> usize {
        (0..self.entries.len()).filter(|&set| self.is_streaming(set)).count()
    }
}
