//! SHiP-lite: a small, aliased table of reuse counters indexed by a hash of the filling PC.
//!
//! Hits train the signature of the line upwards, lines evicted without a hit since their fill
//! train it downwards. Fills then consult the counter of their own signature to decide how long
//! the new line should be protected.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::components::counter::{SaturatingCounter, SaturatingCounterConfig};
use crate::config::ShipConfig;

/// How a signature is formed from the access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignatureHash {
    /// XOR-fold of the PC alone
    #[default]
    Pc,
    /// XOR-fold of the PC combined with the 4KiB page of the address
    PcAddress,
}

/// Whether the table is shared by all sets or replicated per set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShipScope {
    #[default]
    Global,
    PerSet,
}

/// Reuse prediction for a signature, banded from its counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reuse {
    /// Counter in the upper half: insert near MRU
    High,
    /// Neither confident nor dead, defer to the baseline insertion policy
    Neutral,
    /// Counter at zero: fills from this PC are dead on arrival
    Dead,
}

/// Folds a PC (optionally with the page of the address) down to `bits` bits.
///
/// This is a pure function of its inputs, the same access always maps to the same entry.
pub fn signature(hash: SignatureHash, bits: u32, pc: u64, address: u64) -> u16 {
    let mask = (1u64 << bits) - 1;
    let key = match hash {
        SignatureHash::Pc => pc >> 2,
        SignatureHash::PcAddress => (pc >> 2) ^ (address >> 12),
    };
    let mut folded = 0;
    let mut rest = key;
    while rest != 0 {
        folded ^= rest & mask;
        rest >>= bits;
    }
    folded as u16
}

#[derive(Debug, Clone)]
pub struct ShipTable {
    counters: Vec<SaturatingCounter>,
    counter_config: SaturatingCounterConfig,
    hash: SignatureHash,
    scope: ShipScope,
    signature_bits: u32,
    decay_period: Option<u64>,
    fills: u64,
}

impl ShipTable {
    pub fn new(sets: usize, config: &ShipConfig) -> Self {
        let counter_config = SaturatingCounterConfig::with_bits(config.counter_bits, config.initial);
        let tables = match config.scope {
            ShipScope::Global => 1,
            ShipScope::PerSet => sets,
        };
        debug!(
            entries = config.entries,
            tables,
            storage_bits = config.entries * tables * counter_config.storage_bits(),
            "Building SHiP table"
        );
        Self {
            counters: vec![counter_config.build(); config.entries * tables],
            counter_config,
            hash: config.hash,
            scope: config.scope,
            signature_bits: config.entries.trailing_zeros(),
            decay_period: config.decay_period,
            fills: 0,
        }
    }

    /// The signature a fill of this access would be attributed to
    pub fn signature(&self, pc: u64, address: u64) -> u16 {
        signature(self.hash, self.signature_bits, pc, address)
    }

    fn index(&self, set: usize, signature: u16) -> usize {
        match self.scope {
            ShipScope::Global => signature as usize,
            ShipScope::PerSet => (set << self.signature_bits) | signature as usize,
        }
    }

    pub fn counter(&self, set: usize, signature: u16) -> u16 {
        self.counters[self.index(set, signature)].value()
    }

    pub fn predict(&self, set: usize, signature: u16) -> Reuse {
        let counter = &self.counters[self.index(set, signature)];
        if counter.is_zero() {
            Reuse::Dead
        } else if counter.value() >= counter.midpoint() {
            Reuse::High
        } else {
            Reuse::Neutral
        }
    }

    /// A line filled by `signature` was hit
    pub fn on_hit(&mut self, set: usize, signature: u16) {
        let index = self.index(set, signature);
        self.counters[index].increment();
    }

    /// A line filled by `signature` left the cache without being hit
    pub fn on_dead_eviction(&mut self, set: usize, signature: u16) {
        let index = self.index(set, signature);
        self.counters[index].decrement();
    }

    /// Counts a fill, every `decay_period` fills all counters step down by one
    pub fn on_fill(&mut self) {
        self.fills += 1;
        if let Some(period) = self.decay_period {
            if self.fills % period == 0 {
                self.counters.iter_mut().for_each(SaturatingCounter::decrement);
            }
        }
    }

    /// Number of entries currently predicting high reuse
    pub fn hot_entries(&self) -> usize {
        self.counters
            .iter()
            .filter(|c| c.value() >= c.midpoint())
            .count()
    }

    pub fn entries(&self) -> usize {
        self.counters.len()
    }

    pub fn counter_max(&self) -> u16 {
        self.counter_config.max
    }
}
