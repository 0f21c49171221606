//! The composite RRIP decision engine.
//!
//! Victim selection is RRIP with an override for lines predicted dead. Every fill combines the
//! enabled signals with a fixed precedence:
//!
//! 1. a streaming set inserts at distant RRPV (or bypasses the fill entirely, if configured,
//!    optionally for a bounded number of fills per detected stream),
//! 2. a slot whose dead-block counter is saturated inserts at distant RRPV,
//! 3. SHiP inserts near-immediate for a confident signature and distant for a dead one,
//! 4. anything else uses the insertion policy chosen by set dueling, or the fixed baseline,
//!    demoted to distant while the set is in a low-reuse phase.
//!
//! SRRIP, BRRIP, DRRIP, DIP and SHiP-lite are all configurations of this one engine, see
//! [`crate::config::Preset`].

use tracing::{debug, trace};

use crate::components::{
    BimodalCoin, BypassWindow, DeadBlockTable, DuelKind, DuelPolicy, Reuse, RrpvTable, SetDueling,
    SetReuseTable, ShipTable, StreamDetector,
};
use crate::config::{Geometry, HybridConfig, Insertion, Preset};
use crate::error::ConfigError;
use crate::replacement_policies::{
    Access, AccessCounts, BlockInfo, PolicyStats, ReplacementPolicy, Resolution, Victim,
};

#[derive(Debug, Clone)]
pub struct HybridPolicy {
    name: &'static str,
    ways: usize,
    rrpv: RrpvTable,
    /// SHiP signature each line was filled with
    signatures: Vec<u16>,
    /// Whether each line has been hit since its fill
    reused: Vec<bool>,
    /// Whether each way has ever been filled
    resident: Vec<bool>,
    streaming: Option<StreamDetector>,
    bypass_streaming: bool,
    bypass_window: Option<BypassWindow>,
    ship: Option<ShipTable>,
    dead_blocks: Option<DeadBlockTable>,
    dueling: Option<SetDueling>,
    phase: Option<SetReuseTable>,
    baseline: Insertion,
    coin: BimodalCoin,
    counts: AccessCounts,
}

impl HybridPolicy {
    /// Builds the policy with every structure in its neutral state
    ///
    /// # Arguments
    ///
    /// * `geometry`: The shape of the cache the policy will serve
    /// * `config`: Which signals to enable, and their sizes
    ///
    /// returns: Result<HybridPolicy, ConfigError>
    pub fn new(geometry: &Geometry, config: &HybridConfig) -> Result<Self, ConfigError> {
        geometry.validate()?;
        config.validate(geometry)?;
        let lines = geometry.sets * geometry.ways;
        debug!(
            sets = geometry.sets,
            ways = geometry.ways,
            streaming = config.streaming.is_some(),
            ship = config.ship.is_some(),
            dead_block = config.dead_block.is_some(),
            dueling = config.dueling.is_some(),
            phase = config.phase.is_some(),
            "Building hybrid replacement policy"
        );
        Ok(Self {
            name: "hybrid",
            ways: geometry.ways,
            rrpv: RrpvTable::new(geometry.sets, geometry.ways, config.rrpv_bits),
            signatures: vec![0; lines],
            reused: vec![false; lines],
            resident: vec![false; lines],
            streaming: config
                .streaming
                .as_ref()
                .map(|c| StreamDetector::new(geometry.sets, geometry.line_size, c)),
            bypass_streaming: config.bypass_streaming,
            bypass_window: config
                .bypass_window
                .map(|length| BypassWindow::new(geometry.sets, length)),
            ship: config.ship.as_ref().map(|c| ShipTable::new(geometry.sets, c)),
            dead_blocks: config
                .dead_block
                .as_ref()
                .map(|c| DeadBlockTable::new(geometry.sets, geometry.ways, c)),
            dueling: config.dueling.as_ref().map(|c| SetDueling::new(geometry.sets, c)),
            phase: config.phase.as_ref().map(|c| SetReuseTable::new(geometry.sets, c)),
            baseline: config.baseline,
            coin: BimodalCoin::new(config.bimodal, config.bimodal_one_in),
            counts: AccessCounts::default(),
        })
    }

    pub fn from_preset(geometry: &Geometry, preset: Preset) -> Result<Self, ConfigError> {
        let mut policy = Self::new(geometry, &preset.config())?;
        policy.name = preset.name();
        Ok(policy)
    }

    pub fn rrpv(&self, set: usize, way: usize) -> u8 {
        self.rrpv.get(set, way)
    }

    pub fn rrpv_max(&self) -> u8 {
        self.rrpv.max()
    }

    pub fn is_streaming(&self, set: usize) -> bool {
        self.streaming.as_ref().is_some_and(|s| s.is_streaming(set))
    }

    pub fn stream_detector(&self) -> Option<&StreamDetector> {
        self.streaming.as_ref()
    }

    pub fn ship(&self) -> Option<&ShipTable> {
        self.ship.as_ref()
    }

    pub fn dead_blocks(&self) -> Option<&DeadBlockTable> {
        self.dead_blocks.as_ref()
    }

    pub fn dueling(&self) -> Option<&SetDueling> {
        self.dueling.as_ref()
    }

    pub fn bypass_window(&self) -> Option<&BypassWindow> {
        self.bypass_window.as_ref()
    }

    pub fn set_reuse(&self) -> Option<&SetReuseTable> {
        self.phase.as_ref()
    }

    /// A miss in `set` would be bypassed rather than filled
    pub fn would_bypass(&self, set: usize) -> bool {
        self.bypass_streaming
            && self.is_streaming(set)
            && self.bypass_window.as_ref().map_or(true, |w| w.is_open(set))
    }

    /// The SHiP signature a line was filled with
    pub fn line_signature(&self, set: usize, way: usize) -> u16 {
        self.signatures[set * self.ways + way]
    }

    /// The insertion policy a fill into `set` falls back to once the predictors have no opinion
    pub fn fallback_insertion(&self, set: usize) -> Insertion {
        match &self.dueling {
            Some(dueling) => {
                let (a, b) = match dueling.kind() {
                    DuelKind::Drrip => (Insertion::Srrip, Insertion::Brrip),
                    DuelKind::Dip => (Insertion::Lip, Insertion::Bip),
                };
                match dueling.policy_for(set) {
                    DuelPolicy::A => a,
                    DuelPolicy::B => b,
                }
            }
            None => self.baseline,
        }
    }

    fn depth_for(&mut self, insertion: Insertion) -> u8 {
        let max = self.rrpv.max();
        match insertion {
            Insertion::Srrip => self.rrpv.long(),
            Insertion::Brrip if self.coin.throw() => self.rrpv.long(),
            Insertion::Brrip | Insertion::Lip => max,
            Insertion::Bip if self.coin.throw() => 0,
            Insertion::Bip => max,
        }
    }

    /// The RRPV a line filled into `way` of `set` starts with
    fn insertion_depth(&mut self, set: usize, way: usize, signature: u16, streaming: bool) -> u8 {
        let max = self.rrpv.max();
        if streaming {
            return max;
        }
        if self.dead_blocks.as_ref().is_some_and(|d| d.is_dead(set, way)) {
            return max;
        }
        if let Some(ship) = &self.ship {
            match ship.predict(set, signature) {
                Reuse::High => return 0,
                Reuse::Dead => return max,
                Reuse::Neutral => {}
            }
        }
        if self.phase.as_ref().is_some_and(|p| p.is_low(set)) {
            return max;
        }
        let insertion = self.fallback_insertion(set);
        self.depth_for(insertion)
    }
}

/// Ways of a set that hold a line which hasn't been hit since its fill
fn stale_lines<'a>(
    resident: &'a [bool],
    reused: &'a [bool],
    base: usize,
) -> impl Fn(usize) -> bool + 'a {
    move |way| resident[base + way] && !reused[base + way]
}

impl ReplacementPolicy for HybridPolicy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn get_victim(&mut self, set: usize, lines: &[BlockInfo], access: &Access) -> Victim {
        if let Some(way) = lines.iter().position(|line| !line.valid) {
            return Victim::Way(way);
        }
        if self.would_bypass(set) {
            trace!(set, address = access.address, "Bypassing fill in streaming set");
            return Victim::Bypass;
        }
        let dead_blocks = self.dead_blocks.as_ref();
        let way = self
            .rrpv
            .find_victim(set, |way| dead_blocks.is_some_and(|d| d.is_dead(set, way)));
        Victim::Way(way)
    }

    fn update(&mut self, set: usize, access: &Access, resolution: Resolution) {
        self.counts.record(&resolution);
        let streaming = match &mut self.streaming {
            Some(detector) => detector.observe(set, access.address),
            None => false,
        };
        if let Some(window) = &mut self.bypass_window {
            window.observe(set, streaming);
        }
        if let Some(phase) = &mut self.phase {
            phase.on_access();
        }
        let base = set * self.ways;

        match resolution {
            Resolution::Hit { way } => {
                let line = base + way;
                self.rrpv.promote(set, way);
                self.reused[line] = true;
                if let Some(ship) = &mut self.ship {
                    ship.on_hit(set, self.signatures[line]);
                }
                if let Some(dead_blocks) = &mut self.dead_blocks {
                    dead_blocks.on_hit(set, way);
                }
                if let Some(phase) = &mut self.phase {
                    phase.on_hit(set);
                }
            }
            Resolution::Fill { way, victim } => {
                let line = base + way;
                // Train on the outgoing block before the slot is overwritten
                if victim.is_some() && !self.reused[line] {
                    if let Some(ship) = &mut self.ship {
                        ship.on_dead_eviction(set, self.signatures[line]);
                    }
                }
                if let Some(dueling) = &mut self.dueling {
                    dueling.on_miss(set);
                }
                // The outgoing line counts too: its slot's state decides this fill's depth
                if let Some(dead_blocks) = &mut self.dead_blocks {
                    dead_blocks.on_miss(set, stale_lines(&self.resident, &self.reused, base));
                }

                let signature = self
                    .ship
                    .as_ref()
                    .map_or(0, |ship| ship.signature(access.pc, access.address));
                let depth = self.insertion_depth(set, way, signature, streaming);
                self.rrpv.set(set, way, depth);
                self.signatures[line] = signature;
                self.reused[line] = false;
                self.resident[line] = true;

                if let Some(ship) = &mut self.ship {
                    ship.on_fill();
                }
                if let Some(dead_blocks) = &mut self.dead_blocks {
                    dead_blocks.on_fill(set, way);
                }
            }
            Resolution::Bypass => {
                if let Some(dueling) = &mut self.dueling {
                    dueling.on_miss(set);
                }
                if let Some(dead_blocks) = &mut self.dead_blocks {
                    dead_blocks.on_miss(set, stale_lines(&self.resident, &self.reused, base));
                }
                if let Some(window) = &mut self.bypass_window {
                    window.consume(set);
                }
            }
        }
    }

    fn stats(&self) -> PolicyStats {
        let mut stats = PolicyStats::new(self.name, self.counts);
        stats.psel = self.dueling.as_ref().map(SetDueling::psel);
        stats.streaming_sets = self.streaming.as_ref().map(StreamDetector::streaming_sets);
        stats.hot_signatures = self.ship.as_ref().map(ShipTable::hot_entries);
        stats.dead_lines = self.dead_blocks.as_ref().map(DeadBlockTable::dead_lines);
        stats.low_reuse_sets = self.phase.as_ref().map(SetReuseTable::low_sets);
        stats.rrpv_histogram = self.rrpv.histogram();
        stats
    }
}
