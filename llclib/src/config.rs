use serde::{Deserialize, Serialize};

use crate::components::{BimodalSource, DuelKind, LeaderLayout, ShipScope, SignatureHash};
use crate::error::ConfigError;

/// Independent last-level caches, each simulated on the same trace so their policies can be
/// compared side by side
#[derive(Debug, Deserialize)]
pub struct ExperimentConfig {
    pub caches: Vec<CacheConfig>,
    /// Log a heartbeat from every policy each time this many accesses have been simulated
    #[serde(default)]
    pub heartbeat_interval: Option<u64>,
}

/// A configuration for a single last-level cache
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    pub name: String,
    #[serde(default = "default_sets")]
    pub sets: usize,
    #[serde(default = "default_ways")]
    pub ways: usize,
    #[serde(default = "default_line_size")]
    pub line_size: u64,
    #[serde(default)]
    pub replacement_policy: ReplacementPolicyConfig,
}

fn default_sets() -> usize {
    2048
}

fn default_ways() -> usize {
    16
}

fn default_line_size() -> u64 {
    64
}

/// The shape of a cache, shared by the cache and its replacement policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub sets: usize,
    pub ways: usize,
    pub line_size: u64,
}

impl Default for Geometry {
    /// The single-core LLC: 2048 sets of 16 ways, 64 byte lines
    fn default() -> Self {
        Self {
            sets: default_sets(),
            ways: default_ways(),
            line_size: default_line_size(),
        }
    }
}

/// The replacement policy - lru, a named preset, or an explicit hybrid configuration. Defaults
/// to lru.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementPolicyConfig {
    #[serde(alias = "lru")]
    #[default]
    LeastRecentlyUsed,
    Preset(Preset),
    Hybrid(HybridConfig),
}

/// Named configurations of the hybrid policy, one per family of the classic designs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Srrip,
    Brrip,
    Drrip,
    Dip,
    ShipLite,
    ShipDrripStreaming,
    DipShipDeadBlock,
    ShipStreamingDeadBlock,
    StreamingBypassDrrip,
    FullHybrid,
    PhaseAdaptiveDrrip,
    ShipDrripAdaptiveBypass,
}

impl Preset {
    pub const ALL: [Preset; 12] = [
        Preset::Srrip,
        Preset::Brrip,
        Preset::Drrip,
        Preset::Dip,
        Preset::ShipLite,
        Preset::ShipDrripStreaming,
        Preset::DipShipDeadBlock,
        Preset::ShipStreamingDeadBlock,
        Preset::StreamingBypassDrrip,
        Preset::FullHybrid,
        Preset::PhaseAdaptiveDrrip,
        Preset::ShipDrripAdaptiveBypass,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Srrip => "srrip",
            Preset::Brrip => "brrip",
            Preset::Drrip => "drrip",
            Preset::Dip => "dip",
            Preset::ShipLite => "ship_lite",
            Preset::ShipDrripStreaming => "ship_drrip_streaming",
            Preset::DipShipDeadBlock => "dip_ship_dead_block",
            Preset::ShipStreamingDeadBlock => "ship_streaming_dead_block",
            Preset::StreamingBypassDrrip => "streaming_bypass_drrip",
            Preset::FullHybrid => "full_hybrid",
            Preset::PhaseAdaptiveDrrip => "phase_adaptive_drrip",
            Preset::ShipDrripAdaptiveBypass => "ship_drrip_adaptive_bypass",
        }
    }

    pub fn config(self) -> HybridConfig {
        let base = HybridConfig::default();
        match self {
            Preset::Srrip => base,
            Preset::Brrip => HybridConfig {
                baseline: Insertion::Brrip,
                ..base
            },
            Preset::Drrip => HybridConfig {
                dueling: Some(DuelingConfig::default()),
                ..base
            },
            Preset::Dip => HybridConfig {
                dueling: Some(DuelingConfig {
                    kind: DuelKind::Dip,
                    leader_sets: 64,
                    ..DuelingConfig::default()
                }),
                ..base
            },
            Preset::ShipLite => HybridConfig {
                ship: Some(ShipConfig::default()),
                ..base
            },
            Preset::ShipDrripStreaming => HybridConfig {
                streaming: Some(StreamingConfig::default()),
                ship: Some(ShipConfig::default()),
                dueling: Some(DuelingConfig::default()),
                ..base
            },
            Preset::DipShipDeadBlock => HybridConfig {
                ship: Some(ShipConfig::default()),
                dead_block: Some(DeadBlockConfig::default()),
                dueling: Some(DuelingConfig {
                    kind: DuelKind::Dip,
                    leader_sets: 64,
                    ..DuelingConfig::default()
                }),
                ..base
            },
            Preset::ShipStreamingDeadBlock => HybridConfig {
                streaming: Some(StreamingConfig::default()),
                ship: Some(ShipConfig::default()),
                dead_block: Some(DeadBlockConfig::default()),
                ..base
            },
            Preset::StreamingBypassDrrip => HybridConfig {
                streaming: Some(StreamingConfig::default()),
                bypass_streaming: true,
                ship: Some(ShipConfig {
                    hash: SignatureHash::PcAddress,
                    ..ShipConfig::default()
                }),
                dueling: Some(DuelingConfig {
                    layout: LeaderLayout::Interleaved,
                    ..DuelingConfig::default()
                }),
                ..base
            },
            Preset::FullHybrid => HybridConfig {
                streaming: Some(StreamingConfig {
                    reset_interval: Some(1 << 16),
                    ..StreamingConfig::default()
                }),
                ship: Some(ShipConfig {
                    entries: 1024,
                    decay_period: Some(4096),
                    ..ShipConfig::default()
                }),
                dead_block: Some(DeadBlockConfig::default()),
                dueling: Some(DuelingConfig::default()),
                ..base
            },
            Preset::PhaseAdaptiveDrrip => HybridConfig {
                streaming: Some(StreamingConfig::default()),
                phase: Some(PhaseConfig::default()),
                dueling: Some(DuelingConfig::default()),
                ..base
            },
            Preset::ShipDrripAdaptiveBypass => HybridConfig {
                streaming: Some(StreamingConfig::default()),
                bypass_streaming: true,
                bypass_window: Some(8),
                ship: Some(ShipConfig::default()),
                dueling: Some(DuelingConfig::default()),
                ..base
            },
        }
    }
}

/// A fixed insertion policy, used directly when set dueling is off and as the two sides of a
/// duel otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Insertion {
    /// One step short of distant
    #[default]
    Srrip,
    /// Distant, occasionally one step short of distant
    Brrip,
    /// Distant (the LRU position)
    Lip,
    /// Distant, occasionally near-immediate (the MRU position)
    Bip,
}

/// Which signals the hybrid policy combines, and how each is sized
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct HybridConfig {
    /// Width of each line's RRPV, 2 gives RRPV_MAX = 3
    pub rrpv_bits: u8,
    /// Insertion policy when `dueling` is off
    pub baseline: Insertion,
    pub streaming: Option<StreamingConfig>,
    /// Don't fill at all in streaming sets, instead of filling at distant RRPV
    pub bypass_streaming: bool,
    /// Limit each detected stream to this many bypasses, then fill at distant RRPV
    pub bypass_window: Option<u32>,
    pub ship: Option<ShipConfig>,
    pub dead_block: Option<DeadBlockConfig>,
    pub dueling: Option<DuelingConfig>,
    pub phase: Option<PhaseConfig>,
    pub bimodal: BimodalSource,
    /// Bimodal policies take their exception once in this many fills
    pub bimodal_one_in: u32,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            rrpv_bits: 2,
            baseline: Insertion::Srrip,
            streaming: None,
            bypass_streaming: false,
            bypass_window: None,
            ship: None,
            dead_block: None,
            dueling: None,
            phase: None,
            bimodal: BimodalSource::default(),
            bimodal_one_in: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Confidence at which a set is declared streaming
    pub threshold: u16,
    pub confidence_bits: u8,
    /// Clear every set's confidence each time this many accesses have been observed
    pub reset_interval: Option<u64>,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            threshold: 2,
            confidence_bits: 2,
            reset_interval: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShipConfig {
    /// Entries per table, a power of two
    pub entries: usize,
    pub counter_bits: u8,
    /// Starting value of every counter
    pub initial: u16,
    pub hash: SignatureHash,
    pub scope: ShipScope,
    /// Step every counter down by one each time this many fills have happened
    pub decay_period: Option<u64>,
}

impl Default for ShipConfig {
    fn default() -> Self {
        Self {
            entries: 64,
            counter_bits: 2,
            initial: 1,
            hash: SignatureHash::Pc,
            scope: ShipScope::Global,
            decay_period: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeadBlockConfig {
    pub counter_bits: u8,
    /// Relax every counter one step towards live each time this many fills have happened
    pub decay_period: u64,
}

impl Default for DeadBlockConfig {
    fn default() -> Self {
        Self {
            counter_bits: 2,
            decay_period: 4096,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DuelingConfig {
    pub kind: DuelKind,
    /// Leader sets for each of the two policies
    pub leader_sets: usize,
    pub layout: LeaderLayout,
    pub psel_bits: u8,
}

impl Default for DuelingConfig {
    fn default() -> Self {
        Self {
            kind: DuelKind::Drrip,
            leader_sets: 32,
            layout: LeaderLayout::Ends,
            psel_bits: 10,
        }
    }
}

/// Per-set reuse phase tracking
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PhaseConfig {
    pub counter_bits: u8,
    /// Starting value of every set's counter
    pub initial: u16,
    /// A set at or below this value is in a low-reuse phase
    pub low_threshold: u16,
    /// Step every set down by one each time this many accesses have been observed
    pub decay_period: u64,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            counter_bits: 2,
            initial: 2,
            low_threshold: 1,
            decay_period: 500_000,
        }
    }
}

fn check_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn check_power_of_two(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if !value.is_power_of_two() {
        return Err(ConfigError::NotPowerOfTwo { field, value });
    }
    Ok(())
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.caches.is_empty() {
            return Err(ConfigError::NoCaches);
        }
        if let Some(interval) = self.heartbeat_interval {
            check_range("heartbeat_interval", interval, 1, u64::MAX)?;
        }
        self.caches.iter().try_for_each(CacheConfig::validate)
    }
}

impl CacheConfig {
    pub fn geometry(&self) -> Geometry {
        Geometry {
            sets: self.sets,
            ways: self.ways,
            line_size: self.line_size,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let geometry = self.geometry();
        geometry.validate()?;
        match &self.replacement_policy {
            ReplacementPolicyConfig::LeastRecentlyUsed => Ok(()),
            ReplacementPolicyConfig::Preset(preset) => preset.config().validate(&geometry),
            ReplacementPolicyConfig::Hybrid(config) => config.validate(&geometry),
        }
    }
}

impl Geometry {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_power_of_two("sets", self.sets as u64)?;
        check_range("ways", self.ways as u64, 1, 64)?;
        check_power_of_two("line_size", self.line_size)?;
        check_range("line_size", self.line_size, 4, 4096)
    }
}

impl HybridConfig {
    pub fn validate(&self, geometry: &Geometry) -> Result<(), ConfigError> {
        check_range("rrpv_bits", self.rrpv_bits as u64, 1, 7)?;
        check_range("bimodal_one_in", self.bimodal_one_in as u64, 1, u32::MAX as u64)?;
        if let Some(streaming) = &self.streaming {
            check_range("streaming.confidence_bits", streaming.confidence_bits as u64, 1, 8)?;
            let max = (1u64 << streaming.confidence_bits) - 1;
            check_range("streaming.threshold", streaming.threshold as u64, 1, max)?;
            if let Some(interval) = streaming.reset_interval {
                check_range("streaming.reset_interval", interval, 1, u64::MAX)?;
            }
        }
        if let Some(window) = self.bypass_window {
            if !self.bypass_streaming || self.streaming.is_none() {
                return Err(ConfigError::Requires {
                    field: "bypass_window",
                    requires: "streaming with bypass_streaming",
                });
            }
            check_range("bypass_window", window as u64, 1, u32::MAX as u64)?;
        }
        if self.bypass_streaming && self.streaming.is_none() {
            return Err(ConfigError::Requires {
                field: "bypass_streaming",
                requires: "streaming",
            });
        }
        if let Some(ship) = &self.ship {
            check_power_of_two("ship.entries", ship.entries as u64)?;
            check_range("ship.entries", ship.entries as u64, 64, 8192)?;
            check_range("ship.counter_bits", ship.counter_bits as u64, 1, 8)?;
            let max = (1u64 << ship.counter_bits) - 1;
            check_range("ship.initial", ship.initial as u64, 0, max)?;
            if let Some(period) = ship.decay_period {
                check_range("ship.decay_period", period, 1, u64::MAX)?;
            }
        }
        if let Some(dead_block) = &self.dead_block {
            check_range("dead_block.counter_bits", dead_block.counter_bits as u64, 1, 8)?;
            check_range("dead_block.decay_period", dead_block.decay_period, 1, u64::MAX)?;
        }
        if let Some(dueling) = &self.dueling {
            check_range("dueling.psel_bits", dueling.psel_bits as u64, 1, 15)?;
            if dueling.leader_sets == 0 || dueling.leader_sets * 2 > geometry.sets {
                return Err(ConfigError::TooManyLeaders {
                    leader_sets: dueling.leader_sets,
                    sets: geometry.sets,
                });
            }
        }
        if let Some(phase) = &self.phase {
            check_range("phase.counter_bits", phase.counter_bits as u64, 1, 8)?;
            let max = (1u64 << phase.counter_bits) - 1;
            check_range("phase.initial", phase.initial as u64, 0, max)?;
            check_range("phase.low_threshold", phase.low_threshold as u64, 0, max)?;
            check_range("phase.decay_period", phase.decay_period, 1, u64::MAX)?;
        }
        Ok(())
    }
}
