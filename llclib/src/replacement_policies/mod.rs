use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

pub mod hybrid;
pub mod lru;

pub use hybrid::HybridPolicy;
pub use lru::LeastRecentlyUsed;

/// The kind of request reaching the LLC, numbered as in ChampSim traces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Load = 0,
    Rfo = 1,
    Prefetch = 2,
    Writeback = 3,
}

impl TryFrom<u8> for AccessType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AccessType::Load),
            1 => Ok(AccessType::Rfo),
            2 => Ok(AccessType::Prefetch),
            3 => Ok(AccessType::Writeback),
            other => Err(other),
        }
    }
}

/// The per-access fields the cache hands to its policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub cpu: u32,
    pub pc: u64,
    /// Physical byte address
    pub address: u64,
    pub kind: AccessType,
}

impl Access {
    pub fn load(pc: u64, address: u64) -> Self {
        Self {
            cpu: 0,
            pc,
            address,
            kind: AccessType::Load,
        }
    }
}

/// The cache's view of one way of a set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockInfo {
    pub valid: bool,
    /// Line-aligned address of the resident block, meaningless unless valid
    pub address: u64,
}

/// The outcome of a victim search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Victim {
    Way(usize),
    /// Don't fill the missing line at all
    Bypass,
}

/// How the cache resolved an access, reported back to the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Hit { way: usize },
    /// The line was filled into `way`, replacing the block at `victim` if the way was valid
    Fill { way: usize, victim: Option<u64> },
    Bypass,
}

/// Hit and miss counts as seen by a policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccessCounts {
    pub accesses: u64,
    pub hits: u64,
    pub misses: u64,
    pub bypasses: u64,
}

impl AccessCounts {
    pub fn record(&mut self, resolution: &Resolution) {
        self.accesses += 1;
        match resolution {
            Resolution::Hit { .. } => self.hits += 1,
            Resolution::Fill { .. } => self.misses += 1,
            Resolution::Bypass => {
                self.misses += 1;
                self.bypasses += 1;
            }
        }
    }
}

/// Diagnostic snapshot of a policy. Signals a policy doesn't use are left empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyStats {
    pub policy: &'static str,
    #[serde(flatten)]
    pub counts: AccessCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psel: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streaming_sets: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hot_signatures: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_lines: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_reuse_sets: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rrpv_histogram: Vec<u64>,
}

impl PolicyStats {
    pub fn new(policy: &'static str, counts: AccessCounts) -> Self {
        Self {
            policy,
            counts,
            psel: None,
            streaming_sets: None,
            hot_signatures: None,
            dead_lines: None,
            low_reuse_sets: None,
            rrpv_histogram: Vec::new(),
        }
    }
}

impl fmt::Display for PolicyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} accesses, {} hits, {} misses, {} bypasses",
            self.policy,
            self.counts.accesses,
            self.counts.hits,
            self.counts.misses,
            self.counts.bypasses
        )?;
        if let Some(psel) = self.psel {
            write!(f, ", PSEL {psel}")?;
        }
        if let Some(sets) = self.streaming_sets {
            write!(f, ", {sets} streaming sets")?;
        }
        if let Some(hot) = self.hot_signatures {
            write!(f, ", {hot} hot signatures")?;
        }
        if let Some(dead) = self.dead_lines {
            write!(f, ", {dead} dead lines")?;
        }
        if let Some(low) = self.low_reuse_sets {
            write!(f, ", {low} low-reuse sets")?;
        }
        if !self.rrpv_histogram.is_empty() {
            write!(f, ", RRPV histogram {:?}", self.rrpv_histogram)?;
        }
        Ok(())
    }
}

/// A generic trait for implementing new replacement policies. Can be used to parameterise a Cache.
///
/// Construction takes the place of initialising the replacement state: a new policy must have
/// all of its per-line, per-set and global state in its neutral starting configuration.
pub trait ReplacementPolicy {
    fn name(&self) -> &'static str;

    /// Used by the cache to choose the way to fill on a miss
    ///
    /// Invalid ways are always chosen before any valid line is evicted. Implementations may age
    /// their own recency state while searching, but must not touch the lines themselves.
    ///
    /// # Arguments
    ///
    /// * `set`: The cache set
    /// * `lines`: The current contents of every way of the set
    /// * `access`: The missing access
    ///
    /// returns: Victim, a way in `0..lines.len()` or a request to bypass the fill
    fn get_victim(&mut self, set: usize, lines: &[BlockInfo], access: &Access) -> Victim;

    /// Updates the policy once the cache has resolved an access, for hits, fills and bypasses
    ///
    /// # Arguments
    ///
    /// * `set`: The cache set
    /// * `access`: The access that was resolved
    /// * `resolution`: What the cache did with it
    ///
    /// returns: ()
    fn update(&mut self, set: usize, access: &Access, resolution: Resolution);

    fn stats(&self) -> PolicyStats;

    /// Logs end of simulation statistics. Has no effect on replacement decisions.
    fn print_stats(&self) {
        let stats = self.stats();
        info!(policy = stats.policy, "{stats}");
    }

    /// Logs periodic statistics. Has no effect on replacement decisions.
    fn print_heartbeat(&self) {
        let stats = self.stats();
        debug!(
            policy = stats.policy,
            accesses = stats.counts.accesses,
            hits = stats.counts.hits,
            psel = ?stats.psel,
            streaming_sets = ?stats.streaming_sets,
            "Heartbeat"
        );
    }
}
