//! Set dueling between two insertion policies.
//!
//! A few leader sets always run policy A, a few always run policy B, and the rest follow
//! whichever is currently winning. PSEL counts leader misses: a miss in an A leader moves it up
//! (towards B), a miss in a B leader moves it down (towards A). Followers read PSEL but never
//! write it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::components::counter::{SaturatingCounter, SaturatingCounterConfig};
use crate::config::DuelingConfig;

/// The pair of insertion policies being compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuelKind {
    /// SRRIP (A) against BRRIP (B)
    #[default]
    Drrip,
    /// LIP (A) against BIP (B)
    Dip,
}

/// Where leader sets are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeaderLayout {
    /// A leaders are the first sets, B leaders the last
    #[default]
    Ends,
    /// Leaders are spread evenly, each B leader directly after an A leader
    Interleaved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetRole {
    LeaderA,
    LeaderB,
    Follower,
}

/// One side of the duel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelPolicy {
    A,
    B,
}

#[derive(Debug, Clone)]
pub struct SetDueling {
    roles: Vec<SetRole>,
    psel: SaturatingCounter,
    kind: DuelKind,
}

impl SetDueling {
    pub fn new(sets: usize, config: &DuelingConfig) -> Self {
        let mut roles = vec![SetRole::Follower; sets];
        let leaders = config.leader_sets;
        match config.layout {
            LeaderLayout::Ends => {
                for i in 0..leaders {
                    roles[i] = SetRole::LeaderA;
                    roles[sets - 1 - i] = SetRole::LeaderB;
                }
            }
            LeaderLayout::Interleaved => {
                // Validation guarantees 2 * leaders <= sets, so the stride is at least 2
                let stride = sets / leaders;
                for i in 0..leaders {
                    roles[i * stride] = SetRole::LeaderA;
                    roles[i * stride + 1] = SetRole::LeaderB;
                }
            }
        }
        debug!(kind = ?config.kind, layout = ?config.layout, leaders, "Assigned leader sets");
        Self {
            roles,
            psel: SaturatingCounterConfig::centred(config.psel_bits).build(),
            kind: config.kind,
        }
    }

    pub fn kind(&self) -> DuelKind {
        self.kind
    }

    pub fn role(&self, set: usize) -> SetRole {
        self.roles[set]
    }

    pub fn psel(&self) -> u16 {
        self.psel.value()
    }

    pub fn psel_max(&self) -> u16 {
        self.psel.max()
    }

    /// Records a miss, only leader sets move PSEL
    pub fn on_miss(&mut self, set: usize) {
        match self.roles[set] {
            SetRole::LeaderA => self.psel.increment(),
            SetRole::LeaderB => self.psel.decrement(),
            SetRole::Follower => {}
        }
    }

    /// The policy a set should insert with. Followers switch to B once A leaders have missed
    /// more, i.e. PSEL has risen above its midpoint.
    pub fn policy_for(&self, set: usize) -> DuelPolicy {
        match self.roles[set] {
            SetRole::LeaderA => DuelPolicy::A,
            SetRole::LeaderB => DuelPolicy::B,
            SetRole::Follower if self.psel.value() > self.psel.midpoint() => DuelPolicy::B,
            SetRole::Follower => DuelPolicy::A,
        }
    }
}
