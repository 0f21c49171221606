//! The building blocks the hybrid policy composes: recency state, predictors and selectors.

pub mod bimodal;
pub mod bypass_window;
pub mod counter;
pub mod dead_block;
pub mod dueling;
pub mod phase;
pub mod rrpv;
pub mod ship;
pub mod streaming;

pub use bimodal::{BimodalCoin, BimodalSource};
pub use bypass_window::BypassWindow;
pub use counter::{SaturatingCounter, SaturatingCounterConfig};
pub use dead_block::DeadBlockTable;
pub use dueling::{DuelKind, DuelPolicy, LeaderLayout, SetDueling, SetRole};
pub use phase::SetReuseTable;
pub use rrpv::RrpvTable;
pub use ship::{Reuse, ShipScope, ShipTable, SignatureHash};
pub use streaming::StreamDetector;
