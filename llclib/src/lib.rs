//! # LLCLib
//!
//! LLCLib is a library for simulating last-level cache replacement policies
//!
//! It provides one composite replacement engine combining RRIP recency, SHiP-lite PC reuse
//! prediction, per-set stream detection, dead-block approximation and DRRIP/DIP set dueling, a
//! single-core LLC to drive it, and a simulator to run traces through several policies at once
//!
//! Every classic design (SRRIP, BRRIP, DRRIP, DIP, SHiP and their hybrids) is a configuration of
//! the same engine rather than a separate implementation

/// Contains the implementation of the cache, and a utility enum for the existing cache types
pub mod cache;

/// Building blocks for policies: RRPVs, saturating counters, predictors and set dueling
pub mod components;

/// Contains definitions for the JSON input format, including the policy presets
pub mod config;

/// Error types for configuration and simulation
pub mod error;

/// Loading trace files
pub mod io;

/// Contains the provided replacement policies, with a trait for implementing custom replacement
/// policies
pub mod replacement_policies;

/// Contains the simulator used to run a trace through a set of cache configurations
pub mod simulator;
// Generated from the build.rs, private
mod hex {
    include!(concat!(env!("OUT_DIR"), "/hex.rs"));
}
#[cfg(test)]
mod test;

/// Contains utilities for finding workloads and generating synthetic traces for tests and
/// benchmarks.
pub mod util;
