use crate::config::Geometry;
use crate::replacement_policies::{
    Access, BlockInfo, HybridPolicy, LeastRecentlyUsed, PolicyStats, ReplacementPolicy, Resolution,
    Victim,
};

/// What happened to an access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Hit,
    /// The line was filled, evicting the block at `evicted` if the chosen way was valid
    Miss { evicted: Option<u64> },
    /// The policy declined to fill the line
    Bypassed,
}

/// A generic trait for caches
///
/// Technically not required as we're using static dispatch to speed things up instead of dyn Cache,
/// but this gives flexibility for the future with no overhead
///
/// The trait assumes that ensuring reads spanning multiple cache lines are split properly is the
/// responsibility of the caller
pub trait CacheTrait {

    /// Converts an address into a set and a line-aligned block address.
    ///
    /// The set is aligned such that it can be used as an index to a collection of sets
    ///
    /// # Arguments
    ///
    /// * `input`: A physical byte address
    ///
    /// returns: (usize, u64)
    fn address_to_set_and_block(&self, input: u64) -> (usize, u64);

    /// Looks a line up, filling it on a miss
    ///
    /// On hits, misses and bypasses alike the replacement policy is told how the access was
    /// resolved, so it can update its metadata
    ///
    /// # Arguments
    ///
    /// * `access`: The access. Note the address is for the line at that address, hence no size
    ///
    /// returns: AccessOutcome
    fn access(&mut self, access: &Access) -> AccessOutcome;

    /// Gets the line size used by this cache
    fn get_line_size(&self) -> u64;

    /// Gets the number of uninitialised cache lines. Useful for analysing cache performance or
    /// debugging
    fn get_uninitialised_line_count(&self) -> usize;

    /// Diagnostic statistics from the replacement policy
    fn policy_stats(&self) -> PolicyStats;

    fn print_stats(&self);

    fn print_heartbeat(&self);
}

/// A single-core last-level cache, parameterised by a replacement policy
///
/// The cache plays the part of the simulator harness: it tracks which block lives in each way,
/// asks the policy for a victim on a miss, and reports every resolved access back to it.
///
/// We rely on Rust's monomorphisation and the inlining of the replacement policy functions to
/// provide performance, which should be close to on par with writing specialised implementations
/// for each cache type
#[derive(Debug, Clone)]
pub struct Cache<R: ReplacementPolicy> {
    set_selection_bit_mask: u64,
    cache_alignment_bit_mask: u64,
    cache_alignment_bits: u32,
    line_size: u64,
    ways: usize,
    blocks: Vec<BlockInfo>,
    replacement_policy: R,
}

impl<R: ReplacementPolicy> Cache<R> {
    /// Creates an empty cache. The geometry must already be validated: sets and line size are
    /// powers of two and there is at least one way.
    pub fn new(geometry: &Geometry, policy: R) -> Self {
        let cache_alignment_bits = geometry.line_size.trailing_zeros();
        Self {
            set_selection_bit_mask: (geometry.sets as u64 - 1) << cache_alignment_bits,
            cache_alignment_bit_mask: !((1 << cache_alignment_bits) - 1),
            cache_alignment_bits,
            line_size: geometry.line_size,
            ways: geometry.ways,
            blocks: vec![BlockInfo::default(); geometry.sets * geometry.ways],
            replacement_policy: policy,
        }
    }

    pub fn policy(&self) -> &R {
        &self.replacement_policy
    }

    pub fn set_contents(&self, set: usize) -> &[BlockInfo] {
        &self.blocks[set * self.ways..(set + 1) * self.ways]
    }
}

impl<R: ReplacementPolicy> CacheTrait for Cache<R> {

    fn address_to_set_and_block(&self, input: u64) -> (usize, u64) {
        (
            ((input & self.set_selection_bit_mask) >> self.cache_alignment_bits) as usize,
            input & self.cache_alignment_bit_mask,
        )
    }

    fn access(&mut self, access: &Access) -> AccessOutcome {
        let (set, block) = self.address_to_set_and_block(access.address);
        let lower = set * self.ways;
        let lines = &self.blocks[lower..lower + self.ways];
        // Only search the relevant set
        if let Some(way) = lines.iter().position(|line| line.valid && line.address == block) {
            self.replacement_policy.update(set, access, Resolution::Hit { way });
            return AccessOutcome::Hit;
        }
        match self.replacement_policy.get_victim(set, lines, access) {
            Victim::Way(way) => {
                debug_assert!(way < self.ways, "policy returned way {way} of {}", self.ways);
                let slot = &mut self.blocks[lower + way];
                let victim = slot.valid.then_some(slot.address);
                *slot = BlockInfo {
                    valid: true,
                    address: block,
                };
                self.replacement_policy.update(set, access, Resolution::Fill { way, victim });
                AccessOutcome::Miss { evicted: victim }
            }
            Victim::Bypass => {
                self.replacement_policy.update(set, access, Resolution::Bypass);
                AccessOutcome::Bypassed
            }
        }
    }

    fn get_line_size(&self) -> u64 {
        self.line_size
    }

    fn get_uninitialised_line_count(&self) -> usize {
        self.blocks.iter().filter(|b| !b.valid).count()
    }

    fn policy_stats(&self) -> PolicyStats {
        self.replacement_policy.stats()
    }

    fn print_stats(&self) {
        self.replacement_policy.print_stats()
    }

    fn print_heartbeat(&self) {
        self.replacement_policy.print_heartbeat()
    }
}

/// Enum for the caches provided by the library
///
/// Using trait objects in Rust reduces boilerplate, but it is surprisingly slow, as this is
/// completely opaque to the compiler
///
/// For most cases this isn't an issue, but for our use case we would be de-referencing for each
/// record of the trace, which imposes significant overhead
///
/// It's much faster to explicitly branch on all implementations, as the compiler can reason about
/// the concrete types, perform function inlining etc
#[derive(Debug, Clone)]
pub enum GenericCache {
    LeastRecentlyUsed(Cache<LeastRecentlyUsed>),
    Hybrid(Cache<HybridPolicy>),
}

impl From<Cache<LeastRecentlyUsed>> for GenericCache {
    fn from(value: Cache<LeastRecentlyUsed>) -> Self {
        Self::LeastRecentlyUsed(value)
    }
}

impl From<Cache<HybridPolicy>> for GenericCache {
    fn from(value: Cache<HybridPolicy>) -> Self {
        Self::Hybrid(value)
    }
}

impl CacheTrait for GenericCache {
    fn address_to_set_and_block(&self, input: u64) -> (usize, u64) {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.address_to_set_and_block(input),
            GenericCache::Hybrid(c) => c.address_to_set_and_block(input),
        }
    }

    fn access(&mut self, access: &Access) -> AccessOutcome {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.access(access),
            GenericCache::Hybrid(c) => c.access(access),
        }
    }

    fn get_line_size(&self) -> u64 {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.get_line_size(),
            GenericCache::Hybrid(c) => c.get_line_size(),
        }
    }

    fn get_uninitialised_line_count(&self) -> usize {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.get_uninitialised_line_count(),
            GenericCache::Hybrid(c) => c.get_uninitialised_line_count(),
        }
    }

    fn policy_stats(&self) -> PolicyStats {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.policy_stats(),
            GenericCache::Hybrid(c) => c.policy_stats(),
        }
    }

    fn print_stats(&self) {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.print_stats(),
            GenericCache::Hybrid(c) => c.print_stats(),
        }
    }

    fn print_heartbeat(&self) {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.print_heartbeat(),
            GenericCache::Hybrid(c) => c.print_heartbeat(),
        }
    }
}
