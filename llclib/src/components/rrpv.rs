//! Re-reference prediction values for every line of the cache.

/// Flat `sets * ways` array of RRPVs.
///
/// A value of 0 predicts near-immediate reuse and [`RrpvTable::max`] predicts a distant (or no)
/// re-reference. Every line starts at the maximum so an empty set is immediately evictable.
#[derive(Debug, Clone)]
pub struct RrpvTable {
    values: Vec<u8>,
    ways: usize,
    max: u8,
}

impl RrpvTable {
    pub fn new(sets: usize, ways: usize, bits: u8) -> Self {
        let max = ((1u16 << bits) - 1) as u8;
        Self {
            values: vec![max; sets * ways],
            ways,
            max,
        }
    }

    /// RRPV_MAX, the distant re-reference interval
    pub fn max(&self) -> u8 {
        self.max
    }

    /// The insertion depth SRRIP uses, one step short of distant
    pub fn long(&self) -> u8 {
        self.max.saturating_sub(1)
    }

    pub fn get(&self, set: usize, way: usize) -> u8 {
        self.values[set * self.ways + way]
    }

    /// Writes an RRPV, clamping to the table's range
    pub fn set(&mut self, set: usize, way: usize, rrpv: u8) {
        self.values[set * self.ways + way] = rrpv.min(self.max);
    }

    /// Predicts near-immediate reuse for a line, used on every hit
    pub fn promote(&mut self, set: usize, way: usize) {
        self.values[set * self.ways + way] = 0;
    }

    pub fn set_values(&self, set: usize) -> &[u8] {
        &self.values[set * self.ways..(set + 1) * self.ways]
    }

    /// RRIP victim search over one set
    ///
    /// A way for which `preferred` returns true is returned immediately regardless of its RRPV.
    /// Otherwise the lowest way at RRPV_MAX is returned; if there is none every line of the set
    /// is aged by one and the scan repeats. Each pass strictly increases every unsaturated RRPV,
    /// so the loop ends after at most RRPV_MAX + 1 passes.
    ///
    /// # Arguments
    ///
    /// * `set`: The cache set
    /// * `preferred`: Per-way override, e.g. a line predicted dead
    ///
    /// returns: usize, the way to evict
    pub fn find_victim(&mut self, set: usize, preferred: impl Fn(usize) -> bool) -> usize {
        if let Some(way) = (0..self.ways).find(|&way| preferred(way)) {
            return way;
        }
        let max = self.max;
        let lines = &mut self.values[set * self.ways..(set + 1) * self.ways];
        loop {
            if let Some(way) = lines.iter().position(|&rrpv| rrpv == max) {
                return way;
            }
            for rrpv in lines.iter_mut() {
                // No line is at max here, so this cannot overshoot
                *rrpv += 1;
            }
        }
    }

    /// Number of lines at each RRPV, across the whole cache
    pub fn histogram(&self) -> Vec<u64> {
        let mut out = vec![0; self.max as usize + 1];
        for &rrpv in &self.values {
            out[rrpv as usize] += 1;
        }
        out
    }
}
