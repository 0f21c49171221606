use crate::config::Geometry;
use crate::replacement_policies::{
    Access, AccessCounts, BlockInfo, PolicyStats, ReplacementPolicy, Resolution, Victim,
};

/// Least Recently Used replacement policy, the baseline every hybrid is measured against
///
/// This implementation keeps track of when each line was last used, and also keeps track of a
/// logical clock, which is updated each time a line is used. This saves comparisons during search
/// for a new line, we already know what the timestamp should be
#[derive(Debug, Clone)]
pub struct LeastRecentlyUsed {
    last_used_times: Vec<u64>,
    ways: usize,
    // Tracking logical time means we have fewer comparisons when finding a new line
    time: u64,
    counts: AccessCounts,
}

impl LeastRecentlyUsed {
    pub fn new(geometry: &Geometry) -> Self {
        Self {
            last_used_times: vec![0; geometry.sets * geometry.ways],
            ways: geometry.ways,
            time: 0,
            counts: AccessCounts::default(),
        }
    }

    fn touch(&mut self, set: usize, way: usize) {
        self.time += 1;
        self.last_used_times[set * self.ways + way] = self.time;
    }
}

impl ReplacementPolicy for LeastRecentlyUsed {
    fn name(&self) -> &'static str {
        "lru"
    }

    fn get_victim(&mut self, set: usize, lines: &[BlockInfo], _access: &Access) -> Victim {
        if let Some(way) = lines.iter().position(|line| !line.valid) {
            return Victim::Way(way);
        }
        let slb = set * self.ways;
        // Manual loop, the compiler doesn't see through .enumerate().min_by_key() as well here
        let mut index = slb;
        let mut min_value = u64::MAX;
        let mut min_index = slb;
        while index < slb + self.ways {
            if self.last_used_times[index] < min_value {
                min_value = self.last_used_times[index];
                min_index = index;
            }
            index += 1;
        }
        Victim::Way(min_index - slb)
    }

    fn update(&mut self, set: usize, _access: &Access, resolution: Resolution) {
        self.counts.record(&resolution);
        match resolution {
            Resolution::Hit { way } | Resolution::Fill { way, .. } => self.touch(set, way),
            Resolution::Bypass => {}
        }
    }

    fn stats(&self) -> PolicyStats {
        PolicyStats::new(self.name(), self.counts)
    }
}
