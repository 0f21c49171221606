use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use crate::replacement_policies::Access;
use crate::simulator::format_record;

/// A named trace file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub name: String,
    pub trace: PathBuf,
}

/// Finds every `<workload>.trace` file in a directory, sorted by name
pub fn find_workloads(dir: &Path) -> Result<Vec<Workload>, Box<dyn Error>> {
    let pattern = Regex::new(r"^(?P<workload>[0-9a-zA-Z_\-]+)\.trace$")?;
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name().into_string().map_err(|e| format!("Can't convert OS string ({e:?}) to standard string"))?;
        if let Some(tokens) = pattern.captures(&file_name) {
            out.push(Workload {
                name: tokens["workload"].to_string(),
                trace: entry.path(),
            });
        }
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

/// Serialises accesses into the trace format
pub fn to_trace(accesses: &[Access]) -> Vec<u8> {
    accesses.iter().flat_map(|a| format_record(a).into_bytes()).collect()
}

/// One PC walking memory with a constant stride
pub fn stride_stream(pc: u64, start: u64, stride: i64, count: usize) -> Vec<Access> {
    (0..count as i64)
        .map(|i| Access::load(pc, start.wrapping_add_signed(i * stride)))
        .collect()
}

/// One PC sweeping the same `lines` cache lines over and over
pub fn looping(pc: u64, start: u64, lines: u64, line_size: u64, iterations: usize) -> Vec<Access> {
    (0..iterations)
        .flat_map(|_| (0..lines).map(move |line| Access::load(pc, start + line * line_size)))
        .collect()
}

/// A reproducible mix of a small reused working set, touched by one group of PCs, interleaved
/// with a scan over a large footprint by another
///
/// # Arguments
///
/// * `seed`: Seed for the generator, equal seeds give equal traces
/// * `count`: Number of accesses
/// * `hot_lines`: Size of the reused working set, in lines
/// * `line_size`: Line size in bytes
///
/// returns: Vec<Access>
pub fn mixed(seed: u64, count: usize, hot_lines: u64, line_size: u64) -> Vec<Access> {
    const HOT_BASE: u64 = 0x1000_0000;
    const SCAN_BASE: u64 = 0x8000_0000;
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut scan_line = 0;
    (0..count)
        .map(|_| {
            if rng.gen_bool(0.5) {
                let pc = 0x40_0000 + rng.gen_range(0..4u64) * 4;
                Access::load(pc, HOT_BASE + rng.gen_range(0..hot_lines) * line_size)
            } else {
                scan_line += 1;
                Access::load(0x50_0000, SCAN_BASE + scan_line * line_size)
            }
        })
        .collect()
}
