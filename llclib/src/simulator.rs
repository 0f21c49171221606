use std::time::{Duration, Instant};
use serde::Serialize;
use tracing::{debug, info};
use crate::cache::{AccessOutcome, Cache, CacheTrait, GenericCache};
use crate::config::{CacheConfig, ExperimentConfig, ReplacementPolicyConfig};
use crate::error::{ConfigError, SimError};
use crate::hex::HEX_LOOKUP;
use crate::replacement_policies::{Access, AccessType, HybridPolicy, LeastRecentlyUsed, PolicyStats};

/// Size of one trace record: `PPPPPPPPPPPPPPPP AAAAAAAAAAAAAAAA T\n`
pub const RECORD_SIZE: usize = 36;
const PC_OFFSET: usize = 0;
const ADDRESS_OFFSET: usize = 17;
const HEX_SIZE: usize = 16;
const TYPE_OFFSET: usize = ADDRESS_OFFSET + HEX_SIZE + 1;

/// The simulator feeds a trace to every configured cache and collects results.
///
/// The caches are independent: each sees every access, so their replacement policies can be
/// compared on identical input. It supports calling simulate multiple times, and will update the
/// time taken to simulate and the results accordingly
pub struct Simulator {
    caches: Vec<GenericCache>,
    result: ExperimentResult,
    heartbeat_interval: Option<u64>,
    simulation_time: Duration,
}

/// The result of a simulation. Can be serialised to JSON
#[derive(Debug, Serialize, PartialEq)]
pub struct ExperimentResult {
    pub accesses: u64,
    pub caches: Vec<CacheResult>,
}

/// The result for an individual cache
#[derive(Debug, Serialize, PartialEq)]
pub struct CacheResult {
    pub name: String,
    pub hits: u64,
    pub misses: u64,
    pub bypasses: u64,
    pub hit_rate: f64,
    pub stats: PolicyStats,
}

impl Simulator {

    /// Creates a new simulator for a given configuration
    ///
    /// # Arguments
    ///
    /// * `config`: An experiment configuration, usually resulting from parsing JSON
    ///
    /// returns: Result<Simulator, SimError>, an error if the configuration is invalid
    pub fn new(config: &ExperimentConfig) -> Result<Self, SimError> {
        config.validate()?;
        let caches = config
            .caches
            .iter()
            .map(Self::config_to_cache)
            .collect::<Result<Vec<_>, _>>()?;
        let result = ExperimentResult {
            accesses: 0,
            caches: config.caches.iter().zip(&caches).map(|(config, cache)| CacheResult {
                name: config.name.clone(),
                hits: 0,
                misses: 0,
                bypasses: 0,
                hit_rate: 0.0,
                stats: cache.policy_stats(),
            }).collect(),
        };
        Ok(Self {
            caches,
            result,
            heartbeat_interval: config.heartbeat_interval,
            simulation_time: Duration::new(0, 0),
        })
    }

    /// Runs one access through every cache
    pub fn access(&mut self, access: &Access) {
        for (cache, res) in self.caches.iter_mut().zip(&mut self.result.caches) {
            match cache.access(access) {
                AccessOutcome::Hit => res.hits += 1,
                AccessOutcome::Miss { .. } => res.misses += 1,
                AccessOutcome::Bypassed => {
                    res.misses += 1;
                    res.bypasses += 1;
                }
            }
        }
        self.result.accesses += 1;
        if let Some(interval) = self.heartbeat_interval {
            if self.result.accesses % interval == 0 {
                debug!(accesses = self.result.accesses, "Heartbeat");
                self.caches.iter().for_each(CacheTrait::print_heartbeat);
            }
        }
    }

    /// Simulates the caches using a reference to a byte array.
    ///
    /// The byte array must hold whole [`RECORD_SIZE`] byte records. Separators and access types
    /// are checked, but for speed the hex digits are not; malformed digits produce incorrect
    /// addresses rather than an error.
    ///
    /// Note that reads from the byte array are *guaranteed to be sequential*. This means that when
    /// using something like mmap, one can advise the operating system that sequential reads will be
    /// used, which can increase read performance
    ///
    /// # Arguments
    ///
    /// * `bytes`: The input byte array
    ///
    /// returns: Result<&ExperimentResult, SimError>
    pub fn simulate(&mut self, bytes: &[u8]) -> Result<&ExperimentResult, SimError> {
        if bytes.len() % RECORD_SIZE != 0 {
            return Err(SimError::PartialRecord(bytes.len()));
        }
        // A bad record anywhere rejects the whole trace before any cache sees it
        for (record, buffer) in bytes.chunks_exact(RECORD_SIZE).enumerate() {
            validate_record(buffer).map_err(|reason| SimError::MalformedRecord { record, reason })?;
        }
        let start = Instant::now();
        for (record, buffer) in bytes.chunks_exact(RECORD_SIZE).enumerate() {
            let access = parse_record(buffer)
                .map_err(|reason| SimError::MalformedRecord { record, reason })?;
            self.access(&access);
        }
        self.simulation_time += start.elapsed();
        self.refresh_results();
        Ok(&self.result)
    }

    fn refresh_results(&mut self) {
        for (cache, res) in self.caches.iter().zip(&mut self.result.caches) {
            let total = res.hits + res.misses;
            res.hit_rate = if total == 0 { 0.0 } else { res.hits as f64 / total as f64 };
            res.stats = cache.policy_stats();
        }
    }

    /// The results so far
    pub fn result(&mut self) -> &ExperimentResult {
        self.refresh_results();
        &self.result
    }

    /// Logs every policy's end of simulation statistics
    pub fn print_stats(&self) {
        info!(accesses = self.result.accesses, "Simulation finished");
        self.caches.iter().for_each(CacheTrait::print_stats);
    }

    /// Gets the wall-clock execution time for processing
    pub fn get_execution_time(&self) -> &Duration {
        &self.simulation_time
    }

    /// Gets the number of uninitialised lines for each cache
    pub fn get_uninitialised_line_counts(&self) -> Vec<u64> {
        self.caches.iter().map(|x| x.get_uninitialised_line_count() as u64).collect()
    }

    /// Creates a new cache from a cache configuration
    fn config_to_cache(config: &CacheConfig) -> Result<GenericCache, ConfigError> {
        let geometry = config.geometry();
        geometry.validate()?;
        Ok(match &config.replacement_policy {
            ReplacementPolicyConfig::LeastRecentlyUsed => {
                GenericCache::from(Cache::new(&geometry, LeastRecentlyUsed::new(&geometry)))
            }
            ReplacementPolicyConfig::Preset(preset) => {
                GenericCache::from(Cache::new(&geometry, HybridPolicy::from_preset(&geometry, *preset)?))
            }
            ReplacementPolicyConfig::Hybrid(hybrid) => {
                GenericCache::from(Cache::new(&geometry, HybridPolicy::new(&geometry, hybrid)?))
            }
        })
    }
}

/// Parses one trace record into an access
///
/// # Arguments
///
/// * `buf`: Exactly [`RECORD_SIZE`] bytes
///
/// returns: Result<Access, &'static str>, the reason on failure
pub fn parse_record(buf: &[u8]) -> Result<Access, &'static str> {
    let kind = validate_record(buf)?;
    let pc: &[u8; HEX_SIZE] = buf[PC_OFFSET..PC_OFFSET + HEX_SIZE]
        .try_into()
        .map_err(|_| "wrong pc length")?;
    let address: &[u8; HEX_SIZE] = buf[ADDRESS_OFFSET..ADDRESS_OFFSET + HEX_SIZE]
        .try_into()
        .map_err(|_| "wrong address length")?;
    Ok(Access {
        cpu: 0,
        pc: parse_address(pc),
        address: parse_address(address),
        kind,
    })
}

/// Checks a record's framing and access type without decoding its hex fields
pub fn validate_record(buf: &[u8]) -> Result<AccessType, &'static str> {
    if buf.len() != RECORD_SIZE {
        return Err("wrong record length");
    }
    if buf[ADDRESS_OFFSET - 1] != b' ' || buf[TYPE_OFFSET - 1] != b' ' {
        return Err("missing field separator");
    }
    if buf[RECORD_SIZE - 1] != b'\n' {
        return Err("missing newline");
    }
    let kind = buf[TYPE_OFFSET]
        .checked_sub(b'0')
        .and_then(|digit| AccessType::try_from(digit).ok())
        .ok_or("access type must be 0-3")?;
    Ok(kind)
}

/// Formats an access as a trace record, the inverse of [`parse_record`]
pub fn format_record(access: &Access) -> String {
    format!("{:016x} {:016x} {}\n", access.pc, access.address, access.kind as u8)
}

/// Parses a 64-bit value from a 16 byte hexadecimal string
///
/// Parsing addresses with the standard library becomes a bottleneck for long traces, so we use
/// a custom implementation.
///
/// This is significantly faster than using the standard library, but omits checks for the input
/// format. While it is guaranteed not to panic, if the input format is incorrect it may produce
/// incorrect results.
///
/// This function makes use of a lookup table of 2^16 bytes, which performs lookups for each
/// pair of hex values. This gets unrolled by the compiler, and has been shown to be
/// significantly faster than individual lookups of each byte, or branching approaches
///
/// The lookup table is defined in the hex module, which is automatically generated at compile
/// time by build.rs, so the result can be cached across multiple compilations.
///
/// # Arguments
///
/// * `buf`: The byte buffer
///
/// returns: u64
///
/// # Examples
///
/// ```
/// use llclib::simulator::parse_address;
/// let address = b"000000000000000A";
/// assert_eq!(parse_address(address), 10)
/// ```
pub fn parse_address(buf: &[u8; 16]) -> u64 {
    let mut res: u64 = 0;
    let mut x = 0;
    while x < 15 {
        res <<= 8;
        res |= HEX_LOOKUP[buf[x] as usize][buf[x + 1] as usize] as u64;
        x += 2;
    }
    res
}
