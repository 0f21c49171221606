use proptest::prelude::*;
use crate::cache::{AccessOutcome, Cache, CacheTrait};
use crate::components::{
    BimodalSource, DuelKind, LeaderLayout, SaturatingCounterConfig, SetDueling, StreamDetector,
};
use crate::config::{
    DeadBlockConfig, DuelingConfig, HybridConfig, Insertion, PhaseConfig, ShipConfig,
    StreamingConfig,
};
use crate::replacement_policies::{Access, HybridPolicy, ReplacementPolicy, Victim};
use crate::test::geometry;

const SETS: usize = 8;
const WAYS: usize = 4;

prop_compose! {
    fn hybrid_config()(
        baseline in prop_oneof![
            Just(Insertion::Srrip),
            Just(Insertion::Brrip),
            Just(Insertion::Lip),
            Just(Insertion::Bip),
        ],
        streaming in any::<bool>(),
        bypass_streaming in any::<bool>(),
        bypass_window in prop::option::of(1u32..4),
        ship in any::<bool>(),
        dead_block in any::<bool>(),
        dueling in prop::option::of(prop_oneof![Just(DuelKind::Drrip), Just(DuelKind::Dip)]),
        phase in any::<bool>(),
        seed in any::<u64>(),
    ) -> HybridConfig {
        let bypass_streaming = streaming && bypass_streaming;
        HybridConfig {
            baseline,
            streaming: streaming.then(StreamingConfig::default),
            bypass_streaming,
            bypass_window: bypass_window.filter(|_| bypass_streaming),
            ship: ship.then(|| ShipConfig { decay_period: Some(64), ..ShipConfig::default() }),
            dead_block: dead_block.then(|| DeadBlockConfig { counter_bits: 2, decay_period: 32 }),
            dueling: dueling.map(|kind| DuelingConfig {
                kind,
                leader_sets: 2,
                layout: LeaderLayout::Interleaved,
                psel_bits: 6,
            }),
            phase: phase.then(|| PhaseConfig { decay_period: 16, ..PhaseConfig::default() }),
            bimodal: BimodalSource::Random { seed },
            ..HybridConfig::default()
        }
    }
}

/// Accesses from a handful of PCs over a footprint a few times the cache's size
fn accesses() -> impl Strategy<Value = Vec<Access>> {
    prop::collection::vec((0..6u64, 0..(SETS * WAYS * 3) as u64), 1..400)
        .prop_map(|v| v.into_iter().map(|(pc, line)| Access::load(0x40_0000 + pc * 4, line * 64)).collect())
}

proptest! {
    #[test]
    fn rrpvs_stay_in_range_and_hits_promote(config in hybrid_config(), trace in accesses()) {
        let geometry = geometry(SETS, WAYS);
        let mut cache = Cache::new(&geometry, HybridPolicy::new(&geometry, &config).unwrap());
        for access in &trace {
            let (set, block) = cache.address_to_set_and_block(access.address);
            let resident = cache.set_contents(set).iter().position(|l| l.valid && l.address == block);
            let outcome = cache.access(access);
            prop_assert_eq!(outcome == AccessOutcome::Hit, resident.is_some());
            if let Some(way) = resident {
                prop_assert_eq!(cache.policy().rrpv(set, way), 0);
            }
            if outcome == AccessOutcome::Bypassed {
                prop_assert!(config.bypass_streaming);
            }
            for way in 0..WAYS {
                prop_assert!(cache.policy().rrpv(set, way) <= cache.policy().rrpv_max());
            }
        }
        let stats = cache.policy_stats();
        prop_assert_eq!(stats.counts.accesses, trace.len() as u64);
        prop_assert_eq!(stats.counts.hits + stats.counts.misses, trace.len() as u64);
    }

    #[test]
    fn victims_are_in_range(config in hybrid_config(), trace in accesses()) {
        let geometry = geometry(SETS, WAYS);
        let mut cache = Cache::new(&geometry, HybridPolicy::new(&geometry, &config).unwrap());
        for access in &trace {
            cache.access(access);
        }
        let mut policy = cache.policy().clone();
        for set in 0..SETS {
            let lines = cache.set_contents(set);
            match policy.get_victim(set, lines, &Access::load(0x40_0000, 0xFFFF_0000)) {
                Victim::Way(way) => {
                    prop_assert!(way < WAYS);
                    match lines.iter().position(|l| !l.valid) {
                        Some(invalid) => prop_assert_eq!(way, invalid),
                        None => prop_assert!(
                            policy.rrpv(set, way) == policy.rrpv_max()
                                || policy.dead_blocks().is_some_and(|d| d.is_dead(set, way))
                        ),
                    }
                }
                Victim::Bypass => {
                    prop_assert!(config.bypass_streaming && policy.is_streaming(set));
                    prop_assert!(policy.bypass_window().map_or(true, |w| w.is_open(set)));
                    prop_assert!(lines.iter().all(|l| l.valid));
                }
            }
        }
    }

    #[test]
    fn psel_stays_in_range(psel_bits in 1u8..=12, misses in prop::collection::vec(0..16usize, 0..2000)) {
        let config = DuelingConfig { psel_bits, leader_sets: 4, ..DuelingConfig::default() };
        let mut duel = SetDueling::new(16, &config);
        let max = (1u16 << psel_bits) - 1;
        for set in misses {
            duel.on_miss(set);
            prop_assert!(duel.psel() <= max);
        }
    }

    #[test]
    fn counters_saturate(bits in 1u8..=10, start in any::<u16>(), ops in prop::collection::vec(any::<bool>(), 0..300)) {
        let mut counter = SaturatingCounterConfig::with_bits(bits, start).build();
        let max = (1i32 << bits) - 1;
        let mut model = (start as i32).min(max);
        for up in ops {
            if up {
                counter.increment();
                model = (model + 1).min(max);
            } else {
                counter.decrement();
                model = (model - 1).max(0);
            }
            prop_assert_eq!(counter.value() as i32, model);
        }
    }

    #[test]
    fn constant_strides_stream(start in 1u64 << 40..1u64 << 41, stride in prop_oneof![-4096i64..-1, 1i64..4096]) {
        let mut detector = StreamDetector::new(1, 64, &StreamingConfig::default());
        let mut address = start;
        for i in 0..8 {
            let streaming = detector.observe(0, address);
            // Needs the priming access, the delta, then two confirmations
            prop_assert_eq!(streaming, i >= 3);
            address = address.wrapping_add_signed(stride * 64);
        }
        prop_assert_eq!(detector.last_delta(0), stride);
    }
}

#[test]
fn policy_is_deterministic_for_a_seed() {
    let geometry = geometry(64, 8);
    let config = HybridConfig {
        baseline: Insertion::Brrip,
        ..HybridConfig::default()
    };
    let trace = crate::util::mixed(99, 3000, 256, 64);
    let run = || {
        let mut cache = Cache::new(&geometry, HybridPolicy::new(&geometry, &config).unwrap());
        trace.iter().for_each(|a| {
            cache.access(a);
        });
        cache.policy().stats()
    };
    assert_eq!(run(), run());
}
