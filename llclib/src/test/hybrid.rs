use crate::cache::{AccessOutcome, Cache, CacheTrait};
use crate::components::{BimodalSource, DuelKind, LeaderLayout};
use crate::config::{
    DeadBlockConfig, DuelingConfig, HybridConfig, Insertion, PhaseConfig, Preset, ShipConfig,
    StreamingConfig,
};
use crate::error::ConfigError;
use crate::replacement_policies::{
    Access, BlockInfo, HybridPolicy, ReplacementPolicy, Resolution, Victim,
};
use crate::test::geometry;
use crate::util;

fn hybrid_cache(sets: usize, ways: usize, config: HybridConfig) -> Cache<HybridPolicy> {
    let geometry = geometry(sets, ways);
    Cache::new(&geometry, HybridPolicy::new(&geometry, &config).unwrap())
}

fn small_dueling(kind: DuelKind) -> HybridConfig {
    HybridConfig {
        dueling: Some(DuelingConfig {
            kind,
            leader_sets: 2,
            layout: LeaderLayout::Ends,
            psel_bits: 4,
        }),
        bimodal: BimodalSource::Periodic,
        ..HybridConfig::default()
    }
}

#[test]
fn srrip_fill_hit_and_evict() {
    let mut policy = HybridPolicy::new(&geometry(1, 4), &HybridConfig::default()).unwrap();
    let mut lines = [BlockInfo::default(); 4];
    for way in 0..4 {
        let access = Access::load(0x400, 0x1000 + way as u64 * 64);
        assert_eq!(policy.get_victim(0, &lines, &access), Victim::Way(way));
        policy.update(0, &access, Resolution::Fill { way, victim: None });
        lines[way] = BlockInfo {
            valid: true,
            address: access.address,
        };
        assert_eq!(policy.rrpv(0, way), 2);
    }

    policy.update(0, &Access::load(0x400, 0x1000), Resolution::Hit { way: 0 });
    assert_eq!(policy.rrpv(0, 0), 0);

    // One pass of ageing brings ways 1-3 to distant, way 1 wins the tie
    let victim = policy.get_victim(0, &lines, &Access::load(0x400, 0x2000));
    assert_eq!(victim, Victim::Way(1));
    assert_eq!(policy.rrpv(0, 0), 1);
    assert_eq!(policy.rrpv(0, 1), 3);
}

#[test]
fn invalid_ways_are_filled_first() {
    let mut cache = hybrid_cache(1, 4, HybridConfig::default());
    for i in 0..4 {
        assert_eq!(cache.access(&Access::load(0x400, i * 64)), AccessOutcome::Miss { evicted: None });
    }
    assert_eq!(cache.get_uninitialised_line_count(), 0);
    assert_eq!(
        cache.access(&Access::load(0x400, 4 * 64)),
        AccessOutcome::Miss { evicted: Some(0) }
    );
}

#[test]
fn hits_promote_to_zero() {
    let mut cache = hybrid_cache(4, 4, Preset::ShipStreamingDeadBlock.config());
    let access = Access::load(0x400, 0x1040);
    cache.access(&access);
    let (set, _) = cache.address_to_set_and_block(access.address);
    assert_ne!(cache.policy().rrpv(set, 0), 0);
    assert_eq!(cache.access(&access), AccessOutcome::Hit);
    assert_eq!(cache.policy().rrpv(set, 0), 0);
}

#[test]
fn streaming_set_inserts_at_distant() {
    let mut cache = hybrid_cache(
        1,
        16,
        HybridConfig {
            streaming: Some(StreamingConfig::default()),
            ..HybridConfig::default()
        },
    );
    let streaming: Vec<bool> = util::stride_stream(0x400, 0x10000, 64, 5)
        .iter()
        .map(|access| {
            cache.access(access);
            cache.policy().is_streaming(0)
        })
        .collect();
    assert_eq!(streaming, vec![false, false, false, true, true]);
    assert_eq!(cache.policy().stream_detector().unwrap().confidence(0), 3);
    assert_eq!(cache.policy().rrpv(0, 0), 2);
    assert_eq!(cache.policy().rrpv(0, 4), cache.policy().rrpv_max());
}

#[test]
fn streaming_set_bypasses_once_full() {
    let config = HybridConfig {
        streaming: Some(StreamingConfig::default()),
        bypass_streaming: true,
        ..HybridConfig::default()
    };
    let mut cache = hybrid_cache(1, 4, config);
    let trace = util::stride_stream(0x400, 0, 64, 5);
    // Still filling invalid ways even though the set is streaming by the fourth access
    for access in &trace[..4] {
        assert!(matches!(cache.access(access), AccessOutcome::Miss { .. }));
    }
    assert!(cache.policy().is_streaming(0));
    assert_eq!(cache.access(&trace[4]), AccessOutcome::Bypassed);
    assert!(cache.set_contents(0).iter().all(|line| line.address < 256));

    let stats = cache.policy_stats();
    assert_eq!(stats.counts.accesses, 5);
    assert_eq!(stats.counts.misses, 5);
    assert_eq!(stats.counts.bypasses, 1);
    assert_eq!(stats.streaming_sets, Some(1));
}

#[test]
fn ship_inserts_confident_signature_near() {
    let mut cache = hybrid_cache(
        1,
        4,
        HybridConfig {
            ship: Some(ShipConfig::default()),
            ..HybridConfig::default()
        },
    );
    let pc = 0x40_1000;
    cache.access(&Access::load(pc, 0x1000));
    assert_eq!(cache.policy().rrpv(0, 0), 2);
    cache.access(&Access::load(pc, 0x1000));
    cache.access(&Access::load(pc, 0x1000));
    let ship = cache.policy().ship().unwrap();
    assert_eq!(ship.counter(0, ship.signature(pc, 0)), 3);

    cache.access(&Access::load(pc, 0x2000));
    assert_eq!(cache.policy().rrpv(0, 1), 0);
}

#[test]
fn ship_trains_the_fill_signature_on_hit() {
    let mut cache = hybrid_cache(
        1,
        4,
        HybridConfig {
            ship: Some(ShipConfig::default()),
            ..HybridConfig::default()
        },
    );
    let (filler, toucher) = (0x40_0000, 0x40_0004);
    cache.access(&Access::load(filler, 0x1000));
    cache.access(&Access::load(toucher, 0x1000));
    let ship = cache.policy().ship().unwrap();
    let (a, b) = (ship.signature(filler, 0), ship.signature(toucher, 0));
    assert_ne!(a, b);
    assert_eq!(cache.policy().line_signature(0, 0), a);
    assert_eq!(ship.counter(0, a), 2);
    assert_eq!(ship.counter(0, b), 1);
}

#[test]
fn ship_inserts_dead_signature_distant() {
    let mut cache = hybrid_cache(
        1,
        2,
        HybridConfig {
            ship: Some(ShipConfig::default()),
            ..HybridConfig::default()
        },
    );
    let pc = 0x40_2000;
    cache.access(&Access::load(pc, 0x0));
    cache.access(&Access::load(pc, 0x40));
    // Evicts the untouched line in way 0, driving the signature's counter to zero
    cache.access(&Access::load(pc, 0x80));
    let ship = cache.policy().ship().unwrap();
    assert_eq!(ship.counter(0, ship.signature(pc, 0)), 0);
    assert_eq!(cache.policy().rrpv(0, 0), 3);
}

#[test]
fn untouched_lines_die_as_their_set_misses() {
    let config = HybridConfig {
        dead_block: Some(DeadBlockConfig {
            counter_bits: 2,
            decay_period: 1 << 20,
        }),
        ..HybridConfig::default()
    };
    let mut cache = hybrid_cache(1, 4, config);
    let pc = 0x400;
    for i in 0..4 {
        cache.access(&Access::load(pc, i * 64));
    }
    // Each later miss aged the lines already resident, the newest fill starts out live
    let counters = |cache: &Cache<HybridPolicy>| -> Vec<u16> {
        let dead_blocks = cache.policy().dead_blocks().unwrap();
        (0..4).map(|way| dead_blocks.counter(0, way)).collect()
    };
    assert_eq!(counters(&cache), vec![3, 2, 1, 0]);
    assert!(cache.policy().dead_blocks().unwrap().is_dead(0, 0));

    // The dead slot is taken ahead of the RRIP scan, so nothing else ages
    assert_eq!(
        cache.access(&Access::load(pc, 0x100)),
        AccessOutcome::Miss { evicted: Some(0x0) }
    );
    assert_eq!(cache.policy().rrpv(0, 0), 3);
    for way in 1..4 {
        assert_eq!(cache.policy().rrpv(0, way), 2);
    }
    // The new line restarts from live even though it went in distant
    assert_eq!(counters(&cache), vec![0, 3, 2, 1]);
    assert!(!cache.policy().dead_blocks().unwrap().is_dead(0, 0));
    assert_eq!(cache.policy_stats().dead_lines, Some(1));

    assert_eq!(cache.access(&Access::load(pc, 0x40)), AccessOutcome::Hit);
    assert_eq!(counters(&cache), vec![0, 0, 2, 1]);
}

#[test]
fn low_reuse_sets_insert_at_distant() {
    let config = HybridConfig {
        phase: Some(PhaseConfig {
            initial: 1,
            ..PhaseConfig::default()
        }),
        ..HybridConfig::default()
    };
    let mut cache = hybrid_cache(1, 4, config);
    let pc = 0x400;
    cache.access(&Access::load(pc, 0x0));
    assert!(cache.policy().set_reuse().unwrap().is_low(0));
    assert_eq!(cache.policy().rrpv(0, 0), 3);
    assert_eq!(cache.policy_stats().low_reuse_sets, Some(1));

    // Hits lift the set out of the low phase and fills go back to the baseline depth
    cache.access(&Access::load(pc, 0x0));
    cache.access(&Access::load(pc, 0x0));
    assert_eq!(cache.policy().set_reuse().unwrap().reuse(0), 3);
    cache.access(&Access::load(pc, 0x40));
    assert_eq!(cache.policy().rrpv(0, 1), 2);
    assert_eq!(cache.policy_stats().low_reuse_sets, Some(0));
}

#[test]
fn low_reuse_does_not_override_confident_ship() {
    let config = HybridConfig {
        ship: Some(ShipConfig::default()),
        phase: Some(PhaseConfig {
            initial: 0,
            decay_period: 1,
            ..PhaseConfig::default()
        }),
        ..HybridConfig::default()
    };
    let mut cache = hybrid_cache(1, 4, config);
    let pc = 0x40_1000;
    for _ in 0..3 {
        cache.access(&Access::load(pc, 0x1000));
    }
    assert!(cache.policy().set_reuse().unwrap().is_low(0));
    cache.access(&Access::load(pc, 0x2000));
    assert_eq!(cache.policy().rrpv(0, 1), 0);
}

#[test]
fn streaming_bypass_is_bounded_per_stream() {
    let config = HybridConfig {
        streaming: Some(StreamingConfig::default()),
        bypass_streaming: true,
        bypass_window: Some(2),
        ..HybridConfig::default()
    };
    let mut cache = hybrid_cache(1, 4, config);
    let trace = util::stride_stream(0x400, 0, 64, 7);
    for access in &trace[..4] {
        assert!(matches!(cache.access(access), AccessOutcome::Miss { .. }));
    }
    assert_eq!(cache.policy().bypass_window().unwrap().remaining(0), 2);
    assert_eq!(cache.access(&trace[4]), AccessOutcome::Bypassed);
    assert_eq!(cache.access(&trace[5]), AccessOutcome::Bypassed);
    assert!(!cache.policy().bypass_window().unwrap().is_open(0));

    // The window is spent, so the stream fills again, at distant RRPV
    assert_eq!(
        cache.access(&trace[6]),
        AccessOutcome::Miss {
            evicted: Some(3 * 64)
        }
    );
    assert!(cache.policy().is_streaming(0));
    assert_eq!(cache.policy().rrpv(0, 3), cache.policy().rrpv_max());
    assert_eq!(cache.policy_stats().counts.bypasses, 2);
}

#[test]
fn brrip_inserts_distant_with_rare_exceptions() {
    let config = HybridConfig {
        baseline: Insertion::Brrip,
        bimodal: BimodalSource::Periodic,
        ..HybridConfig::default()
    };
    let mut cache = hybrid_cache(1, 4, config);
    for i in 0..4 {
        cache.access(&Access::load(0x400, i * 64));
    }
    let rrpvs: Vec<u8> = (0..4).map(|way| cache.policy().rrpv(0, way)).collect();
    assert_eq!(rrpvs, vec![2, 3, 3, 3]);
}

#[test]
fn drrip_followers_track_psel() {
    let mut policy = HybridPolicy::new(&geometry(8, 4), &small_dueling(DuelKind::Drrip)).unwrap();
    assert_eq!(policy.fallback_insertion(3), Insertion::Srrip);
    assert_eq!(policy.fallback_insertion(7), Insertion::Brrip);

    // A miss in an SRRIP leader moves followers to BRRIP
    let access = Access::load(0x400, 0);
    policy.update(0, &access, Resolution::Fill { way: 0, victim: None });
    assert_eq!(policy.dueling().unwrap().psel(), 9);
    assert_eq!(policy.fallback_insertion(3), Insertion::Brrip);

    // Followers never move PSEL, and hits don't either
    policy.update(3, &access, Resolution::Fill { way: 0, victim: None });
    policy.update(7, &access, Resolution::Hit { way: 0 });
    assert_eq!(policy.dueling().unwrap().psel(), 9);

    policy.update(7, &access, Resolution::Fill { way: 1, victim: None });
    policy.update(6, &access, Resolution::Bypass);
    assert_eq!(policy.dueling().unwrap().psel(), 7);
    assert_eq!(policy.fallback_insertion(3), Insertion::Srrip);
    assert_eq!(policy.stats().psel, Some(7));
}

#[test]
fn dip_leaders_insert_lru_and_bimodal() {
    let mut policy = HybridPolicy::new(&geometry(8, 4), &small_dueling(DuelKind::Dip)).unwrap();
    let access = Access::load(0x400, 0);
    policy.update(0, &access, Resolution::Fill { way: 0, victim: None });
    assert_eq!(policy.rrpv(0, 0), 3);
    // BIP: the first throw of the periodic coin inserts at MRU, the rest at LRU
    policy.update(7, &access, Resolution::Fill { way: 0, victim: None });
    policy.update(7, &access, Resolution::Fill { way: 1, victim: None });
    assert_eq!(policy.rrpv(7, 0), 0);
    assert_eq!(policy.rrpv(7, 1), 3);
}

#[test]
fn every_preset_builds_for_the_default_llc() {
    let geometry = crate::config::Geometry::default();
    for preset in Preset::ALL {
        let policy = HybridPolicy::from_preset(&geometry, preset).unwrap();
        assert_eq!(policy.name(), preset.name());
        let stats = policy.stats();
        assert_eq!(stats.rrpv_histogram[3], (geometry.sets * geometry.ways) as u64);
    }
}

#[test]
fn adaptive_presets_enable_their_components() {
    let geometry = geometry(64, 16);
    let phase = HybridPolicy::from_preset(&geometry, Preset::PhaseAdaptiveDrrip).unwrap();
    assert_eq!(phase.name(), "phase_adaptive_drrip");
    assert!(phase.set_reuse().is_some() && phase.dueling().is_some());
    assert!(phase.bypass_window().is_none());

    let bypass = HybridPolicy::from_preset(&geometry, Preset::ShipDrripAdaptiveBypass).unwrap();
    assert_eq!(Preset::ShipDrripAdaptiveBypass.config().bypass_window, Some(8));
    assert!(bypass.bypass_window().is_some() && bypass.ship().is_some());
    assert!(bypass.set_reuse().is_none());
}

#[test]
fn invalid_configurations_are_rejected() {
    assert_eq!(
        HybridPolicy::new(&geometry(3, 4), &HybridConfig::default()).err(),
        Some(ConfigError::NotPowerOfTwo {
            field: "sets",
            value: 3
        })
    );
    assert_eq!(
        HybridPolicy::from_preset(&geometry(32, 16), Preset::Drrip).err(),
        Some(ConfigError::TooManyLeaders {
            leader_sets: 32,
            sets: 32
        })
    );
    let config = HybridConfig {
        ship: Some(ShipConfig {
            entries: 48,
            ..ShipConfig::default()
        }),
        ..HybridConfig::default()
    };
    assert!(matches!(
        HybridPolicy::new(&geometry(64, 16), &config),
        Err(ConfigError::NotPowerOfTwo { field: "ship.entries", .. })
    ));
    let config = HybridConfig {
        ship: Some(ShipConfig {
            entries: 32,
            ..ShipConfig::default()
        }),
        ..HybridConfig::default()
    };
    assert_eq!(
        HybridPolicy::new(&geometry(64, 16), &config).err(),
        Some(ConfigError::OutOfRange {
            field: "ship.entries",
            value: 32,
            min: 64,
            max: 8192
        })
    );
    let config = HybridConfig {
        streaming: Some(StreamingConfig::default()),
        bypass_window: Some(8),
        ..HybridConfig::default()
    };
    assert_eq!(
        HybridPolicy::new(&geometry(64, 16), &config).err(),
        Some(ConfigError::Requires {
            field: "bypass_window",
            requires: "streaming with bypass_streaming"
        })
    );
    let config = HybridConfig {
        bypass_streaming: true,
        ..HybridConfig::default()
    };
    assert!(matches!(
        HybridPolicy::new(&geometry(64, 16), &config),
        Err(ConfigError::Requires { field: "bypass_streaming", .. })
    ));
}

#[test]
fn stats_account_for_every_access() {
    let geometry = geometry(64, 8);
    let mut cache = Cache::new(&geometry, HybridPolicy::from_preset(&geometry, Preset::FullHybrid).unwrap());
    let trace = util::mixed(7, 5000, 128, 64);
    for access in &trace {
        cache.access(access);
    }
    let stats = cache.policy_stats();
    assert_eq!(stats.policy, "full_hybrid");
    assert_eq!(stats.counts.accesses, 5000);
    assert_eq!(stats.counts.hits + stats.counts.misses, 5000);
    assert_eq!(stats.counts.bypasses, 0);
    assert!(stats.counts.hits > 0);
    assert_eq!(stats.rrpv_histogram.iter().sum::<u64>(), 64 * 8);
    assert!(stats.psel.is_some() && stats.dead_lines.is_some());
    assert!(stats.to_string().starts_with("full_hybrid: 5000 accesses"));
}
