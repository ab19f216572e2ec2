use progression_core::{
    RandomizationCategory, RandomizerConfig, RandomizerState, SimilarityComparison, StatTable,
    SubstitutionEngine, derive_seed,
};
use std::collections::HashSet;

fn all_enabled(seed: u32, similar: bool) -> RandomizerState {
    let mut state = RandomizerState::initialize(seed);
    state.set_flags(true, true, true, similar);
    state
}

#[test]
fn draws_stay_inside_universe() {
    let engine = SubstitutionEngine::new(&RandomizerConfig {
        species_count: 7,
        ..RandomizerConfig::default()
    })
    .unwrap();
    let stats = StatTable::default();

    for seed in [0, 1, 0xDEAD_BEEF, u32::MAX] {
        let state = all_enabled(seed, false);
        for location in 0..200 {
            for slot in 0..12u8 {
                let species = engine.wild_species(&state, &stats, 3, location, slot);
                assert!((1..7).contains(&species), "drew {species}");
            }
        }
    }
}

#[test]
fn smallest_universe_always_draws_one() {
    let engine = SubstitutionEngine::new(&RandomizerConfig {
        species_count: 2,
        ..RandomizerConfig::default()
    })
    .unwrap();
    let state = all_enabled(0x5EED, false);
    let stats = StatTable::default();
    for trade in 0..50 {
        assert_eq!(engine.trade_species(&state, &stats, 1, trade), 1);
    }
}

#[test]
fn same_inputs_give_same_species() {
    let engine = SubstitutionEngine::default();
    let stats = StatTable::new(420);
    let a = all_enabled(0xA11C_E5ED, true);
    let b = all_enabled(0xA11C_E5ED, true);
    for map in 0..40 {
        for object in 0..8 {
            assert_eq!(
                engine.static_species(&a, &stats, 25, map, object),
                engine.static_species(&b, &stats, 25, map, object)
            );
        }
    }
}

#[test]
fn toggles_do_not_move_the_seed() {
    let engine = SubstitutionEngine::default();
    let stats = StatTable::default();
    let mut state = all_enabled(1234, false);
    let before = engine.wild_species(&state, &stats, 10, 33, 0);

    state.set_flags(false, false, false, false);
    assert_eq!(engine.wild_species(&state, &stats, 10, 33, 0), 10);

    state.set_flags(true, false, false, false);
    assert_eq!(engine.wild_species(&state, &stats, 10, 33, 0), before);
}

#[test]
fn each_category_is_gated_independently() {
    let engine = SubstitutionEngine::default();
    let stats = StatTable::default();
    let mut state = RandomizerState::initialize(42);
    state.set_flags(false, false, true, false);

    assert_eq!(engine.wild_species(&state, &stats, 300, 1, 1), 300);
    assert_eq!(engine.static_species(&state, &stats, 300, 1, 1), 300);
    assert!(state.is_enabled(RandomizationCategory::Trade));
    let traded = engine.trade_species(&state, &stats, 300, 1);
    assert!(engine.universe().contains(traded));
}

#[test]
fn neighbouring_context_values_derive_distinct_seeds() {
    for base in [0, 0x1234_5678, u32::MAX] {
        for location in [0, 17, 255] {
            let seeds: HashSet<u32> = (0..1000).map(|ctx| derive_seed(base, location, ctx)).collect();
            assert_eq!(seeds.len(), 1000);
        }
    }
}

#[test]
fn different_slots_spread_across_species() {
    let engine = SubstitutionEngine::default();
    let state = all_enabled(0x0BAD_F00D, false);
    let stats = StatTable::default();
    let picks: HashSet<u16> = (0..64u8)
        .map(|slot| engine.wild_species(&state, &stats, 1, 9, slot))
        .collect();
    assert!(picks.len() > 16, "only {} distinct species", picks.len());
}

#[test]
fn corrected_comparison_keeps_close_candidates() {
    let engine = SubstitutionEngine::new(&RandomizerConfig {
        comparison: SimilarityComparison::OriginalVsCandidate,
        ..RandomizerConfig::default()
    })
    .unwrap();
    let flat = (1..engine.universe().count())
        .fold(StatTable::new(0), |table, id| table.with_species(id, 450));

    let refined = all_enabled(77, true);
    let plain = all_enabled(77, false);
    for location in 0..64 {
        assert_eq!(
            engine.wild_species(&refined, &flat, 1, location, 2),
            engine.wild_species(&plain, &flat, 1, location, 2)
        );
    }
}

#[test]
fn state_round_trips_through_save_json() {
    let mut state = RandomizerState::initialize(0xCAFE);
    state.set_flags(true, false, true, true);
    let saved = serde_json::to_string(&state).unwrap();
    let restored: RandomizerState = serde_json::from_str(&saved).unwrap();
    assert_eq!(restored, state);
}
