//! Seeded logic scenarios run against `progression-core`.
//!
//! Every scenario receives the active configuration and one seed, and
//! fails with the first violated expectation.

use anyhow::{Result, ensure};
use colored::Colorize;
use progression_core::{
    CapTracker, DefaultCapText, EvCapSource, ExpCapMode, LevelCapSource, MAX_LEVEL,
    MAX_TOTAL_EVS, MemoryFlagStore, MilestoneTable, ProgressionCapEngine, ProgressionConfig,
    RandomizationCategory, RandomizerConfig, RandomizerState, ReferenceStats,
    SimilarityComparison, StatSubject, StatTable, SubstitutionEngine, VarId,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::time::{Duration, Instant};

const SCRATCH_VAR: VarId = VarId(0x40F0);
const LOCATION_SWEEP: u32 = 64;
const SLOT_SWEEP: u8 = 12;

pub struct ScenarioCtx<'a> {
    pub seed: u64,
    pub config: &'a ProgressionConfig,
    pub verbose: bool,
}

impl ScenarioCtx<'_> {
    /// Save-record seed: the low 32 bits of the CLI seed.
    fn save_seed(&self) -> u32 {
        u32::try_from(self.seed & u64::from(u32::MAX)).unwrap_or_default()
    }

    fn rng(&self) -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(self.seed)
    }
}

pub struct Scenario {
    pub key: &'static str,
    pub description: &'static str,
    pub run: fn(&ScenarioCtx<'_>) -> Result<()>,
}

const CATALOG: &[Scenario] = &[
    Scenario {
        key: "level-cap-walk",
        description: "Level cap follows story flags, variables or the disabled default",
        run: level_cap_walk,
    },
    Scenario {
        key: "ev-cap-walk",
        description: "EV cap follows badge flags and the fixed modes",
        run: ev_cap_walk,
    },
    Scenario {
        key: "exp-scaling",
        description: "Exp bonus below the cap and hard/soft reduction at or above it",
        run: exp_scaling,
    },
    Scenario {
        key: "cap-announcements",
        description: "Announcements fire exactly on rising edges after the first check",
        run: cap_announcements,
    },
    Scenario {
        key: "substitution-determinism",
        description: "Same seed and context always yield the same species",
        run: substitution_determinism,
    },
    Scenario {
        key: "substitution-bounds",
        description: "Substituted species are never 0 and always inside the universe",
        run: substitution_bounds,
    },
    Scenario {
        key: "category-passthrough",
        description: "Disabled categories return the original species unchanged",
        run: category_passthrough,
    },
    Scenario {
        key: "similarity-single-pass",
        description: "Similarity refinement compares once and redraws at most once",
        run: similarity_single_pass,
    },
];

const SMOKE: &[&str] = &["level-cap-walk", "exp-scaling", "substitution-bounds"];

#[must_use]
pub fn get_scenario(name: &str) -> Option<&'static Scenario> {
    let name = name.to_lowercase();
    CATALOG.iter().find(|scenario| scenario.key == name)
}

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    let mut listing = vec![
        ("smoke", "Quick subset: level-cap-walk, exp-scaling, substitution-bounds"),
        ("all", "Every scenario below"),
    ];
    listing.extend(CATALOG.iter().map(|s| (s.key, s.description)));
    listing
}

/// Expand `smoke` and `all` into scenario keys, keeping first occurrence
/// order and dropping duplicates.
#[must_use]
pub fn expand_scenarios(requested: &[String]) -> Vec<String> {
    let mut expanded: Vec<String> = Vec::new();
    let mut push = |key: &str| {
        if !expanded.iter().any(|k| k == key) {
            expanded.push(key.to_string());
        }
    };

    for name in requested {
        match name.to_lowercase().as_str() {
            "all" => {
                for scenario in CATALOG {
                    push(scenario.key);
                }
            }
            "smoke" => {
                for &key in SMOKE {
                    push(key);
                }
            }
            other => push(other),
        }
    }
    expanded
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub passed: bool,
    pub seeds_run: usize,
    pub successful_seeds: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_micros().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let micros = u64::deserialize(deserializer)?;
        Ok(Duration::from_micros(micros))
    }
}

pub struct LogicTester<'a> {
    config: &'a ProgressionConfig,
    verbose: bool,
}

impl<'a> LogicTester<'a> {
    pub const fn new(config: &'a ProgressionConfig, verbose: bool) -> Self {
        Self { config, verbose }
    }

    pub fn run_scenario(&self, scenario: &Scenario, seeds: &[u64]) -> ScenarioResult {
        let mut failures = Vec::new();
        let mut durations = Vec::with_capacity(seeds.len());

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (seed: {seed})",
                    scenario.key.bright_white()
                );
            }
            let ctx = ScenarioCtx {
                seed,
                config: self.config,
                verbose: self.verbose,
            };
            let start = Instant::now();
            let outcome = (scenario.run)(&ctx);
            durations.push(start.elapsed());

            if let Err(err) = outcome {
                log::debug!("{} failed for seed {seed}: {err:#}", scenario.key);
                failures.push(format!("seed {seed}: {err:#}"));
            }
        }

        let average_duration = if durations.is_empty() {
            Duration::ZERO
        } else {
            durations.iter().sum::<Duration>() / u32::try_from(durations.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.key.to_string(),
            passed: failures.is_empty(),
            seeds_run: seeds.len(),
            successful_seeds: seeds.len() - failures.len(),
            failures,
            average_duration,
        }
    }
}

fn level_cap_walk(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let engine = ProgressionCapEngine::new(ctx.config);
    let mut rng = ctx.rng();

    match ctx.config.level_cap {
        LevelCapSource::FlagList => {
            let table = &ctx.config.level_table;
            let reached = rng.gen_range(0..=table.len());
            let store = store_through(table, reached);
            let expected = table
                .milestones
                .get(reached)
                .map_or(MAX_LEVEL, |m| m.value);
            let cap = engine.current_level_cap(&store);
            ensure!(
                cap == expected,
                "{reached} milestones met: cap {cap}, expected {expected}"
            );
            ensure!(engine.level_cap_reached(&store, cap), "cap level not reached");
            if ctx.verbose {
                println!("   {reached} milestones met -> level cap {cap}");
            }
        }
        LevelCapSource::Variable { var } => {
            let value: u16 = rng.gen_range(0..=100);
            let store = MemoryFlagStore::new().with_var(var, value);
            let cap = engine.current_level_cap(&store);
            ensure!(cap == u32::from(value), "variable cap {cap} != {value}");
        }
        LevelCapSource::Disabled => {
            let cap = engine.current_level_cap(&MemoryFlagStore::new());
            ensure!(cap == MAX_LEVEL, "disabled cap {cap} != {MAX_LEVEL}");
        }
    }
    Ok(())
}

fn ev_cap_walk(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let engine = ProgressionCapEngine::new(ctx.config);
    let mut rng = ctx.rng();

    let (store, expected) = match ctx.config.ev_cap {
        EvCapSource::FlagList => {
            let table = &ctx.config.ev_table;
            let reached = rng.gen_range(0..=table.len());
            let expected = table
                .milestones
                .get(reached)
                .and_then(|m| u16::try_from(m.value).ok())
                .unwrap_or(MAX_TOTAL_EVS);
            (store_through(table, reached), expected)
        }
        EvCapSource::Variable { var } => {
            let value: u16 = rng.gen_range(0..=MAX_TOTAL_EVS);
            (MemoryFlagStore::new().with_var(var, value), value)
        }
        EvCapSource::NoGain => (MemoryFlagStore::new(), 0),
        EvCapSource::Max => (MemoryFlagStore::new(), MAX_TOTAL_EVS),
    };

    let cap = engine.current_ev_cap(&store);
    ensure!(cap == expected, "ev cap {cap}, expected {expected}");

    let current: u16 = rng.gen_range(0..=MAX_TOTAL_EVS);
    let requested: u16 = rng.gen_range(0..=255);
    let granted = engine.ev_allowance(&store, current, requested);
    ensure!(granted <= requested, "granted {granted} of {requested}");
    ensure!(
        current >= cap || current + granted <= cap,
        "allowance {granted} pushes {current} past cap {cap}"
    );
    Ok(())
}

fn exp_scaling(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let cfg = ProgressionConfig {
        level_cap: LevelCapSource::Variable { var: SCRATCH_VAR },
        ..ctx.config.clone()
    };
    let engine = ProgressionCapEngine::new(&cfg);
    let mut rng = ctx.rng();
    let cap: u16 = rng.gen_range(10..=90);
    let exp: u32 = rng.gen_range(1..=50_000);
    let store = MemoryFlagStore::new().with_var(SCRATCH_VAR, cap);
    let cap = u32::from(cap);

    let mut previous = u32::MAX;
    for level in 1..cap {
        let scaled = engine.soft_level_cap_exp_value(&store, level, exp);
        if cfg.exp_bonus_below_cap && !matches!(cfg.exp_cap, ExpCapMode::None) {
            ensure!(
                (exp..=exp * 2).contains(&scaled),
                "level {level} below cap {cap}: {exp} -> {scaled}"
            );
            ensure!(scaled <= previous, "bonus grew approaching the cap");
            previous = scaled;
        } else {
            ensure!(scaled == exp, "level {level}: exp changed without bonus");
        }
    }

    let mut previous = u32::MAX;
    for level in cap..=cap + 8 {
        let scaled = engine.soft_level_cap_exp_value(&store, level, exp);
        match cfg.exp_cap {
            ExpCapMode::Hard => ensure!(scaled == 0, "hard cap left {scaled} exp"),
            ExpCapMode::Soft => {
                ensure!(scaled <= exp / 4, "soft cap at level {level} kept {scaled}");
                ensure!(scaled <= previous, "soft cap eased past level {level}");
                previous = scaled;
            }
            ExpCapMode::None => ensure!(scaled == exp, "uncapped exp changed"),
        }
    }
    if ctx.verbose {
        println!("   cap {cap}, {exp} exp checked from level 1 to {}", cap + 8);
    }
    Ok(())
}

fn cap_announcements(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let cfg = ProgressionConfig {
        level_cap: LevelCapSource::Variable { var: SCRATCH_VAR },
        ..ctx.config.clone()
    };
    let engine = ProgressionCapEngine::new(&cfg);
    let mut rng = ctx.rng();
    let mut store = MemoryFlagStore::new();
    let mut tracker = CapTracker::new();
    let mut previous = 0u32;

    for step in 0..48 {
        let cap: u16 = rng.gen_range(0..=100);
        store.set_var(SCRATCH_VAR, cap);
        let cap = u32::from(cap);
        let announced = tracker.check_level_cap_increase(&engine, &store, &DefaultCapText);
        let expected = previous > 0 && cap > previous;
        ensure!(
            announced.is_some() == expected,
            "step {step}: {previous} -> {cap} announced={}",
            announced.is_some()
        );
        if let Some(text) = announced {
            ensure!(
                text.contains(&cap.to_string()),
                "announcement '{text}' lacks cap {cap}"
            );
        }
        ensure!(tracker.last_announced_cap() == cap, "tracker lagged at step {step}");
        previous = cap;
    }
    Ok(())
}

fn substitution_determinism(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let engine = SubstitutionEngine::new(&ctx.config.randomizer)?;
    let stats = StatTable::new(400);
    let mut first = engine.initialize_state(ctx.save_seed());
    first.set_flags(true, true, true, true);
    let second = first;

    for location in 0..LOCATION_SWEEP {
        for slot in 0..SLOT_SWEEP {
            let a = engine.wild_species(&first, &stats, 1, location, slot);
            let b = engine.wild_species(&second, &stats, 1, location, slot);
            ensure!(a == b, "wild {location}/{slot}: {a} != {b}");
        }
    }

    let before = engine.static_species(&first, &stats, 1, 7, 3);
    first.set_flags(false, false, false, false);
    first.set_flags(true, true, true, true);
    let after = engine.static_species(&first, &stats, 1, 7, 3);
    ensure!(before == after, "toggling categories changed the draw");
    Ok(())
}

fn substitution_bounds(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let engine = SubstitutionEngine::new(&ctx.config.randomizer)?;
    let universe = engine.universe();
    let stats = StatTable::new(0);
    let mut state = engine.initialize_state(ctx.save_seed());
    state.set_flags(true, true, true, ctx.config.randomizer.similar_stats_default);

    for location in 0..LOCATION_SWEEP {
        for slot in 0..SLOT_SWEEP {
            let species = engine.wild_species(&state, &stats, 1, location, slot);
            ensure!(
                universe.contains(species),
                "wild {location}/{slot} drew {species} outside 1..{}",
                universe.count()
            );
        }
        let traded = engine.trade_species(&state, &stats, 1, location);
        ensure!(universe.contains(traded), "trade {location} drew {traded}");
    }
    Ok(())
}

fn category_passthrough(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let engine = SubstitutionEngine::new(&ctx.config.randomizer)?;
    let stats = StatTable::default();
    let original = u16::MAX;

    for enabled in RandomizationCategory::ALL {
        let mut state = RandomizerState::initialize(ctx.save_seed());
        state.set_flags(
            enabled == RandomizationCategory::Wild,
            enabled == RandomizationCategory::Static,
            enabled == RandomizationCategory::Trade,
            false,
        );
        for category in RandomizationCategory::ALL {
            let species = engine.substitute(&state, &stats, original, category, 3, 1);
            if category == enabled {
                ensure!(species != original, "{} was not substituted", category.key());
            } else {
                ensure!(
                    species == original,
                    "{} substituted while disabled",
                    category.key()
                );
            }
        }
    }
    Ok(())
}

struct CountingStats {
    calls: Cell<usize>,
}

impl ReferenceStats for CountingStats {
    fn reference_stat(&self, subject: StatSubject) -> u16 {
        self.calls.set(self.calls.get() + 1);
        match subject {
            StatSubject::PartyLead => 500,
            StatSubject::Species(id) => id.wrapping_mul(211),
        }
    }
}

fn similarity_single_pass(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let engine = SubstitutionEngine::new(&RandomizerConfig {
        comparison: SimilarityComparison::OriginalVsCandidate,
        ..ctx.config.randomizer.clone()
    })?;
    let mut state = engine.initialize_state(ctx.save_seed());

    for (similar, expected_calls) in [(false, 0), (true, 2)] {
        state.set_flags(true, true, true, similar);
        for location in 0..LOCATION_SWEEP {
            let stats = CountingStats {
                calls: Cell::new(0),
            };
            let species = engine.wild_species(&state, &stats, 1, location, 0);
            ensure!(
                engine.universe().contains(species),
                "refined draw {species} out of range"
            );
            let calls = stats.calls.get();
            ensure!(
                calls == expected_calls,
                "location {location}: {calls} stat lookups with similarity {similar}"
            );
        }
    }
    Ok(())
}

/// Store with the first `count` milestones of `table` raised.
fn store_through(table: &MilestoneTable, count: usize) -> MemoryFlagStore {
    MemoryFlagStore::new().with_flags(table.iter().take(count).map(|m| m.flag))
}
