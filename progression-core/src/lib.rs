//! Progression Core
//!
//! Platform-agnostic progression rules for a monster-collecting RPG:
//! story-gated level and stat-training caps with exp rescaling, and a
//! seeded species substitution engine for wild, static and traded
//! encounters. The host game owns save data, flags and the species
//! database; this crate only reads them through the traits below.

pub mod announce;
pub mod caps;
pub mod config;
pub mod constants;
pub mod host;
pub mod milestones;
pub mod randomizer;
pub mod rewrite;

use serde::{Deserialize, Serialize};

pub use announce::{CapTracker, DefaultCapText};
pub use caps::ProgressionCapEngine;
pub use config::{
    ConfigError, EvCapSource, ExpCapMode, LevelCapSource, ProgressionConfig, RandomizerConfig,
    SimilarityComparison, default_config,
};
pub use constants::{MAX_LEVEL, MAX_TOTAL_EVS};
pub use host::{MemoryFlagStore, StatTable};
pub use milestones::{Milestone, MilestoneTable, ev_cap_table, level_cap_table};
pub use randomizer::{
    CategorySet, RandomizationCategory, RandomizerState, SpeciesUniverse, SubstitutionEngine,
    derive_seed,
};
pub use rewrite::{EncounterPools, EncounterRewriter, LevelBand, RewriteError, RewriteSummary};

/// Species identifier. `0` is reserved as the invalid species.
pub type SpeciesId = u16;

/// Opaque event flag identifier owned by the host save data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagId(pub u16);

/// Opaque script variable identifier owned by the host save data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarId(pub u16);

/// Subject whose reference statistic is compared during similarity refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatSubject {
    /// The first member of the player's party.
    PartyLead,
    Species(SpeciesId),
}

/// Read-only view of the host's event flags and script variables.
pub trait FlagStore {
    fn flag_is_set(&self, flag: FlagId) -> bool;

    fn var_get(&self, var: VarId) -> u16;
}

/// Lookup for the base-stat total used by similarity refinement.
pub trait ReferenceStats {
    fn reference_stat(&self, subject: StatSubject) -> u16;
}

/// Formats the message shown when the level cap rises.
/// Display is left to the caller.
pub trait CapTextFormatter {
    fn level_cap_increased(&self, cap: u32) -> String;
}

impl<T: FlagStore + ?Sized> FlagStore for &T {
    fn flag_is_set(&self, flag: FlagId) -> bool {
        (**self).flag_is_set(flag)
    }

    fn var_get(&self, var: VarId) -> u16 {
        (**self).var_get(var)
    }
}

impl<T: ReferenceStats + ?Sized> ReferenceStats for &T {
    fn reference_stat(&self, subject: StatSubject) -> u16 {
        (**self).reference_stat(subject)
    }
}
