//! Centralized tuning constants for the progression core.
//!
//! Cap ceilings, exp scaling tables and the substitution mixing constants
//! live here so that balance can only change through reviewed code.

// Level caps ---------------------------------------------------------------
pub const MAX_LEVEL: u32 = 100;

/// Exp divisors applied at or above the cap, indexed by `min(level - cap, 4)`.
pub(crate) const EXP_SCALING_DOWN: [u32; 5] = [4, 8, 16, 32, 64];
/// Exp bonus divisors applied below the cap, indexed by `min(cap - level, 4)`.
pub(crate) const EXP_SCALING_UP: [u32; 5] = [16, 8, 4, 2, 1];

// Stat-training caps -------------------------------------------------------
pub const MAX_TOTAL_EVS: u16 = 510;

// Substitution -------------------------------------------------------------
pub const DEFAULT_SPECIES_COUNT: u16 = 412;
pub(crate) const DEFAULT_SIMILAR_STATS: bool = false;
/// Base-stat-total distance above which a candidate is redrawn once.
/// Wild encounters historically used 101; static and trade used 100.
pub const SIMILARITY_THRESHOLD: u16 = 100;
pub(crate) const REFINE_XOR: u32 = 0x1234_5678;
pub(crate) const LOCATION_SHIFT: u32 = 8;
pub(crate) const CONTEXT_SHIFT: u32 = 16;
pub(crate) const MIX_SHIFT_LOW: u32 = 11;
pub(crate) const MIX_SHIFT_HIGH: u32 = 22;

// Encounter rewriting ------------------------------------------------------
pub(crate) const REWRITE_USAGE_SOFT_LIMIT: u32 = 3;
pub(crate) const REWRITE_DOMAIN_TAG: &[u8] = b"wild-encounter-rewrite";
pub(crate) const ENCOUNTER_SLOT_KEYS: [&str; 5] = [
    "land_mons",
    "water_mons",
    "rock_smash_mons",
    "fishing_mons",
    "hidden_mons",
];

// Announcements ------------------------------------------------------------
pub(crate) const CAP_TEXT_MAX_DIGITS: usize = 3;
