//! Offline rewriting of wild-encounter tables.
//!
//! Walks a `wild_encounters.json` style document and replaces every slot's
//! species with a pick from a curated pool for the slot's level band.
//! Picks favour species that have been used fewer than three times so far,
//! which spreads the pool across the whole document. The RNG stream is
//! derived from a user seed so a given seed always produces the same file.

use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::constants::{ENCOUNTER_SLOT_KEYS, REWRITE_DOMAIN_TAG, REWRITE_USAGE_SOFT_LIMIT};

const DEFAULT_POOL_DATA: &str = include_str!("../assets/encounter_pools.json");

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("expected {expected} at {path}")]
    Shape { path: String, expected: &'static str },
    #[error("invalid encounter document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LevelBand {
    #[serde(rename = "1-5")]
    Starter,
    #[serde(rename = "6-15")]
    Early,
    #[serde(rename = "16-30")]
    Mid,
    #[serde(rename = "31-50")]
    Late,
    #[serde(rename = "51-100")]
    Endgame,
}

impl LevelBand {
    #[must_use]
    pub const fn for_level(level: u32) -> Self {
        match level {
            0..=5 => Self::Starter,
            6..=15 => Self::Early,
            16..=30 => Self::Mid,
            31..=50 => Self::Late,
            _ => Self::Endgame,
        }
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Starter => "1-5",
            Self::Early => "6-15",
            Self::Mid => "16-30",
            Self::Late => "31-50",
            Self::Endgame => "51-100",
        }
    }
}

/// Species pools keyed by level band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EncounterPools {
    #[serde(default)]
    pub bands: BTreeMap<LevelBand, Vec<String>>,
}

impl EncounterPools {
    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_POOL_DATA).unwrap_or_default()
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into pools.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn pool(&self, band: LevelBand) -> &[String] {
        self.bands.get(&band).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RewriteSummary {
    pub slots_rewritten: usize,
    pub usage: BTreeMap<String, u32>,
}

#[derive(Debug, Clone)]
pub struct EncounterRewriter {
    pools: EncounterPools,
    rng: ChaCha20Rng,
    usage: BTreeMap<String, u32>,
}

impl EncounterRewriter {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_pools(EncounterPools::load_from_static(), seed)
    }

    #[must_use]
    pub fn with_pools(pools: EncounterPools, seed: u64) -> Self {
        Self {
            pools,
            rng: ChaCha20Rng::seed_from_u64(derive_stream_seed(seed, REWRITE_DOMAIN_TAG)),
            usage: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn usage(&self) -> &BTreeMap<String, u32> {
        &self.usage
    }

    /// Pick a species for a slot at `level`, or `None` when the band's pool
    /// is empty.
    pub fn pick_for_level(&mut self, level: u32) -> Option<String> {
        let pool = self.pools.pool(LevelBand::for_level(level));
        let fresh: Vec<&String> = pool
            .iter()
            .filter(|species| {
                self.usage.get(*species).copied().unwrap_or(0) < REWRITE_USAGE_SOFT_LIMIT
            })
            .collect();

        let picked = if fresh.is_empty() {
            pool.choose(&mut self.rng)
        } else {
            fresh.choose(&mut self.rng).copied()
        };
        let chosen = picked?.clone();

        *self.usage.entry(chosen.clone()).or_insert(0) += 1;
        Some(chosen)
    }

    /// Parse, rewrite and return the document along with a usage summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not JSON or has the wrong shape.
    pub fn rewrite_json(&mut self, input: &str) -> Result<(Value, RewriteSummary), RewriteError> {
        let mut doc: Value = serde_json::from_str(input)?;
        let summary = self.rewrite_document(&mut doc)?;
        Ok((doc, summary))
    }

    /// Rewrite every encounter slot in place. Missing sections are skipped;
    /// sections of the wrong type are an error.
    ///
    /// # Errors
    ///
    /// Returns an error when the root, the group list or an encounter list
    /// has the wrong JSON type.
    pub fn rewrite_document(&mut self, doc: &mut Value) -> Result<RewriteSummary, RewriteError> {
        let root = doc
            .as_object_mut()
            .ok_or_else(|| shape_error("$", "object"))?;
        let mut slots_rewritten = 0;

        if let Some(groups) = root.get_mut("wild_encounter_groups") {
            let groups = groups
                .as_array_mut()
                .ok_or_else(|| shape_error("wild_encounter_groups", "array"))?;
            for (group_idx, group) in groups.iter_mut().enumerate() {
                let Some(encounters) = group.get_mut("encounters") else {
                    continue;
                };
                let encounters = encounters.as_array_mut().ok_or_else(|| {
                    shape_error(
                        &format!("wild_encounter_groups[{group_idx}].encounters"),
                        "array",
                    )
                })?;
                for encounter in encounters.iter_mut() {
                    for key in ENCOUNTER_SLOT_KEYS {
                        if let Some(section) = encounter.get_mut(key) {
                            slots_rewritten += self.rewrite_section(section);
                        }
                    }
                }
            }
        }

        log::info!("rewrote {slots_rewritten} encounter slots");
        Ok(RewriteSummary {
            slots_rewritten,
            usage: self.usage.clone(),
        })
    }

    fn rewrite_section(&mut self, section: &mut Value) -> usize {
        let Some(mons) = section.get_mut("mons").and_then(Value::as_array_mut) else {
            return 0;
        };

        let mut rewritten = 0;
        for mon in mons.iter_mut() {
            let Some(slot) = mon.as_object_mut() else {
                continue;
            };
            if !slot.contains_key("species") {
                continue;
            }
            let min_level = slot.get("min_level").and_then(Value::as_u64).unwrap_or(1);
            let max_level = slot.get("max_level").and_then(Value::as_u64).unwrap_or(1);
            let average = min_level.saturating_add(max_level) / 2;
            let level = u32::try_from(average).unwrap_or(u32::MAX);

            if let Some(species) = self.pick_for_level(level) {
                slot.insert("species".to_string(), Value::String(species));
                rewritten += 1;
            }
        }
        rewritten
    }
}

fn shape_error(path: &str, expected: &'static str) -> RewriteError {
    RewriteError::Shape {
        path: path.to_string(),
        expected,
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
