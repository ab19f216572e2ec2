//! Progression configuration: cap modes, exp scaling toggles and
//! substitution tuning.
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

use crate::VarId;
use crate::constants::{DEFAULT_SIMILAR_STATS, DEFAULT_SPECIES_COUNT, SIMILARITY_THRESHOLD};
use crate::milestones::{MilestoneTable, ev_cap_table, level_cap_table};

const DEFAULT_PROGRESSION_DATA: &str = include_str!("../assets/progression.json");

/// Errors raised when progression configuration invariants are violated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("species universe must hold at least two ids (got {count})")]
    UniverseTooSmall { count: u16 },
    #[error("{table} milestone table is empty")]
    EmptyTable { table: &'static str },
    #[error("failed to parse progression config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Where the current level cap comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LevelCapSource {
    #[default]
    FlagList,
    Variable {
        var: VarId,
    },
    #[serde(other)]
    Disabled,
}

/// How exp is scaled once a character reaches the level cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExpCapMode {
    Hard,
    #[default]
    Soft,
    #[serde(other)]
    None,
}

/// Where the current stat-training (EV) cap comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvCapSource {
    #[default]
    FlagList,
    Variable {
        var: VarId,
    },
    /// Stat training is disallowed entirely.
    NoGain,
    #[serde(other)]
    Max,
}

/// Which subjects similarity refinement compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityComparison {
    /// Party lead against itself. The difference is always zero, so the
    /// redraw never fires.
    #[default]
    PartyLead,
    /// Original species against the drawn candidate.
    OriginalVsCandidate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomizerConfig {
    #[serde(default = "RandomizerConfig::default_species_count")]
    pub species_count: u16,
    #[serde(default = "RandomizerConfig::default_similar_stats")]
    pub similar_stats_default: bool,
    #[serde(default = "RandomizerConfig::default_similarity_threshold")]
    pub similarity_threshold: u16,
    #[serde(default)]
    pub comparison: SimilarityComparison,
}

impl RandomizerConfig {
    const fn default_species_count() -> u16 {
        DEFAULT_SPECIES_COUNT
    }

    const fn default_similar_stats() -> bool {
        DEFAULT_SIMILAR_STATS
    }

    const fn default_similarity_threshold() -> u16 {
        SIMILARITY_THRESHOLD
    }
}

impl Default for RandomizerConfig {
    fn default() -> Self {
        Self {
            species_count: Self::default_species_count(),
            similar_stats_default: Self::default_similar_stats(),
            similarity_threshold: Self::default_similarity_threshold(),
            comparison: SimilarityComparison::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionConfig {
    #[serde(default)]
    pub level_cap: LevelCapSource,
    #[serde(default)]
    pub exp_cap: ExpCapMode,
    #[serde(default = "ProgressionConfig::default_exp_bonus")]
    pub exp_bonus_below_cap: bool,
    #[serde(default)]
    pub ev_cap: EvCapSource,
    #[serde(default = "ProgressionConfig::default_level_table")]
    pub level_table: MilestoneTable,
    #[serde(default = "ProgressionConfig::default_ev_table")]
    pub ev_table: MilestoneTable,
    #[serde(default)]
    pub randomizer: RandomizerConfig,
}

impl ProgressionConfig {
    const fn default_exp_bonus() -> bool {
        true
    }

    fn default_level_table() -> MilestoneTable {
        level_cap_table().clone()
    }

    fn default_ev_table() -> MilestoneTable {
        ev_cap_table().clone()
    }

    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_PROGRESSION_DATA).unwrap_or_default()
    }

    /// Parse and validate a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check startup invariants. Out-of-order milestone values are logged
    /// but accepted.
    ///
    /// # Errors
    ///
    /// Returns an error when the species universe cannot be sampled or a
    /// flag-list mode has no milestones to scan.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.randomizer.species_count <= 1 {
            return Err(ConfigError::UniverseTooSmall {
                count: self.randomizer.species_count,
            });
        }
        if matches!(self.level_cap, LevelCapSource::FlagList) {
            Self::check_table("level", &self.level_table)?;
        }
        if matches!(self.ev_cap, EvCapSource::FlagList) {
            Self::check_table("ev", &self.ev_table)?;
        }
        Ok(())
    }

    fn check_table(name: &'static str, table: &MilestoneTable) -> Result<(), ConfigError> {
        if table.is_empty() {
            return Err(ConfigError::EmptyTable { table: name });
        }
        if !table.is_non_decreasing() {
            log::warn!(
                "{name} milestone values decrease in unlock order; caps may drop as flags are set"
            );
        }
        Ok(())
    }
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            level_cap: LevelCapSource::default(),
            exp_cap: ExpCapMode::default(),
            exp_bonus_below_cap: Self::default_exp_bonus(),
            ev_cap: EvCapSource::default(),
            level_table: Self::default_level_table(),
            ev_table: Self::default_ev_table(),
            randomizer: RandomizerConfig::default(),
        }
    }
}

#[must_use]
pub fn default_config() -> &'static ProgressionConfig {
    static CONFIG: OnceLock<ProgressionConfig> = OnceLock::new();
    CONFIG.get_or_init(ProgressionConfig::load_from_static)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlagId;
    use crate::milestones::Milestone;

    #[test]
    fn embedded_config_matches_defaults() {
        let cfg = default_config();
        assert_eq!(cfg, &ProgressionConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unknown_modes_fail_open() {
        let cfg = ProgressionConfig::from_json(
            r#"{
                "level_cap": { "type": "by_region" },
                "exp_cap": { "type": "scaled" },
                "ev_cap": { "type": "per_stat" }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.level_cap, LevelCapSource::Disabled);
        assert_eq!(cfg.exp_cap, ExpCapMode::None);
        assert_eq!(cfg.ev_cap, EvCapSource::Max);
    }

    #[test]
    fn variable_source_reads_var_id() {
        let cfg = ProgressionConfig::from_json(
            r#"{ "level_cap": { "type": "variable", "var": 16624 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.level_cap, LevelCapSource::Variable { var: VarId(16624) });
    }

    #[test]
    fn tiny_universe_is_rejected() {
        let err = ProgressionConfig::from_json(r#"{ "randomizer": { "species_count": 1 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UniverseTooSmall { count: 1 }));
    }

    #[test]
    fn empty_flag_list_is_rejected_only_when_used() {
        let mut cfg = ProgressionConfig {
            level_table: MilestoneTable::default(),
            ..ProgressionConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::EmptyTable { table: "level" })
        ));
        cfg.level_cap = LevelCapSource::Disabled;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn decreasing_table_is_accepted() {
        let cfg = ProgressionConfig {
            level_table: MilestoneTable::from_milestones(vec![
                Milestone::new(FlagId(1), 30),
                Milestone::new(FlagId(2), 20),
            ]),
            ..ProgressionConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
