//! Story-gated level and stat-training caps.
//!
//! Caps are recomputed from the host's flag store on every query; the
//! engine keeps no progress state of its own.

use crate::FlagStore;
use crate::config::{EvCapSource, ExpCapMode, LevelCapSource, ProgressionConfig};
use crate::constants::{EXP_SCALING_DOWN, EXP_SCALING_UP, MAX_LEVEL, MAX_TOTAL_EVS};
use crate::milestones::MilestoneTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressionCapEngine {
    level_cap: LevelCapSource,
    exp_cap: ExpCapMode,
    exp_bonus_below_cap: bool,
    ev_cap: EvCapSource,
    level_table: MilestoneTable,
    ev_table: MilestoneTable,
}

impl ProgressionCapEngine {
    #[must_use]
    pub fn new(cfg: &ProgressionConfig) -> Self {
        Self {
            level_cap: cfg.level_cap,
            exp_cap: cfg.exp_cap,
            exp_bonus_below_cap: cfg.exp_bonus_below_cap,
            ev_cap: cfg.ev_cap,
            level_table: cfg.level_table.clone(),
            ev_table: cfg.ev_table.clone(),
        }
    }

    #[must_use]
    pub const fn level_cap_source(&self) -> LevelCapSource {
        self.level_cap
    }

    #[must_use]
    pub const fn exp_cap_mode(&self) -> ExpCapMode {
        self.exp_cap
    }

    #[must_use]
    pub fn level_table(&self) -> &MilestoneTable {
        &self.level_table
    }

    #[must_use]
    pub fn ev_table(&self) -> &MilestoneTable {
        &self.ev_table
    }

    /// Highest level a character may currently reach.
    #[must_use]
    pub fn current_level_cap<S>(&self, store: &S) -> u32
    where
        S: FlagStore + ?Sized,
    {
        match self.level_cap {
            LevelCapSource::FlagList => self.level_table.first_unmet(store).unwrap_or(MAX_LEVEL),
            LevelCapSource::Variable { var } => u32::from(store.var_get(var)),
            LevelCapSource::Disabled => MAX_LEVEL,
        }
    }

    #[must_use]
    pub fn level_cap_reached<S>(&self, store: &S, level: u32) -> bool
    where
        S: FlagStore + ?Sized,
    {
        level >= self.current_level_cap(store)
    }

    /// Rescale an exp award for a character at `level`.
    ///
    /// Below the cap the award may receive a bonus that grows with the
    /// distance to the cap. At or above it the award is zeroed (hard cap)
    /// or divided down more harshly the further over the cap (soft cap).
    #[must_use]
    pub fn soft_level_cap_exp_value<S>(&self, store: &S, level: u32, exp: u32) -> u32
    where
        S: FlagStore + ?Sized,
    {
        if matches!(self.exp_cap, ExpCapMode::None) {
            return exp;
        }
        let cap = self.current_level_cap(store);

        if level < cap {
            if !self.exp_bonus_below_cap {
                return exp;
            }
            let divisor = scaling_divisor(&EXP_SCALING_UP, cap - level);
            return exp.saturating_add(exp / divisor);
        }

        match self.exp_cap {
            ExpCapMode::Hard => 0,
            ExpCapMode::Soft => exp / scaling_divisor(&EXP_SCALING_DOWN, level - cap),
            ExpCapMode::None => exp,
        }
    }

    /// Ceiling on the summed stat-training points of one character.
    /// Zero means stat training is disallowed.
    #[must_use]
    pub fn current_ev_cap<S>(&self, store: &S) -> u16
    where
        S: FlagStore + ?Sized,
    {
        match self.ev_cap {
            EvCapSource::FlagList => self
                .ev_table
                .first_unmet(store)
                .map_or(MAX_TOTAL_EVS, |value| {
                    u16::try_from(value).unwrap_or(MAX_TOTAL_EVS)
                }),
            EvCapSource::Variable { var } => store.var_get(var),
            EvCapSource::NoGain => 0,
            EvCapSource::Max => MAX_TOTAL_EVS,
        }
    }

    /// How much of `requested` may be granted on top of `current_total`
    /// without passing the current EV cap.
    #[must_use]
    pub fn ev_allowance<S>(&self, store: &S, current_total: u16, requested: u16) -> u16
    where
        S: FlagStore + ?Sized,
    {
        let headroom = self.current_ev_cap(store).saturating_sub(current_total);
        requested.min(headroom)
    }
}

impl Default for ProgressionCapEngine {
    fn default() -> Self {
        Self::new(&ProgressionConfig::default())
    }
}

/// Table lookup clamped to the last slot for any distance past the table.
fn scaling_divisor(table: &[u32; 5], distance: u32) -> u32 {
    let last = table.len() - 1;
    let idx = usize::try_from(distance).map_or(last, |d| d.min(last));
    table[idx]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryFlagStore;
    use crate::milestones::ev_cap_table;
    use crate::{FlagId, VarId};

    const CAP_VAR: VarId = VarId(0x40F0);

    fn variable_engine(exp_cap: ExpCapMode, bonus: bool) -> ProgressionCapEngine {
        ProgressionCapEngine::new(&ProgressionConfig {
            level_cap: LevelCapSource::Variable { var: CAP_VAR },
            exp_cap,
            exp_bonus_below_cap: bonus,
            ..ProgressionConfig::default()
        })
    }

    fn store_with_cap(cap: u16) -> MemoryFlagStore {
        MemoryFlagStore::new().with_var(CAP_VAR, cap)
    }

    #[test]
    fn flag_list_returns_first_unmet_value() {
        let engine = ProgressionCapEngine::default();
        let table = engine.level_table().clone();
        let first_five: Vec<FlagId> = table.iter().take(5).map(|m| m.flag).collect();
        let store = MemoryFlagStore::new().with_flags(first_five);
        assert_eq!(engine.current_level_cap(&store), table.milestones[5].value);
        assert_eq!(engine.current_level_cap(&store), 35);
    }

    #[test]
    fn flag_list_falls_through_to_max_level() {
        let engine = ProgressionCapEngine::default();
        let store = MemoryFlagStore::new().with_flags(engine.level_table().iter().map(|m| m.flag));
        assert_eq!(engine.current_level_cap(&store), MAX_LEVEL);
    }

    #[test]
    fn variable_and_disabled_sources() {
        let engine = variable_engine(ExpCapMode::Soft, true);
        assert_eq!(engine.current_level_cap(&store_with_cap(42)), 42);

        let disabled = ProgressionCapEngine::new(&ProgressionConfig {
            level_cap: LevelCapSource::Disabled,
            ..ProgressionConfig::default()
        });
        assert_eq!(disabled.current_level_cap(&MemoryFlagStore::new()), MAX_LEVEL);
    }

    #[test]
    fn hard_cap_zeroes_exp_at_cap() {
        let engine = variable_engine(ExpCapMode::Hard, true);
        let store = store_with_cap(20);
        for exp in [0, 1, 250, u32::MAX] {
            assert_eq!(engine.soft_level_cap_exp_value(&store, 20, exp), 0);
        }
    }

    #[test]
    fn soft_cap_clamps_divisor_past_table() {
        let engine = variable_engine(ExpCapMode::Soft, true);
        let store = store_with_cap(20);
        assert_eq!(engine.soft_level_cap_exp_value(&store, 25, 1000), 15);
        assert_eq!(engine.soft_level_cap_exp_value(&store, 20, 1000), 250);
        assert_eq!(engine.soft_level_cap_exp_value(&store, 21, 1000), 125);
        assert_eq!(engine.soft_level_cap_exp_value(&store, 99, 1000), 15);
    }

    #[test]
    fn bonus_below_cap_grows_with_distance() {
        let engine = variable_engine(ExpCapMode::Soft, true);
        let store = store_with_cap(20);
        assert_eq!(engine.soft_level_cap_exp_value(&store, 16, 100), 200);
        assert_eq!(engine.soft_level_cap_exp_value(&store, 1, 100), 200);
        assert_eq!(engine.soft_level_cap_exp_value(&store, 17, 100), 150);
        assert_eq!(engine.soft_level_cap_exp_value(&store, 19, 100), 112);
        assert_eq!(
            engine.soft_level_cap_exp_value(&store, 16, u32::MAX),
            u32::MAX
        );
    }

    #[test]
    fn bonus_disabled_and_no_cap_pass_through() {
        let store = store_with_cap(20);
        let no_bonus = variable_engine(ExpCapMode::Hard, false);
        assert_eq!(no_bonus.soft_level_cap_exp_value(&store, 10, 100), 100);

        let uncapped = variable_engine(ExpCapMode::None, true);
        assert_eq!(uncapped.soft_level_cap_exp_value(&store, 10, 100), 100);
        assert_eq!(uncapped.soft_level_cap_exp_value(&store, 30, 100), 100);
    }

    #[test]
    fn ev_cap_modes() {
        let store = MemoryFlagStore::new().with_var(VarId(9), 252);
        let cap_for = |ev_cap| {
            ProgressionCapEngine::new(&ProgressionConfig {
                ev_cap,
                ..ProgressionConfig::default()
            })
            .current_ev_cap(&store)
        };
        assert_eq!(cap_for(EvCapSource::FlagList), 30);
        assert_eq!(cap_for(EvCapSource::Variable { var: VarId(9) }), 252);
        assert_eq!(cap_for(EvCapSource::NoGain), 0);
        assert_eq!(cap_for(EvCapSource::Max), MAX_TOTAL_EVS);
    }

    #[test]
    fn ev_cap_reaches_max_after_final_marker() {
        let engine = ProgressionCapEngine::default();
        let mut store = MemoryFlagStore::new();
        for milestone in ev_cap_table().iter() {
            assert_eq!(
                u32::from(engine.current_ev_cap(&store)),
                milestone.value,
                "cap before {}",
                milestone.label
            );
            store.set_flag(milestone.flag);
        }
        assert_eq!(engine.current_ev_cap(&store), MAX_TOTAL_EVS);
    }

    #[test]
    fn ev_allowance_saturates_at_cap() {
        let engine = ProgressionCapEngine::default();
        let store = MemoryFlagStore::new();
        assert_eq!(engine.ev_allowance(&store, 0, 12), 12);
        assert_eq!(engine.ev_allowance(&store, 25, 12), 5);
        assert_eq!(engine.ev_allowance(&store, 30, 12), 0);
        assert_eq!(engine.ev_allowance(&store, 200, 12), 0);
    }

    #[test]
    fn level_cap_reached_at_and_above_cap() {
        let engine = variable_engine(ExpCapMode::Soft, true);
        let store = store_with_cap(20);
        assert!(!engine.level_cap_reached(&store, 19));
        assert!(engine.level_cap_reached(&store, 20));
        assert!(engine.level_cap_reached(&store, 21));
    }
}
