//! Ordered milestone tables mapping story flags to cap values.
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::{FlagId, FlagStore};

const DEFAULT_LEVEL_CAP_DATA: &str = include_str!("../assets/level_caps.json");
const DEFAULT_EV_CAP_DATA: &str = include_str!("../assets/ev_caps.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub flag: FlagId,
    pub value: u32,
    #[serde(default)]
    pub label: String,
}

impl Milestone {
    #[must_use]
    pub fn new(flag: FlagId, value: u32) -> Self {
        Self {
            flag,
            value,
            label: String::new(),
        }
    }
}

/// Milestones in unlock order. Order is significant; values are expected,
/// but not required, to be non-decreasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MilestoneTable {
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

impl MilestoneTable {
    #[must_use]
    pub fn from_milestones(milestones: Vec<Milestone>) -> Self {
        Self { milestones }
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a milestone table.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn load_level_caps_from_static() -> Self {
        serde_json::from_str(DEFAULT_LEVEL_CAP_DATA).unwrap_or_default()
    }

    #[must_use]
    pub fn load_ev_caps_from_static() -> Self {
        serde_json::from_str(DEFAULT_EV_CAP_DATA).unwrap_or_default()
    }

    /// Value of the first milestone whose flag is not yet set, scanning in
    /// declaration order. `None` once every flag is set.
    #[must_use]
    pub fn first_unmet<S>(&self, store: &S) -> Option<u32>
    where
        S: FlagStore + ?Sized,
    {
        self.milestones
            .iter()
            .find(|m| !store.flag_is_set(m.flag))
            .map(|m| m.value)
    }

    /// The milestone currently gating progress, if any.
    #[must_use]
    pub fn next_milestone<S>(&self, store: &S) -> Option<&Milestone>
    where
        S: FlagStore + ?Sized,
    {
        self.milestones.iter().find(|m| !store.flag_is_set(m.flag))
    }

    #[must_use]
    pub fn is_non_decreasing(&self) -> bool {
        self.milestones.windows(2).all(|w| w[0].value <= w[1].value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.milestones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.milestones.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Milestone> {
        self.milestones.iter()
    }
}

#[must_use]
pub fn level_cap_table() -> &'static MilestoneTable {
    static TABLE: OnceLock<MilestoneTable> = OnceLock::new();
    TABLE.get_or_init(MilestoneTable::load_level_caps_from_static)
}

#[must_use]
pub fn ev_cap_table() -> &'static MilestoneTable {
    static TABLE: OnceLock<MilestoneTable> = OnceLock::new();
    TABLE.get_or_init(MilestoneTable::load_ev_caps_from_static)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MAX_LEVEL, MAX_TOTAL_EVS};
    use crate::host::MemoryFlagStore;

    #[test]
    fn embedded_tables_parse() {
        let level = level_cap_table();
        assert_eq!(level.len(), 23);
        assert_eq!(level.milestones[0].value, 12);
        assert_eq!(level.milestones.last().map(|m| m.value), Some(MAX_LEVEL));
        assert!(level.is_non_decreasing());

        let ev = ev_cap_table();
        assert_eq!(ev.len(), 9);
        let values: Vec<u32> = ev.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![30, 90, 150, 210, 270, 330, 390, 450, 510]);
        assert_eq!(values.last().copied(), Some(u32::from(MAX_TOTAL_EVS)));
    }

    #[test]
    fn first_unmet_follows_declaration_order() {
        let table = MilestoneTable::from_milestones(vec![
            Milestone::new(FlagId(3), 10),
            Milestone::new(FlagId(1), 20),
            Milestone::new(FlagId(2), 30),
        ]);
        let store = MemoryFlagStore::new().with_flags([FlagId(1), FlagId(2)]);
        // Flag 3 gates the first entry even though later flags are set.
        assert_eq!(table.first_unmet(&store), Some(10));

        let store = store.with_flags([FlagId(3)]);
        assert_eq!(table.first_unmet(&store), None);
    }

    #[test]
    fn non_decreasing_check_reports_dips() {
        let table = MilestoneTable::from_milestones(vec![
            Milestone::new(FlagId(1), 20),
            Milestone::new(FlagId(2), 15),
        ]);
        assert!(!table.is_non_decreasing());
    }

    #[test]
    fn next_milestone_exposes_label() {
        let store = MemoryFlagStore::new();
        let next = level_cap_table().next_milestone(&store).unwrap();
        assert_eq!(next.label, "Route 104 Aqua Grunt");
    }
}
