//! In-memory host collaborators for tools, tests and headless hosts.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::{FlagId, FlagStore, ReferenceStats, SpeciesId, StatSubject, VarId};

/// Flag and variable snapshot held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryFlagStore {
    #[serde(default)]
    flags: BTreeSet<FlagId>,
    #[serde(default)]
    vars: HashMap<VarId, u16>,
}

impl MemoryFlagStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_flag(&mut self, flag: FlagId) {
        self.flags.insert(flag);
    }

    pub fn clear_flag(&mut self, flag: FlagId) {
        self.flags.remove(&flag);
    }

    pub fn set_var(&mut self, var: VarId, value: u16) {
        self.vars.insert(var, value);
    }

    #[must_use]
    pub fn with_flags<I>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = FlagId>,
    {
        self.flags.extend(flags);
        self
    }

    #[must_use]
    pub fn with_var(mut self, var: VarId, value: u16) -> Self {
        self.set_var(var, value);
        self
    }
}

impl FlagStore for MemoryFlagStore {
    fn flag_is_set(&self, flag: FlagId) -> bool {
        self.flags.contains(&flag)
    }

    /// Unset variables read as zero, matching fresh save data.
    fn var_get(&self, var: VarId) -> u16 {
        self.vars.get(&var).copied().unwrap_or(0)
    }
}

/// Base-stat totals per species plus the current party lead's total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatTable {
    #[serde(default)]
    pub party_lead: u16,
    #[serde(default)]
    pub species: HashMap<SpeciesId, u16>,
}

impl StatTable {
    #[must_use]
    pub fn new(party_lead: u16) -> Self {
        Self {
            party_lead,
            species: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_species(mut self, species: SpeciesId, total: u16) -> Self {
        self.species.insert(species, total);
        self
    }
}

impl ReferenceStats for StatTable {
    fn reference_stat(&self, subject: StatSubject) -> u16 {
        match subject {
            StatSubject::PartyLead => self.party_lead,
            StatSubject::Species(id) => self.species.get(&id).copied().unwrap_or(0),
        }
    }
}
