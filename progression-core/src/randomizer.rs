//! Seeded species substitution for wild, static and traded encounters.
//!
//! Every draw is a pure function of the per-save seed and two context
//! values (location and slot, map and object, or trade id), so the same
//! encounter always yields the same species across save and reload.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, RandomizerConfig, SimilarityComparison};
use crate::constants::{
    CONTEXT_SHIFT, DEFAULT_SIMILAR_STATS, DEFAULT_SPECIES_COUNT, LOCATION_SHIFT, MIX_SHIFT_HIGH,
    MIX_SHIFT_LOW, REFINE_XOR, SIMILARITY_THRESHOLD,
};
use crate::{ReferenceStats, SpeciesId, StatSubject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomizationCategory {
    Wild,
    Static,
    Trade,
}

impl RandomizationCategory {
    pub const ALL: [Self; 3] = [Self::Wild, Self::Static, Self::Trade];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Wild => 0,
            Self::Static => 1,
            Self::Trade => 2,
        }
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Wild => "wild",
            Self::Static => "static",
            Self::Trade => "trade",
        }
    }
}

/// Enabled categories, one slot per [`RandomizationCategory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategorySet([bool; 3]);

impl CategorySet {
    #[must_use]
    pub const fn empty() -> Self {
        Self([false; 3])
    }

    #[must_use]
    pub const fn all() -> Self {
        Self([true; 3])
    }

    pub const fn insert(&mut self, category: RandomizationCategory) {
        self.0[category.index()] = true;
    }

    pub const fn remove(&mut self, category: RandomizationCategory) {
        self.0[category.index()] = false;
    }

    #[must_use]
    pub const fn contains(&self, category: RandomizationCategory) -> bool {
        self.0[category.index()]
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|&enabled| enabled)
    }

    pub fn iter(&self) -> impl Iterator<Item = RandomizationCategory> + '_ {
        RandomizationCategory::ALL
            .into_iter()
            .filter(move |&category| self.contains(category))
    }
}

impl FromIterator<RandomizationCategory> for CategorySet {
    fn from_iter<I: IntoIterator<Item = RandomizationCategory>>(iter: I) -> Self {
        let mut set = Self::empty();
        for category in iter {
            set.insert(category);
        }
        set
    }
}

/// Randomizer settings persisted in the save record.
///
/// The seed is fixed when the save is created; toggles may change freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomizerState {
    seed: u32,
    categories: CategorySet,
    similar_stats: bool,
}

impl RandomizerState {
    /// New-save state: all categories off, similarity at its compiled default.
    #[must_use]
    pub const fn initialize(seed_source: u32) -> Self {
        Self::initialize_with(seed_source, DEFAULT_SIMILAR_STATS)
    }

    #[must_use]
    pub const fn initialize_with(seed_source: u32, similar_stats: bool) -> Self {
        Self {
            seed: seed_source,
            categories: CategorySet::empty(),
            similar_stats,
        }
    }

    /// Overwrite every toggle. The seed is left untouched.
    pub fn set_flags(
        &mut self,
        wild: bool,
        static_encounters: bool,
        trades: bool,
        similar_stats: bool,
    ) {
        let mut categories = CategorySet::empty();
        for (category, enabled) in [
            (RandomizationCategory::Wild, wild),
            (RandomizationCategory::Static, static_encounters),
            (RandomizationCategory::Trade, trades),
        ] {
            if enabled {
                categories.insert(category);
            }
        }
        self.categories = categories;
        self.similar_stats = similar_stats;
    }

    #[must_use]
    pub const fn is_enabled(&self, category: RandomizationCategory) -> bool {
        self.categories.contains(category)
    }

    #[must_use]
    pub const fn seed(&self) -> u32 {
        self.seed
    }

    #[must_use]
    pub const fn categories(&self) -> CategorySet {
        self.categories
    }

    #[must_use]
    pub const fn similar_stats(&self) -> bool {
        self.similar_stats
    }
}

/// Combine the save seed with two context values. Not cryptographic; it
/// only decorrelates neighbouring locations and slots.
#[must_use]
pub const fn derive_seed(base_seed: u32, location_id: u32, context_id: u32) -> u32 {
    base_seed ^ (location_id << LOCATION_SHIFT) ^ (context_id << CONTEXT_SHIFT)
}

const fn mix(seed: u32) -> u32 {
    seed ^ (seed >> MIX_SHIFT_LOW) ^ (seed >> MIX_SHIFT_HIGH)
}

/// Valid species ids `1..count`; id `0` is never drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeciesUniverse {
    count: u16,
}

impl SpeciesUniverse {
    /// # Errors
    ///
    /// Returns an error when `count` leaves no drawable id besides `0`.
    pub fn new(count: u16) -> Result<Self, ConfigError> {
        if count <= 1 {
            return Err(ConfigError::UniverseTooSmall { count });
        }
        Ok(Self { count })
    }

    #[must_use]
    pub const fn count(&self) -> u16 {
        self.count
    }

    #[must_use]
    pub fn draw(&self, mixed: u32) -> SpeciesId {
        let span = u32::from(self.count - 1);
        let drawn = mixed % span + 1;
        // drawn <= count - 1, which always fits
        SpeciesId::try_from(drawn).unwrap_or(1)
    }

    #[must_use]
    pub const fn contains(&self, species: SpeciesId) -> bool {
        species != 0 && species < self.count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubstitutionEngine {
    universe: SpeciesUniverse,
    similar_stats_default: bool,
    similarity_threshold: u16,
    comparison: SimilarityComparison,
}

impl SubstitutionEngine {
    /// # Errors
    ///
    /// Returns an error when the configured species universe is too small.
    pub fn new(cfg: &RandomizerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            universe: SpeciesUniverse::new(cfg.species_count)?,
            similar_stats_default: cfg.similar_stats_default,
            similarity_threshold: cfg.similarity_threshold,
            comparison: cfg.comparison,
        })
    }

    #[must_use]
    pub const fn universe(&self) -> SpeciesUniverse {
        self.universe
    }

    #[must_use]
    pub const fn similarity_threshold(&self) -> u16 {
        self.similarity_threshold
    }

    /// New-save state using this engine's configured similarity default.
    #[must_use]
    pub const fn initialize_state(&self, seed_source: u32) -> RandomizerState {
        RandomizerState::initialize_with(seed_source, self.similar_stats_default)
    }

    /// Replacement for `original` in `category`, or `original` itself when
    /// the category is disabled.
    ///
    /// When similarity refinement is on and the compared reference stats
    /// differ by more than the threshold, the draw is redone once from a
    /// perturbed value. The second draw is kept whatever its stats.
    #[must_use]
    pub fn substitute<R>(
        &self,
        state: &RandomizerState,
        stats: &R,
        original: SpeciesId,
        category: RandomizationCategory,
        context_a: u32,
        context_b: u32,
    ) -> SpeciesId
    where
        R: ReferenceStats + ?Sized,
    {
        if !state.is_enabled(category) {
            return original;
        }

        let seed = derive_seed(state.seed(), context_a, context_b);
        let mut mixed = mix(seed);
        let mut candidate = self.universe.draw(mixed);

        if state.similar_stats() && self.too_different(stats, original, candidate) {
            mixed ^= REFINE_XOR;
            let redrawn = self.universe.draw(mixed);
            log::debug!(
                "{} substitution for {original} redrawn: {candidate} -> {redrawn}",
                category.key()
            );
            candidate = redrawn;
        }

        log::trace!(
            "{} substitution {original} -> {candidate} (context {context_a}/{context_b})",
            category.key()
        );
        candidate
    }

    #[must_use]
    pub fn wild_species<R>(
        &self,
        state: &RandomizerState,
        stats: &R,
        original: SpeciesId,
        location_id: u32,
        encounter_type: u8,
    ) -> SpeciesId
    where
        R: ReferenceStats + ?Sized,
    {
        self.substitute(
            state,
            stats,
            original,
            RandomizationCategory::Wild,
            location_id,
            u32::from(encounter_type),
        )
    }

    #[must_use]
    pub fn static_species<R>(
        &self,
        state: &RandomizerState,
        stats: &R,
        original: SpeciesId,
        map_id: u32,
        object_id: u32,
    ) -> SpeciesId
    where
        R: ReferenceStats + ?Sized,
    {
        self.substitute(
            state,
            stats,
            original,
            RandomizationCategory::Static,
            map_id,
            object_id,
        )
    }

    #[must_use]
    pub fn trade_species<R>(
        &self,
        state: &RandomizerState,
        stats: &R,
        original: SpeciesId,
        trade_id: u32,
    ) -> SpeciesId
    where
        R: ReferenceStats + ?Sized,
    {
        self.substitute(
            state,
            stats,
            original,
            RandomizationCategory::Trade,
            trade_id,
            0,
        )
    }

    fn too_different<R>(&self, stats: &R, original: SpeciesId, candidate: SpeciesId) -> bool
    where
        R: ReferenceStats + ?Sized,
    {
        let (before, after) = match self.comparison {
            SimilarityComparison::PartyLead => (StatSubject::PartyLead, StatSubject::PartyLead),
            SimilarityComparison::OriginalVsCandidate => (
                StatSubject::Species(original),
                StatSubject::Species(candidate),
            ),
        };
        let difference = stats
            .reference_stat(before)
            .abs_diff(stats.reference_stat(after));
        difference > self.similarity_threshold
    }
}

impl Default for SubstitutionEngine {
    fn default() -> Self {
        Self {
            universe: SpeciesUniverse {
                count: DEFAULT_SPECIES_COUNT,
            },
            similar_stats_default: DEFAULT_SIMILAR_STATS,
            similarity_threshold: SIMILARITY_THRESHOLD,
            comparison: SimilarityComparison::default(),
        }
    }
}
