//! Level-cap increase announcements.
use serde::{Deserialize, Serialize};

use crate::caps::ProgressionCapEngine;
use crate::constants::CAP_TEXT_MAX_DIGITS;
use crate::{CapTextFormatter, FlagStore};

/// Per-session memory of the last level cap seen by the announcement check.
///
/// A fresh tracker holds the zero sentinel, so the first check only records
/// the cap and never announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapTracker {
    last_announced_cap: u32,
}

impl CapTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_announced_cap: 0,
        }
    }

    #[must_use]
    pub const fn last_announced_cap(&self) -> u32 {
        self.last_announced_cap
    }

    /// Compare the current cap against the last one seen and return the
    /// announcement text on a rising edge. The tracker always advances to
    /// the current cap, including when it drops.
    pub fn check_level_cap_increase<S, F>(
        &mut self,
        engine: &ProgressionCapEngine,
        store: &S,
        formatter: &F,
    ) -> Option<String>
    where
        S: FlagStore + ?Sized,
        F: CapTextFormatter + ?Sized,
    {
        let current = engine.current_level_cap(store);
        let previous = std::mem::replace(&mut self.last_announced_cap, current);

        if previous > 0 && current > previous {
            log::info!("level cap raised from {previous} to {current}");
            Some(formatter.level_cap_increased(current))
        } else {
            None
        }
    }
}

/// Stock English announcement text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCapText;

impl CapTextFormatter for DefaultCapText {
    fn level_cap_increased(&self, cap: u32) -> String {
        let digits = cap.to_string();
        let start = digits.len().saturating_sub(CAP_TEXT_MAX_DIGITS);
        format!("The level cap has increased to {}!", &digits[start..])
    }
}
