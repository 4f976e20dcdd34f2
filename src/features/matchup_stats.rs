//! Matchup statistics
//!
//! Per (pitcher, batter) aggregates recomputed from the event table on every run.

use crate::features::events::{total_bases, EventFacets};
use crate::{MatchupKey, PlateAppearance};
use std::collections::HashMap;

/// Value used in place of an undefined rate (zero at-bats).
///
/// Applied by the feature engineer at training time and by the predictor at
/// inference time; both sides must agree or the model is uncalibrated.
pub const MISSING_RATE_FILL: f64 = 0.0;

/// Aggregate history of one pitcher against one batter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchupStat {
    /// Rows with any recorded outcome
    pub plate_appearances: u32,
    /// Rows whose outcome counts as an at-bat
    pub at_bats: u32,
    pub hits: u32,
    pub walks: u32,
    pub strikeouts: u32,
    pub home_runs: u32,
    pub total_bases: u32,
}

impl MatchupStat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the aggregate
    pub fn update(&mut self, event: &PlateAppearance) {
        let Some(outcome) = event.outcome.as_ref() else {
            return;
        };
        let facets = EventFacets::classify(Some(outcome));

        self.plate_appearances += 1;
        self.at_bats += facets.is_at_bat as u32;
        self.hits += facets.is_hit as u32;
        self.walks += facets.is_walk as u32;
        self.strikeouts += facets.is_strikeout as u32;
        self.home_runs += facets.is_home_run as u32;
        self.total_bases += total_bases(Some(outcome));
    }

    fn per_at_bat(&self, count: u32) -> Option<f64> {
        if self.at_bats == 0 {
            None
        } else {
            Some(count as f64 / self.at_bats as f64)
        }
    }

    /// Hits per at-bat; None when there are no at-bats
    pub fn batting_average(&self) -> Option<f64> {
        self.per_at_bat(self.hits)
    }

    /// (hits + walks) per at-bat; None when there are no at-bats
    pub fn on_base_percentage(&self) -> Option<f64> {
        self.per_at_bat(self.hits + self.walks)
    }

    /// Total bases per at-bat (expected total bases of one at-bat)
    pub fn slugging(&self) -> Option<f64> {
        self.per_at_bat(self.total_bases)
    }

    pub fn strikeout_rate(&self) -> Option<f64> {
        self.per_at_bat(self.strikeouts)
    }

    pub fn home_run_rate(&self) -> Option<f64> {
        self.per_at_bat(self.home_runs)
    }
}

/// Matchup statistics for every observed pair
#[derive(Debug, Clone, Default)]
pub struct MatchupTable {
    stats: HashMap<MatchupKey, MatchupStat>,
}

impl MatchupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate a full event table (or a slice of it)
    pub fn from_events(events: &[PlateAppearance]) -> Self {
        let mut table = Self::new();
        table.process_events(events);
        table
    }

    /// Add events to the aggregate. Every observed pair gets an entry, even
    /// when none of its rows carries an outcome.
    pub fn process_events(&mut self, events: &[PlateAppearance]) {
        for event in events {
            self.stats
                .entry(event.matchup_key())
                .or_default()
                .update(event);
        }
    }

    pub fn get(&self, key: &MatchupKey) -> Option<&MatchupStat> {
        self.stats.get(key)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MatchupKey, &MatchupStat)> {
        self.stats.iter()
    }

    /// Pairs whose rates are undefined (no at-bats)
    pub fn undefined_count(&self) -> usize {
        self.stats.values().filter(|s| s.at_bats == 0).count()
    }
}
