//! Feature engineering
//!
//! Joins matchup aggregates back onto plate appearances and produces the
//! labelled table the classifier is trained on.

use crate::features::events::total_bases;
use crate::features::matchup_stats::{MatchupStat, MatchupTable, MISSING_RATE_FILL};
use crate::features::outcome::GameOutcomes;
use crate::features::pitcher_teams::PitcherTeams;
use crate::{GameId, PlateAppearance};
use serde::{Deserialize, Serialize};

/// Column order of the core feature set, shared by trainer and predictor
pub const CORE_FEATURES: [&str; 4] = [
    "batting_average",
    "on_base_percentage",
    "total_bases",
    "is_home",
];

const EXTENDED_FEATURES: [&str; 6] = [
    "batting_average",
    "on_base_percentage",
    "total_bases",
    "is_home",
    "strikeout_rate",
    "home_run_rate",
];

/// Which columns the classifier sees
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureSet {
    /// batting average, on-base percentage, total bases, home flag
    #[default]
    Core,
    /// Core plus strikeout and home run rates
    Extended,
}

impl FeatureSet {
    pub fn names(&self) -> &'static [&'static str] {
        match self {
            FeatureSet::Core => &CORE_FEATURES,
            FeatureSet::Extended => &EXTENDED_FEATURES,
        }
    }

    pub fn dim(&self) -> usize {
        self.names().len()
    }
}

/// Features of one matchup observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub batting_average: f64,
    pub on_base_percentage: f64,
    pub total_bases: f64,
    pub is_home: f64,
    pub strikeout_rate: f64,
    pub home_run_rate: f64,
}

impl FeatureVector {
    fn rates(stat: Option<&MatchupStat>, total_bases: f64, is_home: bool) -> Self {
        let fill = |rate: Option<f64>| rate.unwrap_or(MISSING_RATE_FILL);
        FeatureVector {
            batting_average: fill(stat.and_then(MatchupStat::batting_average)),
            on_base_percentage: fill(stat.and_then(MatchupStat::on_base_percentage)),
            total_bases,
            is_home: if is_home { 1.0 } else { 0.0 },
            strikeout_rate: fill(stat.and_then(MatchupStat::strikeout_rate)),
            home_run_rate: fill(stat.and_then(MatchupStat::home_run_rate)),
        }
    }

    /// Training row: matchup rates plus the total bases of this event
    pub fn for_event(event: &PlateAppearance, stat: Option<&MatchupStat>, is_home: bool) -> Self {
        let bases = total_bases(event.outcome.as_ref()) as f64;
        Self::rates(stat, bases, is_home)
    }

    /// Prediction row: the total bases slot holds the expected total bases of
    /// one at-bat (slugging), since no concrete event exists yet
    pub fn for_matchup(stat: &MatchupStat, is_home: bool) -> Self {
        let bases = stat.slugging().unwrap_or(MISSING_RATE_FILL);
        Self::rates(Some(stat), bases, is_home)
    }

    pub fn to_vec(&self, set: FeatureSet) -> Vec<f64> {
        let mut values = vec![
            self.batting_average,
            self.on_base_percentage,
            self.total_bases,
            self.is_home,
        ];
        if set == FeatureSet::Extended {
            values.push(self.strikeout_rate);
            values.push(self.home_run_rate);
        }
        values
    }
}

/// Labelled feature rows (label: the home team won)
#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub feature_set: FeatureSet,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<bool>,
    pub games: Vec<GameId>,
}

impl FeatureTable {
    pub fn new(feature_set: FeatureSet) -> Self {
        FeatureTable {
            feature_set,
            rows: Vec::new(),
            labels: Vec::new(),
            games: Vec::new(),
        }
    }

    pub fn push(&mut self, features: &FeatureVector, home_won: bool, game: GameId) {
        self.rows.push(features.to_vec(self.feature_set));
        self.labels.push(home_won);
        self.games.push(game);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn feature_names(&self) -> &'static [&'static str] {
        self.feature_set.names()
    }

    /// Rows at the given indices, in that order
    pub fn subset(&self, indices: &[usize]) -> FeatureTable {
        FeatureTable {
            feature_set: self.feature_set,
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            games: indices.iter().map(|&i| self.games[i]).collect(),
        }
    }

    pub fn positive_rate(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        self.labels.iter().filter(|&&l| l).count() as f64 / self.labels.len() as f64
    }
}

/// Counters reported after a build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub events: usize,
    pub rows: usize,
    pub without_outcome: usize,
    pub unlabelled_game: usize,
    pub missing_matchup: usize,
    pub unresolved_pitcher_team: usize,
}

/// Builds feature tables from events
pub struct FeatureEngineer<'a> {
    feature_set: FeatureSet,
    pitcher_teams: &'a PitcherTeams,
}

impl<'a> FeatureEngineer<'a> {
    pub fn new(feature_set: FeatureSet, pitcher_teams: &'a PitcherTeams) -> Self {
        FeatureEngineer {
            feature_set,
            pitcher_teams,
        }
    }

    /// Build the labelled table.
    ///
    /// Rows are the events with a recorded outcome from games with a
    /// determinate winner, in chronological order. Matchup rates are left
    /// joined; an absent or undefined aggregate takes `MISSING_RATE_FILL`.
    pub fn build(
        &self,
        events: &[PlateAppearance],
        matchups: &MatchupTable,
        outcomes: &GameOutcomes,
    ) -> (FeatureTable, BuildSummary) {
        let mut ordered: Vec<&PlateAppearance> = events.iter().collect();
        ordered.sort_by_key(|e| e.order_key());

        let mut table = FeatureTable::new(self.feature_set);
        let mut summary = BuildSummary {
            events: events.len(),
            ..BuildSummary::default()
        };

        for event in ordered {
            if event.outcome.is_none() {
                summary.without_outcome += 1;
                continue;
            }
            let Some(outcome) = outcomes.get(event.game_pk) else {
                summary.unlabelled_game += 1;
                continue;
            };

            let stat = matchups.get(&event.matchup_key());
            if stat.map_or(true, |s| s.at_bats == 0) {
                summary.missing_matchup += 1;
            }

            let is_home = match self.pitcher_teams.is_home(event) {
                Some(is_home) => is_home,
                None => {
                    summary.unresolved_pitcher_team += 1;
                    false
                }
            };

            let features = FeatureVector::for_event(event, stat, is_home);
            table.push(&features, outcome.home_won(), event.game_pk);
        }

        summary.rows = table.len();
        log::debug!(
            "Feature build: {} events -> {} rows ({} without outcome, {} unlabelled, {} filled, {} unresolved teams)",
            summary.events,
            summary.rows,
            summary.without_outcome,
            summary.unlabelled_game,
            summary.missing_matchup,
            summary.unresolved_pitcher_team
        );
        (table, summary)
    }

    /// Aggregate, label and build in one pass over a full event table
    pub fn build_from_events(&self, events: &[PlateAppearance]) -> (FeatureTable, BuildSummary) {
        let matchups = MatchupTable::from_events(events);
        let outcomes = GameOutcomes::from_events(events);
        self.build(events, &matchups, &outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::matchup_stats::tests::make_event;
    use crate::InningHalf;

    fn game_events() -> Vec<PlateAppearance> {
        let mut events = vec![
            make_event(1, 1, 100, 200, Some("double")),
            make_event(2, 1, 100, 200, Some("strikeout")),
            make_event(3, 1, 300, 201, Some("walk")),
            make_event(4, 1, 300, 202, None),
            make_event(5, 1, 300, 202, Some("home_run")),
        ];
        events[0].inning_half = Some(InningHalf::Top);
        events[2].inning_half = Some(InningHalf::Bottom);
        for (i, e) in events.iter_mut().enumerate() {
            e.post_home_score = Some(if i < 2 { 0 } else { 3 });
            e.post_away_score = Some(1);
        }
        events
    }

    #[test]
    fn test_core_feature_order() {
        assert_eq!(
            FeatureSet::Core.names(),
            &["batting_average", "on_base_percentage", "total_bases", "is_home"]
        );
        assert_eq!(FeatureSet::Extended.dim(), 6);
        assert_eq!(&FeatureSet::Extended.names()[..4], FeatureSet::Core.names());
    }

    #[test]
    fn test_build_rows_and_labels() {
        let events = game_events();
        let teams = PitcherTeams::from_events(&events);
        let engineer = FeatureEngineer::new(FeatureSet::Core, &teams);
        let (table, summary) = engineer.build_from_events(&events);

        // The pitch without an outcome is dropped
        assert_eq!(table.len(), 4);
        assert_eq!(summary.without_outcome, 1);
        assert!(table.labels.iter().all(|&l| l));

        // Pitcher 100 vs batter 200: 2 AB, 1 hit
        assert_eq!(table.rows[0], vec![0.5, 0.5, 2.0, 1.0]);
        assert_eq!(table.rows[1], vec![0.5, 0.5, 0.0, 1.0]);
        // Walk-only matchup has no at-bats and takes the fill value
        assert_eq!(table.rows[2], vec![0.0, 0.0, 0.0, 0.0]);
        assert_eq!(summary.missing_matchup, 1);
        // Pitcher 300 resolved to the away team from the bottom half
        assert_eq!(table.rows[3], vec![1.0, 1.0, 4.0, 0.0]);
    }

    #[test]
    fn test_unresolved_pitcher_team_counts_as_away() {
        let mut events = game_events();
        for e in events.iter_mut() {
            e.inning_half = None;
        }
        let teams = PitcherTeams::new();
        let engineer = FeatureEngineer::new(FeatureSet::Core, &teams);
        let (table, summary) = engineer.build_from_events(&events);
        assert_eq!(summary.unresolved_pitcher_team, 4);
        assert!(table.rows.iter().all(|r| r[3] == 0.0));
    }

    #[test]
    fn test_unlabelled_games_are_excluded() {
        let mut events = game_events();
        let mut open_game = make_event(10, 2, 100, 200, Some("single"));
        open_game.post_home_score = Some(2);
        open_game.post_away_score = Some(2);
        events.push(open_game);

        let teams = PitcherTeams::from_events(&events);
        let engineer = FeatureEngineer::new(FeatureSet::Core, &teams);
        let (table, summary) = engineer.build_from_events(&events);
        assert_eq!(table.len(), 4);
        assert_eq!(summary.unlabelled_game, 1);
        assert!(table.games.iter().all(|g| *g == GameId(1)));
    }

    #[test]
    fn test_matchup_vector_uses_slugging() {
        let mut stat = MatchupStat::new();
        stat.at_bats = 4;
        stat.hits = 2;
        stat.walks = 1;
        stat.total_bases = 5;
        stat.strikeouts = 1;
        let features = FeatureVector::for_matchup(&stat, true);
        assert_eq!(
            features.to_vec(FeatureSet::Extended),
            vec![0.5, 0.75, 1.25, 1.0, 0.25, 0.0]
        );
    }

    #[test]
    fn test_subset_keeps_alignment() {
        let events = game_events();
        let teams = PitcherTeams::from_events(&events);
        let (table, _) = FeatureEngineer::new(FeatureSet::Core, &teams).build_from_events(&events);
        let subset = table.subset(&[3, 0]);
        assert_eq!(subset.rows[0], table.rows[3]);
        assert_eq!(subset.rows[1], table.rows[0]);
        assert_eq!(subset.labels.len(), 2);
    }
}
