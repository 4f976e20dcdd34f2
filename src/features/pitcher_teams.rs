//! Pitcher to team resolution
//!
//! `is_home` needs the pitcher's team, which the event table only implies: in
//! the top of an inning the home team is in the field. Season rosters cover
//! events recorded without an inning half.

use crate::data::{RosterEntry, TeamDirectory};
use crate::{GameId, PlateAppearance, PlayerId};
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

type OrderKey = (NaiveDate, GameId, u32, u32, i64);

#[derive(Debug, Clone, Default)]
pub struct PitcherTeams {
    /// Team of each pitcher in each game, taken from the inning half
    by_game: HashMap<(GameId, PlayerId), String>,
    /// Team of each player per season
    rosters: HashMap<(PlayerId, i32), String>,
    /// Both sides of the home comparison go through this directory, so
    /// statcast spellings (CWS, AZ) match roster abbreviations (CHW, ARI)
    teams: TeamDirectory,
}

impl PitcherTeams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn pitcher teams from the inning half of each event. When a
    /// pitcher's rows disagree, the chronologically first row wins.
    pub fn from_events(events: &[PlateAppearance]) -> Self {
        let mut earliest: HashMap<(GameId, PlayerId), (OrderKey, &str)> = HashMap::new();
        for event in events {
            let Some(team) = event.fielding_team() else {
                continue;
            };
            let order = event.order_key();
            earliest
                .entry((event.game_pk, event.pitcher))
                .and_modify(|seen| {
                    if order < seen.0 {
                        *seen = (order, team);
                    }
                })
                .or_insert((order, team));
        }

        let mut lookup = Self::new();
        lookup.by_game = earliest
            .into_iter()
            .map(|(key, (_, team))| (key, team.to_string()))
            .collect();
        lookup
    }

    /// Replace the directory used to compare team spellings
    pub fn with_directory(mut self, teams: TeamDirectory) -> Self {
        self.teams = teams;
        self
    }

    /// Add season rosters as a fallback source
    pub fn with_rosters(mut self, entries: &[RosterEntry]) -> Self {
        for entry in entries {
            self.rosters
                .insert((entry.player, entry.season), entry.team.clone());
        }
        self
    }

    /// Team the pitcher of this event played for
    pub fn team_for(&self, event: &PlateAppearance) -> Option<&str> {
        self.by_game
            .get(&(event.game_pk, event.pitcher))
            .or_else(|| {
                self.rosters
                    .get(&(event.pitcher, event.game_date.year()))
            })
            .map(String::as_str)
    }

    /// Whether the event's pitcher belongs to the recorded home team.
    /// None when the pitcher's team cannot be resolved.
    pub fn is_home(&self, event: &PlateAppearance) -> Option<bool> {
        self.team_for(event)
            .map(|team| self.teams.normalize(team) == self.teams.normalize(&event.home_team))
    }

    pub fn len(&self) -> usize {
        self.by_game.len() + self.rosters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_game.is_empty() && self.rosters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::matchup_stats::tests::make_event;
    use crate::InningHalf;

    #[test]
    fn test_inning_half_resolves_team() {
        let mut top = make_event(1, 1, 100, 200, Some("single"));
        top.inning_half = Some(InningHalf::Top);
        let mut bottom = make_event(2, 1, 101, 201, Some("single"));
        bottom.inning_half = Some(InningHalf::Bottom);

        let lookup = PitcherTeams::from_events(&[top.clone(), bottom.clone()]);
        assert_eq!(lookup.team_for(&top), Some("NYY"));
        assert_eq!(lookup.is_home(&top), Some(true));
        assert_eq!(lookup.is_home(&bottom), Some(false));
    }

    #[test]
    fn test_pitch_without_half_uses_same_game_entry() {
        let mut top = make_event(1, 1, 100, 200, Some("single"));
        top.inning_half = Some(InningHalf::Top);
        let later = make_event(2, 1, 100, 201, Some("walk"));

        let lookup = PitcherTeams::from_events(&[top]);
        assert_eq!(lookup.is_home(&later), Some(true));
    }

    #[test]
    fn test_roster_fallback_by_season() {
        let event = make_event(1, 9, 300, 200, Some("field_out"));
        let rosters = vec![
            RosterEntry {
                player: PlayerId(300),
                season: 2022,
                team: "NYY".to_string(),
            },
            RosterEntry {
                player: PlayerId(300),
                season: 2023,
                team: "BOS".to_string(),
            },
        ];
        let lookup = PitcherTeams::new().with_rosters(&rosters);
        assert_eq!(lookup.team_for(&event), Some("BOS"));
        assert_eq!(lookup.is_home(&event), Some(false));
    }

    #[test]
    fn test_roster_abbreviation_matches_statcast_alias() {
        let mut event = make_event(1, 9, 300, 200, Some("field_out"));
        event.home_team = "CWS".to_string();
        event.away_team = "AZ".to_string();
        let csv = "player_id,season,team\n300,2023,Chicago White Sox\n301,2023,Arizona Diamondbacks\n";
        let rosters = crate::data::import::read_roster_csv(csv.as_bytes(), &TeamDirectory::default()).unwrap();
        let lookup = PitcherTeams::new().with_rosters(&rosters);

        assert_eq!(lookup.team_for(&event), Some("CHW"));
        assert_eq!(lookup.is_home(&event), Some(true));

        event.pitcher = PlayerId(301);
        assert_eq!(lookup.team_for(&event), Some("ARI"));
        assert_eq!(lookup.is_home(&event), Some(false));
    }

    #[test]
    fn test_conflicting_halves_resolve_to_earliest_row() {
        let mut first = make_event(1, 1, 100, 200, Some("single"));
        first.inning_half = Some(InningHalf::Top);
        first.at_bat_number = Some(3);
        let mut later = make_event(2, 1, 100, 201, Some("walk"));
        later.inning_half = Some(InningHalf::Bottom);
        later.at_bat_number = Some(40);

        let forward = PitcherTeams::from_events(&[first.clone(), later.clone()]);
        let reversed = PitcherTeams::from_events(&[later.clone(), first.clone()]);
        assert_eq!(forward.team_for(&later), Some("NYY"));
        assert_eq!(reversed.team_for(&later), Some("NYY"));
    }

    #[test]
    fn test_unknown_pitcher_is_unresolved() {
        let event = make_event(1, 1, 100, 200, Some("single"));
        assert_eq!(PitcherTeams::new().is_home(&event), None);
    }
}
