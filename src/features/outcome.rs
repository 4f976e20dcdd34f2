//! Game outcome labelling
//!
//! The winner of each game comes from the post-event scores of its last event,
//! where "last" follows (game date, game id, at-bat number, pitch number, row id).

use crate::{GameId, PlateAppearance};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    Home,
    Away,
}

/// Final result of a completed game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub game_pk: GameId,
    pub game_date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub winner: Winner,
}

impl GameOutcome {
    pub fn home_won(&self) -> bool {
        self.winner == Winner::Home
    }

    pub fn winning_team(&self) -> &str {
        match self.winner {
            Winner::Home => &self.home_team,
            Winner::Away => &self.away_team,
        }
    }

    pub fn losing_team(&self) -> &str {
        match self.winner {
            Winner::Home => &self.away_team,
            Winner::Away => &self.home_team,
        }
    }

    /// Outcome from a game's terminal event, if that event carries a decisive score
    fn from_last_event(event: &PlateAppearance) -> Option<Self> {
        let (home_score, away_score) = (event.post_home_score?, event.post_away_score?);
        let winner = match home_score.cmp(&away_score) {
            std::cmp::Ordering::Greater => Winner::Home,
            std::cmp::Ordering::Less => Winner::Away,
            std::cmp::Ordering::Equal => return None,
        };
        Some(GameOutcome {
            game_pk: event.game_pk,
            game_date: event.game_date,
            home_team: event.home_team.clone(),
            away_team: event.away_team.clone(),
            home_score,
            away_score,
            winner,
        })
    }
}

/// Labels for every game in an event table
#[derive(Debug, Clone, Default)]
pub struct GameOutcomes {
    outcomes: BTreeMap<GameId, GameOutcome>,
    indeterminate: BTreeSet<GameId>,
}

impl GameOutcomes {
    /// Label every game. Input order does not matter; games whose last event
    /// has no decisive score are recorded as indeterminate and get no label.
    pub fn from_events(events: &[PlateAppearance]) -> Self {
        let mut last_events: BTreeMap<GameId, &PlateAppearance> = BTreeMap::new();
        for event in events {
            last_events
                .entry(event.game_pk)
                .and_modify(|current| {
                    if event.order_key() > current.order_key() {
                        *current = event;
                    }
                })
                .or_insert(event);
        }

        let mut labelled = GameOutcomes::default();
        for (game_pk, event) in last_events {
            match GameOutcome::from_last_event(event) {
                Some(outcome) => {
                    labelled.outcomes.insert(game_pk, outcome);
                }
                None => {
                    log::debug!("{} has no terminal score, excluding it", game_pk);
                    labelled.indeterminate.insert(game_pk);
                }
            }
        }
        labelled
    }

    pub fn get(&self, game_pk: GameId) -> Option<&GameOutcome> {
        self.outcomes.get(&game_pk)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameOutcome> {
        self.outcomes.values()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn indeterminate(&self) -> &BTreeSet<GameId> {
        &self.indeterminate
    }

    /// Share of labelled games won by the home team
    pub fn home_win_rate(&self) -> Option<f64> {
        if self.outcomes.is_empty() {
            return None;
        }
        let home_wins = self.outcomes.values().filter(|o| o.home_won()).count();
        Some(home_wins as f64 / self.outcomes.len() as f64)
    }
}
