//! Game lineups
//!
//! A lineup lists the starting pitcher first, then the batters. Lineups come
//! from a [`LineupSource`]; when a source cannot deliver, callers treat the
//! game as having empty lineups and predict the neutral 0.5.

use crate::{GameId, MatchupError, PlayerId, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One team's lineup for a game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineup {
    pub pitcher: Option<PlayerId>,
    pub batters: Vec<PlayerId>,
}

impl Lineup {
    pub fn new(pitcher: PlayerId, batters: Vec<PlayerId>) -> Self {
        Lineup {
            pitcher: Some(pitcher),
            batters,
        }
    }

    /// Build from raw ids with the pitcher in first position
    pub fn from_ids(ids: &[i64]) -> Result<Self> {
        if let Some(bad) = ids.iter().find(|id| **id <= 0) {
            return Err(MatchupError::InvalidLineup(format!(
                "player id must be positive, got {}",
                bad
            )));
        }
        Ok(match ids.split_first() {
            Some((pitcher, batters)) => Lineup {
                pitcher: Some(PlayerId(*pitcher)),
                batters: batters.iter().map(|id| PlayerId(*id)).collect(),
            },
            None => Lineup::default(),
        })
    }

    /// A lineup without a pitcher or without batters yields no matchups
    pub fn is_empty(&self) -> bool {
        self.pitcher.is_none() || self.batters.is_empty()
    }
}

/// Both lineups of one game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLineups {
    pub game_pk: Option<GameId>,
    pub home_team: String,
    pub away_team: String,
    pub home: Lineup,
    pub away: Lineup,
}

impl GameLineups {
    pub fn label(&self) -> String {
        match self.game_pk {
            Some(game) => format!("{} @ {} ({})", self.away_team, self.home_team, game),
            None => format!("{} @ {}", self.away_team, self.home_team),
        }
    }
}

/// Anything that can deliver the lineups of upcoming games
pub trait LineupSource {
    fn name(&self) -> String;

    fn fetch(&self) -> Result<Vec<GameLineups>>;

    /// Fetch, treating any failure as "no lineups"
    fn fetch_or_empty(&self) -> Vec<GameLineups> {
        match self.fetch() {
            Ok(games) => games,
            Err(e) => {
                log::warn!("Lineup source {} unavailable: {}", self.name(), e);
                Vec::new()
            }
        }
    }
}

/// Record layout of a lineup file entry
#[derive(Debug, Deserialize)]
struct LineupRecord {
    #[serde(default)]
    game_pk: Option<i64>,
    #[serde(default)]
    home_team: String,
    #[serde(default)]
    away_team: String,
    #[serde(default)]
    home: Vec<i64>,
    #[serde(default)]
    away: Vec<i64>,
}

/// JSON array of `{game_pk, home_team, away_team, home, away}` records,
/// player ids listed pitcher first
pub struct JsonLineupFile {
    path: PathBuf,
}

impl JsonLineupFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonLineupFile {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn parse(content: &str) -> Result<Vec<GameLineups>> {
        let records: Vec<LineupRecord> = serde_json::from_str(content)?;
        records
            .into_iter()
            .map(|record| {
                Ok(GameLineups {
                    game_pk: record.game_pk.map(GameId),
                    home_team: record.home_team,
                    away_team: record.away_team,
                    home: Lineup::from_ids(&record.home)?,
                    away: Lineup::from_ids(&record.away)?,
                })
            })
            .collect()
    }
}

impl LineupSource for JsonLineupFile {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Vec<GameLineups>> {
        let content = std::fs::read_to_string(&self.path)?;
        Self::parse(&content)
    }
}

/// Lineups given directly, e.g. on the command line
pub struct StaticLineups {
    games: Vec<GameLineups>,
}

impl StaticLineups {
    pub fn new(games: Vec<GameLineups>) -> Self {
        StaticLineups { games }
    }

    pub fn single(home: Lineup, away: Lineup) -> Self {
        Self::new(vec![GameLineups {
            game_pk: None,
            home_team: "Home".to_string(),
            away_team: "Away".to_string(),
            home,
            away,
        }])
    }
}

impl LineupSource for StaticLineups {
    fn name(&self) -> String {
        "static".to_string()
    }

    fn fetch(&self) -> Result<Vec<GameLineups>> {
        Ok(self.games.clone())
    }
}
