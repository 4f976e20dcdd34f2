//! Baseball matchup prediction
//!
//! Aggregates pitch-tracked plate appearances into pitcher/batter matchup
//! statistics, trains a random forest to predict home wins, and turns lineups
//! into game-level win probabilities.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use features::events::EventOutcome;
pub use features::FeatureSet;

/// MLBAM player identifier (pitchers and batters share the id space)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Game identifier (`game_pk`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameId(pub i64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Game({})", self.0)
    }
}

/// A (pitcher, batter) pairing, the unit of historical aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchupKey {
    pub pitcher: PlayerId,
    pub batter: PlayerId,
}

impl MatchupKey {
    pub fn new(pitcher: PlayerId, batter: PlayerId) -> Self {
        MatchupKey { pitcher, batter }
    }
}

impl fmt::Display for MatchupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{} vs B{}", self.pitcher, self.batter)
    }
}

/// Half of the inning a pitch was thrown in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InningHalf {
    /// Away team bats, home team pitches
    Top,
    /// Home team bats, away team pitches
    Bottom,
}

impl InningHalf {
    pub fn code(&self) -> &'static str {
        match self {
            InningHalf::Top => "Top",
            InningHalf::Bottom => "Bot",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "top" | "t" => Some(InningHalf::Top),
            "bot" | "bottom" | "b" => Some(InningHalf::Bottom),
            _ => None,
        }
    }
}

/// One pitch-tracked record from the historical event table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateAppearance {
    /// Insertion order in the source table, used as the final ordering tie-break
    pub row_id: i64,
    pub game_pk: GameId,
    pub game_date: NaiveDate,
    pub pitcher: PlayerId,
    pub batter: PlayerId,
    pub home_team: String,
    pub away_team: String,
    /// None for pitches that did not end a plate appearance
    pub outcome: Option<EventOutcome>,
    pub post_home_score: Option<u32>,
    pub post_away_score: Option<u32>,
    pub at_bat_number: Option<u32>,
    pub pitch_number: Option<u32>,
    pub inning_half: Option<InningHalf>,
}

impl PlateAppearance {
    pub fn matchup_key(&self) -> MatchupKey {
        MatchupKey::new(self.pitcher, self.batter)
    }

    /// Team in the field (the pitcher's team), when the inning half is known
    pub fn fielding_team(&self) -> Option<&str> {
        match self.inning_half? {
            InningHalf::Top => Some(&self.home_team),
            InningHalf::Bottom => Some(&self.away_team),
        }
    }

    /// Key that orders events chronologically within the whole table
    pub fn order_key(&self) -> (NaiveDate, GameId, u32, u32, i64) {
        (
            self.game_date,
            self.game_pk,
            self.at_bat_number.unwrap_or(0),
            self.pitch_number.unwrap_or(0),
            self.row_id,
        )
    }
}

/// Whether a prediction was backed by real matchup history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataAvailability {
    /// Predicted from observed history with the given number of at-bats
    Historical { at_bats: u32 },
    /// No recorded plate appearance for the pairing. An unseen pairing gets
    /// the neutral default; pitch-only rows are predicted on the fill values.
    Defaulted,
}

impl DataAvailability {
    pub fn has_history(&self) -> bool {
        matches!(self, DataAvailability::Historical { .. })
    }
}

impl fmt::Display for DataAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataAvailability::Historical { at_bats } => write!(f, "history ({} AB)", at_bats),
            DataAvailability::Defaulted => write!(f, "no history"),
        }
    }
}

/// Prediction for a single pitcher/batter matchup
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchupPrediction {
    pub key: MatchupKey,
    pub is_home: bool,
    /// Positive-class (home win) probability
    pub probability: f64,
    pub availability: DataAvailability,
}

impl MatchupPrediction {
    /// Binary class label at the 0.5 threshold
    pub fn predicted_home_win(&self) -> bool {
        self.probability > 0.5
    }
}

/// Prediction for a whole game from two lineups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamePrediction {
    pub home_win_prob: f64,
    pub matchups: Vec<MatchupPrediction>,
    pub confidence: ConfidenceLevel,
}

impl GamePrediction {
    pub fn predicted_home_win(&self) -> bool {
        self.home_win_prob >= 0.5
    }

    /// Number of matchups that had real history behind them
    pub fn with_history(&self) -> usize {
        self.matchups
            .iter()
            .filter(|m| m.availability.has_history())
            .count()
    }
}

/// Confidence level based on how many matchups had history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,   // At least three quarters of matchups have history
    Medium, // At least half
    Low,
}

impl ConfidenceLevel {
    pub fn from_coverage(with_history: usize, total: usize) -> Self {
        if total == 0 {
            return ConfidenceLevel::Low;
        }
        if with_history * 4 >= total * 3 {
            ConfidenceLevel::High
        } else if with_history * 2 >= total {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::High => write!(f, "High"),
            ConfidenceLevel::Medium => write!(f, "Medium"),
            ConfidenceLevel::Low => write!(f, "Low"),
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum MatchupError {
    #[error("Table {table} is missing required column(s): {}", .missing.join(", "))]
    Schema { table: String, missing: Vec<String> },

    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Model artifact mismatch: {0}")]
    ArtifactMismatch(String),

    #[error("No trained model at {0} - run `matchup train` first")]
    NoModel(String),

    #[error("Invalid lineup: {0}")]
    InvalidLineup(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, MatchupError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub training: TrainingConfig,
    pub forest: ForestConfig,
    pub search: SearchConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Share of feature rows held out for evaluation
    pub test_fraction: f64,
    pub seed: u64,
    pub feature_set: FeatureSet,
    /// Run the cross-validated grid search instead of a single fit
    pub search: bool,
}

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    /// None grows trees until leaves are pure
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split; None means sqrt of the feature count
    pub max_features: Option<usize>,
}

/// Grid for the cross-validated hyperparameter search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub n_trees: Vec<usize>,
    /// 0 disables the depth limit
    pub max_depths: Vec<usize>,
    pub min_samples_splits: Vec<usize>,
    pub folds: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub table: String,
    pub model_path: String,
    /// Optional team directory override (TOML)
    pub teams_path: Option<String>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        ForestConfig {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            n_trees: vec![100, 200, 300],
            max_depths: vec![0, 10, 20, 30],
            min_samples_splits: vec![2, 5, 10],
            folds: 3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            training: TrainingConfig {
                test_fraction: 0.2,
                seed: 42,
                feature_set: FeatureSet::Core,
                search: false,
            },
            forest: ForestConfig::default(),
            search: SearchConfig::default(),
            data: DataConfig {
                database_path: "data/baseball_data.db".to_string(),
                table: "statcast_data".to_string(),
                model_path: "model/matchup_forest.json".to_string(),
                teams_path: None,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MatchupError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| MatchupError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MatchupError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrip_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.forest, config.forest);
        assert_eq!(parsed.training.seed, 42);
        assert_eq!(parsed.training.feature_set, FeatureSet::Core);
        assert!(parsed.data.teams_path.is_none());
    }

    #[test]
    fn test_schema_error_names_columns() {
        let err = MatchupError::Schema {
            table: "statcast_data".to_string(),
            missing: vec!["events".to_string(), "batter".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Table statcast_data is missing required column(s): events, batter"
        );
    }

    #[test]
    fn test_confidence_from_coverage() {
        assert_eq!(ConfidenceLevel::from_coverage(9, 12), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_coverage(6, 12), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_coverage(1, 12), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_coverage(0, 0), ConfidenceLevel::Low);
    }

    #[test]
    fn test_fielding_team_from_inning_half() {
        let mut event = PlateAppearance {
            row_id: 1,
            game_pk: GameId(1),
            game_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            pitcher: PlayerId(10),
            batter: PlayerId(20),
            home_team: "NYY".to_string(),
            away_team: "BOS".to_string(),
            outcome: None,
            post_home_score: None,
            post_away_score: None,
            at_bat_number: None,
            pitch_number: None,
            inning_half: Some(InningHalf::Top),
        };
        assert_eq!(event.fielding_team(), Some("NYY"));
        event.inning_half = Some(InningHalf::Bottom);
        assert_eq!(event.fielding_team(), Some("BOS"));
        event.inning_half = None;
        assert_eq!(event.fielding_team(), None);
    }
}
