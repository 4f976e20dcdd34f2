//! Feature extraction
//!
//! Turns raw plate appearances into matchup aggregates, game labels and
//! model-ready feature rows.

pub mod engineer;
pub mod events;
pub mod matchup_stats;
pub mod outcome;
pub mod pitcher_teams;

pub use engineer::{FeatureEngineer, FeatureSet, FeatureTable, FeatureVector};
pub use events::{EventFacets, EventOutcome};
pub use matchup_stats::{MatchupStat, MatchupTable, MISSING_RATE_FILL};
pub use outcome::{GameOutcome, GameOutcomes, Winner};
pub use pitcher_teams::PitcherTeams;
