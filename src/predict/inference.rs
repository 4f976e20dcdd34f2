//! Model inference for matchup and game predictions

use std::sync::Arc;

use rayon::prelude::*;

use crate::data::{GameLineups, Lineup, LineupSource, TeamDirectory};
use crate::features::{FeatureVector, MatchupTable};
use crate::model::ModelArtifact;
use crate::{
    ConfidenceLevel, DataAvailability, GamePrediction, MatchupKey, MatchupPrediction,
    PlateAppearance, PlayerId, Result,
};

/// Probability returned when there is nothing to predict from
pub const NEUTRAL_PROBABILITY: f64 = 0.5;

/// Predictor for making matchup and game predictions
///
/// Holds the model and an immutable matchup snapshot; both are shared so a
/// predictor is cheap to clone across threads.
#[derive(Clone)]
pub struct Predictor {
    artifact: Arc<ModelArtifact>,
    matchups: Arc<MatchupTable>,
}

impl Predictor {
    pub fn new(artifact: Arc<ModelArtifact>, matchups: Arc<MatchupTable>) -> Self {
        Predictor { artifact, matchups }
    }

    /// Snapshot matchup history from the full event table
    pub fn from_events(artifact: ModelArtifact, events: &[PlateAppearance]) -> Self {
        let matchups = MatchupTable::from_events(events);
        log::debug!("Matchup snapshot: {} pairs", matchups.len());
        Self::new(Arc::new(artifact), Arc::new(matchups))
    }

    /// Home-win probability for one pitcher/batter pairing.
    ///
    /// A pairing never seen in the event table gets exactly 0.5.
    pub fn predict_matchup(
        &self,
        pitcher: PlayerId,
        batter: PlayerId,
        is_home: bool,
    ) -> Result<MatchupPrediction> {
        let key = MatchupKey::new(pitcher, batter);
        let Some(stat) = self.matchups.get(&key) else {
            return Ok(MatchupPrediction {
                key,
                is_home,
                probability: NEUTRAL_PROBABILITY,
                availability: DataAvailability::Defaulted,
            });
        };

        let features = FeatureVector::for_matchup(stat, is_home).to_vec(self.artifact.feature_set);
        let probability = self.artifact.positive_probability(&features)?;
        // pitch rows without any outcome still go through the model on the
        // fill values, but they are not history
        let availability = if stat.plate_appearances == 0 {
            DataAvailability::Defaulted
        } else {
            DataAvailability::Historical {
                at_bats: stat.at_bats,
            }
        };
        Ok(MatchupPrediction {
            key,
            is_home,
            probability,
            availability,
        })
    }

    /// Home-win probability from two lineups.
    ///
    /// Each away batter faces the home pitcher and contributes one minus its
    /// matchup probability; each home batter faces the away pitcher and
    /// contributes its probability. The result is the unweighted mean, or 0.5
    /// when neither lineup yields a matchup.
    pub fn predict_game(&self, home: &Lineup, away: &Lineup) -> Result<GamePrediction> {
        let mut pairs: Vec<(PlayerId, PlayerId, bool)> = Vec::new();
        if let Some(home_pitcher) = home.pitcher {
            pairs.extend(away.batters.iter().map(|&b| (home_pitcher, b, true)));
        }
        if let Some(away_pitcher) = away.pitcher {
            pairs.extend(home.batters.iter().map(|&b| (away_pitcher, b, false)));
        }

        let matchups = pairs
            .par_iter()
            .map(|&(pitcher, batter, is_home)| self.predict_matchup(pitcher, batter, is_home))
            .collect::<Result<Vec<_>>>()?;

        let home_win_prob = if matchups.is_empty() {
            NEUTRAL_PROBABILITY
        } else {
            matchups
                .iter()
                .map(|m| if m.is_home { 1.0 - m.probability } else { m.probability })
                .sum::<f64>()
                / matchups.len() as f64
        };

        let with_history = matchups.iter().filter(|m| m.availability.has_history()).count();
        Ok(GamePrediction {
            home_win_prob,
            confidence: ConfidenceLevel::from_coverage(with_history, matchups.len()),
            matchups,
        })
    }

    /// Predict every game a lineup source delivers. A source that fails
    /// yields no games.
    pub fn predict_games(&self, source: &dyn LineupSource) -> Vec<(GameLineups, Result<GamePrediction>)> {
        source
            .fetch_or_empty()
            .into_iter()
            .map(|game| {
                let prediction = self.predict_game(&game.home, &game.away);
                (game, prediction)
            })
            .collect()
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn matchups(&self) -> &MatchupTable {
        &self.matchups
    }
}

/// Format a matchup prediction for display
pub fn format_matchup(pred: &MatchupPrediction) -> String {
    format!(
        r#"
┌─────────────────────────────────────────────────┐
│  Pitcher {} vs Batter {}
├─────────────────────────────────────────────────┤
│  Pitcher's team:   {}
│  Home win prob:    {:.1}%
│  Data:             {}
└─────────────────────────────────────────────────┘
"#,
        pred.key.pitcher,
        pred.key.batter,
        if pred.is_home { "home" } else { "away" },
        pred.probability * 100.0,
        pred.availability
    )
}

/// Format a game prediction for display; team abbreviations are expanded
/// through the directory when known
pub fn format_prediction(
    pred: &GamePrediction,
    game: &GameLineups,
    teams: &TeamDirectory,
) -> String {
    let home_name = teams.name(&game.home_team).unwrap_or(game.home_team.as_str());
    let away_name = teams.name(&game.away_team).unwrap_or(game.away_team.as_str());
    let winner = if pred.predicted_home_win() {
        home_name
    } else {
        away_name
    };
    let win_prob = if pred.predicted_home_win() {
        pred.home_win_prob
    } else {
        1.0 - pred.home_win_prob
    };

    format!(
        r#"
┌─────────────────────────────────────────────────┐
│  {} vs {}
├─────────────────────────────────────────────────┤
│  Win probability:  {} {:.1}%
│  Matchups:         {} ({} with history)
│  Confidence:       {}
└─────────────────────────────────────────────────┘
"#,
        home_name,
        away_name,
        winner,
        win_prob * 100.0,
        pred.matchups.len(),
        pred.with_history(),
        pred.confidence
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::matchup_stats::tests::make_event;
    use crate::features::FeatureSet;
    use crate::model::artifact::tests::fitted_artifact;

    fn predictor() -> Predictor {
        let events = vec![
            make_event(1, 1, 100, 200, Some("single")),
            make_event(2, 1, 100, 200, Some("home_run")),
            make_event(3, 1, 100, 201, Some("strikeout")),
            make_event(4, 1, 101, 200, Some("walk")),
            make_event(5, 1, 101, 202, None),
        ];
        Predictor::from_events(fitted_artifact(FeatureSet::Core), &events)
    }

    #[test]
    fn test_unseen_matchup_is_neutral() {
        let pred = predictor()
            .predict_matchup(PlayerId(999), PlayerId(888), true)
            .unwrap();
        assert_eq!(pred.probability, 0.5);
        assert_eq!(pred.availability, DataAvailability::Defaulted);
    }

    #[test]
    fn test_seen_matchup_uses_model() {
        let predictor = predictor();
        let pred = predictor
            .predict_matchup(PlayerId(100), PlayerId(200), true)
            .unwrap();
        assert_eq!(pred.availability, DataAvailability::Historical { at_bats: 2 });

        let stat = predictor
            .matchups()
            .get(&MatchupKey::new(PlayerId(100), PlayerId(200)))
            .unwrap();
        let expected = predictor
            .artifact()
            .positive_probability(&FeatureVector::for_matchup(stat, true).to_vec(FeatureSet::Core))
            .unwrap();
        assert_eq!(pred.probability, expected);
    }

    #[test]
    fn test_zero_at_bat_pair_is_still_predicted() {
        let predictor = predictor();
        let walk_only = predictor
            .predict_matchup(PlayerId(101), PlayerId(200), false)
            .unwrap();
        assert_eq!(walk_only.availability, DataAvailability::Historical { at_bats: 0 });

        let expected = predictor
            .artifact()
            .positive_probability(&[0.0, 0.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(walk_only.probability, expected);
    }

    #[test]
    fn test_pair_without_outcomes_is_not_history() {
        let predictor = predictor();
        let pitch_only = predictor
            .predict_matchup(PlayerId(101), PlayerId(202), true)
            .unwrap();
        assert_eq!(pitch_only.availability, DataAvailability::Defaulted);

        let expected = predictor
            .artifact()
            .positive_probability(&[0.0, 0.0, 0.0, 1.0])
            .unwrap();
        assert_eq!(pitch_only.probability, expected);

        let away_only = Lineup::new(PlayerId(101), vec![]);
        let home_batting = Lineup::new(PlayerId(100), vec![PlayerId(202)]);
        let pred = predictor.predict_game(&home_batting, &away_only).unwrap();
        assert_eq!(pred.matchups.len(), 1);
        assert_eq!(pred.with_history(), 0);
        assert_eq!(pred.confidence, ConfidenceLevel::Low);
    }

    #[test]
    fn test_empty_lineups_are_neutral() {
        let predictor = predictor();
        let pred = predictor
            .predict_game(&Lineup::default(), &Lineup::default())
            .unwrap();
        assert_eq!(pred.home_win_prob, 0.5);
        assert!(pred.matchups.is_empty());
        assert_eq!(pred.confidence, ConfidenceLevel::Low);

        let pitcher_only = Lineup::from_ids(&[100]).unwrap();
        let pred = predictor.predict_game(&pitcher_only, &pitcher_only).unwrap();
        assert_eq!(pred.home_win_prob, 0.5);
    }

    #[test]
    fn test_game_probability_is_mean_of_matchups() {
        let predictor = predictor();
        let home = Lineup::new(PlayerId(100), vec![PlayerId(300), PlayerId(301)]);
        let away = Lineup::new(PlayerId(101), vec![PlayerId(200), PlayerId(201)]);
        let pred = predictor.predict_game(&home, &away).unwrap();

        let p_200 = predictor.predict_matchup(PlayerId(100), PlayerId(200), true).unwrap();
        let p_201 = predictor.predict_matchup(PlayerId(100), PlayerId(201), true).unwrap();
        // home batters 300 and 301 have never faced pitcher 101
        let expected = ((1.0 - p_200.probability) + (1.0 - p_201.probability) + 0.5 + 0.5) / 4.0;

        assert_eq!(pred.matchups.len(), 4);
        assert!((pred.home_win_prob - expected).abs() < 1e-12);
        assert_eq!(pred.with_history(), 2);
        assert_eq!(pred.confidence, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_failed_source_yields_no_games() {
        let dir = tempfile::tempdir().unwrap();
        let source = crate::data::JsonLineupFile::new(dir.path().join("missing.json"));
        assert!(predictor().predict_games(&source).is_empty());
    }

    #[test]
    fn test_format_prediction_uses_team_names() {
        let game = GameLineups {
            home_team: "NYY".to_string(),
            away_team: "BOS".to_string(),
            ..GameLineups::default()
        };
        let pred = predictor()
            .predict_game(&game.home, &game.away)
            .unwrap();
        let text = format_prediction(&pred, &game, &TeamDirectory::default());
        assert!(text.contains("New York Yankees vs Boston Red Sox"));
        assert!(text.contains("50.0%"));
    }
}
