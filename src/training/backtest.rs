//! Evaluate a stored model over a historical date range.
//!
//! Features are rebuilt from the events of the range alone, so the model is
//! scored the way it would have been used with only that window of history.

use crate::features::{FeatureEngineer, PitcherTeams};
use crate::model::ModelArtifact;
use crate::training::metrics::Evaluation;
use crate::{MatchupError, PlateAppearance, Result};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub events: usize,
    pub games: usize,
    pub rows: usize,
    pub home_win_rows: usize,
    pub evaluation: Evaluation,
}

impl fmt::Display for BacktestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Backtest {} to {}", self.start, self.end)?;
        writeln!(
            f,
            "  {} events, {} games, {} feature rows",
            self.events, self.games, self.rows
        )?;
        writeln!(
            f,
            "  Labels: {} home win, {} away win",
            self.home_win_rows,
            self.rows - self.home_win_rows
        )?;
        write!(f, "  {}", self.evaluation)
    }
}

/// Score `artifact` on every labelled event between `start` and `end`
pub fn backtest(
    artifact: &ModelArtifact,
    events: &[PlateAppearance],
    pitcher_teams: &PitcherTeams,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<BacktestReport> {
    if start > end {
        return Err(MatchupError::Config(format!(
            "backtest start {} is after end {}",
            start, end
        )));
    }
    let window: Vec<PlateAppearance> = events
        .iter()
        .filter(|e| e.game_date >= start && e.game_date <= end)
        .cloned()
        .collect();

    let engineer = FeatureEngineer::new(artifact.feature_set, pitcher_teams);
    let (table, build) = engineer.build_from_events(&window);
    if table.is_empty() {
        return Err(MatchupError::EmptyDataset(format!(
            "no labelled events between {} and {}",
            start, end
        )));
    }

    let probabilities = table
        .rows
        .iter()
        .map(|row| artifact.positive_probability(row))
        .collect::<Result<Vec<f64>>>()?;
    let evaluation = Evaluation::from_probabilities(&table.labels, &probabilities);

    let report = BacktestReport {
        start,
        end,
        events: build.events,
        games: table.games.iter().collect::<BTreeSet<_>>().len(),
        rows: table.len(),
        home_win_rows: table.labels.iter().filter(|l| **l).count(),
        evaluation,
    };
    log::info!("Backtest accuracy: {:.2}", report.evaluation.accuracy);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureSet;
    use crate::training::trainer::tests::synthetic_events;
    use crate::training::ModelTrainer;
    use crate::Config;

    #[test]
    fn test_backtest_window() {
        let events = synthetic_events(30);
        let teams = PitcherTeams::from_events(&events);
        let mut config = Config::default();
        config.forest.n_trees = 10;
        let artifact = ModelTrainer::from_config(&config)
            .train(&events, &teams)
            .unwrap()
            .artifact;

        // games 1..=10 are played 2023-04-02..=2023-04-11
        let report = backtest(
            &artifact,
            &events,
            &teams,
            NaiveDate::from_ymd_opt(2023, 4, 2).unwrap(),
            NaiveDate::from_ymd_opt(2023, 4, 11).unwrap(),
        )
        .unwrap();

        assert_eq!(report.games, 10);
        assert_eq!(report.rows, 80);
        assert_eq!(report.home_win_rows, 56);
        assert_eq!(report.evaluation.n, 80);
        assert!(report.to_string().contains("56 home win"));
        assert_eq!(artifact.feature_set, FeatureSet::Core);
    }

    #[test]
    fn test_empty_window() {
        let events = synthetic_events(6);
        let teams = PitcherTeams::from_events(&events);
        let artifact = crate::model::artifact::tests::fitted_artifact(FeatureSet::Core);

        let day = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        assert!(matches!(
            backtest(&artifact, &events, &teams, day, day),
            Err(MatchupError::EmptyDataset(_))
        ));
        assert!(backtest(&artifact, &events, &teams, day, day.pred_opt().unwrap()).is_err());
    }
}
