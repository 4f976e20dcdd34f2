//! Model training pipeline
//!
//! Events -> matchup aggregates + game labels -> feature table -> seeded
//! split -> preprocessor and forest fitted on the training rows -> held-out
//! evaluation -> artifact.

use crate::features::{FeatureEngineer, FeatureTable, GameOutcomes, MatchupTable, PitcherTeams};
use crate::features::engineer::BuildSummary;
use crate::model::{ModelArtifact, Preprocessor, RandomForest, TrainingSummary};
use crate::training::metrics::Evaluation;
use crate::training::search::{grid_search, SearchResult};
use crate::training::split::TrainTestSplit;
use crate::{
    Config, ForestConfig, MatchupError, PlateAppearance, Result, SearchConfig, TrainingConfig,
};
use std::path::Path;

/// Everything a training run produced
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub build: BuildSummary,
    /// None when every row went to training
    pub evaluation: Option<Evaluation>,
    pub search: Option<SearchResult>,
}

/// Trains the home-win forest
pub struct ModelTrainer {
    training: TrainingConfig,
    forest: ForestConfig,
    search: SearchConfig,
}

impl ModelTrainer {
    pub fn new(training: TrainingConfig, forest: ForestConfig, search: SearchConfig) -> Self {
        ModelTrainer {
            training,
            forest,
            search,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.training.clone(),
            config.forest.clone(),
            config.search.clone(),
        )
    }

    /// Train on a full event table
    pub fn train(
        &self,
        events: &[PlateAppearance],
        pitcher_teams: &PitcherTeams,
    ) -> Result<TrainingOutcome> {
        if events.is_empty() {
            return Err(MatchupError::EmptyDataset(
                "the event table has no rows".to_string(),
            ));
        }

        let matchups = MatchupTable::from_events(events);
        let outcomes = GameOutcomes::from_events(events);
        log::info!(
            "Aggregated {} events into {} matchups ({} without at-bats), {} labelled games ({} indeterminate)",
            events.len(),
            matchups.len(),
            matchups.undefined_count(),
            outcomes.len(),
            outcomes.indeterminate().len()
        );

        let engineer = FeatureEngineer::new(self.training.feature_set, pitcher_teams);
        let (table, build) = engineer.build(events, &matchups, &outcomes);
        if build.unresolved_pitcher_team > 0 {
            log::warn!(
                "{} rows had no resolvable pitcher team and were marked away",
                build.unresolved_pitcher_team
            );
        }
        if table.is_empty() {
            return Err(MatchupError::EmptyDataset(format!(
                "no feature rows from {} events ({} without outcome, {} in unlabelled games)",
                build.events, build.without_outcome, build.unlabelled_game
            )));
        }

        let (mut artifact, evaluation, search) = self.fit_table(&table)?;
        artifact.training.first_game = events.iter().map(|e| e.game_date).min();
        artifact.training.last_game = events.iter().map(|e| e.game_date).max();

        Ok(TrainingOutcome {
            artifact,
            build,
            evaluation,
            search,
        })
    }

    /// Split, fit and evaluate a prepared feature table
    pub fn fit_table(
        &self,
        table: &FeatureTable,
    ) -> Result<(ModelArtifact, Option<Evaluation>, Option<SearchResult>)> {
        let seed = self.training.seed;
        let split = TrainTestSplit::new(table.len(), self.training.test_fraction, seed)?;
        let train = table.subset(&split.train);
        let test = table.subset(&split.test);

        let mut classes: Vec<bool> = train.labels.clone();
        classes.sort();
        classes.dedup();
        if classes.len() == 1 {
            log::warn!(
                "Training rows contain only {} labels; the model will return a constant probability",
                if classes[0] { "home win" } else { "away win" }
            );
        }
        let labels: Vec<usize> = train
            .labels
            .iter()
            .map(|l| if classes.len() == 1 { 0 } else { *l as usize })
            .collect();

        let dim = table.feature_set.dim();
        let preprocessor = Preprocessor::fit(&train.rows, dim);
        let train_x = preprocessor.transform_all(&train.rows);

        let search = if self.training.search && classes.len() == 2 {
            Some(grid_search(
                &train.rows,
                &labels,
                classes.len(),
                &self.search,
                &self.forest,
                seed,
            )?)
        } else {
            None
        };
        let forest_config = search
            .as_ref()
            .map(|s| s.best.clone())
            .unwrap_or_else(|| self.forest.clone());

        log::info!(
            "Fitting {} trees on {} rows ({} features, {:.1}% home wins)",
            forest_config.n_trees,
            train.len(),
            dim,
            train.positive_rate() * 100.0
        );
        let forest = RandomForest::fit(&train_x, &labels, classes.len(), &forest_config, seed)
            .map_err(MatchupError::EmptyDataset)?;

        let mut artifact = ModelArtifact::new(
            table.feature_set,
            classes,
            preprocessor,
            forest,
            TrainingSummary {
                rows: table.len(),
                train_rows: train.len(),
                test_rows: test.len(),
                seed,
                test_fraction: self.training.test_fraction,
                forest: forest_config,
                accuracy: None,
                roc_auc: None,
                first_game: None,
                last_game: None,
            },
        )?;

        let evaluation = if test.is_empty() {
            None
        } else {
            let probabilities = test
                .rows
                .iter()
                .map(|row| artifact.positive_probability(row))
                .collect::<Result<Vec<f64>>>()?;
            let evaluation = Evaluation::from_probabilities(&test.labels, &probabilities);
            log::info!("Test: {}", evaluation);
            log::info!("Classification report:\n{}", evaluation.report);
            artifact.training.accuracy = Some(evaluation.accuracy);
            artifact.training.roc_auc = evaluation.roc_auc;
            Some(evaluation)
        };

        Ok((artifact, evaluation, search))
    }

    /// Load the artifact at `path` unless `force` is set or none exists;
    /// otherwise train on the events from `load_events` and save atomically
    pub fn load_or_train<F>(&self, path: &Path, force: bool, load_events: F) -> Result<TrainingOutcome>
    where
        F: FnOnce() -> Result<(Vec<PlateAppearance>, PitcherTeams)>,
    {
        if !force && path.exists() {
            let artifact = ModelArtifact::load(path)?;
            artifact.expect_feature_set(self.training.feature_set)?;
            log::info!("Using cached model at {}", path.display());
            return Ok(TrainingOutcome {
                artifact,
                build: BuildSummary::default(),
                evaluation: None,
                search: None,
            });
        }

        let (events, pitcher_teams) = load_events()?;
        let outcome = self.train(&events, &pitcher_teams)?;
        outcome.artifact.save_atomic(path)?;
        Ok(outcome)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::features::FeatureSet;
    use crate::{EventOutcome, GameId, InningHalf, PlayerId};
    use chrono::NaiveDate;

    const OUTCOMES: [&str; 7] = [
        "single",
        "field_out",
        "strikeout",
        "walk",
        "double",
        "home_run",
        "grounded_into_double_play",
    ];

    /// A season of NYY home games against BOS. Home pitcher 10 faces away
    /// batters 5-8 in the top half; away pitcher 20 faces home batters 1-4 in
    /// the bottom half. The home team wins two of every three games.
    pub(crate) fn synthetic_events(games: i64) -> Vec<PlateAppearance> {
        let mut events = Vec::new();
        let mut row_id = 0;
        for game in 1..=games {
            let home_wins = game % 3 != 0;
            let (home_score, away_score) = if home_wins { (5, 2) } else { (1, 4) };
            let mut at_bat = 0;
            for batter in 1..=8i64 {
                let (pitcher, half) = if batter <= 4 {
                    (20, InningHalf::Bottom)
                } else {
                    (10, InningHalf::Top)
                };
                at_bat += 1;
                row_id += 1;
                let label = OUTCOMES[((game * 5 + batter * 3) % 7) as usize];
                events.push(PlateAppearance {
                    row_id,
                    game_pk: GameId(game),
                    game_date: NaiveDate::from_ymd_opt(2023, 4, 1).unwrap()
                        + chrono::Duration::days(game),
                    pitcher: PlayerId(pitcher),
                    batter: PlayerId(batter),
                    home_team: "NYY".to_string(),
                    away_team: "BOS".to_string(),
                    outcome: Some(EventOutcome::from_label(label)),
                    post_home_score: Some(home_score),
                    post_away_score: Some(away_score),
                    at_bat_number: Some(at_bat),
                    pitch_number: Some(1),
                    inning_half: Some(half),
                });
            }
        }
        events
    }

    fn trainer(feature_set: FeatureSet) -> ModelTrainer {
        let mut config = Config::default();
        config.training.feature_set = feature_set;
        config.forest.n_trees = 20;
        ModelTrainer::from_config(&config)
    }

    #[test]
    fn test_train_reports_and_labels() {
        let events = synthetic_events(30);
        let teams = PitcherTeams::from_events(&events);
        let outcome = trainer(FeatureSet::Core).train(&events, &teams).unwrap();

        assert_eq!(outcome.build.rows, 240);
        assert_eq!(outcome.build.unresolved_pitcher_team, 0);
        assert_eq!(outcome.artifact.training.train_rows, 192);
        assert_eq!(outcome.artifact.training.test_rows, 48);
        assert_eq!(outcome.artifact.classes, vec![false, true]);
        assert_eq!(
            outcome.artifact.training.first_game,
            NaiveDate::from_ymd_opt(2023, 4, 2)
        );

        let evaluation = outcome.evaluation.unwrap();
        assert_eq!(evaluation.n, 48);
        assert_eq!(outcome.artifact.training.accuracy, Some(evaluation.accuracy));
    }

    #[test]
    fn test_fixed_seed_training_is_reproducible() {
        let events = synthetic_events(24);
        let teams = PitcherTeams::from_events(&events);
        let trainer = trainer(FeatureSet::Extended);

        let first = trainer.train(&events, &teams).unwrap();
        let mut shuffled = events.clone();
        shuffled.reverse();
        let second = trainer.train(&shuffled, &teams).unwrap();

        assert_eq!(first.artifact, second.artifact);
        assert_eq!(
            first.artifact.to_json().unwrap(),
            second.artifact.to_json().unwrap()
        );
    }

    #[test]
    fn test_empty_inputs_fail_fast() {
        let trainer = trainer(FeatureSet::Core);
        let teams = PitcherTeams::new();
        assert!(matches!(
            trainer.train(&[], &teams),
            Err(MatchupError::EmptyDataset(_))
        ));

        let mut events = synthetic_events(3);
        for event in events.iter_mut() {
            event.outcome = None;
        }
        assert!(matches!(
            trainer.train(&events, &teams),
            Err(MatchupError::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_single_class_training() {
        let events: Vec<_> = synthetic_events(12)
            .into_iter()
            .filter(|e| e.game_pk.0 % 3 != 0)
            .collect();
        let teams = PitcherTeams::from_events(&events);
        let outcome = trainer(FeatureSet::Core).train(&events, &teams).unwrap();

        assert_eq!(outcome.artifact.classes, vec![true]);
        let p = outcome
            .artifact
            .positive_probability(&[0.3, 0.4, 1.0, 1.0])
            .unwrap();
        assert_eq!(p, 1.0);
    }

    #[test]
    fn test_load_or_train_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forest.json");
        let trainer = trainer(FeatureSet::Core);
        let load = || {
            let events = synthetic_events(12);
            let teams = PitcherTeams::from_events(&events);
            Ok((events, teams))
        };

        let trained = trainer.load_or_train(&path, false, load).unwrap();
        assert!(path.exists());
        assert!(trained.evaluation.is_some());

        let cached = trainer
            .load_or_train(&path, false, || {
                Err(MatchupError::EmptyDataset("should not be loaded".to_string()))
            })
            .unwrap();
        assert_eq!(cached.artifact, trained.artifact);

        let forced = trainer.load_or_train(&path, true, || {
            Err(MatchupError::EmptyDataset("forced".to_string()))
        });
        assert!(forced.is_err());

        let extended = self::trainer(FeatureSet::Extended);
        assert!(matches!(
            extended.load_or_train(&path, false, load),
            Err(MatchupError::ArtifactMismatch(_))
        ));
    }

    #[test]
    fn test_search_mode_refits_best() {
        let events = synthetic_events(15);
        let teams = PitcherTeams::from_events(&events);
        let mut config = Config::default();
        config.training.search = true;
        config.search = SearchConfig {
            n_trees: vec![5],
            max_depths: vec![0, 3],
            min_samples_splits: vec![2],
            folds: 3,
        };
        let outcome = ModelTrainer::from_config(&config).train(&events, &teams).unwrap();

        let search = outcome.search.unwrap();
        assert_eq!(search.candidates.len(), 2);
        assert_eq!(outcome.artifact.training.forest, search.best);
        assert_eq!(outcome.artifact.forest.n_trees(), 5);
    }
}
