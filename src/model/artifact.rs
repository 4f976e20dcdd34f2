//! Persisted model bundle.
//!
//! The forest travels with its preprocessor, label classes and feature
//! metadata so a loaded model cannot be fed columns in the wrong order.
//!
//! # JSON Format
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "feature_set": "core",
//!   "feature_names": ["batting_average", "on_base_percentage", "total_bases", "is_home"],
//!   "classes": [false, true],
//!   "preprocessor": { "fill": [...], "mean": [...], "scale": [...] },
//!   "forest": { "n_features": 4, "n_classes": 2, "seed": 42, "trees": [...] },
//!   "training": { ... }
//! }
//! ```

use super::preprocess::Preprocessor;
use super::random_forest::RandomForest;
use crate::{FeatureSet, ForestConfig, MatchupError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

pub const FORMAT_VERSION: u32 = 1;

/// How the artifact was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Feature rows before the split
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub seed: u64,
    pub test_fraction: f64,
    pub forest: ForestConfig,
    /// Held-out accuracy, None when the test partition was empty
    pub accuracy: Option<f64>,
    pub roc_auc: Option<f64>,
    pub first_game: Option<NaiveDate>,
    pub last_game: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub feature_set: FeatureSet,
    pub feature_names: Vec<String>,
    /// Label of each probability column, ascending
    pub classes: Vec<bool>,
    pub preprocessor: Preprocessor,
    pub forest: RandomForest,
    pub training: TrainingSummary,
}

impl ModelArtifact {
    pub fn new(
        feature_set: FeatureSet,
        classes: Vec<bool>,
        preprocessor: Preprocessor,
        forest: RandomForest,
        training: TrainingSummary,
    ) -> Result<Self> {
        let artifact = ModelArtifact {
            format_version: FORMAT_VERSION,
            feature_set,
            feature_names: feature_set.names().iter().map(|s| s.to_string()).collect(),
            classes,
            preprocessor,
            forest,
            training,
        };
        artifact.validate()?;
        Ok(artifact)
    }

    /// Check the bundle is internally consistent
    pub fn validate(&self) -> Result<()> {
        let mismatch = |msg: String| Err(MatchupError::ArtifactMismatch(msg));

        if self.format_version != FORMAT_VERSION {
            return mismatch(format!(
                "format version {} (expected {})",
                self.format_version, FORMAT_VERSION
            ));
        }
        let expected = self.feature_set.names();
        if self.feature_names.len() != expected.len()
            || self.feature_names.iter().zip(expected).any(|(a, b)| a != b)
        {
            return mismatch(format!(
                "feature names {:?} do not match the {:?} feature set {:?}",
                self.feature_names, self.feature_set, expected
            ));
        }
        let dim = expected.len();
        if self.preprocessor.n_features() != dim || self.forest.n_features != dim {
            return mismatch(format!(
                "model expects {} features, preprocessor {}, feature set {}",
                self.forest.n_features,
                self.preprocessor.n_features(),
                dim
            ));
        }
        if self.classes.is_empty()
            || self.classes.len() > 2
            || self.classes.windows(2).any(|w| w[0] >= w[1])
        {
            return mismatch(format!("invalid classes {:?}", self.classes));
        }
        if self.forest.n_classes != self.classes.len() {
            return mismatch(format!(
                "forest has {} classes, artifact lists {}",
                self.forest.n_classes,
                self.classes.len()
            ));
        }
        self.preprocessor
            .validate()
            .map_err(MatchupError::ArtifactMismatch)?;
        self.forest
            .validate()
            .map_err(MatchupError::ArtifactMismatch)?;
        Ok(())
    }

    /// Fail unless the artifact was trained on the given feature set
    pub fn expect_feature_set(&self, feature_set: FeatureSet) -> Result<()> {
        if self.feature_set != feature_set {
            return Err(MatchupError::ArtifactMismatch(format!(
                "model was trained on the {:?} feature set, configuration asks for {:?}",
                self.feature_set, feature_set
            )));
        }
        Ok(())
    }

    /// Class probabilities for untransformed features
    pub fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.feature_names.len() {
            return Err(MatchupError::ArtifactMismatch(format!(
                "got {} features, model expects {}",
                features.len(),
                self.feature_names.len()
            )));
        }
        Ok(self.forest.predict_proba(&self.preprocessor.transform(features)))
    }

    /// Probability of the positive (home win) class.
    ///
    /// A model fitted on a single class has one probability column. Its
    /// value is returned when that class is a home win; when the only class
    /// is an away win the column is the away probability and is inverted.
    pub fn positive_probability(&self, features: &[f64]) -> Result<f64> {
        let probs = self.predict_proba(features)?;
        if let [only] = self.classes.as_slice() {
            let p = probs.first().copied().unwrap_or(0.5);
            return Ok(if *only { p } else { 1.0 - p });
        }
        let column = self.classes.iter().position(|c| *c).unwrap_or(0);
        Ok(probs.get(column).copied().unwrap_or(0.5))
    }

    pub fn is_single_class(&self) -> bool {
        self.classes.len() == 1
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let artifact: ModelArtifact = serde_json::from_str(json)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Write to a uniquely named temporary file in the target directory,
    /// then rename over the target so readers never see a partial artifact.
    /// The temporary file is removed if any step fails.
    pub fn save_atomic<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let json = self.to_json()?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        log::info!("Saved model to {}", path.display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MatchupError::NoModel(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_json_str(&content)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Small artifact where high batting average predicts a home win
    pub(crate) fn fitted_artifact(feature_set: FeatureSet) -> ModelArtifact {
        let dim = feature_set.dim();
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| {
                let mut row = vec![0.0; dim];
                row[0] = (i % 20) as f64 / 20.0;
                row[3] = (i % 2) as f64;
                row
            })
            .collect();
        let labels: Vec<usize> = rows.iter().map(|r| (r[0] >= 0.5) as usize).collect();
        let preprocessor = Preprocessor::fit(&rows, dim);
        let config = ForestConfig {
            n_trees: 10,
            max_features: Some(dim),
            ..ForestConfig::default()
        };
        let forest =
            RandomForest::fit(&preprocessor.transform_all(&rows), &labels, 2, &config, 42).unwrap();
        ModelArtifact::new(
            feature_set,
            vec![false, true],
            preprocessor,
            forest,
            TrainingSummary {
                rows: 40,
                train_rows: 40,
                test_rows: 0,
                seed: 42,
                test_fraction: 0.0,
                forest: config,
                accuracy: None,
                roc_auc: None,
                first_game: None,
                last_game: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_positive_probability() {
        let artifact = fitted_artifact(FeatureSet::Core);
        let high = artifact.positive_probability(&[0.9, 0.9, 2.0, 1.0]).unwrap();
        let low = artifact.positive_probability(&[0.05, 0.1, 0.0, 0.0]).unwrap();
        assert!(high > 0.5);
        assert!(low < 0.5);
    }

    #[test]
    fn test_wrong_dimension_is_rejected() {
        let artifact = fitted_artifact(FeatureSet::Core);
        assert!(matches!(
            artifact.positive_probability(&[0.3, 0.4]),
            Err(MatchupError::ArtifactMismatch(_))
        ));
        assert!(artifact.expect_feature_set(FeatureSet::Extended).is_err());
        assert!(artifact.expect_feature_set(FeatureSet::Core).is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model").join("forest.json");
        let artifact = fitted_artifact(FeatureSet::Extended);

        artifact.save_atomic(&path).unwrap();
        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded, artifact);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("model"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("forest.json")]);
    }

    #[test]
    fn test_reloaded_model_predicts_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forest.json");
        let artifact = fitted_artifact(FeatureSet::Core);
        artifact.save_atomic(&path).unwrap();
        let loaded = ModelArtifact::load(&path).unwrap();

        for i in 0..50 {
            let x = i as f64 / 49.0;
            let features = [x, 1.0 - x, (i % 5) as f64, (i % 2) as f64];
            assert_eq!(
                loaded.positive_probability(&features).unwrap(),
                artifact.positive_probability(&features).unwrap()
            );
        }
        assert_eq!(loaded.to_json().unwrap(), artifact.to_json().unwrap());
    }

    #[test]
    fn test_concurrent_saves_leave_one_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forest.json");
        let artifact = fitted_artifact(FeatureSet::Core);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| artifact.save_atomic(&path).unwrap());
            }
        });

        assert_eq!(ModelArtifact::load(&path).unwrap(), artifact);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_file_is_no_model() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ModelArtifact::load(dir.path().join("absent.json")),
            Err(MatchupError::NoModel(_))
        ));
    }

    #[test]
    fn test_reordered_features_rejected() {
        let mut artifact = fitted_artifact(FeatureSet::Core);
        artifact.feature_names.swap(0, 1);
        let json = serde_json::to_string(&artifact).unwrap();
        assert!(matches!(
            ModelArtifact::from_json_str(&json),
            Err(MatchupError::ArtifactMismatch(_))
        ));
    }

    #[test]
    fn test_single_class_returns_only_column() {
        let rows = vec![vec![0.1, 0.2, 0.0, 1.0], vec![0.3, 0.4, 1.0, 0.0]];
        let preprocessor = Preprocessor::fit(&rows, 4);
        let config = ForestConfig {
            n_trees: 3,
            ..ForestConfig::default()
        };
        let forest =
            RandomForest::fit(&preprocessor.transform_all(&rows), &[0, 0], 1, &config, 1).unwrap();
        let mut artifact = fitted_artifact(FeatureSet::Core);
        artifact.classes = vec![true];
        artifact.preprocessor = preprocessor;
        artifact.forest = forest;

        assert!(artifact.validate().is_ok());
        assert!(artifact.is_single_class());
        assert_eq!(artifact.positive_probability(&[0.2, 0.3, 0.0, 1.0]).unwrap(), 1.0);

        artifact.classes = vec![false];
        assert_eq!(artifact.positive_probability(&[0.2, 0.3, 0.0, 1.0]).unwrap(), 0.0);
    }
}
