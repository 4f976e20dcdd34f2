//! Random forest classifier.
//!
//! Bagged CART trees, each grown on a bootstrap sample with a random feature
//! subset per split. Tree `i` draws from `StdRng::seed_from_u64(seed + i)`, so
//! a forest is reproducible regardless of how rayon schedules the fits.
//!
//! # Prediction
//!
//! 1. Traverse each tree to get leaf probabilities
//! 2. Average probabilities across all trees

use super::decision_tree::{DecisionTree, TrainingSet, TreeParams};
use crate::ForestConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub n_classes: usize,
    pub seed: u64,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit a forest on rows of features and class indices
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        config: &ForestConfig,
        seed: u64,
    ) -> Result<Self, String> {
        if rows.is_empty() {
            return Err("Cannot fit a forest on zero rows".to_string());
        }
        if rows.len() != labels.len() {
            return Err(format!("{} rows but {} labels", rows.len(), labels.len()));
        }
        let n_features = rows[0].len();
        if n_features == 0 || rows.iter().any(|r| r.len() != n_features) {
            return Err("Rows must share a non-zero feature count".to_string());
        }
        if n_classes == 0 || labels.iter().any(|&l| l >= n_classes) {
            return Err(format!("Labels must lie in 0..{}", n_classes));
        }
        if config.n_trees == 0 {
            return Err("A forest needs at least one tree".to_string());
        }

        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            max_features: config
                .max_features
                .unwrap_or_else(|| (n_features as f64).sqrt().round() as usize)
                .clamp(1, n_features),
        };
        let data = TrainingSet {
            rows,
            labels,
            n_features,
            n_classes,
        };
        let n_rows = rows.len();

        let trees: Vec<DecisionTree> = (0..config.n_trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                let sample: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
                DecisionTree::fit(&data, sample, &params, &mut rng)
            })
            .collect();

        log::debug!(
            "Fitted {} trees on {} rows (max depth reached: {})",
            trees.len(),
            n_rows,
            trees.iter().map(DecisionTree::depth).max().unwrap_or(0)
        );

        Ok(RandomForest {
            n_features,
            n_classes,
            seed,
            trees,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("Forest has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            if tree.n_features != self.n_features || tree.n_classes != self.n_classes {
                return Err(format!("Tree {} shape differs from the forest", i));
            }
            tree.validate().map_err(|e| format!("Tree {}: {}", i, e))?;
        }
        Ok(())
    }

    /// Mean class probabilities over all trees
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let mut sum = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in sum.iter_mut().zip(tree.predict_proba(features)) {
                *acc += p;
            }
        }
        let n = self.trees.len().max(1) as f64;
        sum.into_iter().map(|s| s / n).collect()
    }

    pub fn predict_proba_batch(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.par_iter().map(|r| self.predict_proba(r)).collect()
    }

    /// Most probable class index per row
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Vec<usize> {
        self.predict_proba_batch(rows)
            .into_iter()
            .map(|probs| {
                probs
                    .iter()
                    .enumerate()
                    .fold((0, f64::MIN), |best, (i, &p)| if p > best.1 { (i, p) } else { best })
                    .0
            })
            .collect()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
