//! Cross-validated grid search over forest hyperparameters

use super::metrics::accuracy;
use super::split::k_folds;
use crate::model::{Preprocessor, RandomForest};
use crate::{ForestConfig, MatchupError, Result, SearchConfig};

/// Score of one grid point
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCandidate {
    pub forest: ForestConfig,
    pub fold_accuracies: Vec<f64>,
    pub mean_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub best: ForestConfig,
    pub best_accuracy: f64,
    pub candidates: Vec<SearchCandidate>,
}

/// Every combination of the grid, in tree count, depth, split order.
/// Settings outside the grid are taken from `base`.
pub fn grid(search: &SearchConfig, base: &ForestConfig) -> Vec<ForestConfig> {
    let mut configs = Vec::new();
    for &n_trees in &search.n_trees {
        for &depth in &search.max_depths {
            for &min_samples_split in &search.min_samples_splits {
                configs.push(ForestConfig {
                    n_trees,
                    max_depth: if depth == 0 { None } else { Some(depth) },
                    min_samples_split,
                    ..base.clone()
                });
            }
        }
    }
    configs
}

/// Score each grid point by mean k-fold accuracy; the first best point wins ties
pub fn grid_search(
    rows: &[Vec<f64>],
    labels: &[usize],
    n_classes: usize,
    search: &SearchConfig,
    base: &ForestConfig,
    seed: u64,
) -> Result<SearchResult> {
    let configs = grid(search, base);
    if configs.is_empty() {
        return Err(MatchupError::Config("search grid is empty".to_string()));
    }
    let folds = k_folds(rows.len(), search.folds, seed)?;
    let n_features = rows.first().map_or(0, Vec::len);

    // Preprocess each fold once; the grid reuses it
    let prepared: Vec<_> = folds
        .iter()
        .map(|fold| {
            let train_raw: Vec<Vec<f64>> = fold.train.iter().map(|&i| rows[i].clone()).collect();
            let pre = Preprocessor::fit(&train_raw, n_features);
            let train_x = pre.transform_all(&train_raw);
            let train_y: Vec<usize> = fold.train.iter().map(|&i| labels[i]).collect();
            let test_x: Vec<Vec<f64>> = fold.test.iter().map(|&i| pre.transform(&rows[i])).collect();
            let test_y: Vec<bool> = fold.test.iter().map(|&i| labels[i] == n_classes - 1).collect();
            (train_x, train_y, test_x, test_y)
        })
        .collect();

    log::info!(
        "Grid search: {} candidates x {} folds on {} rows",
        configs.len(),
        folds.len(),
        rows.len()
    );

    let mut candidates = Vec::with_capacity(configs.len());
    for config in configs {
        let mut fold_accuracies = Vec::with_capacity(prepared.len());
        for (train_x, train_y, test_x, test_y) in &prepared {
            let forest = RandomForest::fit(train_x, train_y, n_classes, &config, seed)
                .map_err(MatchupError::EmptyDataset)?;
            let predicted: Vec<bool> = forest
                .predict_batch(test_x)
                .into_iter()
                .map(|class| class == n_classes - 1)
                .collect();
            fold_accuracies.push(accuracy(test_y, &predicted));
        }
        let mean_accuracy = fold_accuracies.iter().sum::<f64>() / fold_accuracies.len() as f64;
        log::info!(
            "  trees={}, max_depth={:?}, min_split={}: cv_acc={:.2}%",
            config.n_trees,
            config.max_depth,
            config.min_samples_split,
            mean_accuracy * 100.0
        );
        candidates.push(SearchCandidate {
            forest: config,
            fold_accuracies,
            mean_accuracy,
        });
    }

    let mut best = &candidates[0];
    for candidate in &candidates[1..] {
        if candidate.mean_accuracy > best.mean_accuracy {
            best = candidate;
        }
    }
    log::info!(
        "Best: trees={}, max_depth={:?}, min_split={} ({:.2}%)",
        best.forest.n_trees,
        best.forest.max_depth,
        best.forest.min_samples_split,
        best.mean_accuracy * 100.0
    );

    Ok(SearchResult {
        best: best.forest.clone(),
        best_accuracy: best.mean_accuracy,
        candidates,
    })
}
