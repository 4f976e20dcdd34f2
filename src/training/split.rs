//! Seeded train/test and k-fold splits over row indices

use crate::{MatchupError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of each partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl TrainTestSplit {
    /// Shuffle `0..n` with the seed and hold out `ceil(n * test_fraction)` rows
    pub fn new(n: usize, test_fraction: f64, seed: u64) -> Result<Self> {
        if !(0.0..1.0).contains(&test_fraction) {
            return Err(MatchupError::Config(format!(
                "test_fraction must be in [0, 1), got {}",
                test_fraction
            )));
        }
        let n_test = (n as f64 * test_fraction).ceil() as usize;
        if n_test >= n {
            return Err(MatchupError::EmptyDataset(format!(
                "{} rows leave nothing to train on with test fraction {}",
                n, test_fraction
            )));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);
        let train = indices.split_off(n_test);

        log::info!("Split {} rows: train={}, test={}", n, train.len(), indices.len());
        Ok(TrainTestSplit {
            train,
            test: indices,
        })
    }
}

/// Partition `0..n` into `k` shuffled folds; each split tests on one fold
pub fn k_folds(n: usize, k: usize, seed: u64) -> Result<Vec<TrainTestSplit>> {
    if k < 2 {
        return Err(MatchupError::Config(format!("need at least 2 folds, got {}", k)));
    }
    if n < k {
        return Err(MatchupError::EmptyDataset(format!(
            "{} rows cannot fill {} folds",
            n, k
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    // first n % k folds take one extra row
    let base = n / k;
    let extra = n % k;
    let mut bounds = Vec::with_capacity(k + 1);
    let mut start = 0;
    bounds.push(0);
    for fold in 0..k {
        start += base + usize::from(fold < extra);
        bounds.push(start);
    }

    Ok((0..k)
        .map(|fold| {
            let (lo, hi) = (bounds[fold], bounds[fold + 1]);
            TrainTestSplit {
                test: indices[lo..hi].to_vec(),
                train: indices[..lo].iter().chain(&indices[hi..]).copied().collect(),
            }
        })
        .collect())
}
