//! Feature preprocessing fitted on the training partition.
//!
//! Mean imputation for NaN values followed by z-score standardization. Columns
//! with zero variance keep a scale of 1.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    /// Column means over non-NaN training values, used for imputation
    pub fill: Vec<f64>,
    /// Column means after imputation
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Preprocessor {
    pub fn fit(rows: &[Vec<f64>], n_features: usize) -> Self {
        let mut fill = vec![0.0; n_features];
        for (col, fill) in fill.iter_mut().enumerate() {
            let (sum, count) = rows
                .iter()
                .map(|r| r[col])
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count > 0 {
                *fill = sum / count as f64;
            }
        }

        let n = rows.len().max(1) as f64;
        let mut mean = vec![0.0; n_features];
        let mut scale = vec![1.0; n_features];
        for col in 0..n_features {
            let values = rows.iter().map(|r| impute(r[col], fill[col]));
            mean[col] = values.clone().sum::<f64>() / n;
            let var = values.map(|v| (v - mean[col]).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            if std > 1e-12 {
                scale[col] = std;
            }
        }

        Preprocessor { fill, mean, scale }
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .enumerate()
            .map(|(col, &v)| (impute(v, self.fill[col]) - self.mean[col]) / self.scale[col])
            .collect()
    }

    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform(r)).collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        let n = self.mean.len();
        if self.fill.len() != n || self.scale.len() != n {
            return Err("Preprocessor columns disagree in length".to_string());
        }
        if self.scale.iter().any(|s| !(*s > 0.0) || !s.is_finite()) {
            return Err("Preprocessor has a non-positive scale".to_string());
        }
        Ok(())
    }
}

fn impute(value: f64, fill: f64) -> f64 {
    if value.is_nan() {
        fill
    } else {
        value
    }
}
