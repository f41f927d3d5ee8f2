//! Ridge-regularised linear regression over standardized features.

use super::dataset::Dataset;
use crate::constants::fields;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

const N_FEATURES: usize = 6;
const PIVOT_EPSILON: f64 = 1e-12;

/// Per-feature standardization parameters (mean and population std)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub means: [f64; N_FEATURES],
    pub stds: [f64; N_FEATURES],
}

impl Scaler {
    pub fn fit(rows: &[[f64; N_FEATURES]]) -> Self {
        let n = rows.len().max(1) as f64;
        let mut means = [0.0; N_FEATURES];
        for row in rows {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v / n;
            }
        }
        let mut stds = [0.0; N_FEATURES];
        for row in rows {
            for j in 0..N_FEATURES {
                stds[j] += (row[j] - means[j]).powi(2) / n;
            }
        }
        for s in stds.iter_mut() {
            *s = s.sqrt();
            // Constant columns carry no signal; leave them centred at zero
            if *s < PIVOT_EPSILON {
                *s = 1.0;
            }
        }
        Self { means, stds }
    }

    pub fn transform(&self, row: &[f64; N_FEATURES]) -> [f64; N_FEATURES] {
        let mut out = [0.0; N_FEATURES];
        for j in 0..N_FEATURES {
            out[j] = (row[j] - self.means[j]) / self.stds[j];
        }
        out
    }
}

/// Fitted coefficients in standardized space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub coefficients: [f64; N_FEATURES],
    pub intercept: f64,
    /// R² on the held-out partition at training time
    pub score: f64,
}

/// Summary of a training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub score: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    pub mean_emission: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegressor {
    scaler: Scaler,
    weights: Weights,
}

impl LinearRegressor {
    pub fn from_parts(scaler: Scaler, weights: Weights) -> Self {
        Self { scaler, weights }
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn score(&self) -> f64 {
        self.weights.score
    }

    /// Split, fit on the training partition and score on the held-out one
    pub fn train(dataset: &Dataset, test_fraction: f64, ridge: f64) -> Result<(Self, TrainingReport)> {
        let (train, test) = dataset.split(test_fraction);
        let mut model = Self::fit(&train, ridge)?;
        let evaluation = if test.is_empty() { &train } else { &test };
        model.weights.score = model.r_squared(evaluation);

        let report = TrainingReport {
            score: model.weights.score,
            train_rows: train.len(),
            test_rows: test.len(),
            mean_emission: dataset.mean_target(),
        };
        Ok((model, report))
    }

    /// Solve (XᵀX + λI)w = Xᵀ(y - ȳ) on standardized inputs
    pub fn fit(train: &Dataset, ridge: f64) -> Result<Self> {
        if train.len() < 2 {
            return Err(Error::Training(format!(
                "need at least 2 training rows, got {}",
                train.len()
            )));
        }

        let scaler = Scaler::fit(&train.features);
        let intercept = train.targets.iter().sum::<f64>() / train.len() as f64;

        let mut gram = [[0.0; N_FEATURES]; N_FEATURES];
        let mut rhs = [0.0; N_FEATURES];
        for (row, &y) in train.features.iter().zip(&train.targets) {
            let x = scaler.transform(row);
            for i in 0..N_FEATURES {
                rhs[i] += x[i] * (y - intercept);
                for j in 0..N_FEATURES {
                    gram[i][j] += x[i] * x[j];
                }
            }
        }
        for (i, row) in gram.iter_mut().enumerate() {
            row[i] += ridge;
        }

        let coefficients = solve(gram, rhs)?;
        Ok(Self {
            scaler,
            weights: Weights { coefficients, intercept, score: 0.0 },
        })
    }

    pub fn predict(&self, row: &[f64; N_FEATURES]) -> f64 {
        let x = self.scaler.transform(row);
        self.weights.intercept
            + x.iter()
                .zip(&self.weights.coefficients)
                .map(|(a, b)| a * b)
                .sum::<f64>()
    }

    /// Coefficient of determination over a dataset
    pub fn r_squared(&self, data: &Dataset) -> f64 {
        if data.is_empty() {
            return 0.0;
        }
        let mean = data.targets.iter().sum::<f64>() / data.len() as f64;
        let (mut ss_res, mut ss_tot) = (0.0, 0.0);
        for (row, &y) in data.features.iter().zip(&data.targets) {
            ss_res += (y - self.predict(row)).powi(2);
            ss_tot += (y - mean).powi(2);
        }
        if ss_tot == 0.0 {
            return if ss_res < PIVOT_EPSILON { 1.0 } else { 0.0 };
        }
        1.0 - ss_res / ss_tot
    }

    /// Share of total absolute standardized weight per feature
    pub fn feature_importance(&self) -> Vec<(&'static str, f64)> {
        let total: f64 = self.weights.coefficients.iter().map(|c| c.abs()).sum();
        fields::FEATURES
            .iter()
            .zip(&self.weights.coefficients)
            .map(|(name, c)| {
                let share = if total > 0.0 { c.abs() / total } else { 1.0 / N_FEATURES as f64 };
                (*name, share)
            })
            .collect()
    }
}

/// Gaussian elimination with partial pivoting
fn solve(
    mut a: [[f64; N_FEATURES]; N_FEATURES],
    mut b: [f64; N_FEATURES],
) -> Result<[f64; N_FEATURES]> {
    for col in 0..N_FEATURES {
        let pivot = (col..N_FEATURES)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < PIVOT_EPSILON {
            return Err(Error::Training("feature matrix is singular".into()));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..N_FEATURES {
            let factor = a[row][col] / a[col][col];
            for k in col..N_FEATURES {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; N_FEATURES];
    for row in (0..N_FEATURES).rev() {
        let tail: f64 = (row + 1..N_FEATURES).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}
