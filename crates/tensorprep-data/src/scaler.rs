//! Per-column standardization.

use tensorprep_core::{Result, TensorPrepError};

/// Standardizes columns to zero mean and unit variance.
///
/// Statistics are fitted once and kept, so the same transform can be
/// applied to data that arrives later or inverted downstream.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl StandardScaler {
    /// Fit per-column mean and population standard deviation.
    ///
    /// Zero-variance columns get a standard deviation of 1.0 so transform
    /// maps them to a constant zero instead of dividing by zero.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        if rows.is_empty() {
            return Err(TensorPrepError::InvalidArgument(
                "cannot fit a scaler on zero rows".to_string(),
            ));
        }
        let num_cols = rows[0].len();
        let n = rows.len() as f64;

        let mut mean = vec![0.0; num_cols];
        for row in rows {
            for (col, value) in row.iter().enumerate() {
                mean[col] += value;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut std = vec![0.0; num_cols];
        for row in rows {
            for (col, value) in row.iter().enumerate() {
                let d = value - mean[col];
                std[col] += d * d;
            }
        }
        for s in &mut std {
            *s = (*s / n).sqrt();
            if *s < 1e-10 {
                *s = 1.0;
            }
        }

        Ok(Self { mean, std })
    }

    /// Standardize rows in place using the fitted statistics.
    pub fn transform(&self, rows: &mut [Vec<f64>]) {
        for row in rows {
            for (col, value) in row.iter_mut().enumerate() {
                *value = (*value - self.mean[col]) / self.std[col];
            }
        }
    }

    /// Fit on `rows` and standardize them in place.
    pub fn fit_transform(rows: &mut [Vec<f64>]) -> Result<Self> {
        let scaler = Self::fit(rows)?;
        scaler.transform(rows);
        Ok(scaler)
    }

    /// Per-column means.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Per-column standard deviations.
    pub fn std(&self) -> &[f64] {
        &self.std
    }
}
