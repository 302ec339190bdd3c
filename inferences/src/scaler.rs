use std::path::Path;

use serde::Deserialize;

use crate::error::{InferenceError, Result};

/// Feature scaler fitted ahead of time on the classifier's training data.
pub trait Scaler: Send + Sync {
    /// Number of features the scaler was fitted on.
    fn n_features_in(&self) -> usize;

    fn transform(&self, row: &[f32]) -> Result<Vec<f32>>;
}

/// Standardizes each feature as `(x - mean) / scale`.
///
/// Loaded from a JSON export of the fitted parameters:
/// `{"mean": [...], "scale": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f32>,
    scale: Vec<f32>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f32>, scale: Vec<f32>) -> Result<Self> {
        let scaler = Self { mean, scale };
        scaler.check("<inline>")?;
        Ok(scaler)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)?;
        let scaler: Self = serde_json::from_slice(&raw)?;
        scaler.check(path)?;
        log::debug!(
            "Loaded scaler from {} ({} features)",
            path.display(),
            scaler.mean.len()
        );
        Ok(scaler)
    }

    fn check<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let invalid = |reason: String| InferenceError::InvalidParameters {
            path: path.as_ref().to_path_buf(),
            reason,
        };
        if self.mean.is_empty() {
            return Err(invalid("scaler has no features".to_string()));
        }
        if self.mean.len() != self.scale.len() {
            return Err(invalid(format!(
                "mean has {} values but scale has {}",
                self.mean.len(),
                self.scale.len()
            )));
        }
        Ok(())
    }
}

impl Scaler for StandardScaler {
    fn n_features_in(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, row: &[f32]) -> Result<Vec<f32>> {
        if row.len() != self.mean.len() {
            return Err(InferenceError::InputWidth {
                expected: self.mean.len(),
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                // zero-variance features are left centred but unscaled
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }
}
