use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use mindcare_inferences::ndarray::ArrayD;
use mindcare_inferences::{Classifier, OnnxClassifier, Scaler, StandardScaler};

use crate::error::ApiError;
use crate::models::{Disorder, FeatureVector, ProbabilityResult};

/// The fitted (scaler, classifier) pair behind `/predict`.
#[derive(Clone)]
pub struct RiskModel {
    scaler: Arc<dyn Scaler>,
    classifier: Arc<dyn Classifier>,
}

impl RiskModel {
    pub fn new(scaler: Arc<dyn Scaler>, classifier: Arc<dyn Classifier>) -> Self {
        Self { scaler, classifier }
    }

    pub fn load<P: AsRef<Path>>(scaler_path: P, classifier_path: P) -> anyhow::Result<Self> {
        let scaler_path = scaler_path.as_ref();
        let classifier_path = classifier_path.as_ref();

        let scaler = StandardScaler::load(scaler_path)
            .with_context(|| format!("failed to load scaler from {}", scaler_path.display()))?;
        let classifier = OnnxClassifier::load(classifier_path, scaler.n_features_in())
            .with_context(|| {
                format!(
                    "failed to load classifier from {}",
                    classifier_path.display()
                )
            })?;

        Ok(Self::new(Arc::new(scaler), Arc::new(classifier)))
    }

    /// Width the feature vector is padded to before scaling.
    pub fn input_width(&self) -> usize {
        self.scaler.n_features_in()
    }

    pub fn predict(&self, mut features: FeatureVector) -> Result<ProbabilityResult, ApiError> {
        features.pad_to(self.scaler.n_features_in());
        let scaled = self.scaler.transform(features.as_slice())?;

        let output = self.classifier.run(&scaled)?;
        let probabilities = match output.probabilities {
            Some(p) => p,
            None => {
                log::debug!("Classifier has no probability output, using plain prediction");
                output.prediction
            }
        };

        let (rows, cols) = single_row_shape(&probabilities);
        if rows != 1 || cols != Disorder::ALL.len() {
            return Err(ApiError::ShapeMismatch {
                expected: Disorder::ALL.len(),
                rows,
                cols,
            });
        }
        let row: Vec<f32> = probabilities.iter().copied().collect();
        ProbabilityResult::from_row(&row)
    }
}

/// Shape as (rows, cols), reading a 1-D output as a single row.
fn single_row_shape(output: &ArrayD<f32>) -> (usize, usize) {
    match output.shape() {
        [cols] => (1, *cols),
        [rows, cols] => (*rows, *cols),
        other => (other.first().copied().unwrap_or(0), other.iter().skip(1).product()),
    }
}
