use std::path::Path;

use tract_onnx::prelude::*;

use crate::error::{InferenceError, Result};

pub type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Loads an ONNX graph and pins its inputs to fixed shapes before optimizing.
pub fn load_plan<P: AsRef<Path>>(
    model_path: P,
    inputs: &[(DatumType, &[usize])],
) -> TractResult<Plan> {
    let mut model = tract_onnx::onnx().model_for_path(model_path)?;
    for (slot, (dt, shape)) in inputs.iter().enumerate() {
        model = model.with_input_fact(slot, InferenceFact::dt_shape(*dt, shape.to_vec()))?;
    }
    model.into_optimized()?.into_runnable()
}

/// Raw outputs of a single-row classifier run.
#[derive(Debug, Clone)]
pub struct ClassifierOutput {
    /// Per-class probabilities, when the model exposes them.
    pub probabilities: Option<tract_ndarray::ArrayD<f32>>,
    /// Plain prediction output.
    pub prediction: tract_ndarray::ArrayD<f32>,
}

/// A trained classifier applied to one already-scaled feature row.
pub trait Classifier: Send + Sync {
    fn run(&self, row: &[f32]) -> Result<ClassifierOutput>;
}

/// Classifier exported to ONNX (e.g. with skl2onnx, `zipmap` disabled).
///
/// Output 0 is the plain prediction; output 1, when present, holds the
/// class probabilities.
pub struct OnnxClassifier {
    model: Plan,
    n_features: usize,
}

impl OnnxClassifier {
    pub fn load<P: AsRef<Path>>(model_path: P, n_features: usize) -> Result<Self> {
        let model = load_plan(model_path, &[(f32::datum_type(), &[1, n_features][..])])?;
        Ok(Self { model, n_features })
    }
}

impl Classifier for OnnxClassifier {
    fn run(&self, row: &[f32]) -> Result<ClassifierOutput> {
        if row.len() != self.n_features {
            return Err(InferenceError::InputWidth {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        let input = Tensor::from_shape(&[1, self.n_features], row)?;
        let outputs = self.model.run(tvec!(input.into()))?;

        let mut outputs = outputs.iter();
        let prediction = outputs.next().ok_or(InferenceError::EmptyOutput)?;
        let prediction = prediction.cast_to::<f32>()?.to_array_view::<f32>()?.to_owned();
        let probabilities = match outputs.next() {
            Some(value) => Some(value.cast_to::<f32>()?.to_array_view::<f32>()?.to_owned()),
            None => None,
        };

        Ok(ClassifierOutput {
            probabilities,
            prediction,
        })
    }
}

/// Numerically stable softmax over a logits row.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value, first one wins on ties. NaN never wins.
pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f32)>, (i, v)| match best {
            Some((_, b)) if *v <= b => best,
            _ => Some((i, *v)),
        })
        .map(|(i, _)| i)
}
