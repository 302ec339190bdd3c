use std::path::Path;

use tract_onnx::prelude::*;

use crate::error::{InferenceError, Result};
use crate::inference::{argmax, load_plan, Plan};
use crate::types::Frame;

/// FER+ output classes, renamed to the short labels used across the service.
pub const FERPLUS_LABELS: [&str; 8] = [
    "neutral", "happy", "surprise", "sad", "angry", "disgust", "fear", "contempt",
];

/// Side length of the square grayscale input FER+ expects.
pub const FERPLUS_INPUT_SIZE: u32 = 64;

/// Returns the dominant facial emotion label for one frame.
pub trait FaceEmotionAnalyzer: Send + Sync {
    fn dominant_emotion(&self, frame: &Frame) -> Result<String>;
}

/// FER+ emotion model (`emotion-ferplus-8.onnx`), applied to the whole frame.
pub struct FerPlusAnalyzer {
    model: Plan,
    size: u32,
}

impl FerPlusAnalyzer {
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let size = FERPLUS_INPUT_SIZE as usize;
        let model = load_plan(model_path, &[(f32::datum_type(), &[1, 1, size, size][..])])?;
        Ok(Self {
            model,
            size: FERPLUS_INPUT_SIZE,
        })
    }

    /// Frame dimensions the decoder must produce for this analyzer.
    pub fn input_size(&self) -> u32 {
        self.size
    }
}

impl FaceEmotionAnalyzer for FerPlusAnalyzer {
    fn dominant_emotion(&self, frame: &Frame) -> Result<String> {
        let expected = (self.size * self.size) as usize;
        if frame.width != self.size || frame.height != self.size || frame.pixels.len() != expected {
            return Err(InferenceError::InputWidth {
                expected,
                actual: frame.pixels.len(),
            });
        }

        let size = self.size as usize;
        // FER+ takes raw 0..255 intensities
        let pixels: Vec<f32> = frame.pixels.iter().map(|&p| p as f32).collect();
        let input = Tensor::from_shape(&[1, 1, size, size], &pixels)?;
        let outputs = self.model.run(tvec!(input.into()))?;
        let scores = outputs.first().ok_or(InferenceError::EmptyOutput)?;
        let scores: Vec<f32> = scores.to_array_view::<f32>()?.iter().copied().collect();

        argmax(&scores)
            .and_then(|i| FERPLUS_LABELS.get(i))
            .map(|label| label.to_string())
            .ok_or(InferenceError::EmptyOutput)
    }
}
