use serde::{Deserialize, Serialize};

/// One entry of a classifier's score distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Highest-scoring entry of an emotion distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionResult {
    pub emotion: String,
    pub confidence: f32,
}

/// A decoded grayscale video frame.
///
/// `index` is the position of the frame in the source video, not in the
/// sampled sequence.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}
