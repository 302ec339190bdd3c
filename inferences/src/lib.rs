//! Model adapters used by the MindCare backend.
//!
//! Every model sits behind a small trait ([`Scaler`], [`Classifier`],
//! [`EmotionClassifier`], [`FaceEmotionAnalyzer`], [`MediaDecoder`],
//! [`Transcriber`]) so the HTTP layer never depends on a concrete runtime.

pub mod error;
pub mod face;
pub mod inference;
pub mod media;
pub mod scaler;
pub mod text_emotion;
pub mod transcribe;
pub mod types;

pub use error::InferenceError;
pub use face::{FaceEmotionAnalyzer, FerPlusAnalyzer};
pub use inference::{Classifier, ClassifierOutput, OnnxClassifier};
pub use media::{FfmpegDecoder, MediaDecoder};
pub use scaler::{Scaler, StandardScaler};
pub use text_emotion::{top_emotion, EmotionClassifier, OnnxTextClassifier};
pub use transcribe::{Transcriber, WhisperTranscriber};
pub use types::{EmotionResult, Frame, LabelScore};

/// Array types used in classifier outputs.
pub use tract_onnx::prelude::tract_ndarray as ndarray;
