use std::path::PathBuf;

use thiserror::Error;
use tract_onnx::prelude::TractError;

/// Errors raised by the model adapters.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model runtime error: {0}")]
    Model(#[from] TractError),

    #[error("speech model error: {0}")]
    Speech(#[from] whisper_rs::WhisperError),

    #[error("audio decoding error: {0}")]
    Audio(#[from] hound::Error),

    #[error("unsupported audio: {0}")]
    UnsupportedAudio(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("expected {expected} input values, got {actual}")]
    InputWidth { expected: usize, actual: usize },

    #[error("model produced no output")]
    EmptyOutput,

    #[error("invalid model parameters in {path}: {reason}")]
    InvalidParameters { path: PathBuf, reason: String },

    #[error("`{program}` exited with {status}: {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InferenceError>;
