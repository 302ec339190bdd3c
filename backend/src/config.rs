use std::path::PathBuf;

use clap::Parser;

use crate::features::AnswerPolicy;
use crate::journal::DEFAULT_FRAME_INTERVAL;

/// Server configuration, from command-line flags or environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "mindcare-backend")]
#[command(about = "Risk prediction, emotion detection and journal analysis API", long_about = None)]
pub struct Config {
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Worker threads; defaults to the number of CPUs
    #[arg(long, env = "WORKERS")]
    pub workers: Option<usize>,

    /// Directory holding every model file below
    #[arg(long, env = "MODEL_DIR", default_value = "model")]
    pub model_dir: PathBuf,

    /// Fitted scaler parameters (JSON), relative to the model directory
    #[arg(long, default_value = "scaler.json")]
    pub scaler_file: PathBuf,

    /// Risk classifier (ONNX), relative to the model directory
    #[arg(long, default_value = "classifier.onnx")]
    pub classifier_file: PathBuf,

    /// Text emotion model directory (model.onnx, tokenizer.json, config.json)
    #[arg(long, default_value = "emotion")]
    pub emotion_dir: PathBuf,

    /// Maximum tokens fed to the text emotion model
    #[arg(long, default_value_t = 128, value_parser = clap::value_parser!(u16).range(1..))]
    pub emotion_max_tokens: u16,

    /// Facial emotion model (ONNX), relative to the model directory
    #[arg(long, default_value = "emotion-ferplus-8.onnx")]
    pub face_model_file: PathBuf,

    #[arg(long, env = "FFMPEG_BIN", default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    /// Whisper model (ggml), relative to the model directory
    #[arg(long, env = "WHISPER_MODEL", default_value = "ggml-base.bin")]
    pub whisper_model_file: PathBuf,

    /// Transcript language code, or `auto` to detect it
    #[arg(long, env = "TRANSCRIPT_LANGUAGE", default_value = "auto")]
    pub transcript_language: String,

    /// Analyze one video frame out of this many
    #[arg(long, env = "FRAME_INTERVAL", default_value_t = DEFAULT_FRAME_INTERVAL)]
    pub frame_interval: usize,

    /// Fill unanswered questions with defaults instead of rejecting the request
    #[arg(long, env = "LENIENT_ANSWERS")]
    pub lenient_answers: bool,

    /// Allowed CORS origins; any origin when empty
    #[arg(long = "allowed-origin", env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Maximum request body size in bytes
    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    pub body_limit: usize,
}

impl Config {
    pub fn workers(&self) -> usize {
        self.workers
            .filter(|w| *w > 0)
            .unwrap_or_else(num_cpus::get)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn answer_policy(&self) -> AnswerPolicy {
        if self.lenient_answers {
            AnswerPolicy::Lenient
        } else {
            AnswerPolicy::Strict
        }
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.model_dir.join(&self.scaler_file)
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.model_dir.join(&self.classifier_file)
    }

    pub fn emotion_path(&self) -> PathBuf {
        self.model_dir.join(&self.emotion_dir)
    }

    pub fn face_model_path(&self) -> PathBuf {
        self.model_dir.join(&self.face_model_file)
    }

    pub fn whisper_model_path(&self) -> PathBuf {
        self.model_dir.join(&self.whisper_model_file)
    }
}
