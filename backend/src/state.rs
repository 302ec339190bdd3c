//! Process-wide service context, built once at startup and shared read-only
//! with every worker.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use mindcare_inferences::text_emotion::EmotionClassifier;
use mindcare_inferences::{FerPlusAnalyzer, FfmpegDecoder, OnnxTextClassifier, WhisperTranscriber};
use serde::Serialize;

use crate::config::Config;
use crate::features::AnswerPolicy;
use crate::inference::RiskModel;
use crate::journal::JournalAnalyzer;

pub struct AppState {
    pub risk: Option<RiskModel>,
    pub emotion: Option<Arc<dyn EmotionClassifier>>,
    pub journal: Option<JournalAnalyzer>,
    pub policy: AnswerPolicy,
    pub stats: RequestStats,
}

impl AppState {
    pub fn new(policy: AnswerPolicy) -> Self {
        Self {
            risk: None,
            emotion: None,
            journal: None,
            policy,
            stats: RequestStats::default(),
        }
    }

    pub fn with_risk(mut self, risk: RiskModel) -> Self {
        self.risk = Some(risk);
        self
    }

    pub fn with_emotion(mut self, emotion: Arc<dyn EmotionClassifier>) -> Self {
        self.emotion = Some(emotion);
        self
    }

    pub fn with_journal(mut self, journal: JournalAnalyzer) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Loads every configured model. A model that fails to load is logged and
    /// left out; its endpoint then answers with a model-unavailable error.
    pub fn load(config: &Config) -> Self {
        let mut state = Self::new(config.answer_policy());

        match RiskModel::load(config.scaler_path(), config.classifier_path()) {
            Ok(model) => {
                log::info!(
                    "Risk model and scaler loaded ({} input features)",
                    model.input_width()
                );
                state.risk = Some(model);
            }
            Err(e) => log::error!("Error loading model/scaler: {e:#}"),
        }

        let max_tokens = usize::from(config.emotion_max_tokens);
        match OnnxTextClassifier::load(config.emotion_path(), max_tokens) {
            Ok(model) => state.emotion = Some(Arc::new(model)),
            Err(e) => log::error!(
                "Error loading emotion model from {}: {e}",
                config.emotion_path().display()
            ),
        }

        state.journal = load_journal(config);
        state
    }

    /// Which models are available, by endpoint concern.
    pub fn loaded_models(&self) -> BTreeMap<&'static str, bool> {
        BTreeMap::from([
            ("risk", self.risk.is_some()),
            ("emotion", self.emotion.is_some()),
            ("journal", self.journal.is_some()),
        ])
    }
}

fn load_journal(config: &Config) -> Option<JournalAnalyzer> {
    let transcriber =
        match WhisperTranscriber::load(config.whisper_model_path(), &config.transcript_language) {
            Ok(transcriber) => transcriber,
            Err(e) => {
                log::error!(
                    "Error loading whisper model from {}: {e}",
                    config.whisper_model_path().display()
                );
                return None;
            }
        };
    let faces = match FerPlusAnalyzer::load(config.face_model_path()) {
        Ok(faces) => faces,
        Err(e) => {
            log::error!(
                "Error loading face model from {}: {e}",
                config.face_model_path().display()
            );
            return None;
        }
    };
    let decoder = FfmpegDecoder::new(&config.ffmpeg, faces.input_size());
    log::info!("Journal analysis ready (every {} frames)", config.frame_interval);
    Some(JournalAnalyzer::new(
        Arc::new(decoder),
        Arc::new(transcriber),
        Arc::new(faces),
        config.frame_interval,
    ))
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EndpointStats {
    pub requests: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Per-endpoint request counters.
#[derive(Debug, Default)]
pub struct RequestStats {
    endpoints: DashMap<&'static str, Counters>,
}

impl RequestStats {
    pub fn record<T, E>(&self, endpoint: &'static str, outcome: &Result<T, E>) {
        let counters = self.endpoints.entry(endpoint).or_default();
        counters.requests.fetch_add(1, Ordering::Relaxed);
        let bucket = if outcome.is_ok() {
            &counters.succeeded
        } else {
            &counters.failed
        };
        bucket.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BTreeMap<&'static str, EndpointStats> {
        self.endpoints
            .iter()
            .map(|entry| {
                let c = entry.value();
                (
                    *entry.key(),
                    EndpointStats {
                        requests: c.requests.load(Ordering::Relaxed),
                        succeeded: c.succeeded.load(Ordering::Relaxed),
                        failed: c.failed.load(Ordering::Relaxed),
                    },
                )
            })
            .collect()
    }
}
