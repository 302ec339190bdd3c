//! Speech-to-text for journal recordings.
//!
//! The journal pipeline depends on [`Transcriber`] only. The bundled backend
//! runs whisper.cpp in process through `whisper-rs` on 16 kHz mono samples.

use std::path::Path;

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::error::{InferenceError, Result};

/// Sample rate whisper models are trained on.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Speech-to-text backend.
pub trait Transcriber: Send + Sync {
    /// Transcribes a 16 kHz WAV file.
    fn transcribe(&self, audio: &Path) -> Result<String>;
}

/// In-process whisper model loaded from a ggml file (e.g. `ggml-base.bin`).
pub struct WhisperTranscriber {
    context: WhisperContext,
    language: String,
}

impl WhisperTranscriber {
    /// `language` is a whisper language code, or `auto` to detect it.
    pub fn load<P: AsRef<Path>>(model_path: P, language: &str) -> Result<Self> {
        let model_path = model_path.as_ref();
        let path = model_path
            .to_str()
            .ok_or_else(|| InferenceError::InvalidParameters {
                path: model_path.to_path_buf(),
                reason: "model path is not valid UTF-8".to_string(),
            })?;
        let context = WhisperContext::new_with_params(path, WhisperContextParameters::default())?;
        log::info!("Loaded whisper model from {}", model_path.display());
        Ok(Self {
            context,
            language: language.to_string(),
        })
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, audio: &Path) -> Result<String> {
        let samples = read_wav_mono(audio)?;
        if samples.is_empty() {
            return Ok(String::new());
        }

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(self.language.as_str()));
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        let mut state = self.context.create_state()?;
        state.full(params, &samples)?;

        let segments = state.full_n_segments()?;
        let mut text = Vec::with_capacity(segments.max(0) as usize);
        for i in 0..segments {
            text.push(state.full_get_segment_text(i)?);
        }
        log::debug!(
            "Transcribed {:.1} s of audio into {segments} segments",
            samples.len() as f32 / WHISPER_SAMPLE_RATE as f32
        );
        Ok(normalize(&text))
    }
}

/// Reads a 16 kHz WAV file as mono `f32` samples in `[-1.0, 1.0]`,
/// averaging channels.
pub fn read_wav_mono(path: &Path) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    if spec.sample_rate != WHISPER_SAMPLE_RATE {
        return Err(InferenceError::UnsupportedAudio(format!(
            "{} Hz audio, expected {WHISPER_SAMPLE_RATE} Hz",
            spec.sample_rate
        )));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let full_scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / full_scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let channels = usize::from(spec.channels.max(1));
    Ok(interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect())
}

/// Joins segment texts into a single space-separated transcript.
fn normalize<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
