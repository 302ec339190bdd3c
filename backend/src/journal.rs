use std::path::Path;
use std::sync::Arc;

use mindcare_inferences::{FaceEmotionAnalyzer, MediaDecoder, Transcriber};

use crate::error::ApiError;
use crate::models::{ExpressionPoint, JournalAnalysis};

/// Emotion reported when no frame could be analyzed.
pub const FALLBACK_EMOTION: &str = "neutral";

/// Frames between two facial-emotion samples.
pub const DEFAULT_FRAME_INTERVAL: usize = 10;

/// Transcribes a video journal entry and tracks facial expressions over it.
#[derive(Clone)]
pub struct JournalAnalyzer {
    decoder: Arc<dyn MediaDecoder>,
    transcriber: Arc<dyn Transcriber>,
    faces: Arc<dyn FaceEmotionAnalyzer>,
    frame_interval: usize,
}

impl JournalAnalyzer {
    pub fn new(
        decoder: Arc<dyn MediaDecoder>,
        transcriber: Arc<dyn Transcriber>,
        faces: Arc<dyn FaceEmotionAnalyzer>,
        frame_interval: usize,
    ) -> Self {
        Self {
            decoder,
            transcriber,
            faces,
            frame_interval: frame_interval.max(1),
        }
    }

    pub fn analyze(&self, video: &Path) -> Result<JournalAnalysis, ApiError> {
        let workdir = tempfile::tempdir()?;
        let audio = self.decoder.extract_audio(video, workdir.path())?;
        let transcript = self.transcriber.transcribe(&audio)?;

        let timeline = self.expression_timeline(video)?;
        let top_emotion = top_emotion(&timeline);
        let advice = advice_for(&top_emotion).to_string();

        log::info!(
            "Journal analyzed: {} sampled frames, top emotion {}",
            timeline.len(),
            top_emotion
        );
        log::debug!("Transcript: {transcript}");

        Ok(JournalAnalysis {
            transcript,
            top_emotion,
            expression_timeline: timeline,
            advice,
        })
    }

    fn expression_timeline(&self, video: &Path) -> Result<Vec<ExpressionPoint>, ApiError> {
        let frames = self.decoder.sample_frames(video, self.frame_interval)?;
        let mut timeline = Vec::with_capacity(frames.len());
        for frame in &frames {
            match self.faces.dominant_emotion(frame) {
                Ok(emotion) => timeline.push(ExpressionPoint {
                    frame: frame.index,
                    emotion,
                }),
                Err(e) => log::warn!("Frame {} skipped: {}", frame.index, e),
            }
        }
        Ok(timeline)
    }
}

/// Most frequent emotion of the timeline; ties go to the one seen first.
pub fn top_emotion(timeline: &[ExpressionPoint]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for point in timeline {
        match counts.iter_mut().find(|(e, _)| *e == point.emotion) {
            Some((_, n)) => *n += 1,
            None => counts.push((point.emotion.as_str(), 1)),
        }
    }
    counts
        .iter()
        .fold(None, |best: Option<(&str, usize)>, &(e, n)| match best {
            Some((_, m)) if n <= m => best,
            _ => Some((e, n)),
        })
        .map(|(e, _)| e.to_string())
        .unwrap_or_else(|| FALLBACK_EMOTION.to_string())
}

pub fn advice_for(emotion: &str) -> &'static str {
    match emotion {
        "sad" => "You seem low today. Consider writing about what's bothering you or try a mindfulness exercise.",
        "happy" => "You're in a great mood! Keep reflecting on positive thoughts.",
        "angry" => "Try some deep breathing or journaling to let go of frustration.",
        "fear" => "You might be feeling anxious. Would you like to try a calming technique?",
        "neutral" => "Consistency is key. Keep checking in daily.",
        _ => "Thank you for sharing. We're here for you.",
    }
}
