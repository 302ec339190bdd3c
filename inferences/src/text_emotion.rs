//! Text emotion classification.
//!
//! The HTTP layer only sees the [`EmotionClassifier`] trait. The bundled
//! implementation runs a fine-tuned transformer exported to ONNX (for example
//! `emotion-english-distilroberta-base`) next to its `tokenizer.json` and
//! Hugging Face `config.json`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tokenizers::Tokenizer;
use tract_onnx::prelude::*;

use crate::error::{InferenceError, Result};
use crate::inference::{load_plan, softmax, Plan};
use crate::types::{EmotionResult, LabelScore};

/// Labels used when the model directory carries no `config.json`.
pub const DEFAULT_EMOTION_LABELS: [&str; 7] = [
    "anger", "disgust", "fear", "joy", "neutral", "sadness", "surprise",
];

/// Default sequence length the model inputs are pinned to.
pub const DEFAULT_MAX_TOKENS: usize = 128;

/// Returns a full score distribution over the model's emotion labels.
pub trait EmotionClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<Vec<LabelScore>>;
}

/// Picks the highest-scoring entry. Returns `None` for an empty distribution.
pub fn top_emotion(mut scores: Vec<LabelScore>) -> Option<EmotionResult> {
    scores.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scores.into_iter().next().map(|top| EmotionResult {
        emotion: top.label,
        confidence: top.score,
    })
}

#[derive(Deserialize)]
struct HfConfig {
    id2label: HashMap<String, String>,
    #[serde(default)]
    pad_token_id: Option<u32>,
}

pub struct OnnxTextClassifier {
    model: Plan,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    max_tokens: usize,
    pad_id: u32,
}

impl OnnxTextClassifier {
    /// Loads `model.onnx`, `tokenizer.json` and (optionally) `config.json`
    /// from `model_dir`.
    pub fn load<P: AsRef<Path>>(model_dir: P, max_tokens: usize) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        if max_tokens == 0 {
            return Err(InferenceError::InvalidParameters {
                path: model_dir.to_path_buf(),
                reason: "max_tokens must be at least 1".to_string(),
            });
        }
        let tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json"))
            .map_err(|e| InferenceError::Tokenizer(e.to_string()))?;

        let config_path = model_dir.join("config.json");
        let (labels, pad_id) = if config_path.exists() {
            let config: HfConfig = serde_json::from_slice(&std::fs::read(&config_path)?)?;
            (labels_in_order(&config.id2label, &config_path)?, config.pad_token_id.unwrap_or(1))
        } else {
            log::warn!(
                "No config.json in {}, using default emotion labels",
                model_dir.display()
            );
            (DEFAULT_EMOTION_LABELS.iter().map(|l| l.to_string()).collect(), 1)
        };

        let shape = [1, max_tokens];
        let model = load_plan(
            model_dir.join("model.onnx"),
            &[(i64::datum_type(), &shape[..]), (i64::datum_type(), &shape[..])],
        )?;

        log::info!(
            "Loaded text emotion model from {} ({} labels)",
            model_dir.display(),
            labels.len()
        );
        Ok(Self {
            model,
            tokenizer,
            labels,
            max_tokens,
            pad_id,
        })
    }

    fn encode(&self, text: &str) -> Result<(Vec<i64>, Vec<i64>)> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| InferenceError::Tokenizer(e.to_string()))?;

        let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        if ids.len() > self.max_tokens {
            // keep the closing special token
            let last = ids[ids.len() - 1];
            ids.truncate(self.max_tokens.saturating_sub(1));
            ids.push(last);
        }
        let mut mask = vec![1i64; ids.len()];
        ids.resize(self.max_tokens, self.pad_id as i64);
        mask.resize(self.max_tokens, 0);
        Ok((ids, mask))
    }
}

impl EmotionClassifier for OnnxTextClassifier {
    fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
        let (ids, mask) = self.encode(text)?;
        let ids = Tensor::from_shape(&[1, self.max_tokens], &ids)?;
        let mask = Tensor::from_shape(&[1, self.max_tokens], &mask)?;

        let outputs = self.model.run(tvec!(ids.into(), mask.into()))?;
        let logits = outputs.first().ok_or(InferenceError::EmptyOutput)?;
        let logits: Vec<f32> = logits.to_array_view::<f32>()?.iter().copied().collect();
        label_scores(&self.labels, &logits)
    }
}

/// Pairs each label with its softmax score; the logit row must cover
/// exactly one value per label.
fn label_scores(labels: &[String], logits: &[f32]) -> Result<Vec<LabelScore>> {
    if labels.len() != logits.len() {
        return Err(InferenceError::InputWidth {
            expected: labels.len(),
            actual: logits.len(),
        });
    }
    Ok(labels
        .iter()
        .zip(softmax(logits))
        .map(|(label, score)| LabelScore::new(label.clone(), score))
        .collect())
}

fn labels_in_order(id2label: &HashMap<String, String>, path: &Path) -> Result<Vec<String>> {
    let mut indexed = Vec::with_capacity(id2label.len());
    for (id, label) in id2label {
        let id: usize = id.parse().map_err(|_| InferenceError::InvalidParameters {
            path: path.to_path_buf(),
            reason: format!("non-numeric label id {id:?}"),
        })?;
        indexed.push((id, label.clone()));
    }
    indexed.sort_by_key(|(id, _)| *id);
    Ok(indexed.into_iter().map(|(_, label)| label).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_emotion_picks_highest_score() {
        let scores = vec![
            LabelScore::new("sadness", 0.05),
            LabelScore::new("joy", 0.91),
            LabelScore::new("neutral", 0.04),
        ];
        let top = top_emotion(scores).unwrap();
        assert_eq!(top.emotion, "joy");
        assert!((top.confidence - 0.91).abs() < f32::EPSILON);
    }

    #[test]
    fn top_emotion_of_empty_distribution_is_none() {
        assert!(top_emotion(Vec::new()).is_none());
    }

    fn default_labels() -> Vec<String> {
        DEFAULT_EMOTION_LABELS.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn scores_cover_every_label() {
        let logits = [0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0];
        let scores = label_scores(&default_labels(), &logits).unwrap();
        assert_eq!(scores.len(), 7);
        let sum: f32 = scores.iter().map(|s| s.score).sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(top_emotion(scores).unwrap().emotion, "joy");
    }

    #[test]
    fn label_count_must_match_logits() {
        let err = label_scores(&default_labels(), &[0.1; 8]).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::InputWidth {
                expected: 7,
                actual: 8
            }
        ));
    }

    #[test]
    fn zero_max_tokens_is_rejected() {
        let err = OnnxTextClassifier::load("does/not/exist", 0).err().unwrap();
        assert!(matches!(err, InferenceError::InvalidParameters { .. }));
    }

    #[test]
    fn labels_follow_numeric_ids() {
        let mut id2label = HashMap::new();
        id2label.insert("10".to_string(), "last".to_string());
        id2label.insert("2".to_string(), "middle".to_string());
        id2label.insert("0".to_string(), "first".to_string());

        let labels = labels_in_order(&id2label, Path::new("config.json")).unwrap();
        assert_eq!(labels, vec!["first", "middle", "last"]);
    }

    #[test]
    fn non_numeric_label_id_is_rejected() {
        let mut id2label = HashMap::new();
        id2label.insert("LABEL_A".to_string(), "joy".to_string());
        assert!(labels_in_order(&id2label, Path::new("config.json")).is_err());
    }
}
