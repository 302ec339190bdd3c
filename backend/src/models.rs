use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Number of questionnaire answers, keyed `q1`..`q42`.
pub const QUESTION_COUNT: usize = 42;

/// Number of features produced from a questionnaire.
pub const FEATURE_COUNT: usize = 14;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "gender",
    "sleep_hours",
    "physical_activity_days",
    "stress_score",
    "anxiety_score",
    "depression_score",
    "impulsivity_score",
    "hallucinations_score",
    "mood_swings_score",
    "eating_habits_score",
    "substance_use_score",
    "trauma_experience_score",
    "adhd_score",
];

/// Raw questionnaire answers as posted by the client.
#[derive(Debug, Clone, Default)]
pub struct QuestionnaireResponse {
    answers: Map<String, Value>,
}

impl QuestionnaireResponse {
    /// Parses a request body. Anything but a non-empty JSON object is
    /// rejected.
    pub fn from_json(body: &[u8]) -> Result<Self, ApiError> {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(answers)) if !answers.is_empty() => Ok(Self { answers }),
            _ => Err(ApiError::InvalidJson),
        }
    }

    /// Answer to question `number` (1-based). `null` counts as absent.
    pub fn answer(&self, number: usize) -> Option<&Value> {
        self.answers
            .get(&question_key(number))
            .filter(|v| !v.is_null())
    }
}

impl From<Map<String, Value>> for QuestionnaireResponse {
    fn from(answers: Map<String, Value>) -> Self {
        Self { answers }
    }
}

pub fn question_key(number: usize) -> String {
    format!("q{number}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Female,
    Male,
    NonBinary,
    PreferNotToSay,
}

impl Gender {
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        [
            ("Female", Gender::Female),
            ("Male", Gender::Male),
            ("Non-binary", Gender::NonBinary),
            ("Prefer not to say", Gender::PreferNotToSay),
        ]
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(label))
        .map(|(_, gender)| gender)
    }

    pub fn code(self) -> f32 {
        match self {
            Gender::Female => 0.0,
            Gender::Male => 1.0,
            Gender::NonBinary => 2.0,
            Gender::PreferNotToSay => -1.0,
        }
    }
}

/// Ordered model input. Built with [`FEATURE_COUNT`] values; only
/// [`FeatureVector::pad_to`] ever makes it longer.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn new(values: [f32; FEATURE_COUNT]) -> Self {
        Self(values.to_vec())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Right-pads with zeros up to `width`. Never truncates.
    pub fn pad_to(&mut self, width: usize) {
        if self.0.len() < width {
            self.0.resize(width, 0.0);
        }
    }

    pub fn named(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.0.iter().copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disorder {
    Depression,
    Anxiety,
    Ptsd,
    Bipolar,
    Ocd,
    Adhd,
    Schizophrenia,
    EatingDisorder,
    SubstanceUse,
    Bpd,
}

impl Disorder {
    /// Column order of the classifier's probability output.
    pub const ALL: [Disorder; 10] = [
        Disorder::Depression,
        Disorder::Anxiety,
        Disorder::Ptsd,
        Disorder::Bipolar,
        Disorder::Ocd,
        Disorder::Adhd,
        Disorder::Schizophrenia,
        Disorder::EatingDisorder,
        Disorder::SubstanceUse,
        Disorder::Bpd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Disorder::Depression => "Depression",
            Disorder::Anxiety => "Anxiety",
            Disorder::Ptsd => "PTSD",
            Disorder::Bipolar => "Bipolar",
            Disorder::Ocd => "OCD",
            Disorder::Adhd => "ADHD",
            Disorder::Schizophrenia => "Schizophrenia",
            Disorder::EatingDisorder => "Eating Disorder",
            Disorder::SubstanceUse => "Substance Use",
            Disorder::Bpd => "BPD",
        }
    }
}

/// One probability per disorder, in [`Disorder::ALL`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityResult {
    probabilities: [f32; 10],
}

impl ProbabilityResult {
    pub fn from_row(row: &[f32]) -> Result<Self, ApiError> {
        let probabilities: [f32; 10] =
            row.try_into().map_err(|_| ApiError::ShapeMismatch {
                expected: Disorder::ALL.len(),
                rows: 1,
                cols: row.len(),
            })?;
        Ok(Self { probabilities })
    }

    pub fn get(&self, disorder: Disorder) -> f32 {
        let i = Disorder::ALL
            .iter()
            .position(|d| *d == disorder)
            .unwrap_or_default();
        self.probabilities[i]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Disorder, f32)> + '_ {
        Disorder::ALL.iter().copied().zip(self.probabilities.iter().copied())
    }
}

impl Serialize for ProbabilityResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Disorder::ALL.len()))?;
        for (disorder, p) in self.iter() {
            map.serialize_entry(disorder.name(), &p)?;
        }
        map.end()
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub probabilities: ProbabilityResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionPoint {
    pub frame: usize,
    pub emotion: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalAnalysis {
    pub transcript: String,
    pub top_emotion: String,
    pub expression_timeline: Vec<ExpressionPoint>,
    pub advice: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub models: BTreeMap<&'static str, bool>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub features: Vec<&'static str>,
    pub scaler_width: Option<usize>,
    pub disorders: Vec<&'static str>,
    pub answer_policy: &'static str,
}
