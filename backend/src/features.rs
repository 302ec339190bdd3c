//! Questionnaire answers to model features.
//!
//! Answers are indexed from 0 (`answers[i]` is question `q{i+1}`). Each
//! symptom section is scored as `sum / (n * 5) * 25`, i.e. its share of the
//! maximum possible answer total on a 0..25 scale.

use std::ops::Range;

use serde_json::Value;

use crate::error::ApiError;
use crate::models::{question_key, FeatureVector, Gender, QuestionnaireResponse, QUESTION_COUNT};

const MAX_ANSWER: f32 = 5.0;
const SCORE_SCALE: f32 = 25.0;
const GENDER_QUESTION: usize = 2;
const FULL_NIGHT_HOURS: f32 = 8.0;
const HOURS_LOST_PER_POINT: f32 = 1.5;
const DAYS_PER_WEEK: f32 = 7.0;

/// Lenient default for nightly sleep, in hours.
pub const DEFAULT_SLEEP_HOURS: f32 = 8.0;
/// Lenient default for active days per week.
pub const DEFAULT_ACTIVITY_DAYS: f32 = 3.0;
const DEFAULT_AGE: f32 = 30.0;

pub const SLEEP_DISTURBANCE: [usize; 2] = [4, 5];
pub const PHYSICAL_ACTIVITY: usize = 6;
pub const STRESS: Range<usize> = 7..15;
pub const ANXIETY: Range<usize> = 15..22;
pub const DEPRESSION: Range<usize> = 22..31;
pub const IMPULSIVITY: Range<usize> = 31..34;
pub const HALLUCINATIONS: Range<usize> = 34..36;
pub const MOOD_SWINGS: Range<usize> = 36..38;
pub const EATING_HABITS: Range<usize> = 38..40;
pub const SUBSTANCE_USE: Range<usize> = 40..41;
pub const TRAUMA_EXPERIENCE: Range<usize> = 41..42;
pub const ADHD: Range<usize> = 27..29;

/// How absent or unrecognised answers are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnswerPolicy {
    /// Every question must be answered.
    #[default]
    Strict,
    /// Absent answers take defaults; unknown gender labels become Male.
    Lenient,
}

impl AnswerPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerPolicy::Strict => "strict",
            AnswerPolicy::Lenient => "lenient",
        }
    }
}

/// Default answer for question `number` under [`AnswerPolicy::Lenient`].
///
/// Sleep is read from the disturbance answers, so its default is the
/// disturbance level that leaves [`DEFAULT_SLEEP_HOURS`] of sleep.
pub fn default_answer(number: usize) -> f32 {
    let index = number - 1;
    if SLEEP_DISTURBANCE.contains(&index) {
        return (FULL_NIGHT_HOURS - DEFAULT_SLEEP_HOURS) / HOURS_LOST_PER_POINT;
    }
    match number {
        1 => DEFAULT_AGE,
        GENDER_QUESTION => Gender::Male.code(),
        _ if index == PHYSICAL_ACTIVITY => DEFAULT_ACTIVITY_DAYS,
        _ => 0.0,
    }
}

pub fn extract(
    response: &QuestionnaireResponse,
    policy: AnswerPolicy,
) -> Result<FeatureVector, ApiError> {
    let answers = collect_answers(response, policy)?;
    Ok(build_features(&answers))
}

fn collect_answers(
    response: &QuestionnaireResponse,
    policy: AnswerPolicy,
) -> Result<[f32; QUESTION_COUNT], ApiError> {
    let mut answers = [0.0; QUESTION_COUNT];
    for (i, slot) in answers.iter_mut().enumerate() {
        let number = i + 1;
        *slot = match (response.answer(number), policy) {
            (Some(value), _) => parse_answer(number, value, policy)?,
            (None, AnswerPolicy::Lenient) => default_answer(number),
            (None, AnswerPolicy::Strict) => {
                return Err(ApiError::MissingField(question_key(number)))
            }
        };
    }
    Ok(answers)
}

fn parse_answer(number: usize, value: &Value, policy: AnswerPolicy) -> Result<f32, ApiError> {
    let invalid = |reason: &str| ApiError::InvalidAnswer {
        key: question_key(number),
        reason: reason.to_string(),
    };

    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(n) => Some(n),
            Err(_) if number == GENDER_QUESTION => match (Gender::from_label(s), policy) {
                (Some(gender), _) => return Ok(gender.code()),
                (None, AnswerPolicy::Lenient) => return Ok(Gender::Male.code()),
                (None, AnswerPolicy::Strict) => return Err(invalid("unknown gender")),
            },
            Err(_) => None,
        },
        _ => None,
    };

    match parsed {
        Some(n) if n.is_finite() => Ok(n as f32),
        _ => Err(invalid("expected a number")),
    }
}

fn section_score(answers: &[f32], range: Range<usize>) -> f32 {
    let questions = range.len() as f32;
    answers[range].iter().sum::<f32>() / (questions * MAX_ANSWER) * SCORE_SCALE
}

fn build_features(a: &[f32; QUESTION_COUNT]) -> FeatureVector {
    let [s1, s2] = SLEEP_DISTURBANCE;
    let sleep_disturbance = (a[s1] + a[s2]) / 2.0;
    let sleep_hours = (FULL_NIGHT_HOURS - sleep_disturbance * HOURS_LOST_PER_POINT).max(0.0)
        / FULL_NIGHT_HOURS
        * SCORE_SCALE;
    let physical_activity_days = a[PHYSICAL_ACTIVITY] / DAYS_PER_WEEK * SCORE_SCALE;

    FeatureVector::new([
        a[0],
        a[GENDER_QUESTION - 1],
        sleep_hours,
        physical_activity_days,
        section_score(a, STRESS),
        section_score(a, ANXIETY),
        section_score(a, DEPRESSION),
        section_score(a, IMPULSIVITY),
        section_score(a, HALLUCINATIONS),
        section_score(a, MOOD_SWINGS),
        section_score(a, EATING_HABITS),
        section_score(a, SUBSTANCE_USE),
        section_score(a, TRAUMA_EXPERIENCE),
        section_score(a, ADHD),
    ])
}
