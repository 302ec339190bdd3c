use std::io::Write;
use std::time::Instant;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt;
use log::{error, info, warn};
use mindcare_inferences::{top_emotion, EmotionResult};
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::ApiError;
use crate::features;
use crate::models::{
    Disorder, HealthResponse, JournalAnalysis, ModelInfo, PredictResponse, QuestionnaireResponse,
    FEATURE_NAMES,
};
use crate::state::AppState;

/// Multipart field carrying the journal recording.
const VIDEO_FIELD: &str = "video";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/predict", web::post().to(predict))
        .route("/detect_emotion", web::post().to(detect_emotion))
        .route("/analyze-journal", web::post().to(analyze_journal))
        .route("/health", web::get().to(health))
        .route("/model-info", web::get().to(model_info))
        .route("/stats", web::get().to(stats));
}

fn log_failure(endpoint: &str, e: &ApiError, started: Instant) {
    let elapsed = started.elapsed().as_millis();
    match e {
        ApiError::InferenceFailure(details) => {
            error!("{endpoint} failed after {elapsed} ms: {e} ({details})")
        }
        ApiError::ModelUnavailable(_) | ApiError::ShapeMismatch { .. } => {
            error!("{endpoint} failed after {elapsed} ms: {e}")
        }
        _ => warn!("{endpoint} rejected after {elapsed} ms: {e}"),
    }
}

pub async fn predict(state: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let outcome = run_predict(&state, &body).await;
    state.stats.record("predict", &outcome);
    match outcome {
        Ok(response) => {
            info!("Prediction served in {} ms", started.elapsed().as_millis());
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            log_failure("predict", &e, started);
            Err(e)
        }
    }
}

async fn run_predict(state: &web::Data<AppState>, body: &[u8]) -> Result<PredictResponse, ApiError> {
    let model = state
        .risk
        .clone()
        .ok_or(ApiError::ModelUnavailable("Model or scaler"))?;

    let answers = QuestionnaireResponse::from_json(body)?;
    let features = features::extract(&answers, state.policy)?;
    log::debug!("Feature vector: {:?}", features.as_slice());

    let probabilities = web::block(move || model.predict(features)).await??;
    Ok(PredictResponse { probabilities })
}

pub async fn detect_emotion(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let outcome = run_detect_emotion(&state, &body).await;
    state.stats.record("detect_emotion", &outcome);
    match outcome {
        Ok(result) => {
            info!(
                "Emotion detected: {} ({:.3}) in {} ms",
                result.emotion,
                result.confidence,
                started.elapsed().as_millis()
            );
            Ok(HttpResponse::Ok().json(result))
        }
        Err(e) => {
            log_failure("detect_emotion", &e, started);
            Err(e)
        }
    }
}

async fn run_detect_emotion(
    state: &web::Data<AppState>,
    body: &[u8],
) -> Result<EmotionResult, ApiError> {
    let text = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(mut fields)) => match fields.remove("text") {
            Some(Value::String(text)) => text,
            _ => return Err(missing_text()),
        },
        _ => return Err(missing_text()),
    };
    if text.trim().is_empty() {
        return Err(ApiError::MissingInput("Empty text provided".to_string()));
    }

    let classifier = state
        .emotion
        .clone()
        .ok_or(ApiError::ModelUnavailable("Emotion classifier"))?;
    let scores = web::block(move || classifier.classify(&text)).await??;
    top_emotion(scores)
        .ok_or_else(|| ApiError::InferenceFailure("classifier returned no scores".to_string()))
}

fn missing_text() -> ApiError {
    ApiError::MissingInput("Missing 'text' in request body".to_string())
}

pub async fn analyze_journal(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let outcome = run_analyze_journal(&state, payload).await;
    state.stats.record("analyze_journal", &outcome);
    match outcome {
        Ok(analysis) => {
            info!(
                "Journal analyzed in {} ms, top emotion {}",
                started.elapsed().as_millis(),
                analysis.top_emotion
            );
            Ok(HttpResponse::Ok().json(analysis))
        }
        Err(e) => {
            log_failure("analyze_journal", &e, started);
            Err(e)
        }
    }
}

async fn run_analyze_journal(
    state: &web::Data<AppState>,
    payload: Multipart,
) -> Result<JournalAnalysis, ApiError> {
    let video = read_video(payload)
        .await?
        .ok_or_else(|| ApiError::MissingInput("No video uploaded".to_string()))?;

    let analyzer = state
        .journal
        .clone()
        .ok_or(ApiError::ModelUnavailable("Journal analyzer"))?;
    // the temp file lives until the blocking task drops it
    web::block(move || analyzer.analyze(video.path())).await?
}

/// Spools the `video` part of the upload into a temp file.
async fn read_video(mut payload: Multipart) -> Result<Option<NamedTempFile>, ApiError> {
    let mut video = None;
    while let Some(mut field) = payload.try_next().await.map_err(upload_error)? {
        if field.name() != Some(VIDEO_FIELD) || video.is_some() {
            while field.try_next().await.map_err(upload_error)?.is_some() {}
            continue;
        }
        let mut file = tempfile::Builder::new()
            .prefix("journal-")
            .suffix(".webm")
            .tempfile()?;
        let mut size = 0usize;
        while let Some(chunk) = field.try_next().await.map_err(upload_error)? {
            size += chunk.len();
            file.write_all(&chunk)?;
        }
        file.flush()?;
        if size > 0 {
            log::debug!("Received {size} byte video upload");
            video = Some(file);
        }
    }
    Ok(video)
}

fn upload_error(e: actix_multipart::MultipartError) -> ApiError {
    ApiError::MissingInput(format!("No video uploaded: {e}"))
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        models: state.loaded_models(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn model_info(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ModelInfo {
        features: FEATURE_NAMES.to_vec(),
        scaler_width: state.risk.as_ref().map(|m| m.input_width()),
        disorders: Disorder::ALL.iter().map(|d| d.name()).collect(),
        answer_policy: state.policy.as_str(),
    })
}

pub async fn stats(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "endpoints": state.stats.snapshot() }))
}

pub async fn not_found() -> Result<HttpResponse, ApiError> {
    Err(ApiError::NotFound)
}
