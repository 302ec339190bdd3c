use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use mindcare_inferences::InferenceError;
use serde::Serialize;
use thiserror::Error;

/// Everything a request can fail with. Caller mistakes map to 400, model
/// and runtime problems to 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No JSON data received")]
    InvalidJson,

    #[error("{0}")]
    MissingInput(String),

    #[error("Missing answer for {0}")]
    MissingField(String),

    #[error("Invalid answer for {key}: {reason}")]
    InvalidAnswer { key: String, reason: String },

    #[error("{0} not loaded")]
    ModelUnavailable(&'static str),

    #[error("Prediction output shape mismatch")]
    ShapeMismatch {
        expected: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Prediction failed")]
    InferenceFailure(String),

    #[error("Endpoint not found")]
    NotFound,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    fn details(&self) -> Option<String> {
        match self {
            ApiError::InferenceFailure(details) => Some(details.clone()),
            ApiError::ShapeMismatch {
                expected,
                rows,
                cols,
            } => Some(format!(
                "expected 1x{expected} probabilities, got {rows}x{cols}"
            )),
            _ => None,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson
            | ApiError::MissingInput(_)
            | ApiError::MissingField(_)
            | ApiError::InvalidAnswer { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::ModelUnavailable(_)
            | ApiError::ShapeMismatch { .. }
            | ApiError::InferenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
            details: self.details(),
        })
    }
}

impl From<InferenceError> for ApiError {
    fn from(e: InferenceError) -> Self {
        ApiError::InferenceFailure(e.to_string())
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        ApiError::InferenceFailure(format!("blocking task failed: {e}"))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::InferenceFailure(e.to_string())
    }
}
