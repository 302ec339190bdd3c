//! HTTP backend for the MindCare models: questionnaire risk prediction,
//! text emotion detection and video journal analysis.

pub mod config;
pub mod error;
pub mod features;
pub mod handlers;
pub mod inference;
pub mod journal;
pub mod models;
pub mod state;

pub use config::Config;
pub use error::ApiError;
pub use state::AppState;
