use thiserror::Error;

use crate::dispatch::TransportError;
use crate::messages::ResolveError;
use crate::template::TemplateError;

/// Crate-level error type.
///
/// Only resolution and setup can fail; dispatch failures are never surfaced
/// to callers.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Transport setup error: {0}")]
    Transport(#[from] TransportError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
