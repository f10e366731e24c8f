//! Error types for WeatherBot
//!
//! All errors implement `IntoResponse` for Axum handlers. Outward-facing text
//! comes from fixed messages; raw detail only reaches the logs.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Message returned for a screened (blocked) user message
pub const SECURITY_VIOLATION_MESSAGE: &str =
    "Mensaje no válido. Por favor reformula tu consulta sobre el clima.";

/// Message returned when a conversation does not exist for the caller's session
pub const NOT_FOUND_MESSAGE: &str = "Conversación no encontrada";

/// Message returned for every internal failure
pub const INTERNAL_ERROR_MESSAGE: &str =
    "Error interno del servidor. Por favor intenta nuevamente.";

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Message rejected by security screen")]
    SecurityViolation,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Generation failed; the payload is already a localized user-facing sentence
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable category sent as `error_type`
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::SecurityViolation => "security_violation",
            Self::NotFound(_) => "not_found",
            Self::Generation(_) => "generation_error",
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::Database(_)
            | Self::Migration(_)
            | Self::Internal(_) => "internal_error",
        }
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::SecurityViolation => (
                StatusCode::BAD_REQUEST,
                SECURITY_VIOLATION_MESSAGE.to_string(),
            ),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE.to_string()),
            Self::Generation(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_MESSAGE.to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!(error = %self, error_type = self.error_type(), "Request failed");
        }

        let body = Json(serde_json::json!({
            "success": false,
            "message": message,
            "error_type": self.error_type(),
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
