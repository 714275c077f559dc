//! Error types for the Armada Control Plane server.
//!
//! This module provides custom error types that implement `IntoResponse`
//! for seamless integration with Axum handlers. Every variant maps to a
//! stable `kind` string in the JSON error body so callers can branch on the
//! error class without parsing the reason text.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level errors for the control plane.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Not found error
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Validation error (bad input, rejected before touching any resource)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Precondition error (resource exists but is in the wrong state)
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Conflict error (e.g., duplicate resource, illegal state transition)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// SSH provisioning error (unreachable host, rejected auth, timeout)
    #[error("Provisioning error: {0}")]
    Provisioning(String),

    /// Infrastructure error (missing playbook file, engine unreachable)
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation",
            AppError::Precondition(_) => "precondition",
            AppError::Conflict(_) => "conflict",
            AppError::Provisioning(_) => "provisioning",
            AppError::Infrastructure(_) => "infrastructure",
            AppError::Serialization(_) => "serialization",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Precondition(msg) => (StatusCode::PRECONDITION_FAILED, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Provisioning(msg) => {
                tracing::warn!(error = %msg, "Provisioning error");
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::Infrastructure(msg) => {
                tracing::error!(error = %msg, "Infrastructure error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Serialization(e) => {
                tracing::error!(error = %e, "Serialization error");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Config(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "kind": self.kind(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<envy::Error> for AppError {
    fn from(err: envy::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Infrastructure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = AppError::NotFound("Server not found: 42".to_string());
        assert_eq!(err.to_string(), "Resource not found: Server not found: 42");
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation("target server set must not be empty".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: target server set must not be empty"
        );
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_precondition_distinct_from_validation() {
        let precondition = AppError::Precondition("server 7 is not provisioned".to_string());
        let validation = AppError::Validation("unknown server".to_string());
        assert_ne!(precondition.kind(), validation.kind());
    }
}
