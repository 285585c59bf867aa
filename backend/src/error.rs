//! Error handling for the Quote Desk server
//!
//! Every error leaves the server as `{"message", "code", "errors"?}`.

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::{ApiErrorBody, NegotiationError};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation failed")]
    ValidationErrors(HashMap<String, Vec<String>>),

    // Negotiation rule violations
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error("Duplicate quote: {0}")]
    DuplicateQuote(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// HTTP status and wire body for this error
    pub fn status_and_body(&self) -> (StatusCode, ApiErrorBody) {
        match self {
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                body("UNAUTHORIZED", message.clone(), None),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                body(
                    "VALIDATION_ERROR",
                    message.clone(),
                    Some(HashMap::from([(field.clone(), vec![message.clone()])])),
                ),
            ),
            AppError::ValidationErrors(errors) => (
                StatusCode::BAD_REQUEST,
                body(
                    "VALIDATION_ERROR",
                    "The given data was invalid".to_string(),
                    Some(errors.clone()),
                ),
            ),
            AppError::Negotiation(err) => match err {
                NegotiationError::Validation { field, message } => (
                    StatusCode::BAD_REQUEST,
                    body(
                        err.code(),
                        message.clone(),
                        Some(HashMap::from([(field.clone(), vec![message.clone()])])),
                    ),
                ),
                _ => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ApiErrorBody {
                        rule: Some(err.clone()),
                        ..body(err.code(), err.to_string(), None)
                    },
                ),
            },
            AppError::DuplicateQuote(message) => (
                StatusCode::CONFLICT,
                body("DUPLICATE_QUOTE", message.clone(), None),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                body("NOT_FOUND", format!("{} not found", resource), None),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                body("DATABASE_ERROR", "A database error occurred".to_string(), None),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                body("INTERNAL_ERROR", msg.clone(), None),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                body(
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                ),
            ),
        }
    }
}

fn body(
    code: &str,
    message: String,
    errors: Option<HashMap<String, Vec<String>>>,
) -> ApiErrorBody {
    ApiErrorBody {
        message,
        code: code.to_string(),
        errors,
        rule: None,
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("{} is invalid", field))
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        AppError::ValidationErrors(fields)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();

        // Client faults at warn, server faults at error
        if status.is_server_error() {
            tracing::error!(code = %body.code, "Error: {:?}", self);
        } else {
            tracing::warn!(code = %body.code, status = status.as_u16(), "{}", self);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use shared::QuoteStatus;

    #[test]
    fn test_domain_errors_map_to_422() {
        for err in [
            NegotiationError::QuoteExpired,
            NegotiationError::AlreadyAccepted,
            NegotiationError::MaxRoundsReached { round: 5, max: 5 },
            NegotiationError::invalid_transition(QuoteStatus::Rejected, "reject"),
        ] {
            let code = err.code();
            let (status, body) = AppError::from(err.clone()).status_and_body();
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(body.code, code);
            assert_eq!(body.rule, Some(err));
        }
    }

    #[test]
    fn test_domain_validation_maps_to_400_with_field() {
        let err = NegotiationError::validation("reason", "Rejection reason must be at least 10 characters");
        let (status, body) = AppError::from(err).status_and_body();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "VALIDATION_ERROR");
        assert!(body.errors.unwrap().contains_key("reason"));
    }

    #[test]
    fn test_duplicate_and_not_found() {
        let (status, body) = AppError::DuplicateQuote("exists".into()).status_and_body();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, "DUPLICATE_QUOTE");

        let (status, body) = AppError::NotFound("Quote".into()).status_and_body();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.message, "Quote not found");
    }

    #[test]
    fn test_validator_errors_are_collected_per_field() {
        use validator::Validate;
        let request = shared::RejectQuoteRequest { reason: "no".into() };
        let err = AppError::from(request.validate().unwrap_err());
        let (status, body) = err.status_and_body();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.errors.unwrap()["reason"].len(), 1);
    }
}
