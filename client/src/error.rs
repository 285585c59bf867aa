//! Client error types

use shared::{ApiErrorBody, NegotiationError, MAX_ROUNDS};
use thiserror::Error;

/// Notification text used when the server gave no message
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

/// Errors surfaced by the client crate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// A negotiation rule refused the action, locally or on the server
    #[error(transparent)]
    Domain(#[from] NegotiationError),

    #[error("Network error: {0}")]
    Network(String),

    /// A negotiation rule refused the action but the server sent no details
    #[error("{message}")]
    Rule { code: String, message: String },

    #[error("Server error ({status})")]
    Server { status: u16, message: Option<String> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Another update to the same entity has not resolved yet
    #[error("A change to {0} is still being saved")]
    MutationInFlight(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Rebuild an error from a failed response
    pub fn from_response(status: u16, body: Option<ApiErrorBody>) -> Self {
        let Some(body) = body else {
            return if status >= 500 {
                ClientError::Server {
                    status,
                    message: None,
                }
            } else {
                ClientError::Decode(format!("status {} without an error body", status))
            };
        };

        if let Some(rule) = body.rule {
            return ClientError::Domain(rule);
        }

        match body.code.as_str() {
            "VALIDATION_ERROR" => {
                let field = body
                    .errors
                    .as_ref()
                    .and_then(|errors| errors.keys().min().cloned())
                    .unwrap_or_else(|| "request".to_string());
                ClientError::Domain(NegotiationError::validation(field, body.message))
            }
            "QUOTE_EXPIRED" => ClientError::Domain(NegotiationError::QuoteExpired),
            "ALREADY_ACCEPTED" => ClientError::Domain(NegotiationError::AlreadyAccepted),
            "MAX_ROUNDS_REACHED" => ClientError::Domain(NegotiationError::MaxRoundsReached {
                round: MAX_ROUNDS,
                max: MAX_ROUNDS,
            }),
            "NOT_FOUND" => ClientError::NotFound(body.message),
            "DUPLICATE_QUOTE" => ClientError::Conflict(body.message),
            "UNAUTHORIZED" => ClientError::Unauthorized(body.message),
            _ if status == 422 => ClientError::Rule {
                code: body.code,
                message: body.message,
            },
            _ => ClientError::Server {
                status,
                message: Some(body.message),
            },
        }
    }

    /// True when the error was raised before any request was sent
    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Domain(err) if err.is_validation())
    }

    /// Text for the error notification
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Domain(err) => match err {
                NegotiationError::Validation { message, .. } => message.clone(),
                other => other.to_string(),
            },
            ClientError::Server {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            ClientError::Rule { message, .. }
            | ClientError::NotFound(message)
            | ClientError::Conflict(message)
            | ClientError::Unauthorized(message)
                if !message.trim().is_empty() =>
            {
                message.clone()
            }
            ClientError::MutationInFlight(_) => self.to_string(),
            _ => FALLBACK_MESSAGE.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

/// Result alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
