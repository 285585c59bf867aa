//! Negotiation rule violations
//!
//! These are raised by the state machine on both sides of the wire: the client
//! uses them for local validation and the backend maps them to HTTP responses.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::QuoteStatus;

/// Domain errors raised by quote negotiation operations
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NegotiationError {
    /// Client-detectable input problem (reason too short, price <= 0, ...)
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Cannot {action} a quote in {from} status")]
    InvalidTransition { from: QuoteStatus, action: String },

    #[error("Quote has expired")]
    QuoteExpired,

    #[error("Maximum negotiation rounds reached ({round} of {max})")]
    MaxRoundsReached { round: u32, max: u32 },

    #[error("Quote has already been accepted")]
    AlreadyAccepted,
}

impl NegotiationError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        NegotiationError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_transition(from: QuoteStatus, action: impl Into<String>) -> Self {
        NegotiationError::InvalidTransition {
            from,
            action: action.into(),
        }
    }

    /// Stable machine-readable code used on the wire
    pub fn code(&self) -> &'static str {
        match self {
            NegotiationError::Validation { .. } => "VALIDATION_ERROR",
            NegotiationError::InvalidTransition { .. } => "INVALID_TRANSITION",
            NegotiationError::QuoteExpired => "QUOTE_EXPIRED",
            NegotiationError::MaxRoundsReached { .. } => "MAX_ROUNDS_REACHED",
            NegotiationError::AlreadyAccepted => "ALREADY_ACCEPTED",
        }
    }

    /// True for errors the client can detect without a round-trip
    pub fn is_validation(&self) -> bool {
        matches!(self, NegotiationError::Validation { .. })
    }
}

/// Result alias for negotiation operations
pub type NegotiationResult<T> = Result<T, NegotiationError>;
