//! REST wire contract between the backend and the client crate

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::NegotiationError;
use crate::models::{OrderStage, Party, Quote, QuoteItem, QuoteStatus};
use crate::negotiation::IssueTarget;

/// Every successful payload is wrapped as `{"data": ...}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiEnvelope<T> {
    pub data: T,
}

impl<T> ApiEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Error body returned for every failed request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorBody {
    pub message: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<HashMap<String, Vec<String>>>,
    /// The negotiation rule that refused the request, so clients can rebuild
    /// the exact domain error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<NegotiationError>,
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuoteRequest {
    pub order_id: Option<Uuid>,
    pub vendor: Party,
    pub customer: Party,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    #[validate(length(min = 1, message = "A quote needs at least one item"))]
    pub items: Vec<QuoteItem>,
    pub tax_rate: Option<Decimal>,
    pub valid_until: Option<DateTime<Utc>>,
    /// Issue straight away instead of saving a draft
    pub issue: Option<IssueTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueQuoteRequest {
    pub status: IssueTarget,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AcceptQuoteRequest {
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RejectQuoteRequest {
    #[validate(length(
        min = 10,
        max = 1000,
        message = "Rejection reason must be between 10 and 1000 characters"
    ))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CounterQuoteRequest {
    pub price: Decimal,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CancelQuoteRequest {
    #[validate(length(max = 1000, message = "Reason must be at most 1000 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReviseQuoteRequest {
    #[validate(length(min = 1, message = "A quote needs at least one item"))]
    pub items: Vec<QuoteItem>,
    pub tax_rate: Option<Decimal>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendValidityRequest {
    pub valid_until: DateTime<Utc>,
}

// ============================================================================
// Queries
// ============================================================================

/// Filters for `GET /quotes`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteListFilters {
    pub status: Option<String>,
    pub order_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Query string for `GET /quotes/check-existing`.
///
/// `status` is a comma separated list, e.g. `draft,sent`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckExistingParams {
    pub order_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub status: Option<String>,
}

impl CheckExistingParams {
    pub fn status_list(&self) -> Vec<&str> {
        self.status
            .as_deref()
            .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Response of accept, reject and counter.
///
/// `affected_quotes` holds sibling quotes the action changed, `order_stage`
/// the stage the order moved to, if any.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NegotiationOutcome {
    pub data: Quote,
    #[serde(default)]
    pub affected_quotes: Vec<Quote>,
    #[serde(default)]
    pub order_stage: Option<OrderStage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusCount {
    pub status: QuoteStatus,
    pub count: i64,
}

/// Aggregates for `GET /quotes/statistics`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuoteStatistics {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
    pub total_value: Decimal,
    pub accepted_value: Decimal,
    /// Accepted / (accepted + rejected), as a percentage
    pub conversion_rate: f64,
}

impl QuoteStatistics {
    pub fn conversion_rate(accepted: i64, rejected: i64) -> f64 {
        let decided = accepted + rejected;
        if decided == 0 {
            0.0
        } else {
            (accepted as f64 / decided as f64 * 10_000.0).round() / 100.0
        }
    }
}
