//! Database models for the Quote Desk server
//!
//! Re-exports the domain models from the shared crate and adds the row types
//! they are stored as.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use uuid::Uuid;

pub use shared::models::*;

use crate::error::AppError;

/// Columns selected for every quote query, in [`QuoteRow`] order
pub const QUOTE_COLUMNS: &str = "id, tenant_id, quote_number, order_id, vendor, customer, currency, \
     status, items, tax_rate, revision_number, round, valid_until, history, \
     created_at, updated_at, closed_at";

/// A row of the `quotes` table
#[derive(Debug, sqlx::FromRow)]
pub struct QuoteRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub quote_number: String,
    pub order_id: Option<Uuid>,
    pub vendor: Json<Party>,
    pub customer: Json<Party>,
    pub currency: String,
    pub status: String,
    pub items: Json<Vec<QuoteItem>>,
    pub tax_rate: Decimal,
    pub revision_number: i32,
    pub round: i32,
    pub valid_until: DateTime<Utc>,
    pub history: Json<NegotiationHistory>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl TryFrom<QuoteRow> for Quote {
    type Error = AppError;

    fn try_from(row: QuoteRow) -> Result<Self, Self::Error> {
        let status = QuoteStatus::from_str(&row.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown quote status '{}'", row.status)))?;
        let revision_number = u32::try_from(row.revision_number)
            .map_err(|_| AppError::Internal("Negative revision number".to_string()))?;
        let round = u32::try_from(row.round)
            .map_err(|_| AppError::Internal("Negative negotiation round".to_string()))?;

        Ok(Quote::from_parts(QuoteParts {
            id: row.id,
            quote_number: row.quote_number,
            order_id: row.order_id,
            vendor: row.vendor.0,
            customer: row.customer.0,
            currency: row.currency.trim().to_string(),
            status,
            items: row.items.0,
            tax_rate: row.tax_rate,
            revision_number,
            round,
            valid_until: row.valid_until,
            history: row.history.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
            closed_at: row.closed_at,
        }))
    }
}

pub fn quotes_from_rows(rows: Vec<QuoteRow>) -> Result<Vec<Quote>, AppError> {
    rows.into_iter().map(Quote::try_from).collect()
}
