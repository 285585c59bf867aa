//! Duplicate quote guard
//!
//! Before a quote is created for an order, look for one that already holds it.
//! A hit sends the user to the existing quote instead of the create form.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Quote, QuoteStatus};

/// Statuses searched when the caller gives no usable filter: every status
/// that holds the order, matching the server's uniqueness rule
pub fn default_active_statuses() -> Vec<QuoteStatus> {
    QuoteStatus::ALL
        .into_iter()
        .filter(QuoteStatus::occupies_order)
        .collect()
}

/// Query for an existing quote on an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingQuoteQuery {
    pub order_id: Uuid,
    #[serde(default)]
    pub vendor_id: Option<Uuid>,
    #[serde(default)]
    pub statuses: Vec<QuoteStatus>,
}

impl ExistingQuoteQuery {
    pub fn for_order(order_id: Uuid) -> Self {
        Self {
            order_id,
            vendor_id: None,
            statuses: Vec::new(),
        }
    }

    pub fn with_vendor(mut self, vendor_id: Uuid) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<QuoteStatus>) -> Self {
        self.statuses = statuses;
        self
    }

    /// Parse raw status strings, dropping unknown ones
    pub fn with_status_strs<S: AsRef<str>>(self, raw: &[S]) -> Self {
        let statuses = raw
            .iter()
            .filter_map(|s| QuoteStatus::from_str(s.as_ref().trim()))
            .collect();
        self.with_statuses(statuses)
    }

    /// Requested statuses, or the default set when none were usable
    pub fn effective_statuses(&self) -> Vec<QuoteStatus> {
        if self.statuses.is_empty() {
            default_active_statuses()
        } else {
            self.statuses.clone()
        }
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        quote.order_id == Some(self.order_id)
            && self.vendor_id.map_or(true, |v| quote.vendor.id == v)
            && self.effective_statuses().contains(&quote.status())
    }
}

/// Result of [`check_existing`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingQuoteCheck {
    pub has_active_quote: bool,
    pub quote: Option<Quote>,
}

impl ExistingQuoteCheck {
    pub fn none() -> Self {
        Self {
            has_active_quote: false,
            quote: None,
        }
    }

    pub fn found(quote: Quote) -> Self {
        Self {
            has_active_quote: true,
            quote: Some(quote),
        }
    }
}

/// Most recently created quote of the order matching the query
pub fn check_existing<'a, I>(quotes: I, query: &ExistingQuoteQuery) -> ExistingQuoteCheck
where
    I: IntoIterator<Item = &'a Quote>,
{
    quotes
        .into_iter()
        .filter(|q| query.matches(q))
        .max_by_key(|q| q.created_at)
        .cloned()
        .map(ExistingQuoteCheck::found)
        .unwrap_or_else(ExistingQuoteCheck::none)
}

/// Where the "new quote" action should take the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateRoute {
    EditExisting(Box<Quote>),
    CreateNew,
}

pub fn route_for(check: ExistingQuoteCheck) -> CreateRoute {
    match check.quote {
        Some(quote) if check.has_active_quote => CreateRoute::EditExisting(Box::new(quote)),
        _ => CreateRoute::CreateNew,
    }
}
