//! Negotiation history
//!
//! Entries are append-only: the only way to add one is through the owning
//! quote, and nothing hands out mutable access to recorded entries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Action recorded in a quote's history
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationAction {
    Created,
    Issued,
    Countered,
    Accepted,
    Rejected,
    Expired,
    Cancelled,
    Revised,
    ValidityExtended,
}

impl NegotiationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NegotiationAction::Created => "created",
            NegotiationAction::Issued => "issued",
            NegotiationAction::Countered => "countered",
            NegotiationAction::Accepted => "accepted",
            NegotiationAction::Rejected => "rejected",
            NegotiationAction::Expired => "expired",
            NegotiationAction::Cancelled => "cancelled",
            NegotiationAction::Revised => "revised",
            NegotiationAction::ValidityExtended => "validity_extended",
        }
    }
}

/// Who performed an action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    /// `None` for system actions such as lazy expiry
    pub user_id: Option<Uuid>,
    pub name: String,
}

impl Actor {
    pub fn user(user_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id),
            name: name.into(),
        }
    }

    pub fn system() -> Self {
        Self {
            user_id: None,
            name: "System".to_string(),
        }
    }
}

/// One immutable record of an action taken on a quote
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NegotiationHistoryEntry {
    pub action: NegotiationAction,
    pub actor: Actor,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_offer: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_offer: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl NegotiationHistoryEntry {
    pub fn new(action: NegotiationAction, actor: Actor, timestamp: DateTime<Utc>) -> Self {
        Self {
            action,
            actor,
            timestamp,
            previous_offer: None,
            new_offer: None,
            notes: None,
            reason: None,
        }
    }

    pub fn with_offers(mut self, previous: Decimal, new: Decimal) -> Self {
        self.previous_offer = Some(previous);
        self.new_offer = Some(new);
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }
}

/// Ordered, append-only sequence of history entries
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct NegotiationHistory(Vec<NegotiationHistoryEntry>);

impl NegotiationHistory {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub(crate) fn append(&mut self, entry: NegotiationHistoryEntry) {
        self.0.push(entry);
    }

    pub fn entries(&self) -> &[NegotiationHistoryEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&NegotiationHistoryEntry> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NegotiationHistoryEntry> {
        self.0.iter()
    }

    /// Number of entries recorded for an action
    pub fn count(&self, action: NegotiationAction) -> usize {
        self.0.iter().filter(|e| e.action == action).count()
    }
}

impl<'a> IntoIterator for &'a NegotiationHistory {
    type Item = &'a NegotiationHistoryEntry;
    type IntoIter = std::slice::Iter<'a, NegotiationHistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
