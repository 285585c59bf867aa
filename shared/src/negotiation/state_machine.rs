//! Quote state machine
//!
//! Every status change goes through here, on the client when projecting an
//! optimistic update and on the server as the authoritative check. An operation
//! either fails without touching the quote or applies the transition together
//! with exactly one history entry.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{NegotiationError, NegotiationResult};
use crate::models::{
    Actor, NegotiationAction, NegotiationHistoryEntry, OrderStageSignal, Quote, QuoteItem,
    QuoteStatus,
};
use crate::negotiation::rounds::ensure_can_counter;
use crate::validation::{
    validate_counter_price, validate_items, validate_notes, validate_rejection_reason,
    validate_tax_rate, validate_valid_until,
};

/// Reason recorded on sibling quotes closed by another quote's acceptance
pub const SUPERSEDED_REJECTION_REASON: &str = "Another quote was accepted for this order";

const EXPIRED_REASON: &str = "Quote validity period has passed";

/// Status a quote is issued into
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueTarget {
    Open,
    Sent,
}

impl IssueTarget {
    pub fn status(&self) -> QuoteStatus {
        match self {
            IssueTarget::Open => QuoteStatus::Open,
            IssueTarget::Sent => QuoteStatus::Sent,
        }
    }
}

/// Authoritative negotiation transitions
pub struct QuoteStateMachine;

impl QuoteStateMachine {
    /// Issue a draft or revised quote to the vendor, or mark a sent quote open
    pub fn issue(
        quote: &mut Quote,
        actor: &Actor,
        target: IssueTarget,
        now: DateTime<Utc>,
    ) -> NegotiationResult<()> {
        guard_actionable(quote, "issue", now)?;
        let status = target.status();
        if !quote.status().can_transition_to(status) {
            return Err(NegotiationError::invalid_transition(quote.status(), "issue"));
        }

        let total = quote.grand_total();
        quote.set_status(status, now);
        quote.record(
            NegotiationHistoryEntry::new(NegotiationAction::Issued, actor.clone(), now)
                .with_offers(total, total)
                .with_notes(Some(format!("Issued as {}", status))),
        );
        Ok(())
    }

    /// Accept the current offer
    pub fn accept(
        quote: &mut Quote,
        actor: &Actor,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> NegotiationResult<()> {
        if quote.status() == QuoteStatus::Accepted {
            return Err(NegotiationError::AlreadyAccepted);
        }
        validate_notes(notes.as_deref()).map_err(|m| NegotiationError::validation("notes", m))?;
        guard_actionable(quote, "accept", now)?;
        if !matches!(quote.status(), QuoteStatus::Open | QuoteStatus::Countered) {
            return Err(NegotiationError::invalid_transition(quote.status(), "accept"));
        }

        let total = quote.grand_total();
        quote.set_status(QuoteStatus::Accepted, now);
        quote.record(
            NegotiationHistoryEntry::new(NegotiationAction::Accepted, actor.clone(), now)
                .with_offers(total, total)
                .with_notes(clean_notes(notes)),
        );
        Ok(())
    }

    /// Reject the quote with a justification
    pub fn reject(
        quote: &mut Quote,
        actor: &Actor,
        reason: &str,
        now: DateTime<Utc>,
    ) -> NegotiationResult<()> {
        validate_rejection_reason(reason)
            .map_err(|m| NegotiationError::validation("reason", m))?;
        guard_actionable(quote, "reject", now)?;
        if !quote.status().can_transition_to(QuoteStatus::Rejected) {
            return Err(NegotiationError::invalid_transition(quote.status(), "reject"));
        }

        quote.set_status(QuoteStatus::Rejected, now);
        quote.record(
            NegotiationHistoryEntry::new(NegotiationAction::Rejected, actor.clone(), now)
                .with_reason(Some(reason.trim().to_string())),
        );
        Ok(())
    }

    /// Counter the current offer with a new total price
    pub fn counter(
        quote: &mut Quote,
        actor: &Actor,
        new_price: Decimal,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> NegotiationResult<()> {
        validate_counter_price(new_price).map_err(|m| NegotiationError::validation("price", m))?;
        validate_notes(notes.as_deref()).map_err(|m| NegotiationError::validation("notes", m))?;
        guard_actionable(quote, "counter", now)?;
        ensure_can_counter(quote.round())?;
        if !matches!(quote.status(), QuoteStatus::Open | QuoteStatus::Countered) {
            return Err(NegotiationError::invalid_transition(quote.status(), "counter"));
        }
        if new_price.round_dp(2) == quote.grand_total() {
            return Err(NegotiationError::validation(
                "price",
                "Counter-offer must differ from the current price",
            ));
        }

        let previous = quote.grand_total();
        quote.reprice_to_total(new_price)?;
        quote.increment_round();
        quote.set_status(QuoteStatus::Countered, now);
        let current = quote.grand_total();
        quote.record(
            NegotiationHistoryEntry::new(NegotiationAction::Countered, actor.clone(), now)
                .with_offers(previous, current)
                .with_notes(clean_notes(notes)),
        );
        Ok(())
    }

    /// Withdraw a quote that is still in play
    pub fn cancel(
        quote: &mut Quote,
        actor: &Actor,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> NegotiationResult<()> {
        validate_notes(reason.as_deref()).map_err(|m| NegotiationError::validation("reason", m))?;
        guard_actionable(quote, "cancel", now)?;

        quote.set_status(QuoteStatus::Cancelled, now);
        quote.record(
            NegotiationHistoryEntry::new(NegotiationAction::Cancelled, actor.clone(), now)
                .with_reason(clean_notes(reason)),
        );
        Ok(())
    }

    /// Replace the items of an issued quote; it must be re-issued afterwards
    pub fn revise(
        quote: &mut Quote,
        actor: &Actor,
        items: Vec<QuoteItem>,
        tax_rate: Option<Decimal>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> NegotiationResult<()> {
        validate_items(&items).map_err(|m| NegotiationError::validation("items", m))?;
        let tax_rate = tax_rate.unwrap_or_else(|| quote.tax_rate());
        validate_tax_rate(tax_rate).map_err(|m| NegotiationError::validation("tax_rate", m))?;
        validate_notes(notes.as_deref()).map_err(|m| NegotiationError::validation("notes", m))?;
        guard_actionable(quote, "revise", now)?;
        if !quote.status().can_transition_to(QuoteStatus::Revised) {
            return Err(NegotiationError::invalid_transition(quote.status(), "revise"));
        }

        let previous = quote.grand_total();
        quote.set_pricing(items, tax_rate);
        quote.bump_revision();
        quote.set_status(QuoteStatus::Revised, now);
        let current = quote.grand_total();
        quote.record(
            NegotiationHistoryEntry::new(NegotiationAction::Revised, actor.clone(), now)
                .with_offers(previous, current)
                .with_notes(clean_notes(notes)),
        );
        Ok(())
    }

    /// Push back the validity date of a quote that is not closed yet.
    ///
    /// Works on quotes whose validity already lapsed without being recorded,
    /// which is how a past-due draft is brought back into play.
    pub fn extend_validity(
        quote: &mut Quote,
        actor: &Actor,
        new_valid_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> NegotiationResult<()> {
        validate_valid_until(new_valid_until, now)
            .map_err(|m| NegotiationError::validation("valid_until", m))?;
        if quote.effective_status(now) == QuoteStatus::Expired {
            return Err(NegotiationError::QuoteExpired);
        }
        if quote.status().is_terminal() {
            return Err(NegotiationError::invalid_transition(quote.status(), "extend"));
        }

        let previous = quote.valid_until;
        quote.valid_until = new_valid_until;
        quote.updated_at = now;
        quote.record(
            NegotiationHistoryEntry::new(NegotiationAction::ValidityExtended, actor.clone(), now)
                .with_notes(Some(format!(
                    "Valid until {} (was {})",
                    new_valid_until.format("%Y-%m-%d"),
                    previous.format("%Y-%m-%d")
                ))),
        );
        Ok(())
    }

    /// Record a lapse of validity. Returns true when the quote changed.
    pub fn expire_if_due(quote: &mut Quote, now: DateTime<Utc>) -> bool {
        if !(quote.status().is_expirable() && quote.is_past_validity(now)) {
            return false;
        }

        quote.set_status(QuoteStatus::Expired, now);
        quote.record(
            NegotiationHistoryEntry::new(NegotiationAction::Expired, Actor::system(), now)
                .with_reason(Some(EXPIRED_REASON.to_string())),
        );
        true
    }

    /// Close every other quote holding the accepted quote's order.
    ///
    /// Negotiable siblings are rejected; drafts and revised quotes, which have
    /// no edge to `rejected`, are cancelled. Returns the ids that changed.
    pub fn settle_order_after_accept(
        accepted: &Quote,
        siblings: &mut [Quote],
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Vec<Uuid> {
        let Some(order_id) = accepted.order_id else {
            return Vec::new();
        };

        let mut affected = Vec::new();
        for sibling in siblings.iter_mut() {
            if sibling.id == accepted.id
                || sibling.order_id != Some(order_id)
                || !sibling.status().occupies_order()
            {
                continue;
            }

            let (status, action) = if sibling.status().can_transition_to(QuoteStatus::Rejected) {
                (QuoteStatus::Rejected, NegotiationAction::Rejected)
            } else {
                (QuoteStatus::Cancelled, NegotiationAction::Cancelled)
            };
            sibling.set_status(status, now);
            sibling.record(
                NegotiationHistoryEntry::new(action, actor.clone(), now)
                    .with_reason(Some(SUPERSEDED_REJECTION_REASON.to_string())),
            );
            affected.push(sibling.id);
        }
        affected
    }
}

/// Order signal once a quote of the order has been rejected.
///
/// `order_quotes` is every quote of the order as it stands after the
/// rejection. The order goes back to vendor sourcing when none of them still
/// holds it.
pub fn order_signal_after_reject(
    order_quotes: &[Quote],
    now: DateTime<Utc>,
) -> Option<OrderStageSignal> {
    let still_held = order_quotes.iter().any(|q| {
        let status = q.effective_status(now);
        status == QuoteStatus::Accepted || status.occupies_order()
    });
    (!still_held).then_some(OrderStageSignal::RevertToVendorSourcing)
}

/// Shared precondition: not closed and not past validity
fn guard_actionable(quote: &Quote, action: &str, now: DateTime<Utc>) -> NegotiationResult<()> {
    if quote.status() == QuoteStatus::Expired {
        return Err(NegotiationError::QuoteExpired);
    }
    if quote.status().is_terminal() {
        return Err(NegotiationError::invalid_transition(quote.status(), action));
    }
    if quote.is_past_validity(now) {
        return Err(NegotiationError::QuoteExpired);
    }
    Ok(())
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}
