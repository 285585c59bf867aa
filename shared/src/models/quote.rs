//! Quote models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{NegotiationError, NegotiationResult};
use crate::models::{Actor, NegotiationAction, NegotiationHistory, NegotiationHistoryEntry, Party};

/// Decimal places kept on totals
pub const MONEY_SCALE: u32 = 2;

/// Decimal places kept on unit prices after a counter-offer reprices the items
pub const UNIT_PRICE_SCALE: u32 = 4;

/// Finest unit price a quote line may carry
pub const MAX_UNIT_PRICE_SCALE: u32 = 10;

/// Default currency for new quotes
pub const DEFAULT_CURRENCY: &str = "IDR";

/// Status of a quote in the negotiation lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    Open,
    Sent,
    Countered,
    Accepted,
    Rejected,
    Cancelled,
    Revised,
    Expired,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 9] = [
        QuoteStatus::Draft,
        QuoteStatus::Open,
        QuoteStatus::Sent,
        QuoteStatus::Countered,
        QuoteStatus::Accepted,
        QuoteStatus::Rejected,
        QuoteStatus::Cancelled,
        QuoteStatus::Revised,
        QuoteStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Open => "open",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Countered => "countered",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Cancelled => "cancelled",
            QuoteStatus::Revised => "revised",
            QuoteStatus::Expired => "expired",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(QuoteStatus::Draft),
            "open" => Some(QuoteStatus::Open),
            "sent" => Some(QuoteStatus::Sent),
            "countered" => Some(QuoteStatus::Countered),
            "accepted" => Some(QuoteStatus::Accepted),
            "rejected" => Some(QuoteStatus::Rejected),
            "cancelled" => Some(QuoteStatus::Cancelled),
            "revised" => Some(QuoteStatus::Revised),
            "expired" => Some(QuoteStatus::Expired),
            _ => None,
        }
    }

    /// Terminal statuses freeze the quote
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QuoteStatus::Accepted
                | QuoteStatus::Rejected
                | QuoteStatus::Expired
                | QuoteStatus::Cancelled
        )
    }

    /// Statuses still open to negotiation actions
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            QuoteStatus::Open | QuoteStatus::Sent | QuoteStatus::Countered
        )
    }

    /// Statuses that hold an order: a second quote for the same order is not
    /// allowed while one of these exists
    pub fn occupies_order(&self) -> bool {
        !self.is_terminal()
    }

    /// Statuses that lapse into `Expired` once `valid_until` has passed
    pub fn is_expirable(&self) -> bool {
        self.is_active() || *self == QuoteStatus::Revised
    }

    /// Statuses reachable in one step
    pub fn possible_transitions(&self) -> &'static [QuoteStatus] {
        use QuoteStatus::*;
        match self {
            Draft => &[Open, Sent, Cancelled],
            Sent => &[Open, Rejected, Revised, Expired, Cancelled],
            Open => &[Countered, Accepted, Rejected, Revised, Expired, Cancelled],
            Countered => &[Countered, Accepted, Rejected, Revised, Expired, Cancelled],
            Revised => &[Open, Sent, Expired, Cancelled],
            Accepted | Rejected | Cancelled | Expired => &[],
        }
    }

    pub fn can_transition_to(&self, target: QuoteStatus) -> bool {
        self.possible_transitions().contains(&target)
    }

    /// Display metadata for badges and filters
    pub fn display(&self) -> StatusDisplay {
        match self {
            QuoteStatus::Draft => StatusDisplay::new("Draft", StatusTone::Neutral, "file-edit"),
            QuoteStatus::Open => StatusDisplay::new("Open", StatusTone::Info, "inbox"),
            QuoteStatus::Sent => StatusDisplay::new("Sent", StatusTone::Info, "send"),
            QuoteStatus::Countered => {
                StatusDisplay::new("Countered", StatusTone::Warning, "repeat")
            }
            QuoteStatus::Accepted => {
                StatusDisplay::new("Accepted", StatusTone::Success, "check-circle")
            }
            QuoteStatus::Rejected => {
                StatusDisplay::new("Rejected", StatusTone::Danger, "x-circle")
            }
            QuoteStatus::Cancelled => StatusDisplay::new("Cancelled", StatusTone::Muted, "ban"),
            QuoteStatus::Revised => StatusDisplay::new("Revised", StatusTone::Warning, "edit"),
            QuoteStatus::Expired => StatusDisplay::new("Expired", StatusTone::Muted, "clock"),
        }
    }
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Colour family of a status badge
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    Neutral,
    Info,
    Warning,
    Success,
    Danger,
    Muted,
}

/// Label, tone and icon for a status
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StatusDisplay {
    pub label: &'static str,
    pub tone: StatusTone,
    pub icon: &'static str,
}

impl StatusDisplay {
    const fn new(label: &'static str, tone: StatusTone, icon: &'static str) -> Self {
        Self { label, tone, icon }
    }
}

/// One priced line on a quote
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuoteItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl QuoteItem {
    pub fn new(description: impl Into<String>, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

/// Sum of line totals before tax
pub fn items_subtotal(items: &[QuoteItem]) -> Decimal {
    items.iter().map(QuoteItem::line_total).sum()
}

/// Grand total derived from items and tax rate
pub fn derive_grand_total(items: &[QuoteItem], tax_rate: Decimal) -> Decimal {
    let subtotal = items_subtotal(items);
    (subtotal + subtotal * tax_rate).round_dp(MONEY_SCALE)
}

/// Human-readable quote number: `QT-{yyyymm}-{sequence}`
pub fn format_quote_number(created_at: DateTime<Utc>, sequence: Option<i64>) -> String {
    match sequence {
        Some(seq) => format!("QT-{}-{:05}", created_at.format("%Y%m"), seq),
        None => "QT-DRAFT".to_string(),
    }
}

/// A vendor's priced proposal against a customer order
///
/// Status, round, pricing and history are only changed through
/// [`QuoteStateMachine`](crate::negotiation::QuoteStateMachine); the grand
/// total is always derived from the items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    pub id: Uuid,
    pub quote_number: String,
    pub order_id: Option<Uuid>,
    pub vendor: Party,
    pub customer: Party,
    pub currency: String,
    pub valid_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    status: QuoteStatus,
    items: Vec<QuoteItem>,
    tax_rate: Decimal,
    grand_total: Decimal,
    revision_number: u32,
    round: u32,
    #[serde(default)]
    history: NegotiationHistory,
}

/// Every stored attribute of a quote, used to rebuild one from persistence
#[derive(Debug, Clone)]
pub struct QuoteParts {
    pub id: Uuid,
    pub quote_number: String,
    pub order_id: Option<Uuid>,
    pub vendor: Party,
    pub customer: Party,
    pub currency: String,
    pub status: QuoteStatus,
    pub items: Vec<QuoteItem>,
    pub tax_rate: Decimal,
    pub revision_number: u32,
    pub round: u32,
    pub valid_until: DateTime<Utc>,
    pub history: NegotiationHistory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Input for a brand-new quote
#[derive(Debug, Clone)]
pub struct NewQuote {
    pub order_id: Option<Uuid>,
    pub vendor: Party,
    pub customer: Party,
    pub currency: String,
    pub items: Vec<QuoteItem>,
    pub tax_rate: Decimal,
    pub valid_until: DateTime<Utc>,
}

impl Quote {
    /// Start a new quote in `Draft` with a `created` history entry
    pub fn draft(input: NewQuote, actor: &Actor, now: DateTime<Utc>) -> Self {
        let mut history = NegotiationHistory::new();
        let grand_total = derive_grand_total(&input.items, input.tax_rate);
        history.append(
            NegotiationHistoryEntry::new(NegotiationAction::Created, actor.clone(), now)
                .with_offers(Decimal::ZERO, grand_total),
        );

        Self {
            id: Uuid::new_v4(),
            quote_number: format_quote_number(now, None),
            order_id: input.order_id,
            vendor: input.vendor,
            customer: input.customer,
            currency: input.currency,
            valid_until: input.valid_until,
            created_at: now,
            updated_at: now,
            closed_at: None,
            status: QuoteStatus::Draft,
            items: input.items,
            tax_rate: input.tax_rate,
            grand_total,
            revision_number: 0,
            round: 0,
            history,
        }
    }

    /// Rebuild a quote from stored parts, re-deriving the grand total
    pub fn from_parts(parts: QuoteParts) -> Self {
        let grand_total = derive_grand_total(&parts.items, parts.tax_rate);
        Self {
            id: parts.id,
            quote_number: parts.quote_number,
            order_id: parts.order_id,
            vendor: parts.vendor,
            customer: parts.customer,
            currency: parts.currency,
            valid_until: parts.valid_until,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            closed_at: parts.closed_at,
            status: parts.status,
            items: parts.items,
            tax_rate: parts.tax_rate,
            grand_total,
            revision_number: parts.revision_number,
            round: parts.round,
            history: parts.history,
        }
    }

    pub fn status(&self) -> QuoteStatus {
        self.status
    }

    pub fn items(&self) -> &[QuoteItem] {
        &self.items
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    pub fn grand_total(&self) -> Decimal {
        self.grand_total
    }

    pub fn subtotal(&self) -> Decimal {
        items_subtotal(&self.items)
    }

    pub fn tax_amount(&self) -> Decimal {
        self.grand_total - self.subtotal().round_dp(MONEY_SCALE)
    }

    pub fn revision_number(&self) -> u32 {
        self.revision_number
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn history(&self) -> &NegotiationHistory {
        &self.history
    }

    /// Validity has lapsed (evaluated lazily, there is no timer)
    pub fn is_past_validity(&self, now: DateTime<Utc>) -> bool {
        now >= self.valid_until
    }

    /// Expired either by stored status or by an unrecorded lapse of validity
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == QuoteStatus::Expired
            || (!self.status.is_terminal() && self.is_past_validity(now))
    }

    /// Status as a reader should see it at `now`
    pub fn effective_status(&self, now: DateTime<Utc>) -> QuoteStatus {
        if self.status.is_expirable() && self.is_past_validity(now) {
            QuoteStatus::Expired
        } else {
            self.status
        }
    }

    /// No further action can change the quote
    pub fn is_read_only(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now).is_terminal()
    }

    pub(crate) fn set_status(&mut self, status: QuoteStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
        if status.is_terminal() {
            self.closed_at = Some(now);
        }
    }

    pub(crate) fn record(&mut self, entry: NegotiationHistoryEntry) {
        self.history.append(entry);
    }

    pub(crate) fn increment_round(&mut self) {
        self.round += 1;
    }

    pub(crate) fn set_pricing(&mut self, items: Vec<QuoteItem>, tax_rate: Decimal) {
        self.items = items;
        self.tax_rate = tax_rate;
        self.grand_total = derive_grand_total(&self.items, self.tax_rate);
    }

    pub(crate) fn bump_revision(&mut self) {
        self.revision_number += 1;
    }

    /// Rescale unit prices so the derived grand total lands on `new_total`
    ///
    /// Lines are scaled at [`UNIT_PRICE_SCALE`] places. The largest line then
    /// absorbs the rounding residual, going up to [`MAX_UNIT_PRICE_SCALE`]
    /// places when its quantity needs the finer price.
    pub(crate) fn reprice_to_total(&mut self, new_total: Decimal) -> NegotiationResult<()> {
        let subtotal = self.subtotal();
        if subtotal <= Decimal::ZERO {
            return Err(NegotiationError::validation(
                "price",
                "Quote has no priced items to counter",
            ));
        }
        let unreachable = || {
            NegotiationError::validation(
                "price",
                "Counter-offer cannot be spread exactly across the quote items",
            )
        };

        let target = new_total.round_dp(MONEY_SCALE);
        let target_subtotal = target
            .checked_div(Decimal::ONE + self.tax_rate)
            .ok_or_else(unreachable)?;
        let factor = target_subtotal.checked_div(subtotal).ok_or_else(unreachable)?;
        let mut items = self
            .items
            .iter()
            .map(|item| -> NegotiationResult<QuoteItem> {
                let unit_price = item.unit_price.checked_mul(factor).ok_or_else(unreachable)?;
                Ok(QuoteItem {
                    description: item.description.clone(),
                    quantity: item.quantity,
                    unit_price: unit_price.round_dp(UNIT_PRICE_SCALE),
                })
            })
            .collect::<NegotiationResult<Vec<_>>>()?;

        let lead = self
            .items
            .iter()
            .enumerate()
            .max_by_key(|(_, item)| item.line_total())
            .map(|(index, _)| index)
            .ok_or_else(unreachable)?;
        let others: Decimal = items
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != lead)
            .map(|(_, item)| item.line_total())
            .sum();
        let quantity = Decimal::from(items[lead].quantity);
        let lead_unit_price = (target_subtotal - others)
            .checked_div(quantity)
            .ok_or_else(unreachable)?;
        if lead_unit_price < Decimal::ZERO {
            return Err(unreachable());
        }

        for scale in UNIT_PRICE_SCALE..=MAX_UNIT_PRICE_SCALE {
            items[lead].unit_price = lead_unit_price.round_dp(scale);
            if derive_grand_total(&items, self.tax_rate) == target {
                self.set_pricing(items, self.tax_rate);
                return Ok(());
            }
        }
        Err(unreachable())
    }
}
