//! Validation utilities for the Quote Desk platform
//!
//! Checks that can run before any network call. Each returns a static message
//! so both the client form and the backend can report it verbatim.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{items_subtotal, QuoteItem, MAX_UNIT_PRICE_SCALE};

/// Minimum length of a rejection justification
pub const MIN_REJECTION_REASON_CHARS: usize = 10;

/// Maximum length of a rejection justification
pub const MAX_REJECTION_REASON_CHARS: usize = 1000;

/// Maximum length of free-text notes on an action
pub const MAX_NOTES_CHARS: usize = 1000;

/// Maximum number of lines on one quote
pub const MAX_ITEMS: usize = 200;

/// Maximum quantity on one line
pub const MAX_ITEM_QUANTITY: u32 = 1_000_000;

/// Maximum unit price on one line
pub const MAX_UNIT_PRICE: i64 = 1_000_000_000_000;

/// Maximum pre-tax subtotal and counter-offer price; with tax at most 100%
/// the grand total still fits `NUMERIC(18, 2)`
pub const MAX_QUOTE_TOTAL: i64 = 1_000_000_000_000_000;

/// Decimal places stored for a tax rate (`NUMERIC(6, 4)`)
pub const TAX_RATE_SCALE: u32 = 4;

// ============================================================================
// Negotiation Validations
// ============================================================================

/// Validate a rejection reason (10-1000 characters after trimming)
pub fn validate_rejection_reason(reason: &str) -> Result<(), &'static str> {
    let length = reason.trim().chars().count();
    if length < MIN_REJECTION_REASON_CHARS {
        return Err("Rejection reason must be at least 10 characters");
    }
    if length > MAX_REJECTION_REASON_CHARS {
        return Err("Rejection reason must be at most 1000 characters");
    }
    Ok(())
}

/// Validate a counter-offer price
pub fn validate_counter_price(price: Decimal) -> Result<(), &'static str> {
    if price <= Decimal::ZERO {
        return Err("Counter-offer price must be greater than zero");
    }
    if price > Decimal::from(MAX_QUOTE_TOTAL) {
        return Err("Counter-offer price is too large");
    }
    Ok(())
}

/// Validate optional free-text notes
pub fn validate_notes(notes: Option<&str>) -> Result<(), &'static str> {
    match notes {
        Some(n) if n.chars().count() > MAX_NOTES_CHARS => {
            Err("Notes must be at most 1000 characters")
        }
        _ => Ok(()),
    }
}

/// Validate quote line items
pub fn validate_items(items: &[QuoteItem]) -> Result<(), &'static str> {
    if items.is_empty() {
        return Err("A quote needs at least one item");
    }
    if items.len() > MAX_ITEMS {
        return Err("A quote can have at most 200 items");
    }
    for item in items {
        if item.description.trim().is_empty() {
            return Err("Item description cannot be empty");
        }
        if item.quantity == 0 {
            return Err("Item quantity must be at least 1");
        }
        if item.quantity > MAX_ITEM_QUANTITY {
            return Err("Item quantity must be at most 1,000,000");
        }
        if item.unit_price < Decimal::ZERO {
            return Err("Item unit price cannot be negative");
        }
        if item.unit_price > Decimal::from(MAX_UNIT_PRICE) {
            return Err("Item unit price is too large");
        }
        if item.unit_price.scale() > MAX_UNIT_PRICE_SCALE {
            return Err("Item unit price has too many decimal places");
        }
    }
    // Bounded lines cannot overflow the sum
    if items_subtotal(items) > Decimal::from(MAX_QUOTE_TOTAL) {
        return Err("Quote subtotal is too large");
    }
    Ok(())
}

/// Validate tax rate is a fraction between 0 and 1 with at most four places
pub fn validate_tax_rate(rate: Decimal) -> Result<(), &'static str> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err("Tax rate must be between 0 and 1");
    }
    if rate.normalize().scale() > TAX_RATE_SCALE {
        return Err("Tax rate can have at most 4 decimal places");
    }
    Ok(())
}

/// Validate a new validity date lies in the future
pub fn validate_valid_until(
    valid_until: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), &'static str> {
    if valid_until <= now {
        return Err("Validity date must be in the future");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate ISO-4217 style currency code (3 uppercase letters)
pub fn validate_currency(code: &str) -> Result<(), &'static str> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err("Currency must be a 3-letter uppercase code")
    }
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}
