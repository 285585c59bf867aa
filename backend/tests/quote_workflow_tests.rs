//! Quote negotiation workflow tests
//!
//! Properties the server relies on when it replays the state machine:
//! - accept only from open/countered within validity, failures leave the quote untouched
//! - counter increments the round by exactly one and never past the cap
//! - reject validates the reason and never appends duplicate history
//! - accepting one quote of an order closes every other quote holding it

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    order_signal_after_reject, Actor, IssueTarget, NegotiationAction, NegotiationError, NewQuote,
    OrderStage, OrderStageSignal, Party, Quote, QuoteItem, QuoteStateMachine, QuoteStatus,
    MAX_ROUNDS,
};
use uuid::Uuid;

fn actor() -> Actor {
    Actor::user(Uuid::new_v4(), "Sales Admin")
}

fn draft(order_id: Uuid, unit_price: i64, quantity: u32, now: DateTime<Utc>) -> Quote {
    Quote::draft(
        NewQuote {
            order_id: Some(order_id),
            vendor: Party::new(Uuid::new_v4(), "PT Etching Jaya", None),
            customer: Party::new(Uuid::new_v4(), "CV Maju", None),
            currency: "IDR".to_string(),
            items: vec![QuoteItem::new("Brass plate", quantity, Decimal::from(unit_price))],
            tax_rate: Decimal::ZERO,
            valid_until: now + Duration::days(30),
        },
        &actor(),
        now,
    )
}

fn open(order_id: Uuid, total: i64, now: DateTime<Utc>) -> Quote {
    let mut quote = draft(order_id, total, 1, now);
    QuoteStateMachine::issue(&mut quote, &actor(), IssueTarget::Open, now).unwrap();
    quote
}

/// Drive a quote to a given status through legal transitions only
fn quote_in(status: QuoteStatus, now: DateTime<Utc>) -> Quote {
    let a = actor();
    let mut quote = draft(Uuid::new_v4(), 1_000, 1, now);
    match status {
        QuoteStatus::Draft => {}
        QuoteStatus::Open => QuoteStateMachine::issue(&mut quote, &a, IssueTarget::Open, now).unwrap(),
        QuoteStatus::Sent => QuoteStateMachine::issue(&mut quote, &a, IssueTarget::Sent, now).unwrap(),
        QuoteStatus::Countered => {
            QuoteStateMachine::issue(&mut quote, &a, IssueTarget::Open, now).unwrap();
            QuoteStateMachine::counter(&mut quote, &a, Decimal::from(900), None, now).unwrap();
        }
        QuoteStatus::Accepted => {
            QuoteStateMachine::issue(&mut quote, &a, IssueTarget::Open, now).unwrap();
            QuoteStateMachine::accept(&mut quote, &a, None, now).unwrap();
        }
        QuoteStatus::Rejected => {
            QuoteStateMachine::issue(&mut quote, &a, IssueTarget::Open, now).unwrap();
            QuoteStateMachine::reject(&mut quote, &a, "Price too high for us", now).unwrap();
        }
        QuoteStatus::Cancelled => QuoteStateMachine::cancel(&mut quote, &a, None, now).unwrap(),
        QuoteStatus::Revised => {
            QuoteStateMachine::issue(&mut quote, &a, IssueTarget::Open, now).unwrap();
            let items = vec![QuoteItem::new("Brass plate", 2, Decimal::from(450))];
            QuoteStateMachine::revise(&mut quote, &a, items, None, None, now).unwrap();
        }
        QuoteStatus::Expired => {
            QuoteStateMachine::issue(&mut quote, &a, IssueTarget::Open, now).unwrap();
            let lapsed_at = quote.valid_until;
            QuoteStateMachine::expire_if_due(&mut quote, lapsed_at);
        }
    }
    assert_eq!(quote.status(), status);
    quote
}

fn any_status() -> impl Strategy<Value = QuoteStatus> {
    prop::sample::select(QuoteStatus::ALL.to_vec())
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Accept succeeds only from open/countered; any failure leaves the quote as it was
    #[test]
    fn prop_accept_preconditions(status in any_status()) {
        let now = Utc::now();
        let mut quote = quote_in(status, now);
        let before = quote.clone();

        let result = QuoteStateMachine::accept(&mut quote, &actor(), None, now);
        match status {
            QuoteStatus::Open | QuoteStatus::Countered => {
                prop_assert!(result.is_ok());
                prop_assert_eq!(quote.status(), QuoteStatus::Accepted);
                prop_assert_eq!(quote.history().len(), before.history().len() + 1);
            }
            QuoteStatus::Accepted => {
                prop_assert_eq!(result, Err(NegotiationError::AlreadyAccepted));
                prop_assert_eq!(&quote, &before);
            }
            QuoteStatus::Expired => {
                prop_assert_eq!(result, Err(NegotiationError::QuoteExpired));
                prop_assert_eq!(&quote, &before);
            }
            _ => {
                let is_invalid_transition = matches!(result, Err(NegotiationError::InvalidTransition { .. }));
                prop_assert!(is_invalid_transition);
                prop_assert_eq!(&quote, &before);
            }
        }
    }

    /// A quote past its validity can never be accepted
    #[test]
    fn prop_accept_after_validity_fails(days_past in 0i64..365) {
        let now = Utc::now();
        let mut quote = open(Uuid::new_v4(), 1_000, now - Duration::days(400));
        quote.valid_until = now - Duration::days(days_past);
        let before = quote.clone();

        prop_assert_eq!(
            QuoteStateMachine::accept(&mut quote, &actor(), None, now),
            Err(NegotiationError::QuoteExpired)
        );
        prop_assert_eq!(quote, before);
    }

    /// Each counter adds exactly one round; the sixth attempt fails
    #[test]
    fn prop_counter_rounds_capped(
        prices in prop::collection::vec(1i64..10_000_000, 1..10),
    ) {
        let now = Utc::now();
        let mut quote = open(Uuid::new_v4(), 10_000_001, now);

        for price in prices {
            let before = quote.clone();
            let result =
                QuoteStateMachine::counter(&mut quote, &actor(), Decimal::from(price), None, now);

            if before.round() >= MAX_ROUNDS {
                prop_assert_eq!(
                    result,
                    Err(NegotiationError::MaxRoundsReached { round: before.round(), max: MAX_ROUNDS })
                );
                prop_assert_eq!(&quote, &before);
            } else if Decimal::from(price) == before.grand_total() {
                prop_assert!(result.unwrap_err().is_validation());
                prop_assert_eq!(&quote, &before);
            } else {
                prop_assert!(result.is_ok());
                prop_assert_eq!(quote.round(), before.round() + 1);
                prop_assert_eq!(quote.grand_total(), Decimal::from(price));
            }
            prop_assert!(quote.round() <= MAX_ROUNDS);
        }
    }

    /// A counter lands the grand total on the offered price across many lines
    #[test]
    fn prop_counter_lands_on_price_with_many_lines(
        lines in prop::collection::vec((2u32..500, 1i64..1_000_000), 2..6),
        tax_percent in 0i64..=100,
        cents in 100_000i64..10_000_000_000,
    ) {
        let now = Utc::now();
        let items = lines
            .iter()
            .enumerate()
            .map(|(i, (quantity, unit_price))| {
                QuoteItem::new(format!("Line {i}"), *quantity, Decimal::from(*unit_price))
            })
            .collect();
        let mut quote = Quote::draft(
            NewQuote {
                order_id: Some(Uuid::new_v4()),
                vendor: Party::new(Uuid::new_v4(), "PT Etching Jaya", None),
                customer: Party::new(Uuid::new_v4(), "CV Maju", None),
                currency: "IDR".to_string(),
                items,
                tax_rate: Decimal::new(tax_percent, 2),
                valid_until: now + Duration::days(30),
            },
            &actor(),
            now,
        );
        QuoteStateMachine::issue(&mut quote, &actor(), IssueTarget::Open, now).unwrap();
        let price = Decimal::new(cents, 2);
        prop_assume!(price != quote.grand_total());

        QuoteStateMachine::counter(&mut quote, &actor(), price, None, now).unwrap();

        prop_assert_eq!(quote.grand_total(), price);
        prop_assert_eq!(
            quote.history().last().and_then(|entry| entry.new_offer),
            Some(price)
        );
        prop_assert!(quote.items().iter().all(|item| item.unit_price >= Decimal::ZERO));
    }

    /// Short reasons never change the quote
    #[test]
    fn prop_short_reason_rejected(reason in "[a-z ]{0,9}") {
        let now = Utc::now();
        let mut quote = open(Uuid::new_v4(), 1_000, now);
        let before = quote.clone();

        let err = QuoteStateMachine::reject(&mut quote, &actor(), &reason, now).unwrap_err();
        prop_assert!(err.is_validation());
        prop_assert_eq!(quote, before);
    }

    /// Grand total always equals the derived item total
    #[test]
    fn prop_grand_total_derived(
        unit_price in 1i64..1_000_000,
        quantity in 1u32..1_000,
        tax_percent in 0i64..=100,
    ) {
        let now = Utc::now();
        let mut quote = open(Uuid::new_v4(), 1_000, now);
        let tax_rate = Decimal::new(tax_percent, 2);
        let items = vec![QuoteItem::new("Plate", quantity, Decimal::from(unit_price))];
        QuoteStateMachine::revise(&mut quote, &actor(), items.clone(), Some(tax_rate), None, now).unwrap();

        prop_assert_eq!(quote.grand_total(), shared::derive_grand_total(&items, tax_rate));
    }
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[cfg(test)]
mod scenario_tests {
    use super::*;

    /// Scenario A: counter at round four reaches the cap
    #[test]
    fn test_counter_reaches_round_cap() {
        let now = Utc::now();
        let mut quote = open(Uuid::new_v4(), 1_000_000, now);
        for price in [990_000, 980_000, 970_000, 960_000] {
            QuoteStateMachine::counter(&mut quote, &actor(), Decimal::from(price), None, now).unwrap();
        }
        assert_eq!(quote.round(), 4);
        let a = actor();
        QuoteStateMachine::counter(&mut quote, &a, Decimal::from(900_000), None, now).unwrap();

        assert_eq!(quote.round(), 5);
        assert_eq!(quote.status(), QuoteStatus::Countered);
        assert_eq!(quote.grand_total(), Decimal::from(900_000));
        assert!(!shared::can_counter(quote.round()));
        assert_eq!(shared::counter_hint(quote.round()), Some("(Maximum 5 rounds)"));
    }

    /// Scenario B: the sixth counter is refused
    #[test]
    fn test_counter_past_cap_refused() {
        let now = Utc::now();
        let mut quote = open(Uuid::new_v4(), 1_000_000, now);
        for price in [990_000, 980_000, 970_000, 960_000, 950_000] {
            QuoteStateMachine::counter(&mut quote, &actor(), Decimal::from(price), None, now).unwrap();
        }
        let before = quote.clone();

        let result = QuoteStateMachine::counter(&mut quote, &actor(), Decimal::from(800_000), None, now);
        assert_eq!(result, Err(NegotiationError::MaxRoundsReached { round: 5, max: 5 }));
        assert_eq!(quote, before);
    }

    /// Scenario C: expired quote cannot be accepted, lapse is recorded on read
    #[test]
    fn test_expired_quote_accept() {
        let now = Utc::now();
        let mut quote = open(Uuid::new_v4(), 1_000_000, now - Duration::days(31));
        assert!(quote.valid_until < now);

        assert_eq!(
            QuoteStateMachine::accept(&mut quote, &actor(), None, now),
            Err(NegotiationError::QuoteExpired)
        );
        assert_eq!(quote.effective_status(now), QuoteStatus::Expired);
        assert!(QuoteStateMachine::expire_if_due(&mut quote, now));
        assert_eq!(quote.history().count(NegotiationAction::Expired), 1);
    }

    /// Scenario D: short rejection reason
    #[test]
    fn test_short_rejection_reason() {
        let now = Utc::now();
        let mut quote = open(Uuid::new_v4(), 1_000_000, now);
        let entries = quote.history().len();

        let err = QuoteStateMachine::reject(&mut quote, &actor(), "no", now).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(quote.history().len(), entries);
        assert_eq!(quote.status(), QuoteStatus::Open);
    }

    /// Scenario E: accepting one quote closes the other and advances the order
    #[test]
    fn test_accept_closes_siblings() {
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let mut a = open(order_id, 1_000_000, now);
        let b = open(order_id, 1_100_000, now);
        let a_actor = actor();

        QuoteStateMachine::accept(&mut a, &a_actor, None, now).unwrap();
        let mut siblings = vec![b];
        let affected = QuoteStateMachine::settle_order_after_accept(&a, &mut siblings, &a_actor, now);
        let signal = OrderStageSignal::advance_for(a.grand_total());

        assert_eq!(a.status(), QuoteStatus::Accepted);
        assert_eq!(siblings[0].status(), QuoteStatus::Rejected);
        assert_eq!(affected.len(), 1);
        assert_eq!(signal.target_stage(), OrderStage::CustomerQuote);
        assert_eq!(
            signal,
            OrderStageSignal::AdvanceToCustomerQuote {
                vendor_quoted_price: Decimal::from(1_000_000),
                quotation_amount: Decimal::from(1_350_000),
            }
        );
        // Exactly one accepted quote per order
        let accepted = [&a, &siblings[0]]
            .iter()
            .filter(|q| q.status() == QuoteStatus::Accepted)
            .count();
        assert_eq!(accepted, 1);
    }

    /// Rejecting the last quote of an order sends it back to sourcing
    #[test]
    fn test_last_rejection_reverts_order() {
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let mut only = open(order_id, 1_000_000, now);
        QuoteStateMachine::reject(&mut only, &actor(), "Lead time is too long", now).unwrap();

        let signal = order_signal_after_reject(&[only], now);
        assert_eq!(signal, Some(OrderStageSignal::RevertToVendorSourcing));
        assert_eq!(signal.map(|s| s.target_stage()), Some(OrderStage::VendorSourcing));
    }

    /// Rejecting twice does not duplicate history
    #[test]
    fn test_double_reject() {
        let now = Utc::now();
        let mut quote = open(Uuid::new_v4(), 1_000, now);
        QuoteStateMachine::reject(&mut quote, &actor(), "Price too high for us", now).unwrap();
        let rejected = quote.history().count(NegotiationAction::Rejected);

        let err = QuoteStateMachine::reject(&mut quote, &actor(), "Price too high for us", now);
        assert!(matches!(err, Err(NegotiationError::InvalidTransition { .. })));
        assert_eq!(quote.history().count(NegotiationAction::Rejected), rejected);
    }
}
