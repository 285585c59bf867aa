//! Quote negotiation rules
//!
//! - [`QuoteStateMachine`]: legal transitions and the accept / reject /
//!   counter / issue / cancel / revise operations
//! - [`rounds`]: the counter-offer round cap
//! - [`duplicate`]: the one-occupying-quote-per-order guard

pub mod duplicate;
pub mod rounds;
pub mod state_machine;

pub use duplicate::{
    check_existing, default_active_statuses, route_for, CreateRoute, ExistingQuoteCheck,
    ExistingQuoteQuery,
};
pub use rounds::{can_counter, counter_hint, ensure_can_counter, rounds_remaining, MAX_ROUNDS};
pub use state_machine::{
    order_signal_after_reject, IssueTarget, QuoteStateMachine, SUPERSEDED_REJECTION_REASON,
};
