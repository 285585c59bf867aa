//! Counter-offer round cap
//!
//! The client uses these to disable the counter action; the server runs the
//! same check inside the state machine, so the client side is advisory only.

use crate::error::{NegotiationError, NegotiationResult};

/// Maximum number of counter-offer rounds per quote
pub const MAX_ROUNDS: u32 = 5;

/// Hint shown next to the counter action when the cap is close
pub const MAX_ROUNDS_HINT: &str = "(Maximum 5 rounds)";

/// A counter-offer is allowed while `round < 5`
pub fn can_counter(round: u32) -> bool {
    round < MAX_ROUNDS
}

pub fn rounds_remaining(round: u32) -> u32 {
    MAX_ROUNDS.saturating_sub(round)
}

pub fn ensure_can_counter(round: u32) -> NegotiationResult<()> {
    if can_counter(round) {
        Ok(())
    } else {
        Err(NegotiationError::MaxRoundsReached {
            round,
            max: MAX_ROUNDS,
        })
    }
}

/// UI hint once the quote is one round away from the cap
pub fn counter_hint(round: u32) -> Option<&'static str> {
    (round.saturating_add(1) >= MAX_ROUNDS).then_some(MAX_ROUNDS_HINT)
}
