//! HTTP handlers for the Quote Desk server

pub mod health;
pub mod quote;

pub use health::health_check;
pub use quote::{
    accept_quote, cancel_quote, check_existing, counter_quote, create_quote, extend_validity,
    get_quote, get_statistics, issue_quote, list_quotes, reject_quote, revise_quote,
};
