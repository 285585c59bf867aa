//! Business logic services for the Quote Desk server

pub mod order;
pub mod quote;

pub use order::OrderStageService;
pub use quote::QuoteService;
