//! Domain models for the Quote Desk platform

mod history;
mod order;
mod party;
mod quote;

pub use history::*;
pub use order::*;
pub use party::*;
pub use quote::*;
