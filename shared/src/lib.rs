//! Shared types and negotiation rules for the Quote Desk platform
//!
//! This crate contains the quote data model, the negotiation state machine
//! and the REST wire contract shared between the backend, the client crate
//! (native and WASM) and other components of the system.

pub mod api;
pub mod error;
pub mod models;
pub mod negotiation;
pub mod types;
pub mod validation;

pub use api::*;
pub use error::*;
pub use models::*;
pub use negotiation::*;
pub use types::*;
pub use validation::*;
