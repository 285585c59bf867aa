//! Quote Desk client
//!
//! Consumes the quote REST API and keeps a session cache in step with it:
//! - [`QuoteCache`] and the [`OptimisticMutationCoordinator`] that owns all
//!   writes to it
//! - [`QuoteWorkflow`] for per-action validation, projection and reconcile
//! - [`bindings`] for advisory checks from JavaScript

pub mod api;
pub mod bindings;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod notify;
pub mod workflow;

pub use api::{HttpQuoteApi, QuoteApi};
pub use cache::{EntityKey, QuoteCache};
pub use config::ClientConfig;
pub use coordinator::{OptimisticMutationCoordinator, OptimisticUpdate, Resolution, UpdateStatus, UpdateTicket};
pub use error::{ClientError, ClientResult, FALLBACK_MESSAGE};
pub use notify::{Notice, NoticeBoard, NoticeLevel, Notifier, ViewScope};
pub use workflow::{ActionControls, Delivery, MutationMode, QuoteWorkflow};

use std::sync::Arc;

use shared::Actor;

/// Start a session: one cache, one coordinator and an HTTP-backed workflow
pub fn start_session(
    config: ClientConfig,
    notifier: Arc<dyn Notifier>,
    actor: Actor,
) -> ClientResult<QuoteWorkflow> {
    let api = HttpQuoteApi::new(config)?;
    let coordinator = OptimisticMutationCoordinator::new(QuoteCache::new());
    Ok(QuoteWorkflow::new(
        Arc::new(api),
        Arc::new(coordinator),
        notifier,
        actor,
    ))
}
