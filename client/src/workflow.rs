//! Per-action negotiation workflow
//!
//! Every mutating action runs the same sequence: local validation, optimistic
//! projection through the shared state machine, the remote call, then commit or
//! rollback and a notice. Validation failures stop before the network and are
//! returned for inline display; every other failure is only reported once the
//! server has answered.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    can_counter, counter_hint, route_for, rounds_remaining, validate_items, validate_tax_rate,
    validate_valid_until, AcceptQuoteRequest, Actor, CancelQuoteRequest, CheckExistingParams,
    CounterQuoteRequest, CreateQuoteRequest, CreateRoute, ExtendValidityRequest, IssueQuoteRequest,
    IssueTarget, NegotiationError, NegotiationOutcome, NegotiationResult, PaginatedResponse, Quote,
    QuoteItem, QuoteListFilters, QuoteStateMachine, QuoteStatus, RejectQuoteRequest,
    ReviseQuoteRequest,
};
use uuid::Uuid;

use crate::api::QuoteApi;
use crate::cache::EntityKey;
use crate::coordinator::{OptimisticMutationCoordinator, UpdateTicket};
use crate::error::{ClientError, ClientResult};
use crate::notify::{Notice, Notifier, ViewScope};

/// Whether a new action may replace one still in flight on the same quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationMode {
    #[default]
    Exclusive,
    Supersede,
}

/// Result handed back to the view that started an action
#[derive(Debug)]
pub enum Delivery<T> {
    Delivered(ClientResult<T>),
    /// The view went away first; the cache was still reconciled
    Dropped,
}

impl<T> Delivery<T> {
    pub fn into_result(self) -> Option<ClientResult<T>> {
        match self {
            Delivery::Delivered(result) => Some(result),
            Delivery::Dropped => None,
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, Delivery::Dropped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteAction {
    Issue,
    Accept,
    Reject,
    Counter,
    Cancel,
    Revise,
    Extend,
}

impl QuoteAction {
    fn success_message(&self) -> &'static str {
        match self {
            QuoteAction::Issue => "Quote issued",
            QuoteAction::Accept => "Quote accepted",
            QuoteAction::Reject => "Quote rejected",
            QuoteAction::Counter => "Counter-offer sent",
            QuoteAction::Cancel => "Quote cancelled",
            QuoteAction::Revise => "Quote revised",
            QuoteAction::Extend => "Validity extended",
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            QuoteAction::Issue => "issue",
            QuoteAction::Accept => "accept",
            QuoteAction::Reject => "reject",
            QuoteAction::Counter => "counter",
            QuoteAction::Cancel => "cancel",
            QuoteAction::Revise => "revise",
            QuoteAction::Extend => "extend",
        }
    }
}

/// Server answer to a mutation, split for the coordinator
struct Confirmed<T> {
    quote: Quote,
    affected: Vec<Quote>,
    value: T,
}

impl Confirmed<NegotiationOutcome> {
    fn outcome(outcome: NegotiationOutcome) -> Self {
        Self {
            quote: outcome.data.clone(),
            affected: outcome.affected_quotes.clone(),
            value: outcome,
        }
    }
}

impl Confirmed<Quote> {
    fn quote(quote: Quote) -> Self {
        Self {
            quote: quote.clone(),
            affected: Vec::new(),
            value: quote,
        }
    }
}

/// Which actions a quote's controls should offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionControls {
    /// An update on this quote is still in flight
    pub busy: bool,
    pub read_only: bool,
    pub can_issue: bool,
    pub can_accept: bool,
    pub can_reject: bool,
    pub can_counter: bool,
    pub counter_hint: Option<&'static str>,
    pub rounds_remaining: u32,
    pub can_revise: bool,
    pub can_cancel: bool,
    pub can_extend: bool,
}

impl ActionControls {
    pub fn for_quote(quote: &Quote, busy: bool, now: DateTime<Utc>) -> Self {
        let status = quote.effective_status(now);
        let read_only = status.is_terminal();
        let open = !busy && !read_only;
        let negotiable = open && matches!(status, QuoteStatus::Open | QuoteStatus::Countered);

        Self {
            busy,
            read_only,
            can_issue: open
                && (status.can_transition_to(QuoteStatus::Open)
                    || status.can_transition_to(QuoteStatus::Sent)),
            can_accept: negotiable,
            can_reject: open && status.can_transition_to(QuoteStatus::Rejected),
            can_counter: negotiable && can_counter(quote.round()),
            counter_hint: counter_hint(quote.round()),
            rounds_remaining: rounds_remaining(quote.round()),
            can_revise: open && status.can_transition_to(QuoteStatus::Revised),
            can_cancel: open,
            can_extend: open,
        }
    }
}

/// Quote actions for one signed-in user
#[derive(Clone)]
pub struct QuoteWorkflow {
    api: Arc<dyn QuoteApi>,
    coordinator: Arc<OptimisticMutationCoordinator>,
    notifier: Arc<dyn Notifier>,
    actor: Actor,
    mode: MutationMode,
}

impl QuoteWorkflow {
    pub fn new(
        api: Arc<dyn QuoteApi>,
        coordinator: Arc<OptimisticMutationCoordinator>,
        notifier: Arc<dyn Notifier>,
        actor: Actor,
    ) -> Self {
        Self {
            api,
            coordinator,
            notifier,
            actor,
            mode: MutationMode::Exclusive,
        }
    }

    pub fn with_mode(mut self, mode: MutationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn coordinator(&self) -> &OptimisticMutationCoordinator {
        &self.coordinator
    }

    /// Control state for a cached quote
    pub fn controls(&self, id: Uuid) -> Option<ActionControls> {
        let key = EntityKey::Quote(id);
        let quote = self.coordinator.cache().get(&key)?;
        Some(ActionControls::for_quote(
            &quote,
            self.coordinator.is_busy(&key),
            Utc::now(),
        ))
    }

    /// Drop the session cache and anything still in flight
    pub fn logout(&self) {
        self.coordinator.clear_session();
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn load(&self, scope: &ViewScope, id: Uuid) -> Delivery<Quote> {
        match self.api.get_quote(id).await {
            Ok(quote) => {
                self.coordinator.store_fetched([quote.clone()]);
                self.deliver(scope, Ok(quote))
            }
            Err(err) => self.fail(scope, err),
        }
    }

    pub async fn load_list(
        &self,
        scope: &ViewScope,
        filters: &QuoteListFilters,
    ) -> Delivery<PaginatedResponse<Quote>> {
        match self.api.list_quotes(filters).await {
            Ok(page) => {
                self.coordinator.store_fetched(page.data.iter().cloned());
                self.deliver(scope, Ok(page))
            }
            Err(err) => self.fail(scope, err),
        }
    }

    /// Decide whether "new quote" on an order opens the existing quote or the
    /// create form
    pub async fn start_create(
        &self,
        scope: &ViewScope,
        order_id: Uuid,
        vendor_id: Option<Uuid>,
    ) -> Delivery<CreateRoute> {
        let params = CheckExistingParams {
            order_id: Some(order_id),
            vendor_id,
            status: None,
        };
        match self.api.check_existing(&params).await {
            Ok(check) => {
                if let Some(quote) = &check.quote {
                    self.coordinator.store_fetched([quote.clone()]);
                }
                self.deliver(scope, Ok(route_for(check)))
            }
            Err(err) => self.fail(scope, err),
        }
    }

    pub async fn create(&self, scope: &ViewScope, req: CreateQuoteRequest) -> Delivery<Quote> {
        if let Err(err) = validate_create(&req, Utc::now()) {
            return self.deliver(scope, Err(err.into()));
        }

        match self.api.create_quote(&req).await {
            Ok(quote) => {
                self.coordinator.store_fetched([quote.clone()]);
                self.succeed(scope, "Quote created", quote)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Quote creation failed");
                self.fail(scope, err)
            }
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub async fn issue(&self, scope: &ViewScope, id: Uuid, target: IssueTarget) -> Delivery<Quote> {
        let req = IssueQuoteRequest { status: target };
        self.mutate(
            scope,
            id,
            QuoteAction::Issue,
            |quote, actor, now| QuoteStateMachine::issue(quote, actor, target, now),
            async { self.api.issue_quote(id, &req).await.map(Confirmed::quote) },
        )
        .await
    }

    pub async fn accept(
        &self,
        scope: &ViewScope,
        id: Uuid,
        notes: Option<String>,
    ) -> Delivery<NegotiationOutcome> {
        let req = AcceptQuoteRequest {
            notes: notes.clone(),
        };
        self.mutate(
            scope,
            id,
            QuoteAction::Accept,
            move |quote, actor, now| QuoteStateMachine::accept(quote, actor, notes, now),
            async { self.api.accept_quote(id, &req).await.map(Confirmed::outcome) },
        )
        .await
    }

    pub async fn reject(
        &self,
        scope: &ViewScope,
        id: Uuid,
        reason: &str,
    ) -> Delivery<NegotiationOutcome> {
        let req = RejectQuoteRequest {
            reason: reason.trim().to_string(),
        };
        self.mutate(
            scope,
            id,
            QuoteAction::Reject,
            |quote, actor, now| QuoteStateMachine::reject(quote, actor, reason, now),
            async { self.api.reject_quote(id, &req).await.map(Confirmed::outcome) },
        )
        .await
    }

    pub async fn counter(
        &self,
        scope: &ViewScope,
        id: Uuid,
        price: Decimal,
        notes: Option<String>,
    ) -> Delivery<NegotiationOutcome> {
        let req = CounterQuoteRequest {
            price,
            notes: notes.clone(),
        };
        self.mutate(
            scope,
            id,
            QuoteAction::Counter,
            move |quote, actor, now| QuoteStateMachine::counter(quote, actor, price, notes, now),
            async { self.api.counter_quote(id, &req).await.map(Confirmed::outcome) },
        )
        .await
    }

    pub async fn cancel(
        &self,
        scope: &ViewScope,
        id: Uuid,
        reason: Option<String>,
    ) -> Delivery<Quote> {
        let req = CancelQuoteRequest {
            reason: reason.clone(),
        };
        self.mutate(
            scope,
            id,
            QuoteAction::Cancel,
            move |quote, actor, now| QuoteStateMachine::cancel(quote, actor, reason, now),
            async { self.api.cancel_quote(id, &req).await.map(Confirmed::quote) },
        )
        .await
    }

    pub async fn revise(
        &self,
        scope: &ViewScope,
        id: Uuid,
        items: Vec<QuoteItem>,
        tax_rate: Option<Decimal>,
        notes: Option<String>,
    ) -> Delivery<Quote> {
        let req = ReviseQuoteRequest {
            items: items.clone(),
            tax_rate,
            notes: notes.clone(),
        };
        self.mutate(
            scope,
            id,
            QuoteAction::Revise,
            move |quote, actor, now| QuoteStateMachine::revise(quote, actor, items, tax_rate, notes, now),
            async { self.api.revise_quote(id, &req).await.map(Confirmed::quote) },
        )
        .await
    }

    pub async fn extend_validity(
        &self,
        scope: &ViewScope,
        id: Uuid,
        valid_until: DateTime<Utc>,
    ) -> Delivery<Quote> {
        let req = ExtendValidityRequest { valid_until };
        self.mutate(
            scope,
            id,
            QuoteAction::Extend,
            |quote, actor, now| QuoteStateMachine::extend_validity(quote, actor, valid_until, now),
            async { self.api.extend_validity(id, &req).await.map(Confirmed::quote) },
        )
        .await
    }

    async fn mutate<T, P, F>(
        &self,
        scope: &ViewScope,
        id: Uuid,
        action: QuoteAction,
        project: P,
        remote: F,
    ) -> Delivery<T>
    where
        P: FnOnce(&mut Quote, &Actor, DateTime<Utc>) -> NegotiationResult<()>,
        F: Future<Output = ClientResult<Confirmed<T>>>,
    {
        let current = match self.cached_or_fetch(id).await {
            Ok(quote) => quote,
            Err(err) => return self.fail(scope, err),
        };

        let mut projection = current.clone();
        let projection = match project(&mut projection, &self.actor, Utc::now()) {
            Ok(()) => projection,
            Err(err) if err.is_validation() => {
                return self.deliver(scope, Err(err.into()));
            }
            Err(err) => {
                // The server has the final say; show no change until it answers
                tracing::debug!(quote_id = %id, action = action.as_str(), error = %err, "Local check failed");
                current
            }
        };

        let ticket = match self.start(projection) {
            Ok(ticket) => ticket,
            Err(err) => return self.fail(scope, err),
        };

        match remote.await {
            Ok(confirmed) => {
                self.coordinator
                    .commit(&ticket, confirmed.quote, &confirmed.affected);
                self.succeed(scope, action.success_message(), confirmed.value)
            }
            Err(err) => {
                self.coordinator.rollback(&ticket);
                tracing::warn!(quote_id = %id, action = action.as_str(), error = %err, "Quote action failed, rolled back");
                self.fail(scope, err)
            }
        }
    }

    fn start(&self, projection: Quote) -> ClientResult<UpdateTicket> {
        match self.mode {
            MutationMode::Exclusive => self.coordinator.begin(projection),
            MutationMode::Supersede => Ok(self.coordinator.supersede(projection)),
        }
    }

    async fn cached_or_fetch(&self, id: Uuid) -> ClientResult<Quote> {
        if let Some(quote) = self.coordinator.cache().get(&EntityKey::Quote(id)) {
            return Ok(quote);
        }
        let quote = self.api.get_quote(id).await?;
        self.coordinator.store_fetched([quote.clone()]);
        Ok(quote)
    }

    fn deliver<T>(&self, scope: &ViewScope, result: ClientResult<T>) -> Delivery<T> {
        if scope.is_mounted() {
            Delivery::Delivered(result)
        } else {
            Delivery::Dropped
        }
    }

    fn succeed<T>(&self, scope: &ViewScope, message: &str, value: T) -> Delivery<T> {
        if scope.is_mounted() {
            self.notifier.notify(Notice::success(message));
        }
        self.deliver(scope, Ok(value))
    }

    fn fail<T>(&self, scope: &ViewScope, err: ClientError) -> Delivery<T> {
        if scope.is_mounted() && !err.is_validation() {
            self.notifier.notify(Notice::error(err.user_message()));
        }
        self.deliver(scope, Err(err))
    }
}

/// Checks that can be made on a create form without the server
fn validate_create(req: &CreateQuoteRequest, now: DateTime<Utc>) -> NegotiationResult<()> {
    validate_items(&req.items).map_err(|m| NegotiationError::validation("items", m))?;
    if let Some(rate) = req.tax_rate {
        validate_tax_rate(rate).map_err(|m| NegotiationError::validation("tax_rate", m))?;
    }
    if let Some(valid_until) = req.valid_until {
        validate_valid_until(valid_until, now)
            .map_err(|m| NegotiationError::validation("valid_until", m))?;
    }
    Ok(())
}
