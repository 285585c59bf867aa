//! Optimistic mutation bookkeeping
//!
//! The coordinator is the single place that writes to the [`QuoteCache`]. A
//! mutation starts with [`begin`](OptimisticMutationCoordinator::begin), which
//! captures the cached entity as a rollback snapshot and writes the projection,
//! and ends with exactly one of `commit` or `rollback`.
//!
//! At most one update is live per entity key. A second update on a busy key is
//! refused unless it is started with
//! [`supersede`](OptimisticMutationCoordinator::supersede); the superseding
//! update inherits the first one's snapshot and the first one's resolution is
//! ignored when it arrives.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use shared::Quote;
use uuid::Uuid;

use crate::cache::{EntityKey, QuoteCache};
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    Pending,
    Confirmed,
    RolledBack,
    Superseded,
}

/// One optimistic change in flight
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticUpdate {
    pub id: Uuid,
    pub key: EntityKey,
    /// Cached value before the first of a chain of updates; `None` when the
    /// entity was not cached
    pub from: Option<Quote>,
    pub to: Quote,
    pub status: UpdateStatus,
}

/// Handle for resolving an update started with `begin` or `supersede`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateTicket {
    pub id: Uuid,
    pub key: EntityKey,
}

/// What a resolution did to the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Confirmed,
    RolledBack,
    /// The update had been superseded or the session was cleared
    Ignored,
}

#[derive(Debug, Default)]
pub struct OptimisticMutationCoordinator {
    cache: QuoteCache,
    in_flight: Mutex<HashMap<EntityKey, OptimisticUpdate>>,
}

impl OptimisticMutationCoordinator {
    pub fn new(cache: QuoteCache) -> Self {
        Self {
            cache,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<EntityKey, OptimisticUpdate>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// True while an update on the key is unresolved
    pub fn is_busy(&self, key: &EntityKey) -> bool {
        self.in_flight().contains_key(key)
    }

    pub fn pending(&self, key: &EntityKey) -> Option<OptimisticUpdate> {
        self.in_flight().get(key).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.in_flight().len()
    }

    /// Capture the snapshot and write the projection
    pub fn begin(&self, projection: Quote) -> ClientResult<UpdateTicket> {
        let key = EntityKey::of(&projection);
        let mut in_flight = self.in_flight();
        if in_flight.contains_key(&key) {
            tracing::debug!(%key, "Optimistic update refused, key busy");
            return Err(ClientError::MutationInFlight(key.to_string()));
        }

        let snapshot = self.cache.get(&key);
        Ok(self.start(&mut in_flight, key, snapshot, projection))
    }

    /// Replace any live update on the key, keeping its snapshot
    pub fn supersede(&self, projection: Quote) -> UpdateTicket {
        let key = EntityKey::of(&projection);
        let mut in_flight = self.in_flight();
        let snapshot = match in_flight.remove(&key) {
            Some(previous) => {
                tracing::debug!(%key, update_id = %previous.id, "Optimistic update superseded");
                previous.from
            }
            None => self.cache.get(&key),
        };
        self.start(&mut in_flight, key, snapshot, projection)
    }

    fn start(
        &self,
        in_flight: &mut HashMap<EntityKey, OptimisticUpdate>,
        key: EntityKey,
        snapshot: Option<Quote>,
        projection: Quote,
    ) -> UpdateTicket {
        let update = OptimisticUpdate {
            id: Uuid::new_v4(),
            key,
            from: snapshot,
            to: projection.clone(),
            status: UpdateStatus::Pending,
        };
        let ticket = UpdateTicket { id: update.id, key };

        self.cache.put(projection);
        in_flight.insert(key, update);
        tracing::debug!(%key, update_id = %ticket.id, "Optimistic update started");
        ticket
    }

    /// Take the live update for a ticket, if it is still the live one
    fn take(
        in_flight: &mut HashMap<EntityKey, OptimisticUpdate>,
        ticket: &UpdateTicket,
    ) -> Option<OptimisticUpdate> {
        match in_flight.get(&ticket.key) {
            Some(update) if update.id == ticket.id => in_flight.remove(&ticket.key),
            _ => None,
        }
    }

    /// Replace the projection with the server's version.
    ///
    /// `affected` are other quotes the server changed as part of the action;
    /// they are written as well, or become the new snapshot of a sibling that
    /// has its own update in flight.
    pub fn commit(&self, ticket: &UpdateTicket, confirmed: Quote, affected: &[Quote]) -> Resolution {
        let mut in_flight = self.in_flight();
        let Some(update) = Self::take(&mut in_flight, ticket) else {
            tracing::debug!(key = %ticket.key, update_id = %ticket.id, "Stale confirmation ignored");
            return Resolution::Ignored;
        };

        self.cache.put(confirmed);
        for sibling in affected {
            let key = EntityKey::of(sibling);
            match in_flight.get_mut(&key) {
                Some(other) => other.from = Some(sibling.clone()),
                None => self.cache.put(sibling.clone()),
            }
        }

        tracing::debug!(key = %update.key, update_id = %update.id, "Optimistic update confirmed");
        Resolution::Confirmed
    }

    /// Put the snapshot back exactly as captured
    pub fn rollback(&self, ticket: &UpdateTicket) -> Resolution {
        let mut in_flight = self.in_flight();
        let Some(update) = Self::take(&mut in_flight, ticket) else {
            tracing::debug!(key = %ticket.key, update_id = %ticket.id, "Stale rollback ignored");
            return Resolution::Ignored;
        };

        tracing::debug!(key = %update.key, update_id = %update.id, "Optimistic update rolled back");
        self.cache.restore(update.key, update.from);
        Resolution::RolledBack
    }

    /// Write quotes read from the server. Keys with a live update keep their
    /// projection; the fetched value becomes their snapshot instead.
    pub fn store_fetched<I>(&self, quotes: I)
    where
        I: IntoIterator<Item = Quote>,
    {
        let mut in_flight = self.in_flight();
        for quote in quotes {
            match in_flight.get_mut(&EntityKey::of(&quote)) {
                Some(update) => update.from = Some(quote),
                None => self.cache.put(quote),
            }
        }
    }

    /// Drop everything on logout. Updates still in flight resolve as ignored.
    pub fn clear_session(&self) {
        let mut in_flight = self.in_flight();
        let dropped = in_flight.len();
        in_flight.clear();
        self.cache.clear();
        tracing::debug!(dropped_updates = dropped, "Session cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use shared::{
        Actor, IssueTarget, NewQuote, Party, QuoteItem, QuoteStateMachine, QuoteStatus,
        DEFAULT_CURRENCY,
    };

    fn open_quote(order_id: Uuid) -> Quote {
        let now = Utc::now();
        let actor = Actor::system();
        let mut quote = Quote::draft(
            NewQuote {
                order_id: Some(order_id),
                vendor: Party::new(Uuid::new_v4(), "PT Vendor", None),
                customer: Party::new(Uuid::new_v4(), "PT Customer", None),
                currency: DEFAULT_CURRENCY.to_string(),
                items: vec![QuoteItem::new("Bracket", 10, Decimal::from(100_000))],
                tax_rate: Decimal::ZERO,
                valid_until: now + Duration::days(30),
            },
            &actor,
            now,
        );
        QuoteStateMachine::issue(&mut quote, &actor, IssueTarget::Open, now).unwrap();
        quote
    }

    fn accepted(quote: &Quote) -> Quote {
        let mut projection = quote.clone();
        QuoteStateMachine::accept(&mut projection, &Actor::system(), None, Utc::now()).unwrap();
        projection
    }

    fn seeded(quote: &Quote) -> OptimisticMutationCoordinator {
        let coordinator = OptimisticMutationCoordinator::default();
        coordinator.store_fetched([quote.clone()]);
        coordinator
    }

    #[test]
    fn test_begin_writes_projection() {
        let quote = open_quote(Uuid::new_v4());
        let coordinator = seeded(&quote);
        let key = EntityKey::of(&quote);

        let ticket = coordinator.begin(accepted(&quote)).unwrap();
        assert_eq!(coordinator.cache().get(&key).unwrap().status(), QuoteStatus::Accepted);
        assert!(coordinator.is_busy(&key));

        let pending = coordinator.pending(&key).unwrap();
        assert_eq!(pending.id, ticket.id);
        assert_eq!(pending.from.as_ref(), Some(&quote));
        assert_eq!(pending.status, UpdateStatus::Pending);
    }

    #[test]
    fn test_resolved_updates_leave_tracking() {
        let quote = open_quote(Uuid::new_v4());
        let coordinator = seeded(&quote);
        let key = EntityKey::of(&quote);

        let first = coordinator.begin(accepted(&quote)).unwrap();
        let second = coordinator.supersede(accepted(&quote));
        let live = coordinator.pending(&key).unwrap();
        assert_eq!((live.id, live.status), (second.id, UpdateStatus::Pending));
        assert_eq!(coordinator.pending_count(), 1);

        assert_eq!(coordinator.commit(&second, accepted(&quote), &[]), Resolution::Confirmed);
        assert_eq!(coordinator.pending(&key), None);
        assert_eq!(coordinator.rollback(&first), Resolution::Ignored);

        let third = coordinator.begin(quote.clone()).unwrap();
        assert_eq!(coordinator.rollback(&third), Resolution::RolledBack);
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[test]
    fn test_rollback_restores_exact_snapshot() {
        let quote = open_quote(Uuid::new_v4());
        let coordinator = seeded(&quote);
        let key = EntityKey::of(&quote);

        let ticket = coordinator.begin(accepted(&quote)).unwrap();
        assert_eq!(coordinator.rollback(&ticket), Resolution::RolledBack);
        assert_eq!(coordinator.cache().get(&key), Some(quote));
        assert!(!coordinator.is_busy(&key));
    }

    #[test]
    fn test_rollback_of_uncached_entity_removes_it() {
        let quote = open_quote(Uuid::new_v4());
        let coordinator = OptimisticMutationCoordinator::default();
        let ticket = coordinator.begin(quote.clone()).unwrap();
        coordinator.rollback(&ticket);
        assert!(!coordinator.cache().contains(&EntityKey::of(&quote)));
    }

    #[test]
    fn test_second_begin_refused_while_busy() {
        let quote = open_quote(Uuid::new_v4());
        let coordinator = seeded(&quote);
        coordinator.begin(accepted(&quote)).unwrap();

        let err = coordinator.begin(quote.clone()).unwrap_err();
        assert!(matches!(err, ClientError::MutationInFlight(_)));
    }

    #[test]
    fn test_supersede_inherits_snapshot_and_ignores_first() {
        let quote = open_quote(Uuid::new_v4());
        let coordinator = seeded(&quote);
        let key = EntityKey::of(&quote);

        let first = coordinator.begin(accepted(&quote)).unwrap();
        let mut countered = quote.clone();
        QuoteStateMachine::counter(
            &mut countered,
            &Actor::system(),
            Decimal::from(900_000),
            None,
            Utc::now(),
        )
        .unwrap();
        let second = coordinator.supersede(countered.clone());

        assert_eq!(coordinator.pending(&key).unwrap().from.as_ref(), Some(&quote));
        assert_eq!(coordinator.commit(&first, accepted(&quote), &[]), Resolution::Ignored);
        assert_eq!(coordinator.cache().get(&key), Some(countered));

        assert_eq!(coordinator.rollback(&second), Resolution::RolledBack);
        assert_eq!(coordinator.cache().get(&key), Some(quote));
    }

    #[test]
    fn test_commit_writes_server_version_and_siblings() {
        let order_id = Uuid::new_v4();
        let quote = open_quote(order_id);
        let sibling = open_quote(order_id);
        let coordinator = seeded(&quote);
        coordinator.store_fetched([sibling.clone()]);

        let ticket = coordinator.begin(accepted(&quote)).unwrap();
        let server = accepted(&quote);
        let mut rejected = sibling.clone();
        QuoteStateMachine::reject(&mut rejected, &Actor::system(), "Another quote won", Utc::now())
            .unwrap();

        assert_eq!(
            coordinator.commit(&ticket, server.clone(), &[rejected.clone()]),
            Resolution::Confirmed
        );
        assert_eq!(coordinator.cache().get(&EntityKey::of(&quote)), Some(server));
        assert_eq!(coordinator.cache().get(&EntityKey::of(&sibling)), Some(rejected));
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[test]
    fn test_sibling_in_flight_gets_new_snapshot() {
        let order_id = Uuid::new_v4();
        let quote = open_quote(order_id);
        let sibling = open_quote(order_id);
        let coordinator = seeded(&quote);
        coordinator.store_fetched([sibling.clone()]);

        let sibling_ticket = coordinator.begin(accepted(&sibling)).unwrap();
        let ticket = coordinator.begin(accepted(&quote)).unwrap();
        let mut rejected = sibling.clone();
        QuoteStateMachine::reject(&mut rejected, &Actor::system(), "Another quote won", Utc::now())
            .unwrap();
        coordinator.commit(&ticket, accepted(&quote), &[rejected.clone()]);

        coordinator.rollback(&sibling_ticket);
        assert_eq!(coordinator.cache().get(&EntityKey::of(&sibling)), Some(rejected));
    }

    #[test]
    fn test_clear_session_ignores_late_results() {
        let quote = open_quote(Uuid::new_v4());
        let coordinator = seeded(&quote);
        let ticket = coordinator.begin(accepted(&quote)).unwrap();

        coordinator.clear_session();
        assert!(coordinator.cache().is_empty());
        assert_eq!(coordinator.commit(&ticket, accepted(&quote), &[]), Resolution::Ignored);
        assert!(coordinator.cache().is_empty());
    }
}
