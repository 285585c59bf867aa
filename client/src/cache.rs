//! Session-scoped entity cache
//!
//! Created when a session starts and cleared on logout. Reads are public;
//! writes are crate-private so that every change goes through the
//! [`OptimisticMutationCoordinator`](crate::coordinator::OptimisticMutationCoordinator).

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use shared::Quote;
use uuid::Uuid;

/// Identity of a cached entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Quote(Uuid),
}

impl EntityKey {
    pub fn of(quote: &Quote) -> Self {
        EntityKey::Quote(quote.id)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Quote(id) => write!(f, "quote {}", id),
        }
    }
}

#[derive(Debug, Default)]
pub struct QuoteCache {
    entries: Mutex<HashMap<EntityKey, Quote>>,
}

impl QuoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<EntityKey, Quote>> {
        // Entries stay consistent even if a holder panicked: every write is a
        // single insert or remove
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &EntityKey) -> Option<Quote> {
        self.entries().get(key).cloned()
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entries().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Cached quotes of one order
    pub fn quotes_for_order(&self, order_id: Uuid) -> Vec<Quote> {
        self.entries()
            .values()
            .filter(|q| q.order_id == Some(order_id))
            .cloned()
            .collect()
    }

    pub(crate) fn put(&self, quote: Quote) {
        self.entries().insert(EntityKey::of(&quote), quote);
    }

    /// Restore a snapshot; `None` means the entity was not cached before
    pub(crate) fn restore(&self, key: EntityKey, snapshot: Option<Quote>) {
        let mut entries = self.entries();
        match snapshot {
            Some(quote) => {
                entries.insert(key, quote);
            }
            None => {
                entries.remove(&key);
            }
        }
    }

    pub(crate) fn clear(&self) {
        self.entries().clear();
    }
}
