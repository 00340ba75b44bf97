//! Process-wide registry of the entities the frontend wants to observe.
//!
//! [`InterestRegistry`] stores the current [`InterestSet`] behind a
//! [`tokio::sync::RwLock`] holding an `Arc`. A write builds the new set
//! off-lock and swaps the `Arc`; a read clones it. Readers therefore see
//! either the old set or the new set in full, never a partial update.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::EntityId;

/// Immutable set of entity ids a client has declared interest in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterestSet {
    ids: HashSet<EntityId>,
}

impl InterestSet {
    /// Builds a set from any sequence of ids. Duplicates collapse.
    #[must_use]
    pub fn from_ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityId>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if `entity_id` is a member.
    #[must_use]
    pub fn contains(&self, entity_id: &str) -> bool {
        self.ids.contains(entity_id)
    }

    /// Number of distinct ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the ids in sorted order.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.ids.iter().cloned().collect();
        ids.sort();
        ids
    }
}

/// Shared holder of the current [`InterestSet`].
///
/// One registry exists per process and is handed to every relay through
/// `Arc`, so all connected clients observe the same filter.
#[derive(Debug, Default)]
pub struct InterestRegistry {
    current: RwLock<Arc<InterestSet>>,
}

impl InterestRegistry {
    /// Creates a registry with an empty interest set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the interest set and returns the resulting size.
    pub async fn set<I, T>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityId>,
    {
        let next = Arc::new(InterestSet::from_ids(ids));
        let count = next.len();
        *self.current.write().await = next;
        count
    }

    /// Returns the current ids (sorted) and their count.
    pub async fn get(&self) -> (Vec<EntityId>, usize) {
        let snapshot = self.snapshot().await;
        (snapshot.sorted_ids(), snapshot.len())
    }

    /// Returns a shared snapshot of the current set.
    pub async fn snapshot(&self) -> Arc<InterestSet> {
        Arc::clone(&*self.current.read().await)
    }
}
