//! Test fixtures and state helpers.

use crate::allocator::TrackingAllocator;
use repllog_core::{
    ClassResolver, Oid, RecordKind, ReplicationConfig, TransactionReplicationState, Value,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Class name used by the fixtures.
pub const TEST_CLASS: &str = "orders";

/// Instance identifier in the fixture heap.
pub fn instance(slot: i16) -> Oid {
    Oid::new(0, 1000, slot)
}

/// Class identifier in the fixture catalog.
pub fn class_oid(n: i16) -> Oid {
    Oid::new(0, 1, n)
}

/// Creates a state whose allocations are tracked.
pub fn tracked_state(
    config: &ReplicationConfig,
) -> (TransactionReplicationState, Arc<TrackingAllocator>) {
    let allocator = Arc::new(TrackingAllocator::new());
    let state = TransactionReplicationState::new(config, allocator.clone());
    (state, allocator)
}

/// Appends one update record per slot and returns their indices.
///
/// # Panics
///
/// Panics if an append fails.
pub fn append_updates(
    state: &mut TransactionReplicationState,
    slots: impl IntoIterator<Item = i16>,
) -> Vec<usize> {
    slots
        .into_iter()
        .map(|slot| {
            let mut key = Value::Int(i32::from(slot));
            state
                .append_data(
                    RecordKind::DataUpdate,
                    instance(slot),
                    TEST_CLASS.to_string(),
                    &mut key,
                )
                .expect("Failed to append update record")
        })
        .collect()
}

/// Class resolver backed by in-memory maps.
#[derive(Debug, Clone, Default)]
pub struct MapClassResolver {
    names: HashMap<Oid, String>,
    unreplicated: HashSet<Oid>,
}

impl MapClassResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a replicated class.
    #[must_use]
    pub fn with_class(mut self, class: Oid, name: impl Into<String>) -> Self {
        self.names.insert(class, name.into());
        self
    }

    /// Adds a class whose changes are not replicated.
    #[must_use]
    pub fn with_unreplicated(mut self, class: Oid, name: impl Into<String>) -> Self {
        self.names.insert(class, name.into());
        self.unreplicated.insert(class);
        self
    }
}

impl ClassResolver for MapClassResolver {
    fn class_name(&self, class: &Oid) -> Option<String> {
        self.names.get(class).cloned()
    }

    fn is_replicated(&self, class: Option<&Oid>) -> bool {
        class.is_some_and(|class| !self.unreplicated.contains(class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracked_state_counts_payloads() {
        let (mut state, allocator) = tracked_state(&ReplicationConfig::default());
        append_updates(&mut state, 0..3);
        assert_eq!(allocator.live_payloads(), 3);
        drop(state);
        assert_eq!(allocator.live_payloads(), 0);
    }

    #[test]
    fn resolver_filters_unreplicated() {
        let resolver = MapClassResolver::new()
            .with_class(class_oid(1), "orders")
            .with_unreplicated(class_oid(2), "audit");
        assert!(resolver.is_replicated(Some(&class_oid(1))));
        assert!(!resolver.is_replicated(Some(&class_oid(2))));
        assert!(!resolver.is_replicated(None));
        assert_eq!(resolver.class_name(&class_oid(2)).as_deref(), Some("audit"));
    }
}
