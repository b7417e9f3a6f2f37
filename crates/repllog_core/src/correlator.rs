//! Deferred binding of log addresses to replication records.
//!
//! An insert reaches the heap before its replication record is built, so
//! its log address is already pending when the record is appended. An
//! update is the other way around: the record is built while indexing (the
//! primary key is known there) and the heap write that produces the log
//! address happens afterwards. The correlator holds the pending addresses
//! and attaches them to the right record.

use crate::record::RecordKind;
use crate::store::ReplicationRecordStore;
use crate::types::{Lsa, Oid};
use tracing::debug;

/// Pending log addresses of one transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LsaCorrelator {
    pending_insert: Option<Lsa>,
    pending_update: Option<Lsa>,
}

impl LsaCorrelator {
    /// Creates a correlator with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pending insert address.
    #[must_use]
    pub fn pending_insert(&self) -> Option<Lsa> {
        self.pending_insert
    }

    /// Returns the pending update address.
    #[must_use]
    pub fn pending_update(&self) -> Option<Lsa> {
        self.pending_update
    }

    /// Records the log address of a heap insert whose replication record
    /// has not been appended yet.
    pub fn note_pending_insert(&mut self, lsa: Lsa) {
        self.pending_insert = Some(lsa);
    }

    /// Records the log address of a heap update whose replication record
    /// was appended earlier.
    pub fn note_pending_update(&mut self, lsa: Lsa) {
        self.pending_update = Some(lsa);
    }

    /// Binds the pending insert address to the freshly appended record at
    /// `index`.
    ///
    /// Only insert records take an address at append time. Returns true if
    /// an address was bound; both pending addresses are then cleared.
    pub fn bind_insert(&mut self, store: &mut ReplicationRecordStore, index: usize) -> bool {
        let Some(lsa) = self.pending_insert else {
            return false;
        };
        match store.get_mut(index) {
            Some(record) if record.kind() == RecordKind::DataInsert => {
                record.set_lsa(lsa);
                self.clear();
                true
            }
            _ => false,
        }
    }

    /// Binds the pending update address to the most recent record for
    /// `instance`.
    ///
    /// The store is scanned from the newest record backwards: the same
    /// instance may have been logged several times and only the latest entry
    /// corresponds to this heap write. On success both pending addresses are
    /// cleared and the record index is returned.
    ///
    /// A miss (no pending update address, or no record for the instance) is
    /// not an error: not every heap update belongs to a replicated class.
    pub fn bind_update(
        &mut self,
        store: &mut ReplicationRecordStore,
        instance: &Oid,
    ) -> Option<usize> {
        let Some(lsa) = self.pending_update else {
            debug!(%instance, "no pending update address to bind");
            return None;
        };
        let Some(index) = store.rposition(instance) else {
            debug!(%instance, %lsa, "no replication record for updated instance");
            return None;
        };

        if let Some(record) = store.get_mut(index) {
            record.set_lsa(lsa);
        }
        self.clear();
        Some(index)
    }

    /// Forgets both pending addresses.
    pub fn clear(&mut self) {
        self.pending_insert = None;
        self.pending_update = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::SystemAllocator;
    use crate::config::ReplicationConfig;
    use crate::record::FlushRequirement;
    use repllog_codec::Value;
    use std::sync::Arc;

    fn store() -> ReplicationRecordStore {
        ReplicationRecordStore::new(&ReplicationConfig::default(), Arc::new(SystemAllocator))
    }

    fn append(store: &mut ReplicationRecordStore, kind: RecordKind, instance: Oid) -> usize {
        let mut key = Value::Int(1);
        store
            .append_data(
                kind,
                instance,
                "orders".to_string(),
                &mut key,
                FlushRequirement::CommitNeedFlush,
            )
            .unwrap()
    }

    #[test]
    fn pending_fields_are_independent() {
        let mut correlator = LsaCorrelator::new();
        correlator.note_pending_insert(Lsa::new(1, 0));
        correlator.note_pending_update(Lsa::new(2, 0));
        assert_eq!(correlator.pending_insert(), Some(Lsa::new(1, 0)));
        assert_eq!(correlator.pending_update(), Some(Lsa::new(2, 0)));
    }

    #[test]
    fn bind_update_targets_most_recent_record() {
        let x = Oid::new(0, 5, 5);
        let y = Oid::new(0, 5, 6);
        let mut store = store();
        for instance in [y, y, x, y, y, x] {
            append(&mut store, RecordKind::DataUpdate, instance);
        }

        let mut correlator = LsaCorrelator::new();
        correlator.note_pending_update(Lsa::new(77, 8));
        assert_eq!(correlator.bind_update(&mut store, &x), Some(5));

        assert_eq!(store.get(5).unwrap().lsa(), Some(Lsa::new(77, 8)));
        assert_eq!(store.get(2).unwrap().lsa(), None);
        assert_eq!(correlator, LsaCorrelator::default());
    }

    #[test]
    fn bind_update_clears_pending_insert_too() {
        let x = Oid::new(0, 5, 5);
        let mut store = store();
        append(&mut store, RecordKind::DataUpdate, x);

        let mut correlator = LsaCorrelator::new();
        correlator.note_pending_insert(Lsa::new(3, 0));
        correlator.note_pending_update(Lsa::new(4, 0));
        correlator.bind_update(&mut store, &x);
        assert_eq!(correlator.pending_insert(), None);
        assert_eq!(correlator.pending_update(), None);
    }

    #[test]
    fn bind_update_miss_is_noop() {
        let mut store = store();
        append(&mut store, RecordKind::DataUpdate, Oid::new(0, 1, 1));

        let mut correlator = LsaCorrelator::new();
        correlator.note_pending_update(Lsa::new(9, 0));
        assert_eq!(correlator.bind_update(&mut store, &Oid::new(0, 1, 2)), None);
        assert_eq!(correlator.pending_update(), Some(Lsa::new(9, 0)));
        assert_eq!(store.get(0).unwrap().lsa(), None);
    }

    #[test]
    fn bind_update_without_pending_address_is_noop() {
        let x = Oid::new(0, 1, 1);
        let mut store = store();
        append(&mut store, RecordKind::DataUpdate, x);

        let mut correlator = LsaCorrelator::new();
        correlator.note_pending_insert(Lsa::new(1, 1));
        assert_eq!(correlator.bind_update(&mut store, &x), None);
        assert_eq!(correlator.pending_insert(), Some(Lsa::new(1, 1)));
    }

    #[test]
    fn bind_insert_only_applies_to_inserts() {
        let mut store = store();
        let update = append(&mut store, RecordKind::DataUpdate, Oid::new(0, 1, 1));
        let insert = append(&mut store, RecordKind::DataInsert, Oid::new(0, 1, 2));

        let mut correlator = LsaCorrelator::new();
        correlator.note_pending_insert(Lsa::new(12, 4));
        assert!(!correlator.bind_insert(&mut store, update));
        assert!(correlator.bind_insert(&mut store, insert));
        assert_eq!(store.get(insert).unwrap().lsa(), Some(Lsa::new(12, 4)));
        assert_eq!(correlator.pending_insert(), None);
    }
}
