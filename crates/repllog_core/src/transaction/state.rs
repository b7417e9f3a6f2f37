//! Replication state of one transaction.

use crate::alloc::{ReplicationAllocator, SystemAllocator};
use crate::config::ReplicationConfig;
use crate::correlator::LsaCorrelator;
use crate::error::{CoreError, CoreResult};
use crate::flush::FlushMarker;
use crate::record::{RecordKind, ReplicationRecord};
use crate::resolver::ClassResolver;
use crate::savepoint::SavepointLedger;
use crate::store::ReplicationRecordStore;
use crate::types::{Lsa, Oid};
use repllog_codec::Value;
use std::sync::Arc;

/// Everything a transaction records for replication.
///
/// The state is owned by the transaction and mutated only by the worker
/// running it, so every operation takes `&mut self` and nothing locks.
///
/// # Example
///
/// ```
/// use repllog_core::{FlushRequirement, Lsa, Oid, RecordKind, TransactionReplicationState, Value};
///
/// let mut state = TransactionReplicationState::default();
/// let row = Oid::new(0, 42, 7);
///
/// // the heap insert already knows its log address
/// state.note_pending_insert(Lsa::new(100, 16));
/// let mut key = Value::Int(1);
/// let index = state.append_data(RecordKind::DataInsert, row, "orders".into(), &mut key)?;
/// assert_eq!(state.records()[index].lsa(), Some(Lsa::new(100, 16)));
///
/// state.create_savepoint("before_update")?;
/// let mut key = Value::Int(1);
/// state.append_data(RecordKind::DataUpdate, row, "orders".into(), &mut key)?;
/// state.rollback_to_savepoint("before_update")?;
/// assert_eq!(state.records()[1].flush(), FlushRequirement::DontNeedFlush);
/// # Ok::<(), repllog_core::CoreError>(())
/// ```
#[derive(Debug)]
pub struct TransactionReplicationState {
    store: ReplicationRecordStore,
    correlator: LsaCorrelator,
    flush_marker: FlushMarker,
    savepoints: SavepointLedger,
}

impl Default for TransactionReplicationState {
    fn default() -> Self {
        Self::new(&ReplicationConfig::default(), Arc::new(SystemAllocator))
    }
}

impl TransactionReplicationState {
    /// Creates an empty state. No record slots are allocated until the first
    /// data-changing operation.
    pub fn new(config: &ReplicationConfig, allocator: Arc<dyn ReplicationAllocator>) -> Self {
        Self {
            store: ReplicationRecordStore::new(config, Arc::clone(&allocator)),
            correlator: LsaCorrelator::new(),
            flush_marker: FlushMarker::new(),
            savepoints: SavepointLedger::new(allocator),
        }
    }

    /// Returns the record store.
    #[must_use]
    pub fn store(&self) -> &ReplicationRecordStore {
        &self.store
    }

    /// Returns all records in append order.
    #[must_use]
    pub fn records(&self) -> &[ReplicationRecord] {
        self.store.records()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Records that will be propagated, in append order.
    pub fn propagated_records(&self) -> impl Iterator<Item = (usize, &ReplicationRecord)> {
        self.store
            .iter()
            .enumerate()
            .filter(|(_, record)| record.is_propagated())
    }

    /// Returns the savepoint ledger.
    #[must_use]
    pub fn savepoints(&self) -> &SavepointLedger {
        &self.savepoints
    }

    /// Returns the pending insert address.
    #[must_use]
    pub fn pending_insert(&self) -> Option<Lsa> {
        self.correlator.pending_insert()
    }

    /// Returns the pending update address.
    #[must_use]
    pub fn pending_update(&self) -> Option<Lsa> {
        self.correlator.pending_update()
    }

    /// Start of the open flush marking window, if any.
    #[must_use]
    pub fn flush_mark_start(&self) -> Option<usize> {
        self.flush_marker.start()
    }

    /// Appends an insert, update or delete record carrying the class name
    /// and primary key of `instance`.
    ///
    /// The flush requirement comes from the marking window. An insert takes
    /// the pending insert address, if one is waiting. On success `key` is
    /// left as [`Value::Null`].
    ///
    /// # Errors
    ///
    /// See [`ReplicationRecordStore::append_data`].
    pub fn append_data(
        &mut self,
        kind: RecordKind,
        instance: Oid,
        class_name: String,
        key: &mut Value,
    ) -> CoreResult<usize> {
        let flush = self.flush_marker.decide(&self.store, &instance);
        let index = self
            .store
            .append_data(kind, instance, class_name, key, flush)?;
        if kind == RecordKind::DataInsert {
            self.correlator.bind_insert(&mut self.store, index);
        }
        Ok(index)
    }

    /// Appends a delete record without payload.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AllocationFailure`] if growth is refused.
    pub fn append_delete(&mut self, instance: Oid) -> CoreResult<usize> {
        let flush = self.flush_marker.decide(&self.store, &instance);
        self.store.append_delete(instance, flush)
    }

    /// Appends a schema record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AllocationFailure`] if growth or the payload is
    /// refused.
    pub fn append_schema(
        &mut self,
        statement_type: i32,
        class_name: &str,
        ddl: &str,
    ) -> CoreResult<usize> {
        self.store.append_schema(statement_type, class_name, ddl)
    }

    /// Logs an instance change on behalf of the locator.
    ///
    /// Nothing is recorded for classes the resolver does not replicate, in
    /// which case `Ok(None)` is returned and `key` is untouched.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidOperation`] if the class name cannot be resolved
    /// - the errors of [`append_data`](Self::append_data)
    pub fn log_instance_change<R>(
        &mut self,
        resolver: &R,
        class: Option<&Oid>,
        instance: Oid,
        kind: RecordKind,
        key: &mut Value,
    ) -> CoreResult<Option<usize>>
    where
        R: ClassResolver + ?Sized,
    {
        if !resolver.is_replicated(class) {
            return Ok(None);
        }
        let Some(class) = class else {
            return Ok(None);
        };
        let class_name = resolver.class_name(class).ok_or_else(|| {
            CoreError::invalid_operation(format!("no class name for class {class}"))
        })?;
        self.append_data(kind, instance, class_name, key).map(Some)
    }

    /// Stores the log address of a heap insert until its record is appended.
    pub fn note_pending_insert(&mut self, lsa: Lsa) {
        self.correlator.note_pending_insert(lsa);
    }

    /// Stores the log address of a heap update until it is bound.
    pub fn note_pending_update(&mut self, lsa: Lsa) {
        self.correlator.note_pending_update(lsa);
    }

    /// Binds the pending update address to the latest record for `instance`.
    ///
    /// Returns the index of the bound record, or `None` on a miss.
    pub fn bind_update(&mut self, instance: &Oid) -> Option<usize> {
        self.correlator.bind_update(&mut self.store, instance)
    }

    /// Opens the flush marking window (no-op if already open).
    pub fn begin_flush_mark(&mut self) -> usize {
        self.flush_marker.begin(&self.store)
    }

    /// Closes the flush marking window, dropping its records if `discard`.
    ///
    /// Returns the number of records dropped.
    pub fn end_flush_mark(&mut self, discard: bool) -> usize {
        self.flush_marker.end(&mut self.store, discard)
    }

    /// Creates (or moves to the tail) the savepoint `name` at the current
    /// record count.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AllocationFailure`] if a new marker is refused.
    pub fn create_savepoint(&mut self, name: &str) -> CoreResult<()> {
        self.savepoints.create_or_move(name, self.store.len())
    }

    /// Rolls back to the savepoint `name`, suppressing every later record.
    ///
    /// Returns the savepoint's boundary.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SavepointNotFound`] if there is no such savepoint.
    pub fn rollback_to_savepoint(&mut self, name: &str) -> CoreResult<usize> {
        self.savepoints.rollback(name, &mut self.store)
    }

    /// Releases everything: records, savepoints, pending addresses and the
    /// marking window.
    pub fn reset(&mut self) {
        self.store.reset();
        self.savepoints.clear();
        self.correlator.clear();
        self.flush_marker.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FlushRequirement;
    use std::collections::HashMap;

    fn update(state: &mut TransactionReplicationState, instance: Oid) -> usize {
        let mut key = Value::Int(instance.slot.into());
        state
            .append_data(RecordKind::DataUpdate, instance, "orders".into(), &mut key)
            .unwrap()
    }

    fn oid(slot: i16) -> Oid {
        Oid::new(0, 10, slot)
    }

    #[test]
    fn new_state_is_empty() {
        let state = TransactionReplicationState::default();
        assert!(state.is_empty());
        assert_eq!(state.store().capacity(), 0);
        assert_eq!(state.flush_mark_start(), None);
        assert!(state.savepoints().is_empty());
    }

    #[test]
    fn insert_takes_pending_address() {
        let mut state = TransactionReplicationState::default();
        state.note_pending_insert(Lsa::new(5, 0));
        state.note_pending_update(Lsa::new(6, 0));
        let mut key = Value::Int(1);
        let index = state
            .append_data(RecordKind::DataInsert, oid(1), "orders".into(), &mut key)
            .unwrap();
        assert_eq!(state.records()[index].lsa(), Some(Lsa::new(5, 0)));
        assert_eq!(state.pending_insert(), None);
        assert_eq!(state.pending_update(), None);
    }

    #[test]
    fn update_and_delete_leave_pending_insert() {
        let mut state = TransactionReplicationState::default();
        state.note_pending_insert(Lsa::new(5, 0));
        let index = update(&mut state, oid(1));
        let delete = state.append_delete(oid(2)).unwrap();
        let schema = state.append_schema(1, "orders", "DROP INDEX i").unwrap();
        assert_eq!(state.records()[index].lsa(), None);
        assert_eq!(state.records()[delete].lsa(), None);
        assert_eq!(state.records()[schema].lsa(), None);
        assert_eq!(state.pending_insert(), Some(Lsa::new(5, 0)));
    }

    #[test]
    fn update_then_bind() {
        let mut state = TransactionReplicationState::default();
        update(&mut state, oid(1));
        update(&mut state, oid(2));
        state.note_pending_update(Lsa::new(8, 24));
        assert_eq!(state.bind_update(&oid(1)), Some(0));
        assert_eq!(state.records()[0].lsa(), Some(Lsa::new(8, 24)));
        assert_eq!(state.bind_update(&oid(2)), None);
    }

    #[test]
    fn delete_in_window_gets_flush_decision() {
        let mut state = TransactionReplicationState::default();
        state.begin_flush_mark();
        let index = state.append_delete(oid(4)).unwrap();
        assert_eq!(state.records()[index].flush(), FlushRequirement::NeedFlush);
    }

    #[test]
    fn schema_in_window_waits_for_commit() {
        let mut state = TransactionReplicationState::default();
        state.begin_flush_mark();
        let index = state.append_schema(1, "orders", "TRUNCATE orders").unwrap();
        assert_eq!(
            state.records()[index].flush(),
            FlushRequirement::CommitNeedFlush
        );
    }

    #[test]
    fn create_savepoint_twice_refreshes_boundary() {
        let mut state = TransactionReplicationState::default();
        update(&mut state, oid(1));
        state.create_savepoint("sp1").unwrap();
        update(&mut state, oid(2));
        state.create_savepoint("sp1").unwrap();
        assert_eq!(state.savepoints().len(), 1);
        assert_eq!(state.savepoints().get("sp1").unwrap().boundary(), 2);
    }

    #[test]
    fn propagated_records_skip_rolled_back() {
        let mut state = TransactionReplicationState::default();
        update(&mut state, oid(1));
        state.create_savepoint("sp").unwrap();
        update(&mut state, oid(2));
        state.rollback_to_savepoint("sp").unwrap();
        update(&mut state, oid(3));
        let indices: Vec<usize> = state.propagated_records().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn log_instance_change_skips_unreplicated_classes() {
        let mut classes = HashMap::new();
        classes.insert(Oid::new(0, 1, 0), "orders".to_string());
        let mut state = TransactionReplicationState::default();

        let mut key = Value::Int(5);
        let skipped = state
            .log_instance_change(&classes, None, oid(1), RecordKind::DataInsert, &mut key)
            .unwrap();
        assert_eq!(skipped, None);
        assert_eq!(key, Value::Int(5));

        let logged = state
            .log_instance_change(
                &classes,
                Some(&Oid::new(0, 1, 0)),
                oid(1),
                RecordKind::DataInsert,
                &mut key,
            )
            .unwrap();
        assert_eq!(logged, Some(0));
        assert_eq!(key, Value::Null);
    }

    #[test]
    fn log_instance_change_requires_class_name() {
        let classes: HashMap<Oid, String> = HashMap::new();
        let mut state = TransactionReplicationState::default();
        let mut key = Value::Int(5);
        let result = state.log_instance_change(
            &classes,
            Some(&Oid::new(0, 3, 0)),
            oid(1),
            RecordKind::DataUpdate,
            &mut key,
        );
        assert!(matches!(result, Err(CoreError::InvalidOperation { .. })));
        assert!(state.is_empty());
    }

    #[test]
    fn reset_clears_everything() {
        let mut state = TransactionReplicationState::default();
        update(&mut state, oid(1));
        state.create_savepoint("sp").unwrap();
        state.begin_flush_mark();
        state.note_pending_update(Lsa::new(1, 1));
        state.reset();

        assert!(state.is_empty());
        assert_eq!(state.store().capacity(), 0);
        assert!(state.savepoints().is_empty());
        assert_eq!(state.flush_mark_start(), None);
        assert_eq!(state.pending_update(), None);
    }
}
