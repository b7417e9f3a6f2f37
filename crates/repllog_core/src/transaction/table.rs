//! Replication states of all live transactions.

use crate::alloc::{ReplicationAllocator, SystemAllocator};
use crate::config::ReplicationConfig;
use crate::dump::dump_state;
use crate::error::{CoreError, CoreResult};
use crate::record::ReplicationRecord;
use crate::transaction::state::TransactionReplicationState;
use crate::types::TransactionId;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use tracing::{debug, error};

/// Maps transaction IDs to their replication state.
///
/// Each state is only ever touched by the worker running its transaction.
/// The table lock is held just long enough to look a state up; the state's
/// own mutex is uncontended in practice and exists so the table can be
/// shared between workers.
pub struct ReplicationTable {
    config: ReplicationConfig,
    allocator: Arc<dyn ReplicationAllocator>,
    states: RwLock<BTreeMap<TransactionId, Arc<Mutex<TransactionReplicationState>>>>,
}

impl Default for ReplicationTable {
    fn default() -> Self {
        Self::new(ReplicationConfig::default(), Arc::new(SystemAllocator))
    }
}

impl std::fmt::Debug for ReplicationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicationTable")
            .field("config", &self.config)
            .field("transactions", &self.states.read().len())
            .finish()
    }
}

impl ReplicationTable {
    /// Creates an empty table. States registered later share `config` and
    /// `allocator`.
    pub fn new(config: ReplicationConfig, allocator: Arc<dyn ReplicationAllocator>) -> Self {
        Self {
            config,
            allocator,
            states: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registers an empty state for `txid`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] if `txid` is already registered.
    pub fn register(&self, txid: TransactionId) -> CoreResult<()> {
        let mut states = self.states.write();
        if states.contains_key(&txid) {
            return Err(CoreError::invalid_operation(format!(
                "{txid} already has replication state"
            )));
        }
        let state = TransactionReplicationState::new(&self.config, Arc::clone(&self.allocator));
        states.insert(txid, Arc::new(Mutex::new(state)));
        debug!(%txid, "registered replication state");
        Ok(())
    }

    /// Runs `f` on the state of `txid`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownTransaction`] if `txid` is not registered,
    /// or whatever `f` returns.
    pub fn with_state<T, F>(&self, txid: TransactionId, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut TransactionReplicationState) -> CoreResult<T>,
    {
        let state = self.lookup(txid)?;
        let mut guard = state.lock();
        f(&mut guard)
    }

    /// Hands every propagated record of `txid` to `publish`, in append order,
    /// then releases the state and unregisters the transaction.
    ///
    /// Returns the number of records published.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownTransaction`] if `txid` is not registered.
    pub fn commit<F>(&self, txid: TransactionId, mut publish: F) -> CoreResult<usize>
    where
        F: FnMut(usize, &ReplicationRecord),
    {
        let state = self.remove(txid)?;
        let mut state = state.lock();
        let mut published = 0;
        for (index, record) in state.propagated_records() {
            publish(index, record);
            published += 1;
        }
        debug!(%txid, published, total = state.len(), "committed replication records");
        state.reset();
        Ok(published)
    }

    /// Releases the state of `txid` without publishing anything.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownTransaction`] if `txid` is not registered.
    pub fn abort(&self, txid: TransactionId) -> CoreResult<()> {
        let state = self.remove(txid)?;
        let mut state = state.lock();
        debug!(%txid, discarded = state.len(), "aborted replication records");
        state.reset();
        Ok(())
    }

    /// Registered transaction IDs, ascending.
    #[must_use]
    pub fn transaction_ids(&self) -> Vec<TransactionId> {
        self.states.read().keys().copied().collect()
    }

    /// Number of registered transactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    /// Returns true if no transaction is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }

    /// Writes a dump of every registered state to `out`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if writing fails.
    pub fn dump(&self, out: &mut dyn io::Write) -> CoreResult<()> {
        let states: Vec<_> = self
            .states
            .read()
            .iter()
            .map(|(txid, state)| (*txid, Arc::clone(state)))
            .collect();
        for (txid, state) in states {
            dump_state(txid, &state.lock(), out)?;
        }
        Ok(())
    }

    fn lookup(&self, txid: TransactionId) -> CoreResult<Arc<Mutex<TransactionReplicationState>>> {
        match self.states.read().get(&txid) {
            Some(state) => Ok(Arc::clone(state)),
            None => {
                error!(%txid, "no replication state for transaction");
                Err(CoreError::unknown_transaction(txid))
            }
        }
    }

    fn remove(&self, txid: TransactionId) -> CoreResult<Arc<Mutex<TransactionReplicationState>>> {
        self.states.write().remove(&txid).ok_or_else(|| {
            error!(%txid, "no replication state for transaction");
            CoreError::unknown_transaction(txid)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordKind;
    use crate::types::Oid;
    use repllog_codec::Value;
    use std::thread;

    fn insert(state: &mut TransactionReplicationState, slot: i16) -> CoreResult<usize> {
        let mut key = Value::Int(i32::from(slot));
        state.append_data(RecordKind::DataInsert, Oid::new(0, 3, slot), "items".into(), &mut key)
    }

    #[test]
    fn register_twice_fails() {
        let table = ReplicationTable::default();
        table.register(TransactionId::new(1)).unwrap();
        let result = table.register(TransactionId::new(1));
        assert!(matches!(result, Err(CoreError::InvalidOperation { .. })));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn unknown_transaction_is_reported() {
        let table = ReplicationTable::default();
        let result = table.with_state(TransactionId::new(9), |state| insert(state, 1));
        assert!(matches!(
            result,
            Err(CoreError::UnknownTransaction { txid }) if txid == TransactionId::new(9)
        ));
        assert!(matches!(
            table.abort(TransactionId::new(9)),
            Err(CoreError::UnknownTransaction { .. })
        ));
    }

    #[test]
    fn commit_publishes_only_propagated_records() {
        let table = ReplicationTable::default();
        let txid = TransactionId::new(4);
        table.register(txid).unwrap();
        table
            .with_state(txid, |state| {
                insert(state, 1)?;
                state.create_savepoint("sp")?;
                insert(state, 2)?;
                state.rollback_to_savepoint("sp")?;
                insert(state, 3)
            })
            .unwrap();

        let mut seen = Vec::new();
        let published = table
            .commit(txid, |index, record| seen.push((index, record.instance().copied())))
            .unwrap();
        assert_eq!(published, 2);
        assert_eq!(
            seen,
            vec![(0, Some(Oid::new(0, 3, 1))), (2, Some(Oid::new(0, 3, 3)))]
        );
        assert!(table.is_empty());
    }

    #[test]
    fn abort_unregisters() {
        let table = ReplicationTable::default();
        table.register(TransactionId::new(1)).unwrap();
        table.register(TransactionId::new(2)).unwrap();
        table.abort(TransactionId::new(1)).unwrap();
        assert_eq!(table.transaction_ids(), vec![TransactionId::new(2)]);
    }

    #[test]
    fn workers_use_their_own_states() {
        let table = Arc::new(ReplicationTable::default());
        let handles: Vec<_> = (1..=4u64)
            .map(|n| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    let txid = TransactionId::new(n);
                    table.register(txid).unwrap();
                    for slot in 0..50 {
                        table.with_state(txid, |state| insert(state, slot)).unwrap();
                    }
                    table.with_state(txid, |state| Ok(state.len())).unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 50);
        }
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn dump_lists_every_transaction() {
        let table = ReplicationTable::default();
        for n in [2, 1] {
            let txid = TransactionId::new(n);
            table.register(txid).unwrap();
            table.with_state(txid, |state| insert(state, 7)).unwrap();
        }
        let mut out = Vec::new();
        table.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let first = text.find("txn:1").unwrap();
        let second = text.find("txn:2").unwrap();
        assert!(first < second);
    }
}
