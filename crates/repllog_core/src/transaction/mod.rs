//! Per-transaction replication state.
//!
//! A [`TransactionReplicationState`] composes the record store, the LSA
//! correlator, the flush marker and the savepoint ledger of one transaction.
//! A [`ReplicationTable`] keeps the states of all live transactions.

mod state;
mod table;

pub use state::TransactionReplicationState;
pub use table::ReplicationTable;
