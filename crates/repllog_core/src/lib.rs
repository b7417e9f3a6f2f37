//! # repllog Core
//!
//! Per-transaction replication log buffer.
//!
//! While a transaction runs, every replicated data change and schema
//! statement is captured as a [`ReplicationRecord`] in the transaction's
//! [`TransactionReplicationState`]. At commit the surviving records are
//! handed on for propagation.
//!
//! This crate provides:
//! - [`ReplicationRecordStore`]: chunk-growing record array with
//!   all-or-nothing appends
//! - [`LsaCorrelator`]: binds log addresses to records after the fact
//! - [`FlushMarker`]: decides which records must be flushed ahead of commit
//! - [`SavepointLedger`]: named rollback points that suppress later records
//! - [`ReplicationTable`]: the states of all live transactions
//!
//! ## Example
//!
//! ```rust
//! use repllog_core::{Oid, RecordKind, ReplicationTable, TransactionId, Value};
//!
//! let table = ReplicationTable::default();
//! let txid = TransactionId::new(1);
//! table.register(txid)?;
//!
//! table.with_state(txid, |state| {
//!     let mut key = Value::from("A-1");
//!     state.append_data(RecordKind::DataInsert, Oid::new(0, 7, 1), "orders".into(), &mut key)?;
//!     state.append_delete(Oid::new(0, 7, 2))?;
//!     Ok(())
//! })?;
//!
//! let published = table.commit(txid, |_, record| println!("{}", record.kind()))?;
//! assert_eq!(published, 2);
//! # Ok::<(), repllog_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod alloc;
mod config;
mod correlator;
mod dump;
mod error;
mod flush;
mod record;
mod resolver;
mod savepoint;
mod store;
mod transaction;
mod types;

pub use alloc::{ReplicationAllocator, SystemAllocator};
pub use config::{ReplicationConfig, DEFAULT_CHUNK_SIZE};
pub use correlator::LsaCorrelator;
pub use dump::{describe_record, dump_state};
pub use error::{CoreError, CoreResult};
pub use flush::FlushMarker;
pub use record::{FlushRequirement, RecordKind, RecordPayload, ReplicationRecord};
pub use resolver::ClassResolver;
pub use savepoint::{SavepointLedger, SavepointMarker};
pub use store::ReplicationRecordStore;
pub use transaction::{ReplicationTable, TransactionReplicationState};
pub use types::{Lsa, Oid, TransactionId};

pub use repllog_codec::Value;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
