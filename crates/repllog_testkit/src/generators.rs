//! Property-based test generators using proptest.
//!
//! Identifiers are drawn from a small domain so that generated operation
//! sequences revisit the same instances and savepoint names often.

use proptest::prelude::*;
use repllog_core::{CoreError, CoreResult, Lsa, Oid, RecordKind, TransactionReplicationState, Value};

/// One replication operation applied to a transaction's state.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplicationOp {
    /// Append a data record.
    Data {
        /// Insert, update or delete.
        kind: RecordKind,
        /// Target instance.
        instance: Oid,
        /// Primary-key value.
        key: Value,
    },
    /// Append a delete record without payload.
    Delete(Oid),
    /// Append a schema record.
    Schema(String),
    /// Note a pending insert address.
    PendingInsert(Lsa),
    /// Note a pending update address.
    PendingUpdate(Lsa),
    /// Bind the pending update address.
    BindUpdate(Oid),
    /// Open the flush marking window.
    BeginMark,
    /// Close the flush marking window.
    EndMark {
        /// Drop the window's records.
        discard: bool,
    },
    /// Create or move a savepoint.
    Savepoint(String),
    /// Roll back to a savepoint.
    Rollback(String),
}

/// Strategy for instance identifiers from a small domain.
pub fn oid_strategy() -> impl Strategy<Value = Oid> {
    (0i16..2, 0i32..3, 0i16..6).prop_map(|(volume, page, slot)| Oid::new(volume, page, slot))
}

/// Strategy for log addresses.
pub fn lsa_strategy() -> impl Strategy<Value = Lsa> {
    (0i64..10_000, 0i16..4096).prop_map(|(page, offset)| Lsa::new(page, offset))
}

/// Strategy for primary-key values.
pub fn key_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i32>().prop_map(Value::Int),
        any::<i64>().prop_map(Value::BigInt),
        "[A-Z]{1,3}-[0-9]{1,4}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
    ]
}

/// Strategy for savepoint names.
pub fn savepoint_name_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["sp1", "sp2", "sp3", "SP1"]).prop_map(str::to_string)
}

/// Strategy for data record kinds.
pub fn data_kind_strategy() -> impl Strategy<Value = RecordKind> {
    prop::sample::select(vec![
        RecordKind::DataInsert,
        RecordKind::DataUpdate,
        RecordKind::DataDelete,
    ])
}

/// Strategy for single operations.
pub fn op_strategy() -> impl Strategy<Value = ReplicationOp> {
    prop_oneof![
        6 => (data_kind_strategy(), oid_strategy(), key_strategy())
            .prop_map(|(kind, instance, key)| ReplicationOp::Data { kind, instance, key }),
        2 => oid_strategy().prop_map(ReplicationOp::Delete),
        1 => "(ALTER|DROP) TABLE [a-z]{1,8}".prop_map(ReplicationOp::Schema),
        2 => lsa_strategy().prop_map(ReplicationOp::PendingInsert),
        2 => lsa_strategy().prop_map(ReplicationOp::PendingUpdate),
        2 => oid_strategy().prop_map(ReplicationOp::BindUpdate),
        1 => Just(ReplicationOp::BeginMark),
        1 => any::<bool>().prop_map(|discard| ReplicationOp::EndMark { discard }),
        2 => savepoint_name_strategy().prop_map(ReplicationOp::Savepoint),
        1 => savepoint_name_strategy().prop_map(ReplicationOp::Rollback),
    ]
}

/// Strategy for operation sequences of up to `max_len` operations.
pub fn op_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<ReplicationOp>> {
    prop::collection::vec(op_strategy(), 0..max_len)
}

/// Applies `op` to `state`.
///
/// Rolling back to a savepoint that does not exist is not an error here:
/// generated sequences hit unknown names routinely.
///
/// # Errors
///
/// Returns whatever the state operation returns, except
/// [`CoreError::SavepointNotFound`].
pub fn apply_op(state: &mut TransactionReplicationState, op: &ReplicationOp) -> CoreResult<()> {
    match op {
        ReplicationOp::Data {
            kind,
            instance,
            key,
        } => {
            let mut key = key.clone();
            state.append_data(*kind, *instance, "orders".to_string(), &mut key)?;
        }
        ReplicationOp::Delete(instance) => {
            state.append_delete(*instance)?;
        }
        ReplicationOp::Schema(ddl) => {
            state.append_schema(1, "orders", ddl)?;
        }
        ReplicationOp::PendingInsert(lsa) => state.note_pending_insert(*lsa),
        ReplicationOp::PendingUpdate(lsa) => state.note_pending_update(*lsa),
        ReplicationOp::BindUpdate(instance) => {
            state.bind_update(instance);
        }
        ReplicationOp::BeginMark => {
            state.begin_flush_mark();
        }
        ReplicationOp::EndMark { discard } => {
            state.end_flush_mark(*discard);
        }
        ReplicationOp::Savepoint(name) => state.create_savepoint(name)?,
        ReplicationOp::Rollback(name) => match state.rollback_to_savepoint(name) {
            Ok(_) | Err(CoreError::SavepointNotFound { .. }) => {}
            Err(e) => return Err(e),
        },
    }
    Ok(())
}
