//! Fuzz testing harnesses.
//!
//! These targets can be driven by cargo-fuzz or by proptest byte vectors.

use crate::generators::{apply_op, ReplicationOp};
use repllog_codec::Unpacker;
use repllog_core::{Lsa, Oid, RecordKind, ReplicationConfig, TransactionReplicationState, Value};

/// Fuzz target for payload decoding.
///
/// Arbitrary bytes either decode as a data payload or fail with an error;
/// they never panic.
pub fn fuzz_payload_decode(data: &[u8]) {
    let mut unpacker = Unpacker::new(data);
    if unpacker.unpack_string().is_ok() {
        let _ = unpacker.unpack_value();
    }
}

/// Fuzz target for operation sequences.
///
/// Every 3 bytes become one operation on a state with a small chunk size.
/// After each operation the store's capacity invariants are checked.
///
/// # Panics
///
/// Panics if an invariant is violated.
pub fn fuzz_operations(data: &[u8]) {
    const CHUNK: usize = 4;
    let mut state = TransactionReplicationState::new(
        &ReplicationConfig::new().chunk_size(CHUNK),
        std::sync::Arc::new(repllog_core::SystemAllocator),
    );

    for bytes in data.chunks_exact(3) {
        let op = decode_op(bytes[0], bytes[1], bytes[2]);
        let _ = apply_op(&mut state, &op);

        let store = state.store();
        assert!(store.capacity() >= store.len(), "capacity below count");
        assert_eq!(store.capacity() % CHUNK, 0, "capacity not a chunk multiple");
        if let Some(start) = state.flush_mark_start() {
            assert!(start <= store.len(), "flush mark past the end");
        }
    }
}

fn decode_op(tag: u8, a: u8, b: u8) -> ReplicationOp {
    let instance = Oid::new(0, i32::from(a % 4), i16::from(b % 8));
    let lsa = Lsa::new(i64::from(a), i16::from(b));
    let name = format!("sp{}", a % 3);
    match tag % 11 {
        0 => ReplicationOp::Data {
            kind: RecordKind::DataInsert,
            instance,
            key: Value::Int(i32::from(b)),
        },
        1 => ReplicationOp::Data {
            kind: RecordKind::DataUpdate,
            instance,
            key: Value::Int(i32::from(b)),
        },
        2 => ReplicationOp::Delete(instance),
        3 => ReplicationOp::Schema(format!("DROP INDEX i{a}")),
        4 => ReplicationOp::PendingInsert(lsa),
        5 => ReplicationOp::PendingUpdate(lsa),
        6 => ReplicationOp::BindUpdate(instance),
        7 => ReplicationOp::BeginMark,
        8 => ReplicationOp::EndMark { discard: b % 2 == 0 },
        9 => ReplicationOp::Savepoint(name),
        _ => ReplicationOp::Rollback(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_input_is_fine() {
        fuzz_payload_decode(&[]);
        fuzz_operations(&[]);
    }

    proptest! {
        #[test]
        fn payload_decode_never_panics(data in prop::collection::vec(any::<u8>(), 0..128)) {
            fuzz_payload_decode(&data);
        }

        #[test]
        fn operations_keep_invariants(data in prop::collection::vec(any::<u8>(), 0..600)) {
            fuzz_operations(&data);
        }
    }
}
