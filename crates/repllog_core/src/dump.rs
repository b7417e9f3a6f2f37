//! Human-readable dumps of replication state.

use crate::error::CoreResult;
use crate::record::{RecordPayload, ReplicationRecord};
use crate::transaction::TransactionReplicationState;
use crate::types::TransactionId;
use std::io::Write;

/// Writes the state of `txid` to `out`: one header line, one line per
/// record, then one line per savepoint.
///
/// # Errors
///
/// Returns an I/O error if writing fails.
pub fn dump_state(
    txid: TransactionId,
    state: &TransactionReplicationState,
    out: &mut dyn Write,
) -> CoreResult<()> {
    let store = state.store();
    writeln!(
        out,
        "{txid}: {} records, capacity {}, flush mark {}",
        store.len(),
        store.capacity(),
        state
            .flush_mark_start()
            .map_or_else(|| "-".to_string(), |start| start.to_string()),
    )?;
    for (index, record) in store.iter().enumerate() {
        writeln!(out, "  [{index}] {}", describe_record(record))?;
    }
    for savepoint in state.savepoints().iter() {
        writeln!(
            out,
            "  savepoint {} at {}",
            savepoint.name(),
            savepoint.boundary()
        )?;
    }
    Ok(())
}

/// One-line description of a record.
///
/// A payload that fails to decode is shown as `<undecodable>` rather than
/// aborting the dump.
#[must_use]
pub fn describe_record(record: &ReplicationRecord) -> String {
    let instance = record
        .instance()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    let lsa = record
        .lsa()
        .map_or_else(|| "-".to_string(), |lsa| lsa.to_string());
    let payload = match record.describe() {
        Ok(RecordPayload::Empty) => String::new(),
        Ok(RecordPayload::Data { class_name, key }) => format!(" {class_name} key={key}"),
        Ok(RecordPayload::Schema {
            statement_type,
            class_name,
            ddl,
        }) => format!(" type={statement_type} {class_name} {ddl:?}"),
        Err(_) => " <undecodable>".to_string(),
    };
    format!(
        "{} {instance} {} lsa={lsa}{payload}",
        record.kind(),
        record.flush()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordKind;
    use crate::types::{Lsa, Oid};
    use repllog_codec::Value;

    #[test]
    fn dump_lists_records_and_savepoints() {
        let mut state = TransactionReplicationState::default();
        state.note_pending_insert(Lsa::new(12, 40));
        let mut key = Value::Int(7);
        state
            .append_data(
                RecordKind::DataInsert,
                Oid::new(0, 5, 1),
                "orders".into(),
                &mut key,
            )
            .unwrap();
        state.create_savepoint("sp1").unwrap();
        state.append_schema(3, "orders", "DROP TABLE orders").unwrap();

        let mut out = Vec::new();
        dump_state(TransactionId::new(3), &state, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "txn:3: 2 records, capacity 100, flush mark -"
        );
        assert_eq!(
            lines[1],
            "  [0] DATA_INSERT 0|5|1 commit-need-flush lsa=12|40 orders key=7"
        );
        assert_eq!(
            lines[2],
            "  [1] SCHEMA - commit-need-flush lsa=- type=3 orders \"DROP TABLE orders\""
        );
        assert_eq!(lines[3], "  savepoint sp1 at 1");
    }

    #[test]
    fn empty_state_dumps_header_only() {
        let state = TransactionReplicationState::default();
        let mut out = Vec::new();
        dump_state(TransactionId::new(1), &state, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "txn:1: 0 records, capacity 0, flush mark -\n"
        );
    }
}
