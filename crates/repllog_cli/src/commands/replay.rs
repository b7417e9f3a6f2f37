//! Replay command implementation.
//!
//! A script is one JSON object per line. Blank lines and lines starting with
//! `#` are skipped. Example:
//!
//! ```text
//! {"op":"begin","txid":1}
//! {"op":"pending_insert","txid":1,"lsa":[120,16]}
//! {"op":"insert","txid":1,"instance":[0,40,3],"class":"orders","key":{"int":7}}
//! {"op":"savepoint","txid":1,"name":"sp1"}
//! {"op":"delete","txid":1,"instance":[0,40,4]}
//! {"op":"rollback","txid":1,"name":"sp1"}
//! {"op":"commit","txid":1}
//! ```

use repllog_core::{
    dump_state, CoreError, Lsa, Oid, RecordKind, RecordPayload, ReplicationConfig,
    ReplicationRecord, ReplicationTable, SystemAllocator, TransactionId, Value,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// One script operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    /// Register a transaction.
    Begin {
        /// Transaction ID.
        txid: u64,
    },
    /// Append an insert record.
    Insert {
        /// Transaction ID.
        txid: u64,
        /// Instance as `[volume, page, slot]`.
        instance: (i16, i32, i16),
        /// Class name.
        class: String,
        /// Primary-key value.
        key: Value,
    },
    /// Append an update record.
    Update {
        /// Transaction ID.
        txid: u64,
        /// Instance as `[volume, page, slot]`.
        instance: (i16, i32, i16),
        /// Class name.
        class: String,
        /// Primary-key value.
        key: Value,
    },
    /// Append a delete record.
    Delete {
        /// Transaction ID.
        txid: u64,
        /// Instance as `[volume, page, slot]`.
        instance: (i16, i32, i16),
    },
    /// Append a schema record.
    Schema {
        /// Transaction ID.
        txid: u64,
        /// Statement type code.
        statement_type: i32,
        /// Class name.
        class: String,
        /// DDL text.
        ddl: String,
    },
    /// Note a pending insert address.
    PendingInsert {
        /// Transaction ID.
        txid: u64,
        /// Address as `[page, offset]`.
        lsa: (i64, i16),
    },
    /// Note a pending update address.
    PendingUpdate {
        /// Transaction ID.
        txid: u64,
        /// Address as `[page, offset]`.
        lsa: (i64, i16),
    },
    /// Bind the pending update address.
    BindUpdate {
        /// Transaction ID.
        txid: u64,
        /// Instance as `[volume, page, slot]`.
        instance: (i16, i32, i16),
    },
    /// Open the flush marking window.
    BeginMark {
        /// Transaction ID.
        txid: u64,
    },
    /// Close the flush marking window.
    EndMark {
        /// Transaction ID.
        txid: u64,
        /// Drop the records appended inside the window.
        #[serde(default)]
        discard: bool,
    },
    /// Create or move a savepoint.
    Savepoint {
        /// Transaction ID.
        txid: u64,
        /// Savepoint name.
        name: String,
    },
    /// Roll back to a savepoint.
    Rollback {
        /// Transaction ID.
        txid: u64,
        /// Savepoint name.
        name: String,
    },
    /// Publish and release a transaction's records.
    Commit {
        /// Transaction ID.
        txid: u64,
    },
    /// Release a transaction's records without publishing.
    Abort {
        /// Transaction ID.
        txid: u64,
    },
}

/// Replay errors, tagged with the script line.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The script could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A line is not a valid operation.
    #[error("line {line}: {source}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// Parser error.
        source: serde_json::Error,
    },

    /// An operation failed.
    #[error("line {line}: {source}")]
    Operation {
        /// 1-based line number.
        line: usize,
        /// Replication error.
        source: CoreError,
    },
}

/// Record representation for output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordInfo {
    /// Index within the transaction.
    pub index: usize,
    /// Record kind.
    pub kind: String,
    /// Instance (if applicable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Flush requirement.
    pub flush: String,
    /// Bound log address (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lsa: Option<String>,
    /// Class name (if the payload carries one).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Primary-key value (data records).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Value>,
    /// Statement type (schema records).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_type: Option<i32>,
    /// DDL text (schema records).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ddl: Option<String>,
}

impl RecordInfo {
    fn new(index: usize, record: &ReplicationRecord) -> Result<Self, CoreError> {
        let mut info = Self {
            index,
            kind: record.kind().to_string(),
            instance: record.instance().map(ToString::to_string),
            flush: record.flush().to_string(),
            lsa: record.lsa().map(|lsa| lsa.to_string()),
            class_name: None,
            key: None,
            statement_type: None,
            ddl: None,
        };
        match record.describe()? {
            RecordPayload::Empty => {}
            RecordPayload::Data { class_name, key } => {
                info.class_name = Some(class_name);
                info.key = Some(key);
            }
            RecordPayload::Schema {
                statement_type,
                class_name,
                ddl,
            } => {
                info.statement_type = Some(statement_type);
                info.class_name = Some(class_name);
                info.ddl = Some(ddl);
            }
        }
        Ok(info)
    }
}

/// Savepoint representation for output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavepointInfo {
    /// Savepoint name.
    pub name: String,
    /// Index of the first record after the savepoint.
    pub boundary: usize,
}

/// State of a transaction still open at the end of the script.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionInfo {
    /// Transaction ID.
    pub txid: u64,
    /// Allocated record slots.
    pub capacity: usize,
    /// Start of the open flush marking window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flush_mark: Option<usize>,
    /// Records in append order.
    pub records: Vec<RecordInfo>,
    /// Savepoints, oldest first.
    pub savepoints: Vec<SavepointInfo>,
}

/// A record handed on at commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedRecord {
    /// Committing transaction.
    pub txid: u64,
    /// The record.
    #[serde(flatten)]
    pub record: RecordInfo,
}

/// Outcome of a replay.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    /// Records published by commits, in commit order.
    pub published: Vec<PublishedRecord>,
    /// Transactions left open.
    pub open: Vec<TransactionInfo>,
    #[serde(skip)]
    table: ReplicationTable,
}

/// Runs the replay command.
pub fn run(
    script: &Path,
    chunk_size: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if !script.exists() {
        return Err(format!("script not found: {}", script.display()).into());
    }

    let mut config = ReplicationConfig::default();
    if let Some(size) = chunk_size {
        config = config.chunk_size(size);
    }

    let reader = BufReader::new(File::open(script)?);
    let report = replay(reader, config)?;
    info!(
        published = report.published.len(),
        open = report.open.len(),
        "replay finished"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        "json" => {
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        }
        _ => {
            print_text_output(&report, &mut out)?;
        }
    }

    Ok(())
}

/// Applies every operation of `input` to a fresh replication table.
///
/// # Errors
///
/// Stops at the first line that cannot be parsed or applied.
pub fn replay<R: BufRead>(input: R, config: ReplicationConfig) -> Result<ReplayReport, ReplayError> {
    let table = ReplicationTable::new(config, Arc::new(SystemAllocator));
    let mut published = Vec::new();
    let mut last_line = 0;

    for (number, line) in input.lines().enumerate() {
        let line_no = number + 1;
        last_line = line_no;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let op: ScriptOp = serde_json::from_str(trimmed).map_err(|source| ReplayError::Parse {
            line: line_no,
            source,
        })?;
        debug!(line = line_no, ?op, "applying script operation");
        apply(&table, op, &mut published).map_err(|source| ReplayError::Operation {
            line: line_no,
            source,
        })?;
    }

    let open = table
        .transaction_ids()
        .into_iter()
        .map(|txid| table.with_state(txid, |state| {
            let records = state
                .records()
                .iter()
                .enumerate()
                .map(|(index, record)| RecordInfo::new(index, record))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TransactionInfo {
                txid: txid.as_u64(),
                capacity: state.store().capacity(),
                flush_mark: state.flush_mark_start(),
                records,
                savepoints: state
                    .savepoints()
                    .iter()
                    .map(|sp| SavepointInfo {
                        name: sp.name().to_string(),
                        boundary: sp.boundary(),
                    })
                    .collect(),
            })
        }))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ReplayError::Operation {
            line: last_line,
            source,
        })?;

    Ok(ReplayReport {
        published,
        open,
        table,
    })
}

fn apply(
    table: &ReplicationTable,
    op: ScriptOp,
    published: &mut Vec<PublishedRecord>,
) -> Result<(), CoreError> {
    match op {
        ScriptOp::Begin { txid } => table.register(TransactionId::new(txid)),
        ScriptOp::Insert {
            txid,
            instance,
            class,
            key,
        } => append(table, txid, RecordKind::DataInsert, instance, class, key),
        ScriptOp::Update {
            txid,
            instance,
            class,
            key,
        } => append(table, txid, RecordKind::DataUpdate, instance, class, key),
        ScriptOp::Delete { txid, instance } => with(table, txid, |state| {
            state.append_delete(oid(instance)).map(drop)
        }),
        ScriptOp::Schema {
            txid,
            statement_type,
            class,
            ddl,
        } => with(table, txid, |state| {
            state.append_schema(statement_type, &class, &ddl).map(drop)
        }),
        ScriptOp::PendingInsert { txid, lsa } => with(table, txid, |state| {
            state.note_pending_insert(Lsa::new(lsa.0, lsa.1));
            Ok(())
        }),
        ScriptOp::PendingUpdate { txid, lsa } => with(table, txid, |state| {
            state.note_pending_update(Lsa::new(lsa.0, lsa.1));
            Ok(())
        }),
        ScriptOp::BindUpdate { txid, instance } => with(table, txid, |state| {
            state.bind_update(&oid(instance));
            Ok(())
        }),
        ScriptOp::BeginMark { txid } => with(table, txid, |state| {
            state.begin_flush_mark();
            Ok(())
        }),
        ScriptOp::EndMark { txid, discard } => with(table, txid, |state| {
            state.end_flush_mark(discard);
            Ok(())
        }),
        ScriptOp::Savepoint { txid, name } => {
            with(table, txid, |state| state.create_savepoint(&name))
        }
        ScriptOp::Rollback { txid, name } => with(table, txid, |state| {
            state.rollback_to_savepoint(&name).map(drop)
        }),
        ScriptOp::Commit { txid } => {
            let mut infos = Vec::new();
            let mut failure = None;
            table.commit(TransactionId::new(txid), |index, record| {
                match RecordInfo::new(index, record) {
                    Ok(record) => infos.push(PublishedRecord { txid, record }),
                    Err(e) => failure = Some(e),
                }
            })?;
            if let Some(e) = failure {
                return Err(e);
            }
            published.extend(infos);
            Ok(())
        }
        ScriptOp::Abort { txid } => table.abort(TransactionId::new(txid)),
    }
}

fn append(
    table: &ReplicationTable,
    txid: u64,
    kind: RecordKind,
    instance: (i16, i32, i16),
    class: String,
    mut key: Value,
) -> Result<(), CoreError> {
    with(table, txid, |state| {
        state
            .append_data(kind, oid(instance), class, &mut key)
            .map(drop)
    })
}

fn with<F>(table: &ReplicationTable, txid: u64, f: F) -> Result<(), CoreError>
where
    F: FnOnce(&mut repllog_core::TransactionReplicationState) -> Result<(), CoreError>,
{
    table.with_state(TransactionId::new(txid), f)
}

fn oid((volume, page, slot): (i16, i32, i16)) -> Oid {
    Oid::new(volume, page, slot)
}

fn print_text_output(report: &ReplayReport, out: &mut dyn Write) -> Result<(), Box<dyn std::error::Error>> {
    writeln!(out, "Published Records ({} total)", report.published.len())?;
    writeln!(out, "================")?;
    for published in &report.published {
        let record = &published.record;
        write!(
            out,
            "txn:{} [{}] {:12} {}",
            published.txid, record.index, record.kind, record.flush
        )?;
        if let Some(instance) = &record.instance {
            write!(out, " instance={instance}")?;
        }
        if let Some(lsa) = &record.lsa {
            write!(out, " lsa={lsa}")?;
        }
        if let Some(class_name) = &record.class_name {
            write!(out, " class={class_name}")?;
        }
        if let Some(key) = &record.key {
            write!(out, " key={key}")?;
        }
        if let Some(ddl) = &record.ddl {
            write!(out, " ddl={ddl:?}")?;
        }
        writeln!(out)?;
    }

    writeln!(out)?;
    writeln!(out, "Open Transactions ({} total)", report.open.len())?;
    writeln!(out, "================")?;
    for txid in report.table.transaction_ids() {
        report
            .table
            .with_state(txid, |state| dump_state(txid, state, &mut *out))?;
    }
    Ok(())
}
