//! Replication record types.

use crate::error::CoreResult;
use crate::types::{Lsa, Oid};
use repllog_codec::{Unpacker, Value};
use std::fmt;

/// Kind of operation a replication record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Instance insert.
    DataInsert,
    /// Instance update.
    DataUpdate,
    /// Instance delete.
    DataDelete,
    /// Schema (DDL) statement.
    Schema,
}

impl RecordKind {
    /// Returns true for the three instance-level kinds.
    #[must_use]
    pub const fn is_data(self) -> bool {
        !matches!(self, Self::Schema)
    }

    /// Stable name used in dumps.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DataInsert => "DATA_INSERT",
            Self::DataUpdate => "DATA_UPDATE",
            Self::DataDelete => "DATA_DELETE",
            Self::Schema => "SCHEMA",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When a record has to be propagated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FlushRequirement {
    /// Propagated with the commit batch.
    #[default]
    CommitNeedFlush,
    /// Propagated immediately, ahead of the commit batch.
    NeedFlush,
    /// Never propagated (rolled back past a savepoint).
    DontNeedFlush,
}

impl FlushRequirement {
    /// Stable name used in dumps.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CommitNeedFlush => "commit-need-flush",
            Self::NeedFlush => "need-flush",
            Self::DontNeedFlush => "dont-need-flush",
        }
    }
}

impl fmt::Display for FlushRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded form of a record payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPayload {
    /// No payload (delete without after-image).
    Empty,
    /// Class name and primary-key value of a data record.
    Data {
        /// Name of the instance's class.
        class_name: String,
        /// Primary-key value.
        key: Value,
    },
    /// Statement of a schema record.
    Schema {
        /// Statement type code.
        statement_type: i32,
        /// Name of the class the statement targets.
        class_name: String,
        /// DDL text.
        ddl: String,
    },
}

/// One entry of a transaction's replication log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationRecord {
    kind: RecordKind,
    instance: Option<Oid>,
    payload: Vec<u8>,
    lsa: Option<Lsa>,
    flush: FlushRequirement,
}

impl ReplicationRecord {
    pub(crate) fn new(
        kind: RecordKind,
        instance: Option<Oid>,
        payload: Vec<u8>,
        flush: FlushRequirement,
    ) -> Self {
        Self {
            kind,
            instance,
            payload,
            lsa: None,
            flush,
        }
    }

    /// Returns the record kind.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Returns the instance this record describes (`None` for schema records).
    #[must_use]
    pub fn instance(&self) -> Option<&Oid> {
        self.instance.as_ref()
    }

    /// Returns the packed payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the bound log address, if any.
    #[must_use]
    pub fn lsa(&self) -> Option<Lsa> {
        self.lsa
    }

    /// Returns the flush requirement.
    #[must_use]
    pub fn flush(&self) -> FlushRequirement {
        self.flush
    }

    /// Returns true if this record will be propagated at all.
    #[must_use]
    pub fn is_propagated(&self) -> bool {
        self.flush != FlushRequirement::DontNeedFlush
    }

    /// Decodes the payload.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the payload is malformed.
    pub fn describe(&self) -> CoreResult<RecordPayload> {
        if self.payload.is_empty() {
            return Ok(RecordPayload::Empty);
        }
        let mut unpacker = Unpacker::new(&self.payload);
        let payload = match self.kind {
            RecordKind::Schema => RecordPayload::Schema {
                statement_type: unpacker.unpack_int()?,
                class_name: unpacker.unpack_string()?,
                ddl: unpacker.unpack_string()?,
            },
            _ => RecordPayload::Data {
                class_name: unpacker.unpack_string()?,
                key: unpacker.unpack_value()?,
            },
        };
        Ok(payload)
    }

    pub(crate) fn matches_instance(&self, instance: &Oid) -> bool {
        self.instance.as_ref() == Some(instance)
    }

    pub(crate) fn set_lsa(&mut self, lsa: Lsa) {
        self.lsa = Some(lsa);
    }

    pub(crate) fn set_flush(&mut self, flush: FlushRequirement) {
        self.flush = flush;
    }

    pub(crate) fn take_payload(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repllog_codec::Packer;

    #[test]
    fn default_flush_is_commit() {
        assert_eq!(FlushRequirement::default(), FlushRequirement::CommitNeedFlush);
    }

    #[test]
    fn new_record_has_no_address() {
        let record = ReplicationRecord::new(
            RecordKind::DataUpdate,
            Some(Oid::new(0, 1, 1)),
            Vec::new(),
            FlushRequirement::NeedFlush,
        );
        assert_eq!(record.lsa(), None);
        assert_eq!(record.flush(), FlushRequirement::NeedFlush);
        assert!(record.is_propagated());
    }

    #[test]
    fn describe_data_payload() {
        let mut packer = Packer::new();
        packer.pack_string("orders").unwrap();
        packer.pack_value(&Value::Int(9)).unwrap();
        let record = ReplicationRecord::new(
            RecordKind::DataInsert,
            Some(Oid::new(0, 1, 1)),
            packer.finish(),
            FlushRequirement::CommitNeedFlush,
        );
        assert_eq!(
            record.describe().unwrap(),
            RecordPayload::Data {
                class_name: "orders".to_string(),
                key: Value::Int(9),
            }
        );
    }

    #[test]
    fn describe_schema_payload() {
        let mut packer = Packer::new();
        packer.pack_int(1);
        packer.pack_string("orders").unwrap();
        packer.pack_string("DROP TABLE orders").unwrap();
        let record = ReplicationRecord::new(
            RecordKind::Schema,
            None,
            packer.finish(),
            FlushRequirement::CommitNeedFlush,
        );
        assert_eq!(
            record.describe().unwrap(),
            RecordPayload::Schema {
                statement_type: 1,
                class_name: "orders".to_string(),
                ddl: "DROP TABLE orders".to_string(),
            }
        );
    }

    #[test]
    fn describe_truncated_payload_fails() {
        let record = ReplicationRecord::new(
            RecordKind::DataUpdate,
            Some(Oid::new(0, 1, 1)),
            vec![0, 0, 0, 9],
            FlushRequirement::CommitNeedFlush,
        );
        assert!(record.describe().is_err());
    }

    #[test]
    fn kind_names() {
        assert!(RecordKind::DataDelete.is_data());
        assert!(!RecordKind::Schema.is_data());
        assert_eq!(RecordKind::DataUpdate.to_string(), "DATA_UPDATE");
    }
}
