//! Growable per-transaction array of replication records.

use crate::alloc::ReplicationAllocator;
use crate::config::ReplicationConfig;
use crate::error::{CoreError, CoreResult};
use crate::record::{FlushRequirement, RecordKind, ReplicationRecord};
use crate::types::Oid;
use repllog_codec::{
    packed_int_size, packed_string_size, packed_value_size, CodecResult, Packer, Value,
};
use std::sync::Arc;
use tracing::{debug, trace};

/// The replication records of one transaction, in append order.
///
/// Capacity is managed explicitly: the first append allocates one chunk and
/// every append into a full store grows it by exactly one more chunk. The
/// capacity only shrinks on [`reset`](Self::reset).
///
/// Appends are all-or-nothing. If growth or payload allocation fails, no
/// record is added and the store is left exactly as it was.
#[derive(Debug)]
pub struct ReplicationRecordStore {
    records: Vec<ReplicationRecord>,
    capacity: usize,
    chunk_size: usize,
    max_records: Option<usize>,
    allocator: Arc<dyn ReplicationAllocator>,
}

impl ReplicationRecordStore {
    /// Creates an empty store. Nothing is allocated until the first append.
    pub fn new(config: &ReplicationConfig, allocator: Arc<dyn ReplicationAllocator>) -> Self {
        Self {
            records: Vec::new(),
            capacity: 0,
            chunk_size: config.effective_chunk_size(),
            max_records: config.max_records,
            allocator,
        }
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of record slots currently allocated.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots added per growth step.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the record at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ReplicationRecord> {
        self.records.get(index)
    }

    /// Returns all live records in append order.
    #[must_use]
    pub fn records(&self) -> &[ReplicationRecord] {
        &self.records
    }

    /// Iterates over live records in append order.
    pub fn iter(&self) -> impl Iterator<Item = &ReplicationRecord> {
        self.records.iter()
    }

    /// Appends a data record whose payload is the class name followed by
    /// the key value.
    ///
    /// On success the key is moved into the payload and `key` is left as
    /// [`Value::Null`]; the class name is consumed. On failure both are
    /// untouched by the store.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidOperation`] for [`RecordKind::Schema`]
    /// - [`CoreError::AllocationFailure`] if growth or the payload is refused
    pub fn append_data(
        &mut self,
        kind: RecordKind,
        instance: Oid,
        class_name: String,
        key: &mut Value,
        flush: FlushRequirement,
    ) -> CoreResult<usize> {
        if !kind.is_data() {
            return Err(CoreError::invalid_operation(
                "schema records must be appended with append_schema",
            ));
        }

        let len = packed_string_size(&class_name) + packed_value_size(key);
        let payload = self.pack_payload(len, |packer| {
            packer.pack_string(&class_name)?;
            packer.pack_value(key)
        })?;

        let index = self.push(ReplicationRecord::new(kind, Some(instance), payload, flush))?;
        *key = Value::Null;
        Ok(index)
    }

    /// Appends a delete record with an empty payload.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AllocationFailure`] if growth is refused.
    pub fn append_delete(&mut self, instance: Oid, flush: FlushRequirement) -> CoreResult<usize> {
        self.push(ReplicationRecord::new(
            RecordKind::DataDelete,
            Some(instance),
            Vec::new(),
            flush,
        ))
    }

    /// Appends a schema record: statement type, class name, then DDL text.
    ///
    /// Schema records carry no instance and never receive a log address.
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
        let len = packed_int_size() + packed_string_size(class_name) + packed_string_size(ddl);
        let payload = self.pack_payload(len, |packer| {
            packer.pack_int(statement_type);
            packer.pack_string(class_name)?;
            packer.pack_string(ddl)
        })?;

        self.push(ReplicationRecord::new(
            RecordKind::Schema,
            None,
            payload,
            FlushRequirement::CommitNeedFlush,
        ))
    }

    /// Drops every record at or after `new_len`, releasing their payloads.
    ///
    /// Capacity is unchanged. Returns the number of records dropped.
    pub fn truncate_to(&mut self, new_len: usize) -> usize {
        if new_len >= self.records.len() {
            return 0;
        }
        let dropped = self.release_from(new_len);
        debug!(new_len, dropped, "truncated replication records");
        dropped
    }

    /// Marks every record at or after `start` as never to be propagated.
    ///
    /// Records stay in place; only their flush requirement changes. Returns
    /// the number of records suppressed.
    pub fn suppress_from(&mut self, start: usize) -> usize {
        let Some(suffix) = self.records.get_mut(start..) else {
            return 0;
        };
        for record in suffix.iter_mut() {
            record.set_flush(FlushRequirement::DontNeedFlush);
        }
        suffix.len()
    }

    /// Releases every payload and the backing array.
    pub fn reset(&mut self) {
        self.release_from(0);
        self.records = Vec::new();
        self.capacity = 0;
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut ReplicationRecord> {
        self.records.get_mut(index)
    }

    /// Index of the most recent record for `instance`.
    pub(crate) fn rposition(&self, instance: &Oid) -> Option<usize> {
        self.records
            .iter()
            .rposition(|record| record.matches_instance(instance))
    }

    fn pack_payload<F>(&self, len: usize, fill: F) -> CoreResult<Vec<u8>>
    where
        F: FnOnce(&mut Packer) -> CodecResult<()>,
    {
        let mut packer = Packer::with_buffer(self.allocator.alloc_payload(len)?);
        match fill(&mut packer) {
            Ok(()) => Ok(packer.finish()),
            Err(e) => {
                self.allocator.release_payload(packer.finish());
                Err(e.into())
            }
        }
    }

    /// Appends `record`, growing by one chunk if the store is full.
    ///
    /// If growth fails the record's payload is released and the store is
    /// unchanged.
    fn push(&mut self, record: ReplicationRecord) -> CoreResult<usize> {
        if let Err(e) = self.ensure_slot() {
            self.release(record);
            return Err(e);
        }
        let index = self.records.len();
        self.records.push(record);
        Ok(index)
    }

    fn ensure_slot(&mut self) -> CoreResult<()> {
        let len = self.records.len();
        if let Some(limit) = self.max_records {
            if len >= limit {
                return Err(CoreError::allocation_failure(format!(
                    "record limit of {limit} reached"
                )));
            }
        }
        if len < self.capacity {
            return Ok(());
        }

        let target = self.capacity + self.chunk_size;
        self.allocator.grow_records(self.capacity, target)?;
        self.records
            .try_reserve_exact(target - len)
            .map_err(|e| CoreError::allocation_failure(format!("record array of {target}: {e}")))?;
        trace!(from = self.capacity, to = target, "grew replication record array");
        self.capacity = target;
        Ok(())
    }

    fn release_from(&mut self, start: usize) -> usize {
        let dropped: Vec<ReplicationRecord> = self.records.drain(start..).collect();
        let count = dropped.len();
        for record in dropped {
            self.release(record);
        }
        count
    }

    fn release(&self, mut record: ReplicationRecord) {
        let payload = record.take_payload();
        if !payload.is_empty() {
            self.allocator.release_payload(payload);
        }
    }
}

impl Drop for ReplicationRecordStore {
    fn drop(&mut self) {
        self.release_from(0);
    }
}
