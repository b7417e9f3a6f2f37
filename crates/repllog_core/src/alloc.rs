//! Allocation seam for replication state.

use crate::error::{CoreError, CoreResult};
use std::fmt;

/// Allocation policy for a transaction's replication state.
///
/// The record store and savepoint ledger route every allocation and release
/// through this trait. Allocators are **accountants**: they do not own the
/// record array, they admit or refuse growth and hand out payload buffers.
///
/// # Invariants
///
/// - Every successful `alloc_payload` is matched by exactly one
///   `release_payload` when the record is truncated, reset or dropped
/// - Every successful `alloc_savepoint` is matched by exactly one
///   `release_savepoint`
/// - A refused allocation leaves the caller's state unchanged
///
/// # Implementors
///
/// - [`SystemAllocator`] - fallible reservation on the global allocator
/// - `repllog_testkit::TrackingAllocator` - counts live allocations and
///   injects failures
pub trait ReplicationAllocator: Send + Sync + fmt::Debug {
    /// Admits growth of the record array from `from` to `to` slots.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AllocationFailure`] if the growth is refused.
    fn grow_records(&self, from: usize, to: usize) -> CoreResult<()>;

    /// Returns an empty buffer able to hold `len` payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AllocationFailure`] if the buffer cannot be
    /// reserved.
    fn alloc_payload(&self, len: usize) -> CoreResult<Vec<u8>>;

    /// Takes back a payload previously handed out by `alloc_payload`.
    fn release_payload(&self, payload: Vec<u8>);

    /// Admits a new savepoint marker.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AllocationFailure`] if the marker is refused.
    fn alloc_savepoint(&self, name: &str) -> CoreResult<()>;

    /// Takes back a savepoint marker.
    fn release_savepoint(&self, name: &str);
}

/// Allocator backed by fallible reservation on the global allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl ReplicationAllocator for SystemAllocator {
    fn grow_records(&self, _from: usize, _to: usize) -> CoreResult<()> {
        Ok(())
    }

    fn alloc_payload(&self, len: usize) -> CoreResult<Vec<u8>> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(len).map_err(|e| {
            CoreError::allocation_failure(format!("payload of {len} bytes: {e}"))
        })?;
        Ok(buffer)
    }

    fn release_payload(&self, payload: Vec<u8>) {
        drop(payload);
    }

    fn alloc_savepoint(&self, _name: &str) -> CoreResult<()> {
        Ok(())
    }

    fn release_savepoint(&self, _name: &str) {}
}
