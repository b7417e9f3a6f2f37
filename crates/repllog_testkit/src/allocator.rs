//! Allocator that counts live allocations and injects failures.

use repllog_core::{CoreError, CoreResult, ReplicationAllocator};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

const UNLIMITED: usize = usize::MAX;

/// Accounting allocator for tests.
///
/// Every payload and savepoint handed out is counted until it comes back,
/// so a test can assert that truncation, rollback and reset release exactly
/// what they should. Failures can be switched on per allocation class.
///
/// ```
/// use repllog_core::{ReplicationConfig, TransactionReplicationState};
/// use repllog_testkit::TrackingAllocator;
/// use std::sync::Arc;
///
/// let allocator = Arc::new(TrackingAllocator::new());
/// let mut state = TransactionReplicationState::new(&ReplicationConfig::default(), allocator.clone());
/// state.create_savepoint("sp")?;
/// assert_eq!(allocator.live_savepoints(), 1);
/// state.reset();
/// assert_eq!(allocator.live_savepoints(), 0);
/// # Ok::<(), repllog_core::CoreError>(())
/// ```
#[derive(Debug)]
pub struct TrackingAllocator {
    live_payloads: AtomicUsize,
    payloads_allocated: AtomicUsize,
    live_savepoints: AtomicUsize,
    grow_calls: AtomicUsize,
    record_slots: AtomicUsize,
    payload_budget: AtomicUsize,
    fail_growth: AtomicBool,
    fail_savepoints: AtomicBool,
}

impl Default for TrackingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingAllocator {
    /// Creates an allocator that admits everything.
    pub fn new() -> Self {
        Self {
            live_payloads: AtomicUsize::new(0),
            payloads_allocated: AtomicUsize::new(0),
            live_savepoints: AtomicUsize::new(0),
            grow_calls: AtomicUsize::new(0),
            record_slots: AtomicUsize::new(0),
            payload_budget: AtomicUsize::new(UNLIMITED),
            fail_growth: AtomicBool::new(false),
            fail_savepoints: AtomicBool::new(false),
        }
    }

    /// Refuses (or admits again) every record array growth.
    pub fn fail_growth(&self, fail: bool) {
        self.fail_growth.store(fail, Ordering::SeqCst);
    }

    /// Admits `n` more payloads, then refuses every later one.
    pub fn fail_payloads_after(&self, n: usize) {
        self.payload_budget.store(n, Ordering::SeqCst);
    }

    /// Admits payloads without limit again.
    pub fn allow_payloads(&self) {
        self.payload_budget.store(UNLIMITED, Ordering::SeqCst);
    }

    /// Refuses (or admits again) new savepoint markers.
    pub fn fail_savepoints(&self, fail: bool) {
        self.fail_savepoints.store(fail, Ordering::SeqCst);
    }

    /// Payloads handed out and not yet released.
    pub fn live_payloads(&self) -> usize {
        self.live_payloads.load(Ordering::SeqCst)
    }

    /// Payloads handed out since creation.
    pub fn payloads_allocated(&self) -> usize {
        self.payloads_allocated.load(Ordering::SeqCst)
    }

    /// Savepoint markers admitted and not yet released.
    pub fn live_savepoints(&self) -> usize {
        self.live_savepoints.load(Ordering::SeqCst)
    }

    /// Number of admitted record array growths.
    pub fn grow_calls(&self) -> usize {
        self.grow_calls.load(Ordering::SeqCst)
    }

    /// Slot count after the last admitted growth.
    pub fn record_slots(&self) -> usize {
        self.record_slots.load(Ordering::SeqCst)
    }

    fn take_payload_budget(&self) -> bool {
        self.payload_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |budget| match budget {
                UNLIMITED => Some(UNLIMITED),
                0 => None,
                n => Some(n - 1),
            })
            .is_ok()
    }
}

impl ReplicationAllocator for TrackingAllocator {
    fn grow_records(&self, from: usize, to: usize) -> CoreResult<()> {
        if self.fail_growth.load(Ordering::SeqCst) {
            return Err(CoreError::allocation_failure(format!(
                "record array growth {from} -> {to} refused"
            )));
        }
        self.grow_calls.fetch_add(1, Ordering::SeqCst);
        self.record_slots.store(to, Ordering::SeqCst);
        Ok(())
    }

    fn alloc_payload(&self, len: usize) -> CoreResult<Vec<u8>> {
        if !self.take_payload_budget() {
            return Err(CoreError::allocation_failure(format!(
                "payload of {len} bytes refused"
            )));
        }
        self.live_payloads.fetch_add(1, Ordering::SeqCst);
        self.payloads_allocated.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::with_capacity(len))
    }

    fn release_payload(&self, payload: Vec<u8>) {
        self.live_payloads.fetch_sub(1, Ordering::SeqCst);
        drop(payload);
    }

    fn alloc_savepoint(&self, name: &str) -> CoreResult<()> {
        if self.fail_savepoints.load(Ordering::SeqCst) {
            return Err(CoreError::allocation_failure(format!(
                "savepoint {name} refused"
            )));
        }
        self.live_savepoints.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release_savepoint(&self, _name: &str) {
        self.live_savepoints.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_budget_runs_out() {
        let allocator = TrackingAllocator::new();
        allocator.fail_payloads_after(2);
        assert!(allocator.alloc_payload(8).is_ok());
        assert!(allocator.alloc_payload(8).is_ok());
        assert!(allocator.alloc_payload(8).is_err());
        assert_eq!(allocator.live_payloads(), 2);

        allocator.allow_payloads();
        assert!(allocator.alloc_payload(8).is_ok());
    }

    #[test]
    fn release_balances_counts() {
        let allocator = TrackingAllocator::new();
        let payload = allocator.alloc_payload(16).unwrap();
        allocator.release_payload(payload);
        assert_eq!(allocator.live_payloads(), 0);
        assert_eq!(allocator.payloads_allocated(), 1);
    }

    #[test]
    fn growth_is_recorded() {
        let allocator = TrackingAllocator::new();
        allocator.grow_records(0, 100).unwrap();
        allocator.fail_growth(true);
        assert!(allocator.grow_records(100, 200).is_err());
        assert_eq!(allocator.grow_calls(), 1);
        assert_eq!(allocator.record_slots(), 100);
    }
}
