//! Must-flush marking window.

use crate::record::FlushRequirement;
use crate::store::ReplicationRecordStore;
use crate::types::Oid;
use tracing::debug;

/// Marks records appended inside a window as needing immediate flush.
///
/// While a window is open, a new record for an instance is marked
/// [`FlushRequirement::NeedFlush`] unless an older record for the same
/// instance, appended before the window opened, is still waiting for commit.
/// In that case the new record follows the older one into the commit batch,
/// so the instance is never flushed out of order.
///
/// Windows do not nest: a second `begin` while open keeps the outer start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushMarker {
    start: Option<usize>,
}

impl FlushMarker {
    /// Creates a marker with no open window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while a window is open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.start.is_some()
    }

    /// Index of the first record inside the open window.
    #[must_use]
    pub fn start(&self) -> Option<usize> {
        self.start
    }

    /// Opens a window at the current end of `store`, unless one is open.
    ///
    /// Returns the start of the window in effect.
    pub fn begin(&mut self, store: &ReplicationRecordStore) -> usize {
        match self.start {
            Some(start) => start,
            None => {
                let start = store.len();
                debug!(start, "opened flush marking window");
                self.start = Some(start);
                start
            }
        }
    }

    /// Decides the flush requirement of a record about to be appended for
    /// `instance`.
    #[must_use]
    pub fn decide(&self, store: &ReplicationRecordStore, instance: &Oid) -> FlushRequirement {
        let Some(start) = self.start else {
            return FlushRequirement::CommitNeedFlush;
        };
        let prefix = &store.records()[..start.min(store.len())];
        let deferred = prefix.iter().any(|record| {
            record.flush() == FlushRequirement::CommitNeedFlush && record.matches_instance(instance)
        });
        if deferred {
            FlushRequirement::CommitNeedFlush
        } else {
            FlushRequirement::NeedFlush
        }
    }

    /// Closes the window.
    ///
    /// With `discard`, every record appended since the window opened is
    /// dropped and its payload released. Returns the number of records
    /// dropped. Closing with no open window does nothing.
    pub fn end(&mut self, store: &mut ReplicationRecordStore, discard: bool) -> usize {
        let Some(start) = self.start.take() else {
            return 0;
        };
        let dropped = if discard { store.truncate_to(start) } else { 0 };
        debug!(start, discard, dropped, "closed flush marking window");
        dropped
    }

    /// Closes the window without touching any record.
    pub fn clear(&mut self) {
        self.start = None;
    }
}
