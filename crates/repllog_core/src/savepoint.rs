//! Named rollback points into the record store.

use crate::alloc::ReplicationAllocator;
use crate::error::{CoreError, CoreResult};
use crate::store::ReplicationRecordStore;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// A named rollback point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavepointMarker {
    name: String,
    boundary: usize,
}

impl SavepointMarker {
    /// Savepoint name (case-sensitive).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of the first record appended after this savepoint.
    #[must_use]
    pub fn boundary(&self) -> usize {
        self.boundary
    }
}

/// Ordered set of savepoints, oldest first.
///
/// Markers are keyed by a position that only ever increases, so the tail is
/// always the most recently created (or re-created) savepoint and "this
/// savepoint and every later one" is a single range split.
#[derive(Debug)]
pub struct SavepointLedger {
    markers: BTreeMap<u64, SavepointMarker>,
    positions: HashMap<String, u64>,
    next_position: u64,
    allocator: Arc<dyn ReplicationAllocator>,
}

impl SavepointLedger {
    /// Creates an empty ledger.
    pub fn new(allocator: Arc<dyn ReplicationAllocator>) -> Self {
        Self {
            markers: BTreeMap::new(),
            positions: HashMap::new(),
            next_position: 0,
            allocator,
        }
    }

    /// Number of savepoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Returns true if there are no savepoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Looks up a savepoint by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SavepointMarker> {
        self.positions
            .get(name)
            .and_then(|position| self.markers.get(position))
    }

    /// Iterates over savepoints, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &SavepointMarker> {
        self.markers.values()
    }

    /// Savepoint names, oldest first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.markers.values().map(SavepointMarker::name)
    }

    /// Creates a savepoint at `boundary`, or moves an existing one with the
    /// same name to the tail with the new boundary.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AllocationFailure`] if a new marker is refused.
    /// Moving an existing marker never allocates and cannot fail.
    pub fn create_or_move(&mut self, name: &str, boundary: usize) -> CoreResult<()> {
        let existing = self
            .positions
            .remove(name)
            .and_then(|position| self.markers.remove(&position));

        let mut marker = match existing {
            Some(marker) => {
                debug!(savepoint = name, from = marker.boundary, to = boundary, "moved savepoint");
                marker
            }
            None => {
                self.allocator.alloc_savepoint(name)?;
                SavepointMarker {
                    name: name.to_string(),
                    boundary,
                }
            }
        };
        marker.boundary = boundary;

        let position = self.next_position;
        self.next_position += 1;
        self.positions.insert(marker.name.clone(), position);
        self.markers.insert(position, marker);
        Ok(())
    }

    /// Rolls back to the savepoint `name`.
    ///
    /// The savepoint and every savepoint created after it are discarded.
    /// Records appended since the savepoint stay in `store` (indices remain
    /// stable) but are marked as never to be propagated. Returns the
    /// savepoint's boundary.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SavepointNotFound`] if no savepoint has that name.
    pub fn rollback(&mut self, name: &str, store: &mut ReplicationRecordStore) -> CoreResult<usize> {
        let (position, boundary) = self
            .positions
            .get(name)
            .and_then(|position| self.markers.get(position).map(|m| (*position, m.boundary)))
            .ok_or_else(|| CoreError::savepoint_not_found(name))?;

        let discarded = self.markers.split_off(&position);
        for marker in discarded.values() {
            self.positions.remove(&marker.name);
            self.allocator.release_savepoint(&marker.name);
        }

        let suppressed = store.suppress_from(boundary);
        debug!(
            savepoint = name,
            boundary,
            suppressed,
            discarded = discarded.len(),
            "rolled back to savepoint"
        );
        Ok(boundary)
    }

    /// Discards every savepoint.
    pub fn clear(&mut self) {
        for marker in std::mem::take(&mut self.markers).into_values() {
            self.allocator.release_savepoint(&marker.name);
        }
        self.positions.clear();
    }
}

impl Drop for SavepointLedger {
    fn drop(&mut self) {
        self.clear();
    }
}
