//! Replication buffer configuration.

/// Number of records the record array grows by.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Configuration for per-transaction replication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationConfig {
    /// Number of record slots added on each growth step.
    ///
    /// Capacity is always a multiple of this value. Zero is treated as one.
    pub chunk_size: usize,

    /// Hard limit on records per transaction (`None` = unlimited).
    ///
    /// Appending past the limit fails with an allocation failure.
    pub max_records: Option<usize>,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_records: None,
        }
    }
}

impl ReplicationConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the growth chunk size.
    #[must_use]
    pub const fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Sets the per-transaction record limit.
    #[must_use]
    pub const fn max_records(mut self, limit: usize) -> Self {
        self.max_records = Some(limit);
        self
    }

    pub(crate) fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }
}
