//! Core type definitions for the replication log.

use repllog_codec::Value;
use std::fmt;

/// Identifier of a transaction owning a replication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Object identifier: the physical address of an instance or class.
///
/// A missing identifier is expressed as `Option<Oid>`, never as a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid {
    /// Volume identifier.
    pub volume: i16,
    /// Page identifier within the volume.
    pub page: i32,
    /// Slot identifier within the page.
    pub slot: i16,
}

impl Oid {
    /// Creates a new object identifier.
    #[must_use]
    pub const fn new(volume: i16, page: i32, slot: i16) -> Self {
        Self { volume, page, slot }
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.volume, self.page, self.slot)
    }
}

impl From<Oid> for Value {
    fn from(oid: Oid) -> Self {
        Value::Oid {
            volume: oid.volume,
            page: oid.page,
            slot: oid.slot,
        }
    }
}

/// Log sequence address: a page and offset in the write-ahead log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lsa {
    /// Log page identifier.
    pub page: i64,
    /// Offset within the log page.
    pub offset: i16,
}

impl Lsa {
    /// Creates a new log sequence address.
    #[must_use]
    pub const fn new(page: i64, offset: i16) -> Self {
        Self { page, offset }
    }
}

impl fmt::Display for Lsa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.page, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_id_display() {
        assert_eq!(TransactionId::new(7).to_string(), "txn:7");
    }

    #[test]
    fn oid_equality_is_componentwise() {
        assert_eq!(Oid::new(0, 10, 1), Oid::new(0, 10, 1));
        assert_ne!(Oid::new(0, 10, 1), Oid::new(0, 10, 2));
        assert_ne!(Oid::new(1, 10, 1), Oid::new(0, 10, 1));
    }

    #[test]
    fn oid_converts_to_value() {
        let value: Value = Oid::new(1, 2, 3).into();
        assert_eq!(value.to_string(), "1|2|3");
    }

    #[test]
    fn lsa_ordering_is_page_then_offset() {
        assert!(Lsa::new(1, 500) < Lsa::new(2, 0));
        assert!(Lsa::new(2, 0) < Lsa::new(2, 8));
        assert_eq!(Lsa::new(40, 16).to_string(), "40|16");
    }
}
