//! Class name resolution.

use crate::types::Oid;
use std::collections::HashMap;

/// Resolves class identifiers for replication.
pub trait ClassResolver {
    /// Returns the name of `class`, or `None` if the class is unknown.
    ///
    /// The returned string is owned by the caller.
    fn class_name(&self, class: &Oid) -> Option<String>;

    /// Returns true if changes to instances of `class` are replicated.
    ///
    /// By default every class is replicated; a missing class never is.
    fn is_replicated(&self, class: Option<&Oid>) -> bool {
        class.is_some()
    }
}

impl ClassResolver for HashMap<Oid, String> {
    fn class_name(&self, class: &Oid) -> Option<String> {
        self.get(class).cloned()
    }
}
