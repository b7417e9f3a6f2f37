//! # repllog Testkit
//!
//! Test utilities for repllog.
//!
//! This crate provides:
//! - An accounting allocator with failure injection
//! - State fixtures and an in-memory class resolver
//! - Property-based generators for replication operation sequences
//! - Fuzz harnesses for payload decoding and operation sequences
//!
//! ## Usage
//!
//! ```rust
//! use repllog_core::ReplicationConfig;
//! use repllog_testkit::prelude::*;
//!
//! let (mut state, allocator) = tracked_state(&ReplicationConfig::default());
//! append_updates(&mut state, 0..3);
//! state.begin_flush_mark();
//! append_updates(&mut state, 3..5);
//! state.end_flush_mark(true);
//! assert_eq!(allocator.live_payloads(), 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod allocator;
pub mod fixtures;
pub mod fuzz;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::allocator::*;
    pub use crate::fixtures::*;
    pub use crate::fuzz::*;
    pub use crate::generators::*;
}

pub use allocator::*;
pub use fixtures::*;
pub use fuzz::*;
pub use generators::*;
