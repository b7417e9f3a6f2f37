//! # repllog Codec
//!
//! Value packing for replication log payloads.
//!
//! A replication payload is a short sequence of packed fields:
//! - data records: class name, then primary-key value
//! - schema records: statement type, class name, then DDL text
//!
//! ## Packing Rules
//!
//! - Integers are 4-byte big-endian
//! - Strings and byte fields carry a 4-byte length prefix
//! - Variable-length bodies are zero-padded to a 4-byte boundary
//! - Values are a 4-byte type tag followed by the type's body
//!
//! ## Usage
//!
//! ```
//! use repllog_codec::{packed_string_size, packed_value_size, Packer, Unpacker, Value};
//!
//! let key = Value::BigInt(1001);
//! let size = packed_string_size("orders") + packed_value_size(&key);
//!
//! let mut packer = Packer::with_buffer(Vec::with_capacity(size));
//! packer.pack_string("orders").unwrap();
//! packer.pack_value(&key).unwrap();
//! let payload = packer.finish();
//! assert_eq!(payload.len(), size);
//!
//! let mut unpacker = Unpacker::new(&payload);
//! assert_eq!(unpacker.unpack_string().unwrap(), "orders");
//! assert_eq!(unpacker.unpack_value().unwrap(), key);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod packer;
mod unpacker;
mod value;

pub use error::{CodecError, CodecResult};
pub use packer::{packed_int_size, packed_string_size, packed_value_size, Packer, INT_SIZE};
pub use unpacker::Unpacker;
pub use value::Value;
