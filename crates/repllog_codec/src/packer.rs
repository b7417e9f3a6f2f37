//! Packing of integers, strings and values into a byte buffer.

use crate::error::{CodecError, CodecResult};
use crate::value::{Value, ValueTag};
use bytes::BufMut;

/// Size of a packed integer in bytes.
pub const INT_SIZE: usize = 4;

/// Rounds `len` up to the 4-byte packing alignment.
#[inline]
pub(crate) const fn align4(len: usize) -> usize {
    (len + 3) & !3
}

/// Returns the packed size of an integer.
#[must_use]
pub const fn packed_int_size() -> usize {
    INT_SIZE
}

/// Returns the packed size of a length-prefixed string.
#[must_use]
pub fn packed_string_size(s: &str) -> usize {
    INT_SIZE + align4(s.len())
}

/// Returns the packed size of a tagged value.
#[must_use]
pub fn packed_value_size(value: &Value) -> usize {
    let body = match value {
        Value::Null => 0,
        Value::Int(_) | Value::Bool(_) => INT_SIZE,
        Value::BigInt(_) => 8,
        Value::Text(s) => packed_string_size(s),
        Value::Bytes(b) => INT_SIZE + align4(b.len()),
        Value::Oid { .. } => 3 * INT_SIZE,
    };
    INT_SIZE + body
}

/// Writes packed fields into an owned buffer.
///
/// Integers are 4-byte big-endian. Strings and byte fields carry a 4-byte
/// length and are zero-padded to the next 4-byte boundary.
///
/// # Example
///
/// ```
/// use repllog_codec::{Packer, Unpacker, Value};
///
/// let mut packer = Packer::new();
/// packer.pack_string("orders").unwrap();
/// packer.pack_value(&Value::Int(42)).unwrap();
/// let bytes = packer.finish();
///
/// let mut unpacker = Unpacker::new(&bytes);
/// assert_eq!(unpacker.unpack_string().unwrap(), "orders");
/// assert_eq!(unpacker.unpack_value().unwrap(), Value::Int(42));
/// assert!(unpacker.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct Packer {
    buffer: Vec<u8>,
}

impl Packer {
    /// Creates a packer with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a packer that writes into `buffer`, keeping its capacity.
    ///
    /// Existing contents are discarded.
    #[must_use]
    pub fn with_buffer(mut buffer: Vec<u8>) -> Self {
        buffer.clear();
        Self { buffer }
    }

    /// Number of bytes packed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing has been packed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Packs a 32-bit integer.
    pub fn pack_int(&mut self, n: i32) {
        self.buffer.put_i32(n);
    }

    /// Packs a length-prefixed string.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::LengthOverflow`] if the string does not fit a
    /// 4-byte length prefix.
    pub fn pack_string(&mut self, s: &str) -> CodecResult<()> {
        self.pack_raw(s.as_bytes())
    }

    /// Packs a tagged value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::LengthOverflow`] for oversized text or bytes.
    pub fn pack_value(&mut self, value: &Value) -> CodecResult<()> {
        self.pack_int(value.tag() as i32);
        match value {
            Value::Null => Ok(()),
            Value::Int(n) => {
                self.pack_int(*n);
                Ok(())
            }
            Value::BigInt(n) => {
                self.buffer.put_i64(*n);
                Ok(())
            }
            Value::Bool(b) => {
                self.pack_int(i32::from(*b));
                Ok(())
            }
            Value::Text(s) => self.pack_string(s),
            Value::Bytes(b) => self.pack_raw(b),
            Value::Oid { volume, page, slot } => {
                self.pack_int(i32::from(*volume));
                self.pack_int(*page);
                self.pack_int(i32::from(*slot));
                Ok(())
            }
        }
    }

    /// Consumes the packer and returns the packed bytes.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }

    fn pack_raw(&mut self, bytes: &[u8]) -> CodecResult<()> {
        let length =
            i32::try_from(bytes.len()).map_err(|_| CodecError::LengthOverflow {
                length: bytes.len(),
            })?;
        self.pack_int(length);
        self.buffer.put_slice(bytes);
        self.buffer.put_bytes(0, align4(bytes.len()) - bytes.len());
        Ok(())
    }
}
