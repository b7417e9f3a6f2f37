//! Unpacking of fields written by [`crate::Packer`].

use crate::error::{CodecError, CodecResult};
use crate::packer::{align4, INT_SIZE};
use crate::value::{Value, ValueTag};
use bytes::Buf;

/// Reads packed fields from a borrowed buffer, front to back.
pub struct Unpacker<'a> {
    data: &'a [u8],
}

impl<'a> Unpacker<'a> {
    /// Creates an unpacker over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Returns true if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        !self.data.has_remaining()
    }

    /// Returns the unconsumed bytes.
    pub fn remaining(&self) -> &'a [u8] {
        self.data
    }

    /// Unpacks a 32-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnexpectedEof`] if fewer than four bytes remain.
    pub fn unpack_int(&mut self) -> CodecResult<i32> {
        self.ensure(INT_SIZE)?;
        Ok(self.data.get_i32())
    }

    /// Unpacks a length-prefixed string.
    ///
    /// # Errors
    ///
    /// Returns an error on truncated input, a negative length or invalid
    /// UTF-8.
    pub fn unpack_string(&mut self) -> CodecResult<String> {
        let bytes = self.unpack_raw()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    /// Unpacks a tagged value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownTag`] for tags this codec does not write,
    /// and the errors of the underlying field readers.
    #[allow(clippy::cast_possible_truncation)]
    pub fn unpack_value(&mut self) -> CodecResult<Value> {
        let tag = self.unpack_int()?;
        let tag = ValueTag::from_i32(tag).ok_or(CodecError::UnknownTag { tag })?;
        let value = match tag {
            ValueTag::Null => Value::Null,
            ValueTag::Int => Value::Int(self.unpack_int()?),
            ValueTag::BigInt => {
                self.ensure(8)?;
                Value::BigInt(self.data.get_i64())
            }
            ValueTag::Bool => Value::Bool(self.unpack_int()? != 0),
            ValueTag::Text => Value::Text(self.unpack_string()?),
            ValueTag::Bytes => Value::Bytes(self.unpack_raw()?.to_vec()),
            ValueTag::Oid => {
                let volume = self.unpack_int()?;
                let page = self.unpack_int()?;
                let slot = self.unpack_int()?;
                Value::Oid {
                    volume: volume as i16,
                    page,
                    slot: slot as i16,
                }
            }
        };
        Ok(value)
    }

    fn unpack_raw(&mut self) -> CodecResult<&'a [u8]> {
        let length = self.unpack_int()?;
        let len = usize::try_from(length).map_err(|_| CodecError::NegativeLength { length })?;
        let padded = align4(len);
        self.ensure(padded)?;
        let data = self.data;
        self.data = &data[padded..];
        Ok(&data[..len])
    }

    #[inline]
    fn ensure(&self, needed: usize) -> CodecResult<()> {
        if self.data.remaining() < needed {
            return Err(CodecError::eof(needed, self.data.remaining()));
        }
        Ok(())
    }
}
