//! Tagged primitive values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tagged primitive value, typically a primary-key value.
///
/// This is the unit the replication payload carries after the class name.
/// `Value::default()` is [`Value::Null`], so `std::mem::take` on a value
/// leaves a null behind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// SQL null.
    #[default]
    Null,
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    BigInt(i64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Object identifier (volume, page, slot).
    Oid {
        /// Volume identifier.
        volume: i16,
        /// Page identifier.
        page: i32,
        /// Slot identifier.
        slot: i16,
    },
}

/// Type tag written in front of each packed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub(crate) enum ValueTag {
    Null = 0,
    Int = 1,
    BigInt = 2,
    Bool = 3,
    Text = 4,
    Bytes = 5,
    Oid = 6,
}

impl ValueTag {
    pub(crate) fn from_i32(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(Self::Null),
            1 => Some(Self::Int),
            2 => Some(Self::BigInt),
            3 => Some(Self::Bool),
            4 => Some(Self::Text),
            5 => Some(Self::Bytes),
            6 => Some(Self::Oid),
            _ => None,
        }
    }
}

impl Value {
    /// Returns true for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the value's type, as shown in dumps.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "int",
            Self::BigInt(_) => "bigint",
            Self::Bool(_) => "bool",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Oid { .. } => "oid",
        }
    }

    pub(crate) fn tag(&self) -> ValueTag {
        match self {
            Self::Null => ValueTag::Null,
            Self::Int(_) => ValueTag::Int,
            Self::BigInt(_) => ValueTag::BigInt,
            Self::Bool(_) => ValueTag::Bool,
            Self::Text(_) => ValueTag::Text,
            Self::Bytes(_) => ValueTag::Bytes,
            Self::Oid { .. } => ValueTag::Oid,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int(n) => write!(f, "{n}"),
            Self::BigInt(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Bytes(bytes) => {
                f.write_str("X'")?;
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                f.write_str("'")
            }
            Self::Oid { volume, page, slot } => write!(f, "{volume}|{page}|{slot}"),
        }
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::BigInt(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}
