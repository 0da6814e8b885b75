//! The dynamically-typed [`Value`] and the dictionary-backed [`Record`] that
//! stands in for a user's declared record type.

use std::collections::HashMap;
use std::fmt;
use std::str::Utf8Error;
use std::sync::Arc;

/// Any value that can sit in a wire slot: a scalar, a raw byte array, a list
/// of child records, or a single nested record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Bytes(Vec<u8>),
    Str(String),
    List(Vec<Value>),
    Record(Box<Record>),
}

impl Value {
    /// The record this value holds, if it is a `Value::Record`.
    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// The list this value holds, if it is a `Value::List`.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// The raw bytes this value holds, if it is `Value::Bytes` or
    /// `Value::Str` (the latter re-encoded as UTF-8).
    #[must_use]
    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Self::Bytes(b) => Some(b.clone()),
            Self::Str(s) => Some(utf8_to_bytes(s)),
            _ => None,
        }
    }

    /// Interprets this value as a nonnegative integer, used to resolve
    /// `{mname}` placeholders and `Fixed`/`CountOf` child counts.
    #[must_use]
    pub fn as_usize(&self) -> Option<usize> {
        match *self {
            Self::U8(v) => Some(v as usize),
            Self::U16(v) => Some(v as usize),
            Self::U32(v) => Some(v as usize),
            Self::U64(v) => usize::try_from(v).ok(),
            Self::I8(v) => usize::try_from(v).ok(),
            Self::I16(v) => usize::try_from(v).ok(),
            Self::I32(v) => usize::try_from(v).ok(),
            Self::I64(v) => usize::try_from(v).ok(),
            _ => None,
        }
    }

    /// Interprets this value as a signed 64-bit integer, used for constant
    /// comparisons.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::U8(v) => Some(i64::from(v)),
            Self::I8(v) => Some(i64::from(v)),
            Self::U16(v) => Some(i64::from(v)),
            Self::I16(v) => Some(i64::from(v)),
            Self::U32(v) => Some(i64::from(v)),
            Self::I32(v) => Some(i64::from(v)),
            Self::U64(v) => i64::try_from(v).ok(),
            Self::I64(v) => Some(v),
            _ => None,
        }
    }
}

/// The dictionary-backed stand-in for a user's declared record type: a
/// `type_name` tag (used for child dispatch by dynamic type) plus a field
/// map keyed by slot name.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: Arc<str>,
    fields: HashMap<String, Value>,
}

impl Record {
    #[must_use]
    pub fn new(type_name: impl Into<Arc<str>>, fields: impl Into<HashMap<String, Value>>) -> Self {
        Self { type_name: type_name.into(), fields: fields.into() }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    #[must_use]
    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.type_name, self.fields)
    }
}

/// Byte length of `s` encoded as UTF-8.
#[must_use]
pub fn utf8_size(s: &str) -> usize {
    s.len()
}

/// Encode `s` to its UTF-8 bytes.
#[must_use]
pub fn utf8_to_bytes(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

/// Decode UTF-8 bytes back to a `String`.
pub fn utf8_from_bytes(b: &[u8]) -> Result<String, Utf8Error> {
    std::str::from_utf8(b).map(str::to_string)
}
