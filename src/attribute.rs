//! Key/value span attributes produced by the tracing wrappers.

use std::{borrow::Cow, fmt};

use rusqlite::types::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(v) => write!(f, "{v}"),
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Float(v) => write!(f, "{v}"),
            AttrValue::Str(v) => write!(f, "{v:?}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeyValue {
    pub key: Cow<'static, str>,
    pub value: AttrValue,
}

impl KeyValue {
    pub fn new(key: impl Into<Cow<'static, str>>, value: AttrValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn string(key: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        Self::new(key, AttrValue::Str(value.into()))
    }

    pub fn int(key: impl Into<Cow<'static, str>>, value: i64) -> Self {
        Self::new(key, AttrValue::Int(value))
    }

    /// Typed attribute for a bound SQL argument. Blobs are hex-encoded.
    pub fn from_sql_value(key: impl Into<Cow<'static, str>>, value: &Value) -> Self {
        let value = match value {
            Value::Null => AttrValue::Str("NULL".to_string()),
            Value::Integer(v) => AttrValue::Int(*v),
            Value::Real(v) => AttrValue::Float(*v),
            Value::Text(v) => AttrValue::Str(v.clone()),
            Value::Blob(v) => AttrValue::Str(hex_encode(v)),
        };
        Self::new(key, value)
    }
}

/// Renders a slice as `key=value` pairs for a single span field.
pub struct AttrList<'a>(pub &'a [KeyValue]);

impl fmt::Display for AttrList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, kv) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", kv.key, kv.value)?;
        }
        Ok(())
    }
}

pub fn hex_encode(bytes: &[u8]) -> String {
    use fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
