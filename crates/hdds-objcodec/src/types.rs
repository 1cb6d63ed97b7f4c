// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Data model: type identifiers, values, keys and record instances.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TypeId
// ---------------------------------------------------------------------------

/// Semantic type identifier selecting which codec applies to a value.
///
/// Textual form (used in schema files and error messages): the variant name
/// for primitives, `List<T>` for collections and `Record<Kind>` for records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeId {
    String,
    Bytes,
    Bool,
    Int32,
    Int64,
    Float64,
    DateTime,
    JsonBlob,
    OpaqueAny,
    KeyRef,
    List(Box<TypeId>),
    Record(String),
}

impl TypeId {
    /// Every primitive type identifier, in registration order.
    pub const PRIMITIVES: [TypeId; 10] = [
        TypeId::String,
        TypeId::Bytes,
        TypeId::Bool,
        TypeId::Int32,
        TypeId::Int64,
        TypeId::Float64,
        TypeId::DateTime,
        TypeId::JsonBlob,
        TypeId::OpaqueAny,
        TypeId::KeyRef,
    ];

    /// `List<element>`.
    pub fn list(element: TypeId) -> Self {
        TypeId::List(Box::new(element))
    }

    /// `Record<kind>`.
    pub fn record(kind: impl Into<String>) -> Self {
        TypeId::Record(kind.into())
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, TypeId::List(_) | TypeId::Record(_))
    }

    /// Record kind, if this identifies a record.
    pub fn record_kind(&self) -> Option<&str> {
        match self {
            TypeId::Record(kind) => Some(kind),
            _ => None,
        }
    }

    fn primitive_name(&self) -> Option<&'static str> {
        Some(match self {
            TypeId::String => "String",
            TypeId::Bytes => "Bytes",
            TypeId::Bool => "Bool",
            TypeId::Int32 => "Int32",
            TypeId::Int64 => "Int64",
            TypeId::Float64 => "Float64",
            TypeId::DateTime => "DateTime",
            TypeId::JsonBlob => "JsonBlob",
            TypeId::OpaqueAny => "OpaqueAny",
            TypeId::KeyRef => "KeyRef",
            TypeId::List(_) | TypeId::Record(_) => return None,
        })
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeId::List(inner) => write!(f, "List<{}>", inner),
            TypeId::Record(kind) => write!(f, "Record<{}>", kind),
            other => f.write_str(other.primitive_name().unwrap_or("?")),
        }
    }
}

/// Error returned when a type identifier string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTypeIdError(pub String);

impl fmt::Display for ParseTypeIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid type identifier: '{}'", self.0)
    }
}

impl std::error::Error for ParseTypeIdError {}

impl FromStr for TypeId {
    type Err = ParseTypeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(inner) = generic_argument(s, "List") {
            return Ok(TypeId::list(inner.parse()?));
        }
        if let Some(kind) = generic_argument(s, "Record") {
            let kind = kind.trim();
            if kind.is_empty() || kind.contains(['<', '>']) {
                return Err(ParseTypeIdError(s.to_string()));
            }
            return Ok(TypeId::record(kind));
        }
        TypeId::PRIMITIVES
            .iter()
            .find(|t| t.primitive_name() == Some(s))
            .cloned()
            .ok_or_else(|| ParseTypeIdError(s.to_string()))
    }
}

/// Returns the text between `Name<` and the closing `>`.
fn generic_argument<'a>(s: &'a str, name: &str) -> Option<&'a str> {
    s.strip_prefix(name)?.strip_prefix('<')?.strip_suffix('>')
}

impl TryFrom<String> for TypeId {
    type Error = ParseTypeIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TypeId> for String {
    fn from(t: TypeId) -> Self {
        t.to_string()
    }
}

// ---------------------------------------------------------------------------
// RecordKey
// ---------------------------------------------------------------------------

/// Opaque identity key of a record, usable by the application to locate or
/// rebuild it. The codec only carries the bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey(Vec<u8>);

impl RecordKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for RecordKey {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for RecordKey {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<Vec<u8>> for RecordKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

// ---------------------------------------------------------------------------
// OpaqueValue
// ---------------------------------------------------------------------------

/// Untyped object graph carried by the `OpaqueAny` fallback codec.
///
/// Maps keep insertion order so that encoding stays deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpaqueValue {
    Unit,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Seq(Vec<OpaqueValue>),
    Map(Vec<(OpaqueValue, OpaqueValue)>),
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A typed application value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Bytes(Vec<u8>),
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    DateTime(DateTime<Utc>),
    Json(serde_json::Value),
    Opaque(OpaqueValue),
    Key(RecordKey),
    List(Vec<Value>),
    Record(Box<Record>),
}

impl Value {
    /// Short variant name, used in type mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Bool(_) => "Bool",
            Value::Int32(_) => "Int32",
            Value::Int64(_) => "Int64",
            Value::Float64(_) => "Float64",
            Value::DateTime(_) => "DateTime",
            Value::Json(_) => "Json",
            Value::Opaque(_) => "Opaque",
            Value::Key(_) => "Key",
            Value::List(_) => "List",
            Value::Record(_) => "Record",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_value_from!(
    String => String,
    Vec<u8> => Bytes,
    bool => Bool,
    i32 => Int32,
    i64 => Int64,
    f64 => Float64,
    DateTime<Utc> => DateTime,
    serde_json::Value => Json,
    OpaqueValue => Opaque,
    RecordKey => Key,
    Vec<Value> => List,
);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(Box::new(r))
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Value stored in one record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Single-valued field.
    Single(Value),
    /// Repeated field; each element may be absent.
    Repeated(Vec<Option<Value>>),
}

/// One structured record instance: kind, identity key and named fields.
///
/// A single-valued field that is not set is absent on the wire. Decoding
/// always fills repeated fields, with an empty list when the count is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    kind: String,
    key: RecordKey,
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(kind: impl Into<String>, key: impl Into<RecordKey>) -> Self {
        Self {
            kind: kind.into(),
            key: key.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set a single-valued field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, FieldValue::Single(value.into()));
        self
    }

    /// Set a repeated field where every element is present.
    pub fn with_repeated<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items = values.into_iter().map(|v| Some(v.into())).collect();
        self.set(name, FieldValue::Repeated(items));
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Value of a single-valued field.
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.fields.get(name)? {
            FieldValue::Single(v) => Some(v),
            FieldValue::Repeated(_) => None,
        }
    }

    /// Elements of a repeated field.
    pub fn repeated(&self, name: &str) -> Option<&[Option<Value>]> {
        match self.fields.get(name)? {
            FieldValue::Repeated(items) => Some(items),
            FieldValue::Single(_) => None,
        }
    }

    /// Fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_id_display_and_parse() {
        let cases = [
            TypeId::Int32,
            TypeId::KeyRef,
            TypeId::list(TypeId::Bool),
            TypeId::list(TypeId::list(TypeId::String)),
            TypeId::record("Person"),
            TypeId::list(TypeId::record("Address")),
        ];
        for t in cases {
            let text = t.to_string();
            assert_eq!(text.parse::<TypeId>().expect("parse"), t, "{}", text);
        }
        assert_eq!(TypeId::list(TypeId::Float64).to_string(), "List<Float64>");
    }

    #[test]
    fn type_id_parse_rejects_garbage() {
        for bad in ["", "int32", "List<>", "List<Int32", "Record<>", "Record<A<B>>", "Map<String>"] {
            assert!(bad.parse::<TypeId>().is_err(), "accepted {:?}", bad);
        }
        assert_eq!(" Int64 ".parse::<TypeId>().expect("trimmed"), TypeId::Int64);
    }

    #[test]
    fn type_id_serde_uses_text_form() {
        let json = serde_json::to_string(&TypeId::list(TypeId::Int32)).expect("serialize");
        assert_eq!(json, "\"List<Int32>\"");
        let back: TypeId = serde_json::from_str("\"Record<Order>\"").expect("deserialize");
        assert_eq!(back, TypeId::record("Order"));
    }

    #[test]
    fn record_accessors() {
        let mut record = Record::new("Person", "person:1")
            .with_field("age", 41)
            .with_repeated("tags", ["a", "b"]);

        assert_eq!(record.kind(), "Person");
        assert_eq!(record.key().to_string(), "person:1");
        assert_eq!(record.value("age"), Some(&Value::Int32(41)));
        assert_eq!(record.repeated("tags").map(<[_]>::len), Some(2));
        assert!(record.value("tags").is_none());
        assert!(record.repeated("age").is_none());

        let names: Vec<_> = record.fields().map(|(name, _)| name).collect();
        assert_eq!(names, ["age", "tags"]);

        assert!(record.remove("age").is_some());
        assert_eq!(record.field_count(), 1);
    }

    #[test]
    fn value_helpers() {
        assert_eq!(Value::from(7i32).as_i64(), Some(7));
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(vec![Value::Int64(1)]).as_list().map(<[_]>::len), Some(1));
        assert_eq!(Value::Float64(1.0).type_name(), "Float64");
    }
}
