// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Structured record codec.
//!
//! # Wire format
//!
//! ```text
//! +----------------------+
//! | layout hash (i64 LE) |
//! +----------------------+
//! | key (i32 len, bytes) |
//! +----------------------+
//! | field 0              |  single:   flag ('0'/'1') [+ value]
//! | field 1              |  repeated: count (i32 LE), count x (flag [+ value])
//! | ...                  |
//! +----------------------+
//! ```
//!
//! Fields appear in ascending name order. Nested records are written in
//! place with their own hash and key.

use std::io::{Cursor, Read, Write};
use std::sync::Arc;

use crate::error::{CodecError, CodecResult};
use crate::layout::{check, FieldCodec, LayoutCache, LayoutField, LayoutHash, LookupStats, RecordLayout};
use crate::presence::{read_flag, write_flag};
use crate::primitives::{
    prealloc_capacity, read_i64, read_key, read_len, write_i64, write_key, write_len,
};
use crate::registry::TypeRegistry;
use crate::schema::SchemaCatalog;
use crate::types::{FieldValue, Record, TypeId, Value};

/// Deepest chain of nested records accepted in either direction.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Encodes and decodes [`Record`]s against the kinds of a [`SchemaCatalog`].
///
/// Layouts are resolved lazily, once per kind, and cached for the lifetime of
/// the codec. The codec is `Send + Sync` and is meant to be shared.
pub struct RecordCodec {
    registry: Arc<TypeRegistry>,
    catalog: Arc<SchemaCatalog>,
    layouts: LayoutCache,
}

impl RecordCodec {
    pub fn new(registry: Arc<TypeRegistry>, catalog: Arc<SchemaCatalog>) -> Self {
        Self {
            registry,
            catalog,
            layouts: LayoutCache::new(),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Resolved layout of `kind`, built on first use.
    pub fn layout(&self, kind: &str) -> CodecResult<Arc<RecordLayout>> {
        self.layouts.get_or_try_build(kind, || {
            let schema = self
                .catalog
                .get(kind)
                .ok_or_else(|| CodecError::UnknownRecordKind(kind.to_string()))?;
            RecordLayout::resolve(schema, &self.registry, &self.catalog)
        })
    }

    pub fn layout_hash(&self, kind: &str) -> CodecResult<LayoutHash> {
        self.layout(kind).map(|layout| layout.hash())
    }

    pub fn cache_stats(&self) -> LookupStats {
        self.layouts.stats()
    }

    // -----------------------------------------------------------------------
    // Encoding
    // -----------------------------------------------------------------------

    pub fn serialize_record(&self, record: &Record) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode_at(record, &mut buf, 0)?;
        Ok(buf)
    }

    /// Encode `record` onto `out`.
    ///
    /// The record is encoded in memory first; nothing reaches `out` if any
    /// field fails to encode.
    pub fn write_record(&self, record: &Record, out: &mut dyn Write) -> CodecResult<()> {
        let buf = self.serialize_record(record)?;
        out.write_all(&buf)?;
        Ok(())
    }

    /// Encode a count-prefixed batch of records that all share `kind`.
    pub fn write_records(&self, kind: &str, records: &[Record], out: &mut dyn Write) -> CodecResult<()> {
        let mut buf = Vec::new();
        write_len(&mut buf, records.len(), &TypeId::record(kind))?;
        for record in records {
            if record.kind() != kind {
                return Err(CodecError::InvalidData(format!(
                    "'{}' record in a batch of '{}'",
                    record.kind(),
                    kind
                )));
            }
            self.encode_at(record, &mut buf, 0)?;
        }
        out.write_all(&buf)?;
        Ok(())
    }

    fn encode_at(&self, record: &Record, out: &mut Vec<u8>, depth: usize) -> CodecResult<()> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(CodecError::NestingTooDeep {
                max: MAX_NESTING_DEPTH,
            });
        }
        let layout = self.layout(record.kind())?;
        for (name, _) in record.fields() {
            if layout.field(name).is_none() {
                return Err(CodecError::UnknownField {
                    kind: record.kind().to_string(),
                    field: name.to_string(),
                });
            }
        }

        write_i64(out, layout.hash())?;
        write_key(out, record.key())?;
        for field in layout.fields() {
            match (field.repeated, record.get(&field.name)) {
                (false, None) => write_flag(out, false)?,
                (false, Some(FieldValue::Single(value))) => {
                    self.encode_optional(field, Some(value), out, depth)?
                }
                (true, None) => write_len(out, 0, &field.type_id)?,
                (true, Some(FieldValue::Repeated(items))) => {
                    write_len(out, items.len(), &field.type_id)?;
                    for item in items {
                        self.encode_optional(field, item.as_ref(), out, depth)?;
                    }
                }
                (repeated, Some(_)) => {
                    return Err(CodecError::FieldShape {
                        kind: record.kind().to_string(),
                        field: field.name.clone(),
                        expected: if repeated { "repeated" } else { "single" },
                    })
                }
            }
        }
        Ok(())
    }

    fn encode_optional(
        &self,
        field: &LayoutField,
        value: Option<&Value>,
        out: &mut Vec<u8>,
        depth: usize,
    ) -> CodecResult<()> {
        let Some(value) = value else {
            return write_flag(out, false);
        };
        write_flag(out, true)?;
        match &field.codec {
            FieldCodec::Registered(codec) => codec.encode(value, out),
            FieldCodec::Custom(property) => property.encode(value, out),
            FieldCodec::Record(kind) => match value {
                Value::Record(nested) if nested.kind() == kind.as_str() => {
                    self.encode_at(nested, out, depth + 1)
                }
                other => Err(CodecError::mismatch(&field.type_id, other)),
            },
        }
    }

    // -----------------------------------------------------------------------
    // Decoding
    // -----------------------------------------------------------------------

    /// Read one record of `kind` from `input`.
    ///
    /// The stored layout hash is checked before anything else is consumed;
    /// on mismatch the stream is left just past the hash.
    pub fn deserialize_record(&self, input: &mut dyn Read, kind: &str) -> CodecResult<Record> {
        self.decode_at(input, kind, 0)
    }

    /// Decode a buffer holding exactly one record.
    pub fn decode_record(&self, bytes: &[u8], kind: &str) -> CodecResult<Record> {
        let mut cursor = Cursor::new(bytes);
        let record = self.decode_at(&mut cursor, kind, 0)?;
        let consumed = cursor.position() as usize;
        if consumed != bytes.len() {
            return Err(CodecError::InvalidData(format!(
                "{} trailing bytes after '{}' record",
                bytes.len() - consumed,
                kind
            )));
        }
        Ok(record)
    }

    /// Read a batch written by [`Self::write_records`].
    pub fn read_records(&self, input: &mut dyn Read, kind: &str) -> CodecResult<Vec<Record>> {
        let count = read_len(input)?;
        let mut records = Vec::with_capacity(prealloc_capacity::<Record>(count));
        for _ in 0..count {
            records.push(self.decode_at(input, kind, 0)?);
        }
        Ok(records)
    }

    /// Whether `bytes` starts with the current layout hash of `kind`.
    pub fn is_current(&self, bytes: &[u8], kind: &str) -> CodecResult<bool> {
        let current = self.layout_hash(kind)?;
        let stored = read_i64(&mut Cursor::new(bytes))?;
        Ok(stored == current)
    }

    fn decode_at(&self, input: &mut dyn Read, kind: &str, depth: usize) -> CodecResult<Record> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(CodecError::NestingTooDeep {
                max: MAX_NESTING_DEPTH,
            });
        }
        let layout = self.layout(kind)?;

        let stored = read_i64(input)?;
        if let Err(e) = check(kind, stored, layout.hash()) {
            tracing::warn!(
                "stored layout of '{}' is stale: {:#018x} != {:#018x}",
                kind,
                stored,
                layout.hash()
            );
            return Err(e);
        }

        let mut record = Record::new(kind, read_key(input)?);
        for field in layout.fields() {
            if field.repeated {
                let count = read_len(input)?;
                let mut items = Vec::with_capacity(prealloc_capacity::<Option<Value>>(count));
                for _ in 0..count {
                    items.push(self.decode_optional(field, input, depth)?);
                }
                record.set(field.name.clone(), FieldValue::Repeated(items));
            } else if let Some(value) = self.decode_optional(field, input, depth)? {
                record.set(field.name.clone(), FieldValue::Single(value));
            }
        }
        Ok(record)
    }

    fn decode_optional(
        &self,
        field: &LayoutField,
        input: &mut dyn Read,
        depth: usize,
    ) -> CodecResult<Option<Value>> {
        if !read_flag(input)? {
            return Ok(None);
        }
        let value = match &field.codec {
            FieldCodec::Registered(codec) => codec.decode(input)?,
            FieldCodec::Custom(property) => property.decode(input)?,
            FieldCodec::Record(kind) => {
                Value::Record(Box::new(self.decode_at(input, kind, depth + 1)?))
            }
        };
        Ok(Some(value))
    }
}
