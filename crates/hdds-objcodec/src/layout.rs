// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record layouts and the schema version guard.
//!
//! A layout is the sorted field list of one record kind with every field's
//! codec already resolved. Its hash is derived from the field names only:
//!
//! ```text
//! names  = sort(field names)
//! digest = MD5(names.join(","))
//! hash   = i64::from_le_bytes(digest[0..8])
//! ```
//!
//! The hash is written in front of every encoded record and checked before
//! anything else is read back, so a stream produced under an older definition
//! fails immediately instead of being misread.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use md5::{Digest, Md5};
use parking_lot::RwLock;

use crate::custom::CustomProperty;
use crate::error::{CodecError, CodecResult};
use crate::registry::{SharedCodec, TypeRegistry};
use crate::schema::{RecordSchema, SchemaCatalog};
use crate::types::TypeId;

/// Truncated MD5 of a record kind's sorted field names.
pub type LayoutHash = i64;

/// Hash a set of field names. Input order does not matter.
///
/// Names are joined with ',', so a name containing ',' collides with the
/// split set; [`RecordSchema::validate`] rejects such names.
pub fn compute_hash<S: AsRef<str>>(field_names: &[S]) -> LayoutHash {
    let mut names: Vec<&str> = field_names.iter().map(AsRef::as_ref).collect();
    names.sort_unstable();

    let mut hasher = Md5::new();
    hasher.update(names.join(",").as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_le_bytes(bytes)
}

/// Fail with [`CodecError::SchemaOutOfDate`] unless the hashes agree.
pub fn check(kind: &str, stored: LayoutHash, current: LayoutHash) -> CodecResult<()> {
    if stored == current {
        Ok(())
    } else {
        Err(CodecError::SchemaOutOfDate {
            kind: kind.to_string(),
            stored,
            current,
        })
    }
}

/// How one field's values are written.
#[derive(Clone)]
pub enum FieldCodec {
    /// Codec from the type registry.
    Registered(SharedCodec),
    /// Named custom property.
    Custom(Arc<dyn CustomProperty>),
    /// Nested record of the given kind, handled by the record codec.
    Record(String),
}

impl fmt::Debug for FieldCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldCodec::Registered(_) => f.write_str("Registered"),
            FieldCodec::Custom(p) => write!(f, "Custom({})", p.name()),
            FieldCodec::Record(kind) => write!(f, "Record({})", kind),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutField {
    pub name: String,
    pub type_id: TypeId,
    pub repeated: bool,
    pub codec: FieldCodec,
}

/// Resolved, sorted field list of one record kind.
#[derive(Debug, Clone)]
pub struct RecordLayout {
    kind: String,
    hash: LayoutHash,
    fields: Vec<LayoutField>,
}

impl RecordLayout {
    /// Resolve every field of `schema` to its codec.
    ///
    /// Custom properties win over nested record kinds, which win over the type
    /// registry.
    pub fn resolve(
        schema: &RecordSchema,
        registry: &TypeRegistry,
        catalog: &SchemaCatalog,
    ) -> CodecResult<Self> {
        let mut declared: Vec<_> = schema.fields.iter().collect();
        declared.sort_by(|a, b| a.name.cmp(&b.name));

        let mut fields = Vec::with_capacity(declared.len());
        for field in declared {
            let codec = if let Some(name) = &field.custom {
                let property = catalog.custom_property(name).ok_or_else(|| {
                    CodecError::UnknownCustomProperty {
                        name: name.clone(),
                        kind: schema.kind.clone(),
                        field: field.name.clone(),
                    }
                })?;
                FieldCodec::Custom(Arc::clone(property))
            } else if let Some(kind) = field.type_id.record_kind() {
                if !catalog.contains(kind) {
                    return Err(CodecError::UnknownRecordKind(kind.to_string()));
                }
                FieldCodec::Record(kind.to_string())
            } else {
                FieldCodec::Registered(Arc::clone(registry.get_codec(&field.type_id)?))
            };
            fields.push(LayoutField {
                name: field.name.clone(),
                type_id: field.type_id.clone(),
                repeated: field.repeated,
                codec,
            });
        }

        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        Ok(Self {
            kind: schema.kind.clone(),
            hash: compute_hash(&names),
            fields,
        })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn hash(&self) -> LayoutHash {
        self.hash
    }

    /// Fields in encoding order.
    pub fn fields(&self) -> &[LayoutField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&LayoutField> {
        self.fields
            .binary_search_by(|f| f.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.fields[idx])
    }
}

/// Cache hit/miss statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LookupStats {
    pub hits: u64,
    pub misses: u64,
    pub last_build_ns: u64,
}

/// Layouts by record kind, built on first use and kept for the life of the
/// cache.
#[derive(Default)]
pub struct LayoutCache {
    inner: RwLock<HashMap<String, Arc<RecordLayout>>>,
    stats: RwLock<LookupStats>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_try_build<F>(&self, kind: &str, build: F) -> CodecResult<Arc<RecordLayout>>
    where
        F: FnOnce() -> CodecResult<RecordLayout>,
    {
        if let Some(hit) = self.inner.read().get(kind) {
            self.record_hit();
            return Ok(Arc::clone(hit));
        }

        let mut cache = self.inner.write();
        if let Some(hit) = cache.get(kind) {
            self.record_hit();
            return Ok(Arc::clone(hit));
        }

        let start = Instant::now();
        let built = Arc::new(build()?);
        tracing::debug!(
            "built layout for '{}': {} fields, hash {:#018x}",
            built.kind(),
            built.fields().len(),
            built.hash()
        );
        cache.insert(kind.to_string(), Arc::clone(&built));
        self.record_miss(start);
        Ok(built)
    }

    pub fn get(&self, kind: &str) -> Option<Arc<RecordLayout>> {
        self.inner.read().get(kind).map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn stats(&self) -> LookupStats {
        *self.stats.read()
    }

    fn record_hit(&self) {
        let mut stats = self.stats.write();
        stats.hits = stats.hits.saturating_add(1);
    }

    fn record_miss(&self, start: Instant) {
        let mut stats = self.stats.write();
        stats.misses = stats.misses.saturating_add(1);
        stats.last_build_ns = start.elapsed().as_nanos() as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custom::EmailProperty;
    use crate::schema::FieldSchema;

    fn catalog() -> SchemaCatalog {
        let mut catalog = SchemaCatalog::new();
        catalog
            .register_custom(Arc::new(EmailProperty))
            .expect("custom");
        catalog
            .add(
                RecordSchema::new("Person")
                    .field(FieldSchema::new("name", TypeId::String))
                    .field(FieldSchema::new("age", TypeId::Int32))
                    .field(FieldSchema::new("emails", TypeId::String).repeated().with_custom("email"))
                    .field(FieldSchema::new("friend", TypeId::record("Person"))),
            )
            .expect("add");
        catalog
    }

    #[test]
    fn hash_is_order_independent() {
        assert_eq!(compute_hash(&["a", "b", "c"]), compute_hash(&["c", "a", "b"]));
        assert_ne!(compute_hash(&["a", "b"]), compute_hash(&["a", "b", "c"]));
        assert_ne!(compute_hash(&["ab"]), compute_hash(&["a", "b"]));
    }

    #[test]
    fn hash_matches_truncated_md5() {
        let digest = Md5::digest(b"a,b,c");
        let mut expected = [0u8; 8];
        expected.copy_from_slice(&digest[..8]);
        assert_eq!(compute_hash(&["b", "c", "a"]), i64::from_le_bytes(expected));

        let empty: [&str; 0] = [];
        let digest = Md5::digest(b"");
        let mut expected = [0u8; 8];
        expected.copy_from_slice(&digest[..8]);
        assert_eq!(compute_hash(&empty), i64::from_le_bytes(expected));
    }

    #[test]
    fn comma_names_would_collide_and_are_refused() {
        assert_eq!(compute_hash(&["a,b"]), compute_hash(&["a", "b"]));

        let mut catalog = SchemaCatalog::new();
        catalog
            .add(
                RecordSchema::new("Split")
                    .field(FieldSchema::new("a", TypeId::Int32))
                    .field(FieldSchema::new("b", TypeId::String)),
            )
            .expect("split names");
        let err = catalog
            .add(RecordSchema::new("Joined").field(FieldSchema::new("a,b", TypeId::String)))
            .unwrap_err();
        assert!(matches!(err, crate::schema::SchemaError::InvalidFieldName { .. }));
    }

    #[test]
    fn check_reports_both_hashes() {
        assert!(check("K", 5, 5).is_ok());
        match check("K", 1, 2).unwrap_err() {
            CodecError::SchemaOutOfDate {
                kind,
                stored,
                current,
            } => {
                assert_eq!(kind, "K");
                assert_eq!((stored, current), (1, 2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn resolve_sorts_and_dispatches() {
        let catalog = catalog();
        let registry = TypeRegistry::standard();
        let layout = RecordLayout::resolve(catalog.get("Person").expect("schema"), &registry, &catalog)
            .expect("resolve");

        let names: Vec<&str> = layout.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["age", "emails", "friend", "name"]);
        assert_eq!(layout.hash(), compute_hash(&names));

        assert!(matches!(layout.field("age").expect("age").codec, FieldCodec::Registered(_)));
        assert!(matches!(layout.field("emails").expect("emails").codec, FieldCodec::Custom(_)));
        assert!(matches!(&layout.field("friend").expect("friend").codec, FieldCodec::Record(k) if k == "Person"));
        assert!(layout.field("missing").is_none());
    }

    #[test]
    fn resolve_reports_missing_codecs() {
        let registry = TypeRegistry::standard();
        let mut catalog = SchemaCatalog::new();
        catalog
            .add(RecordSchema::new("A").field(FieldSchema::new("x", TypeId::String).with_custom("phone")))
            .expect("add");
        catalog
            .add(RecordSchema::new("B").field(FieldSchema::new("x", TypeId::record("Nope"))))
            .expect("add");
        catalog
            .add(RecordSchema::new("C").field(FieldSchema::new("x", TypeId::list(TypeId::list(TypeId::Bool)))))
            .expect("add");

        let resolve = |kind: &str| {
            RecordLayout::resolve(catalog.get(kind).expect("schema"), &registry, &catalog).unwrap_err()
        };
        assert!(matches!(resolve("A"), CodecError::UnknownCustomProperty { .. }));
        assert!(matches!(resolve("B"), CodecError::UnknownRecordKind(k) if k == "Nope"));
        assert!(matches!(resolve("C"), CodecError::UnknownType(_)));
    }

    #[test]
    fn cache_builds_once() {
        let catalog = catalog();
        let registry = TypeRegistry::standard();
        let cache = LayoutCache::new();
        let mut builds = 0;

        for _ in 0..3 {
            let layout = cache
                .get_or_try_build("Person", || {
                    builds += 1;
                    RecordLayout::resolve(catalog.get("Person").expect("schema"), &registry, &catalog)
                })
                .expect("layout");
            assert_eq!(layout.kind(), "Person");
        }

        assert_eq!(builds, 1);
        assert_eq!(cache.len(), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (2, 1));
    }

    #[test]
    fn failed_build_is_not_cached() {
        let cache = LayoutCache::new();
        let err = cache
            .get_or_try_build("Ghost", || Err(CodecError::UnknownRecordKind("Ghost".into())))
            .unwrap_err();
        assert!(matches!(err, CodecError::UnknownRecordKind(_)));
        assert!(cache.is_empty());
        assert!(cache.get("Ghost").is_none());
    }
}
