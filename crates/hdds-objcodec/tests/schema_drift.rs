// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Layout drift: records written under one field set must be refused, not
// misread, by a codec built from a different field set.

use std::io::{Cursor, Write};
use std::sync::Arc;

use hdds_objcodec::{
    compute_hash, CodecError, FieldSchema, Record, RecordCodec, RecordSchema, SchemaCatalog,
    TypeId, TypeRegistry,
};

// Stale-layout warnings show up with `cargo test -- --nocapture`
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

fn codec_with(fields: &[(&str, TypeId)]) -> RecordCodec {
    let mut schema = RecordSchema::new("Sample");
    for (name, ty) in fields {
        schema = schema.field(FieldSchema::new(*name, ty.clone()));
    }
    let mut catalog = SchemaCatalog::new();
    catalog.add(schema).unwrap();
    RecordCodec::new(Arc::new(TypeRegistry::standard()), Arc::new(catalog))
}

fn v1() -> RecordCodec {
    codec_with(&[("a", TypeId::Int32), ("b", TypeId::String)])
}

fn stored_v1() -> Vec<u8> {
    let record = Record::new("Sample", "k")
        .with_field("a", 1i32)
        .with_field("b", "one");
    v1().serialize_record(&record).unwrap()
}

#[test]
fn added_field_is_detected() {
    init_tracing();
    let v2 = codec_with(&[
        ("a", TypeId::Int32),
        ("b", TypeId::String),
        ("c", TypeId::list(TypeId::Bool)),
    ]);
    let bytes = stored_v1();

    let mut cursor = Cursor::new(bytes.as_slice());
    let err = v2.deserialize_record(&mut cursor, "Sample").unwrap_err();
    match err {
        CodecError::SchemaOutOfDate {
            kind,
            stored,
            current,
        } => {
            assert_eq!(kind, "Sample");
            assert_eq!(stored, compute_hash(&["a", "b"]));
            assert_eq!(current, compute_hash(&["a", "b", "c"]));
        }
        other => panic!("expected SchemaOutOfDate, got {other}"),
    }
    // Only the hash was consumed.
    assert_eq!(cursor.position(), 8);
}

#[test]
fn removed_field_is_detected() {
    let v0 = codec_with(&[("a", TypeId::Int32)]);
    let err = v0.decode_record(&stored_v1(), "Sample").unwrap_err();
    assert!(err.is_schema_out_of_date());
}

#[test]
fn renamed_field_is_detected() {
    let renamed = codec_with(&[("a", TypeId::Int32), ("bee", TypeId::String)]);
    assert!(!renamed.is_current(&stored_v1(), "Sample").unwrap());
    assert!(v1().is_current(&stored_v1(), "Sample").unwrap());
}

#[test]
fn reordered_declaration_is_compatible() {
    let reordered = codec_with(&[("b", TypeId::String), ("a", TypeId::Int32)]);
    let decoded = reordered.decode_record(&stored_v1(), "Sample").unwrap();
    assert_eq!(decoded.value("b").and_then(|v| v.as_str()), Some("one"));
}

#[test]
fn drift_in_nested_record_is_detected() {
    init_tracing();
    let outer = |inner_fields: &[&str]| {
        let mut inner = RecordSchema::new("Inner");
        for name in inner_fields {
            inner = inner.field(FieldSchema::new(*name, TypeId::Int64));
        }
        let mut catalog = SchemaCatalog::new();
        catalog.add(inner).unwrap();
        catalog
            .add(RecordSchema::new("Outer").field(FieldSchema::new("inner", TypeId::record("Inner"))))
            .unwrap();
        RecordCodec::new(Arc::new(TypeRegistry::standard()), Arc::new(catalog))
    };

    let old = outer(&["x"][..]);
    let new = outer(&["x", "y"][..]);
    let record = Record::new("Outer", "o").with_field("inner", Record::new("Inner", "i").with_field("x", 3i64));
    let bytes = old.serialize_record(&record).unwrap();

    // Outer layout is unchanged, the nested one is not.
    assert!(new.is_current(&bytes, "Outer").unwrap());
    match new.decode_record(&bytes, "Outer").unwrap_err() {
        CodecError::SchemaOutOfDate { kind, .. } => assert_eq!(kind, "Inner"),
        other => panic!("expected SchemaOutOfDate, got {other}"),
    }
}

#[test]
fn drift_stops_a_batch() {
    let mut stream = Vec::new();
    let records = vec![
        Record::new("Sample", "1").with_field("a", 1i32),
        Record::new("Sample", "2").with_field("a", 2i32),
    ];
    v1().write_records("Sample", &records, &mut stream).unwrap();
    stream.flush().unwrap();

    let v2 = codec_with(&[("a", TypeId::Int32)]);
    let err = v2.read_records(&mut Cursor::new(stream), "Sample").unwrap_err();
    assert!(err.is_schema_out_of_date());
}
