// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS Object Codec
//!
//! Compact binary encoding for typed application values and structured
//! records, with a guard that detects records written under an older field
//! layout.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use hdds_objcodec::{Record, RecordCodec, SchemaCatalog, TypeRegistry};
//!
//! let catalog = SchemaCatalog::from_toml_str(r#"
//!     [[record]]
//!     kind = "Person"
//!     fields = [
//!       { name = "age",  type = "Int32" },
//!       { name = "name", type = "String" },
//!     ]
//! "#)?;
//! let codec = RecordCodec::new(Arc::new(TypeRegistry::standard()), Arc::new(catalog));
//!
//! let person = Record::new("Person", "p-1")
//!     .with_field("age", 36i32)
//!     .with_field("name", "Ada");
//! let bytes = codec.serialize_record(&person)?;
//! assert_eq!(codec.decode_record(&bytes, "Person")?, person);
//! # Ok::<(), hdds_objcodec::CodecError>(())
//! ```
//!
//! # Building blocks
//!
//! | Module | Role |
//! |--------|------|
//! | [`primitives`] | Fixed and length-prefixed primitive encodings |
//! | [`presence`] | `'0'`/`'1'` flag making any codec nullable |
//! | [`registry`] | `TypeId` -> codec lookup, frozen after startup |
//! | [`collection`] | `List<T>` from the codec for `T` |
//! | [`layout`] | Field layouts and the layout hash check |
//! | [`opaque`] | Depth-bounded `OpaqueAny` payloads |
//! | [`custom`] | Named per-field codecs |
//! | [`schema`] | Record kind descriptions (TOML/JSON) |
//! | [`record`] | Record encoding and decoding |

pub mod collection;
pub mod custom;
pub mod error;
pub mod layout;
pub mod opaque;
pub mod presence;
pub mod primitives;
pub mod record;
pub mod registry;
pub mod schema;
pub mod types;

pub use custom::{CustomProperty, EmailProperty};
pub use error::{CodecError, CodecResult};
pub use layout::{compute_hash, LayoutHash, LookupStats, RecordLayout};
pub use opaque::MAX_OPAQUE_DEPTH;
pub use presence::Presence;
pub use record::{RecordCodec, MAX_NESTING_DEPTH};
pub use registry::{TypeRegistry, TypeRegistryBuilder, ValueCodec};
pub use schema::{FieldSchema, RecordSchema, SchemaCatalog, SchemaError};
pub use types::{FieldValue, OpaqueValue, Record, RecordKey, TypeId, Value};
