// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the object codec.
//!
//! Every failure is terminal for the value or record being processed. Nothing
//! in this crate retries: a failure is either a registry/schema programming
//! error or a versioning problem to be fixed upstream.

use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

use crate::layout::LayoutHash;
use crate::schema::SchemaError;
use crate::types::TypeId;

/// Result alias used throughout the codec.
pub type CodecResult<T> = Result<T, CodecError>;

/// Codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A codec is already registered for this type identifier.
    #[error("codec already registered for type {0}")]
    DuplicateType(TypeId),

    /// No codec is registered for this type identifier.
    #[error("no codec registered for type {0}")]
    UnknownType(TypeId),

    /// The stream ended before the expected bytes were read.
    #[error("stream truncated: {0}")]
    TruncatedStream(String),

    /// Text bytes are not valid UTF-8.
    #[error("invalid UTF-8 text: {0}")]
    Encoding(#[from] FromUtf8Error),

    /// The stored record layout no longer matches the current definition.
    #[error(
        "schema out of date for record kind '{kind}': stored layout hash {stored:#018x}, current {current:#018x}"
    )]
    SchemaOutOfDate {
        kind: String,
        stored: LayoutHash,
        current: LayoutHash,
    },

    /// The value handed to a codec does not have the codec's shape.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: TypeId,
        found: &'static str,
    },

    /// A value cannot be represented in the wire type.
    #[error("value out of range for {ty}: {detail}")]
    OutOfRange { ty: TypeId, detail: String },

    /// The stream holds bytes that no encoder writes.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The schema catalog has no definition for this record kind.
    #[error("unknown record kind: {0}")]
    UnknownRecordKind(String),

    /// A record carries a field its layout does not declare.
    #[error("record kind '{kind}' has no field '{field}'")]
    UnknownField { kind: String, field: String },

    /// Single value given for a repeated field, or the other way round.
    #[error("field '{kind}.{field}' expects a {expected} value")]
    FieldShape {
        kind: String,
        field: String,
        expected: &'static str,
    },

    /// A schema field names a custom property that was never registered.
    #[error("custom property '{name}' is not registered (field '{kind}.{field}')")]
    UnknownCustomProperty {
        name: String,
        kind: String,
        field: String,
    },

    /// Nested records or opaque graphs exceed the supported depth.
    #[error("nesting exceeds {max} levels")]
    NestingTooDeep { max: usize },

    /// JSON blob (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Opaque value (de)serialization failed.
    #[error("opaque value error: {0}")]
    Opaque(#[from] bincode::Error),

    /// Schema description could not be loaded or is invalid.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Underlying stream error other than end-of-stream.
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            CodecError::TruncatedStream(e.to_string())
        } else {
            CodecError::Io(e)
        }
    }
}

impl CodecError {
    /// Returns `true` for layout drift, the one failure expected in normal
    /// operation when application schemas evolve.
    pub fn is_schema_out_of_date(&self) -> bool {
        matches!(self, CodecError::SchemaOutOfDate { .. })
    }

    pub(crate) fn mismatch(expected: &TypeId, found: &crate::types::Value) -> Self {
        CodecError::TypeMismatch {
            expected: expected.clone(),
            found: found.type_name(),
        }
    }
}
