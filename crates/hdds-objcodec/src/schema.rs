// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema descriptions for structured records.
//!
//! Record kinds are normally described in a TOML (or JSON) file:
//!
//! ```toml
//! [[record]]
//! kind = "Person"
//! fields = [
//!   { name = "age",    type = "Int32" },
//!   { name = "name",   type = "String" },
//!   { name = "emails", type = "String", repeated = true, custom = "email" },
//! ]
//! ```
//!
//! Custom properties are code, so they are registered programmatically with
//! [`SchemaCatalog::register_custom`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::custom::CustomProperty;
use crate::types::TypeId;

/// Schema loading/validation errors.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record kind must not be empty")]
    EmptyKind,

    #[error("record kind '{0}' defined twice")]
    DuplicateKind(String),

    #[error("record kind '{kind}' has an unnamed field")]
    EmptyFieldName { kind: String },

    /// ',' separates names in the layout hash input.
    #[error("field name '{field}' in record kind '{kind}' contains ','")]
    InvalidFieldName { kind: String, field: String },

    #[error("field '{field}' defined twice in record kind '{kind}'")]
    DuplicateField { kind: String, field: String },

    #[error("custom property '{0}' registered twice")]
    DuplicateCustom(String),

    #[error("unsupported schema file format: {0}")]
    UnsupportedFormat(String),
}

/// One declared field of a record kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,

    #[serde(rename = "type")]
    pub type_id: TypeId,

    /// Field holds a sequence of optional values.
    #[serde(default)]
    pub repeated: bool,

    /// Name of a custom property overriding the registry codec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, type_id: TypeId) -> Self {
        Self {
            name: name.into(),
            type_id,
            repeated: false,
            custom: None,
        }
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    pub fn with_custom(mut self, property: impl Into<String>) -> Self {
        self.custom = Some(property.into());
        self
    }
}

/// Declared fields of one record kind. Field order is irrelevant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    pub kind: String,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

impl RecordSchema {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.kind.trim().is_empty() {
            return Err(SchemaError::EmptyKind);
        }
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyFieldName {
                    kind: self.kind.clone(),
                });
            }
            if field.name.contains(',') {
                return Err(SchemaError::InvalidFieldName {
                    kind: self.kind.clone(),
                    field: field.name.clone(),
                });
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    kind: self.kind.clone(),
                    field: field.name.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SchemaFile {
    #[serde(default, rename = "record")]
    records: Vec<RecordSchema>,
}

/// All record kinds known to a codec, plus the custom properties fields may
/// refer to.
#[derive(Default)]
pub struct SchemaCatalog {
    records: HashMap<String, RecordSchema>,
    custom: HashMap<String, Arc<dyn CustomProperty>>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a `.toml` or `.json` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(SchemaError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile = toml::from_str(content)?;
        Self::from_schemas(file.records)
    }

    pub fn from_json_str(content: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile = serde_json::from_str(content)?;
        Self::from_schemas(file.records)
    }

    fn from_schemas(records: Vec<RecordSchema>) -> Result<Self, SchemaError> {
        let mut catalog = Self::new();
        for record in records {
            catalog.add(record)?;
        }
        Ok(catalog)
    }

    /// Add one record kind.
    pub fn add(&mut self, schema: RecordSchema) -> Result<&mut Self, SchemaError> {
        schema.validate()?;
        if self.records.contains_key(&schema.kind) {
            return Err(SchemaError::DuplicateKind(schema.kind));
        }
        self.records.insert(schema.kind.clone(), schema);
        Ok(self)
    }

    /// Register a custom property under its own name.
    pub fn register_custom(
        &mut self,
        property: Arc<dyn CustomProperty>,
    ) -> Result<&mut Self, SchemaError> {
        let name = property.name().to_string();
        if self.custom.contains_key(&name) {
            return Err(SchemaError::DuplicateCustom(name));
        }
        self.custom.insert(name, property);
        Ok(self)
    }

    pub fn get(&self, kind: &str) -> Option<&RecordSchema> {
        self.records.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.records.contains_key(kind)
    }

    pub fn custom_property(&self, name: &str) -> Option<&Arc<dyn CustomProperty>> {
        self.custom.get(name)
    }

    /// Known record kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.records.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Render the record kinds back to TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        let mut records: Vec<RecordSchema> = self.records.values().cloned().collect();
        records.sort_by(|a, b| a.kind.cmp(&b.kind));
        toml::to_string_pretty(&SchemaFile { records })
    }
}

impl fmt::Debug for SchemaCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut custom: Vec<&str> = self.custom.keys().map(String::as_str).collect();
        custom.sort_unstable();
        f.debug_struct("SchemaCatalog")
            .field("kinds", &self.kinds())
            .field("custom", &custom)
            .finish()
    }
}
