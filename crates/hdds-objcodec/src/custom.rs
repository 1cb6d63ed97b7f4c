// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Custom property extension point.
//!
//! A schema field may name a custom property (`custom = "email"`) instead of
//! relying on the codec registered for its declared type. The property is
//! looked up once when the record layout is built and is consulted before the
//! type registry.

use std::io::{Read, Write};

use crate::error::{CodecError, CodecResult};
use crate::primitives::{read_text, write_text};
use crate::registry::ValueCodec;
use crate::types::{TypeId, Value};

/// A named codec attached to individual record fields.
pub trait CustomProperty: ValueCodec {
    /// Name used by schema descriptions to select this property.
    fn name(&self) -> &str;
}

/// E-mail address stored as text, validated on both encode and decode.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmailProperty;

impl EmailProperty {
    pub const NAME: &'static str = "email";

    fn validate(address: &str) -> CodecResult<()> {
        let mut parts = address.split('@');
        let local = parts.next().unwrap_or_default();
        let domain = parts.next();
        match domain {
            Some(domain) if parts.next().is_none() && !local.is_empty() && !domain.is_empty() => {
                Ok(())
            }
            _ => Err(CodecError::InvalidData(format!(
                "'{}' is not an e-mail address",
                address
            ))),
        }
    }
}

impl ValueCodec for EmailProperty {
    fn encode(&self, value: &Value, out: &mut dyn Write) -> CodecResult<()> {
        let address = match value {
            Value::String(s) => s,
            other => return Err(CodecError::mismatch(&TypeId::String, other)),
        };
        Self::validate(address)?;
        write_text(out, address)
    }

    fn decode(&self, input: &mut dyn Read) -> CodecResult<Value> {
        let address = read_text(input)?;
        Self::validate(&address)?;
        Ok(Value::String(address))
    }
}

impl CustomProperty for EmailProperty {
    fn name(&self) -> &str {
        Self::NAME
    }
}
