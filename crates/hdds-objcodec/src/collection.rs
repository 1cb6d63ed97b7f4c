// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Collection codec: `List<T>` built from the codec for `T`.
//!
//! ```text
//! count: Int32 | element_0 | element_1 | ... | element_{count-1}
//! ```
//!
//! Elements are not presence-wrapped; a list holds concrete values only.

use std::io::{Read, Write};

use crate::error::{CodecError, CodecResult};
use crate::primitives::{prealloc_capacity, read_len, write_len};
use crate::registry::{SharedCodec, ValueCodec};
use crate::types::{TypeId, Value};

/// Codec for ordered sequences of one element type.
pub struct ListCodec {
    element_type: TypeId,
    element: SharedCodec,
}

impl ListCodec {
    pub fn new(element_type: TypeId, element: SharedCodec) -> Self {
        Self {
            element_type,
            element,
        }
    }

    pub fn element_type(&self) -> &TypeId {
        &self.element_type
    }
}

impl ValueCodec for ListCodec {
    fn encode(&self, value: &Value, out: &mut dyn Write) -> CodecResult<()> {
        let items = match value {
            Value::List(items) => items,
            other => {
                return Err(CodecError::mismatch(
                    &TypeId::list(self.element_type.clone()),
                    other,
                ))
            }
        };
        write_len(out, items.len(), &TypeId::list(self.element_type.clone()))?;
        for item in items {
            self.element.encode(item, out)?;
        }
        Ok(())
    }

    fn decode(&self, input: &mut dyn Read) -> CodecResult<Value> {
        let count = read_len(input)?;
        // Untrusted count: reserve a bounded number of bytes, grow as elements arrive.
        let mut items = Vec::with_capacity(prealloc_capacity::<Value>(count));
        for _ in 0..count {
            items.push(self.element.decode(input)?);
        }
        Ok(Value::List(items))
    }
}
