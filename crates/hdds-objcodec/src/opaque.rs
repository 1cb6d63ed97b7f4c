// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `OpaqueAny` payloads.
//!
//! The payload is the bincode (1.x legacy layout: fixed-width integers, little
//! endian) encoding of an [`OpaqueValue`]. `Seq` and `Map` nest arbitrarily, so
//! both directions bound the depth at [`MAX_OPAQUE_DEPTH`]: encoding walks the
//! graph with an explicit stack, decoding goes through a depth-counting
//! `DeserializeSeed` instead of the derived `Deserialize`.

use std::cell::Cell;
use std::fmt;

use bincode::Options;
use serde::de::{self, DeserializeSeed, EnumAccess, SeqAccess, VariantAccess, Visitor};
use serde::Deserializer;

use crate::error::{CodecError, CodecResult};
use crate::types::OpaqueValue;

/// Deepest accepted opaque graph; a scalar or an empty `Seq` is one level.
pub const MAX_OPAQUE_DEPTH: usize = 128;

const VARIANTS: &[&str] = &[
    "Unit", "Bool", "Int", "UInt", "Float", "Text", "Bytes", "Seq", "Map",
];

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

/// Encode `value`, refusing graphs deeper than [`MAX_OPAQUE_DEPTH`].
pub fn to_bytes(value: &OpaqueValue) -> CodecResult<Vec<u8>> {
    if depth_exceeds(value, MAX_OPAQUE_DEPTH) {
        return Err(CodecError::NestingTooDeep {
            max: MAX_OPAQUE_DEPTH,
        });
    }
    Ok(options().serialize(value)?)
}

/// Decode a payload written by [`to_bytes`].
pub fn from_bytes(bytes: &[u8]) -> CodecResult<OpaqueValue> {
    let too_deep = Cell::new(false);
    let seed = OpaqueSeed {
        depth: 1,
        too_deep: &too_deep,
    };
    options().deserialize_seed(seed, bytes).map_err(|e| {
        if too_deep.get() {
            CodecError::NestingTooDeep {
                max: MAX_OPAQUE_DEPTH,
            }
        } else {
            CodecError::Opaque(e)
        }
    })
}

fn depth_exceeds(value: &OpaqueValue, max: usize) -> bool {
    let mut stack = vec![(value, 1usize)];
    while let Some((value, depth)) = stack.pop() {
        if depth > max {
            return true;
        }
        match value {
            OpaqueValue::Seq(items) => stack.extend(items.iter().map(|v| (v, depth + 1))),
            OpaqueValue::Map(entries) => {
                for (k, v) in entries {
                    stack.push((k, depth + 1));
                    stack.push((v, depth + 1));
                }
            }
            _ => {}
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Seeds
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct OpaqueSeed<'a> {
    depth: usize,
    too_deep: &'a Cell<bool>,
}

impl<'a> OpaqueSeed<'a> {
    fn child(self) -> Self {
        OpaqueSeed {
            depth: self.depth + 1,
            too_deep: self.too_deep,
        }
    }
}

impl<'de, 'a> DeserializeSeed<'de> for OpaqueSeed<'a> {
    type Value = OpaqueValue;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<OpaqueValue, D::Error> {
        if self.depth > MAX_OPAQUE_DEPTH {
            self.too_deep.set(true);
            return Err(de::Error::custom(format_args!(
                "opaque value nests deeper than {} levels",
                MAX_OPAQUE_DEPTH
            )));
        }
        deserializer.deserialize_enum("OpaqueValue", VARIANTS, self)
    }
}

impl<'de, 'a> Visitor<'de> for OpaqueSeed<'a> {
    type Value = OpaqueValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an opaque value")
    }

    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<OpaqueValue, A::Error> {
        // Variant indices follow the declaration order of `OpaqueValue`.
        let (index, variant) = data.variant::<u32>()?;
        match index {
            0 => variant.unit_variant().map(|()| OpaqueValue::Unit),
            1 => variant.newtype_variant().map(OpaqueValue::Bool),
            2 => variant.newtype_variant().map(OpaqueValue::Int),
            3 => variant.newtype_variant().map(OpaqueValue::UInt),
            4 => variant.newtype_variant().map(OpaqueValue::Float),
            5 => variant.newtype_variant().map(OpaqueValue::Text),
            6 => variant.newtype_variant().map(OpaqueValue::Bytes),
            7 => variant
                .newtype_variant_seed(SeqSeed(self.child()))
                .map(OpaqueValue::Seq),
            8 => variant
                .newtype_variant_seed(MapSeed(self.child()))
                .map(OpaqueValue::Map),
            other => Err(de::Error::invalid_value(
                de::Unexpected::Unsigned(u64::from(other)),
                &"a variant index in 0..=8",
            )),
        }
    }
}

/// Elements of a `Seq`. The encoded length is untrusted, so the vector grows
/// only as elements decode.
#[derive(Clone, Copy)]
struct SeqSeed<'a>(OpaqueSeed<'a>);

impl<'de, 'a> DeserializeSeed<'de> for SeqSeed<'a> {
    type Value = Vec<OpaqueValue>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, 'a> Visitor<'de> for SeqSeed<'a> {
    type Value = Vec<OpaqueValue>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a sequence of opaque values")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element_seed(self.0)? {
            items.push(item);
        }
        Ok(items)
    }
}

#[derive(Clone, Copy)]
struct MapSeed<'a>(OpaqueSeed<'a>);

impl<'de, 'a> DeserializeSeed<'de> for MapSeed<'a> {
    type Value = Vec<(OpaqueValue, OpaqueValue)>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, 'a> Visitor<'de> for MapSeed<'a> {
    type Value = Vec<(OpaqueValue, OpaqueValue)>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a sequence of opaque key/value pairs")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::new();
        while let Some(entry) = seq.next_element_seed(EntrySeed(self.0))? {
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// One `(key, value)` tuple of a `Map`; both sides sit at the map's depth.
#[derive(Clone, Copy)]
struct EntrySeed<'a>(OpaqueSeed<'a>);

impl<'de, 'a> DeserializeSeed<'de> for EntrySeed<'a> {
    type Value = (OpaqueValue, OpaqueValue);

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_tuple(2, self)
    }
}

impl<'de, 'a> Visitor<'de> for EntrySeed<'a> {
    type Value = (OpaqueValue, OpaqueValue);

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an opaque key/value pair")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let key = seq
            .next_element_seed(self.0)?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let value = seq
            .next_element_seed(self.0)?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        Ok((key, value))
    }
}
