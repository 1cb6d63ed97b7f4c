// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type registry: semantic type identifier -> codec.
//!
//! Registration happens on a [`TypeRegistryBuilder`] during startup. `build()`
//! freezes it into a [`TypeRegistry`] that is read-only for the rest of the
//! process, so it is shared as `Arc<TypeRegistry>` without any locking.
//!
//! ```text
//! TypeRegistryBuilder::new()
//!     .register_primitives()      String, Bytes, Bool, Int32, ...
//!     .register_list(Int32)?      List<Int32> from the Int32 codec
//!     .build()                    -> TypeRegistry (immutable)
//! ```

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::collection::ListCodec;
use crate::error::{CodecError, CodecResult};
use crate::presence::Presence;
use crate::primitives::primitive_codecs;
use crate::types::{TypeId, Value};

/// Encoder half of a codec entry.
pub type EncodeFn = fn(&Value, &mut dyn Write) -> CodecResult<()>;
/// Decoder half of a codec entry.
pub type DecodeFn = fn(&mut dyn Read) -> CodecResult<Value>;

/// An encode/decode pair for one kind of value.
///
/// `decode` must consume exactly the bytes `encode` wrote.
pub trait ValueCodec: Send + Sync {
    fn encode(&self, value: &Value, out: &mut dyn Write) -> CodecResult<()>;

    fn decode(&self, input: &mut dyn Read) -> CodecResult<Value>;
}

/// Shared handle to a registered codec.
pub type SharedCodec = Arc<dyn ValueCodec>;

/// Codec built from a pair of plain functions.
#[derive(Clone, Copy)]
pub struct FnCodec {
    encode: EncodeFn,
    decode: DecodeFn,
}

impl FnCodec {
    pub const fn new(encode: EncodeFn, decode: DecodeFn) -> Self {
        Self { encode, decode }
    }
}

impl ValueCodec for FnCodec {
    fn encode(&self, value: &Value, out: &mut dyn Write) -> CodecResult<()> {
        (self.encode)(value, out)
    }

    fn decode(&self, input: &mut dyn Read) -> CodecResult<Value> {
        (self.decode)(input)
    }
}

impl fmt::Debug for FnCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnCodec")
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Mutable registration phase of the type registry.
#[derive(Default)]
pub struct TypeRegistryBuilder {
    codecs: HashMap<TypeId, SharedCodec>,
}

impl TypeRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codec for `type_id`.
    ///
    /// Fails with [`CodecError::DuplicateType`] if the identifier is taken.
    pub fn register(
        &mut self,
        type_id: TypeId,
        codec: impl ValueCodec + 'static,
    ) -> CodecResult<&mut Self> {
        self.insert(type_id, Arc::new(codec))
    }

    /// Register a codec given as an encode/decode function pair.
    pub fn register_fn(
        &mut self,
        type_id: TypeId,
        encode: EncodeFn,
        decode: DecodeFn,
    ) -> CodecResult<&mut Self> {
        self.register(type_id, FnCodec::new(encode, decode))
    }

    /// Register every primitive encoder.
    pub fn register_primitives(&mut self) -> CodecResult<&mut Self> {
        for (type_id, encode, decode) in primitive_codecs() {
            self.register_fn(type_id, encode, decode)?;
        }
        Ok(self)
    }

    /// Register every primitive plus `List<T>` for each primitive `T`.
    pub fn register_standard(&mut self) -> CodecResult<&mut Self> {
        self.register_primitives()?;
        for primitive in TypeId::PRIMITIVES {
            self.register_list(primitive)?;
        }
        Ok(self)
    }

    /// Instantiate the collection codec `List<element>` from the codec
    /// already registered for `element`.
    pub fn register_list(&mut self, element: TypeId) -> CodecResult<&mut Self> {
        let element_codec = self
            .codecs
            .get(&element)
            .cloned()
            .ok_or_else(|| CodecError::UnknownType(element.clone()))?;
        let list = ListCodec::new(element.clone(), element_codec);
        self.insert(TypeId::list(element), Arc::new(list))
    }

    pub fn contains(&self, type_id: &TypeId) -> bool {
        self.codecs.contains_key(type_id)
    }

    /// Freeze the registry.
    pub fn build(self) -> TypeRegistry {
        tracing::debug!("type registry frozen with {} codecs", self.codecs.len());
        TypeRegistry {
            codecs: self.codecs,
        }
    }

    fn insert(&mut self, type_id: TypeId, codec: SharedCodec) -> CodecResult<&mut Self> {
        if self.codecs.contains_key(&type_id) {
            return Err(CodecError::DuplicateType(type_id));
        }
        tracing::trace!("registered codec for {}", type_id);
        self.codecs.insert(type_id, codec);
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable mapping from type identifier to codec.
pub struct TypeRegistry {
    codecs: HashMap<TypeId, SharedCodec>,
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::new()
    }

    /// Registry holding every primitive plus `List<T>` for each primitive `T`.
    pub fn standard() -> Self {
        let mut builder = TypeRegistryBuilder::new();
        #[allow(clippy::expect_used)] // empty builder, primitive identifiers are distinct
        builder
            .register_standard()
            .expect("standard codecs register on an empty builder");
        builder.build()
    }

    /// Look up the codec registered for `type_id`.
    pub fn get_codec(&self, type_id: &TypeId) -> CodecResult<&SharedCodec> {
        self.codecs
            .get(type_id)
            .ok_or_else(|| CodecError::UnknownType(type_id.clone()))
    }

    pub fn contains(&self, type_id: &TypeId) -> bool {
        self.codecs.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Registered identifiers, sorted for determinism.
    pub fn type_ids(&self) -> Vec<TypeId> {
        let mut ids: Vec<TypeId> = self.codecs.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Presence-wrapped encoding of an optional value.
    pub fn serialize(&self, type_id: &TypeId, value: Option<&Value>) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.serialize_into(type_id, value, &mut buf)?;
        Ok(buf)
    }

    /// Append the presence-wrapped encoding of `value` to `out`.
    pub fn serialize_into(
        &self,
        type_id: &TypeId,
        value: Option<&Value>,
        out: &mut dyn Write,
    ) -> CodecResult<()> {
        let codec = self.get_codec(type_id)?;
        Presence::new(&**codec).encode(value, out)
    }

    /// Read one presence-wrapped value written by [`Self::serialize`].
    pub fn deserialize(&self, type_id: &TypeId, input: &mut dyn Read) -> CodecResult<Option<Value>> {
        let codec = self.get_codec(type_id)?;
        Presence::new(&**codec).decode(input)
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.type_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_upper(value: &Value, out: &mut dyn Write) -> CodecResult<()> {
        match value {
            Value::String(s) => crate::primitives::write_text(out, &s.to_uppercase()),
            other => Err(CodecError::mismatch(&TypeId::String, other)),
        }
    }

    fn decode_upper(input: &mut dyn Read) -> CodecResult<Value> {
        crate::primitives::read_text(input).map(Value::String)
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut builder = TypeRegistry::builder();
        builder.register_primitives().expect("primitives");
        let err = builder
            .register_fn(TypeId::String, encode_upper, decode_upper)
            .err()
            .expect("duplicate must fail");
        assert!(matches!(err, CodecError::DuplicateType(TypeId::String)));
    }

    #[test]
    fn unknown_type_rejected() {
        let registry = TypeRegistry::builder().build();
        assert!(registry.is_empty());
        let err = registry.get_codec(&TypeId::Int32).err().expect("unknown");
        assert!(matches!(err, CodecError::UnknownType(TypeId::Int32)));

        let err = registry
            .serialize(&TypeId::Int32, Some(&Value::Int32(1)))
            .unwrap_err();
        assert!(matches!(err, CodecError::UnknownType(_)));
    }

    #[test]
    fn list_requires_registered_element() {
        let mut builder = TypeRegistry::builder();
        let err = builder.register_list(TypeId::Bool).err().expect("no element");
        assert!(matches!(err, CodecError::UnknownType(TypeId::Bool)));

        builder.register_primitives().expect("primitives");
        builder.register_list(TypeId::Bool).expect("list");
        let err = builder.register_list(TypeId::Bool).err().expect("duplicate");
        assert!(matches!(err, CodecError::DuplicateType(_)));

        let registry = builder.build();
        assert!(registry.contains(&TypeId::list(TypeId::Bool)));
        assert!(!registry.contains(&TypeId::list(TypeId::Int32)));
    }

    #[test]
    fn custom_fn_codec_is_used() {
        let mut builder = TypeRegistry::builder();
        builder
            .register_fn(TypeId::String, encode_upper, decode_upper)
            .expect("register");
        let registry = builder.build();

        let bytes = registry
            .serialize(&TypeId::String, Some(&Value::from("shout")))
            .expect("serialize");
        let decoded = registry
            .deserialize(&TypeId::String, &mut Cursor::new(bytes))
            .expect("deserialize");
        assert_eq!(decoded, Some(Value::from("SHOUT")));
    }

    #[test]
    fn standard_registry_contents() {
        let registry = TypeRegistry::standard();
        assert_eq!(registry.len(), 20);
        for primitive in TypeId::PRIMITIVES {
            assert!(registry.contains(&primitive), "{}", primitive);
            assert!(registry.contains(&TypeId::list(primitive.clone())));
        }
        let ids = registry.type_ids();
        assert_eq!(ids, {
            let mut builder = TypeRegistry::builder();
            builder.register_standard().expect("standard");
            builder.build().type_ids()
        });
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn standard_set_goes_through_duplicate_check() {
        let mut builder = TypeRegistry::builder();
        builder.register_standard().expect("standard");
        let err = builder.register_standard().err().expect("second pass");
        assert!(matches!(err, CodecError::DuplicateType(TypeId::String)));

        let mut builder = TypeRegistry::builder();
        builder.register_list(TypeId::Int32).err().expect("element missing");
        builder.register_primitives().expect("primitives");
        let err = builder.register_standard().err().expect("primitives taken");
        assert!(matches!(err, CodecError::DuplicateType(_)));
    }

    #[test]
    fn deeply_nested_opaque_payload_is_refused() {
        // '1' | i32 len | bincode Seq(Seq(...Unit)) nested 100 000 times
        let levels = 100_000usize;
        let mut payload = Vec::with_capacity(levels * 12 + 4);
        for _ in 0..levels {
            payload.extend_from_slice(&7u32.to_le_bytes());
            payload.extend_from_slice(&1u64.to_le_bytes());
        }
        payload.extend_from_slice(&0u32.to_le_bytes());

        let mut input = vec![b'1'];
        input.extend_from_slice(&(payload.len() as i32).to_le_bytes());
        input.extend_from_slice(&payload);

        let registry = TypeRegistry::standard();
        let err = registry
            .deserialize(&TypeId::OpaqueAny, &mut Cursor::new(input))
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::NestingTooDeep { max: crate::opaque::MAX_OPAQUE_DEPTH }
        ));
    }

    #[test]
    fn serialize_applies_presence_envelope() {
        let registry = TypeRegistry::standard();
        let absent = registry.serialize(&TypeId::String, None).expect("absent");
        assert_eq!(absent, b"0");

        let present = registry
            .serialize(&TypeId::Int32, Some(&Value::Int32(1)))
            .expect("present");
        assert_eq!(present, [b'1', 1, 0, 0, 0]);

        let mut stream = Cursor::new([absent, present].concat());
        assert_eq!(registry.deserialize(&TypeId::String, &mut stream).expect("first"), None);
        assert_eq!(
            registry.deserialize(&TypeId::Int32, &mut stream).expect("second"),
            Some(Value::Int32(1))
        );
    }
}
