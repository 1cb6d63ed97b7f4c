// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Primitive encoders.
//!
//! # Wire format
//!
//! ```text
//! Bytes / String : i32 length (LE) | raw bytes (String = UTF-8)
//! Bool           : '1' | '0'
//! Int32          : 4 bytes LE
//! Int64          : 8 bytes LE
//! Float64        : 8 bytes IEEE-754 LE
//! DateTime       : Int64 seconds since the Unix epoch (UTC), sub-seconds dropped
//! JsonBlob       : String holding a JSON document
//! OpaqueAny      : Bytes holding a bincode-encoded OpaqueValue (depth-bounded)
//! KeyRef         : Bytes holding the record key
//! ```
//!
//! Every decoder consumes exactly the bytes its encoder wrote. The free
//! functions work on raw Rust values; the `encode_*`/`decode_*` pairs at the
//! bottom adapt them to [`Value`] and are what the registry installs.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};

use crate::error::{CodecError, CodecResult};
use crate::opaque;
use crate::registry::{DecodeFn, EncodeFn};
use crate::types::{OpaqueValue, RecordKey, TypeId, Value};

/// Byte written for `true` (and for a present value in the presence envelope).
pub const BYTE_TRUE: u8 = b'1';
/// Byte written for `false` (and for an absent value).
pub const BYTE_FALSE: u8 = b'0';

/// Upper bound, in bytes, on memory reserved ahead of reading a
/// length-prefixed item. Larger payloads grow as data actually arrives.
pub(crate) const PREALLOC_LIMIT: usize = 64 * 1024;

/// Capacity to reserve for `count` untrusted elements of `T`, at most
/// [`PREALLOC_LIMIT`] bytes worth.
pub(crate) fn prealloc_capacity<T>(count: usize) -> usize {
    count.min(PREALLOC_LIMIT / std::mem::size_of::<T>().max(1))
}

// ---------------------------------------------------------------------------
// Lengths
// ---------------------------------------------------------------------------

/// Write a length or element count as a signed 32-bit prefix.
pub fn write_len<W: Write + ?Sized>(out: &mut W, len: usize, ty: &TypeId) -> CodecResult<()> {
    let len = i32::try_from(len).map_err(|_| CodecError::OutOfRange {
        ty: ty.clone(),
        detail: format!("length {} exceeds i32::MAX", len),
    })?;
    write_i32(out, len)
}

/// Read a length or element count; negative values are rejected.
pub fn read_len<R: Read + ?Sized>(input: &mut R) -> CodecResult<usize> {
    let len = read_i32(input)?;
    usize::try_from(len).map_err(|_| CodecError::InvalidData(format!("negative length {}", len)))
}

// ---------------------------------------------------------------------------
// Fixed width
// ---------------------------------------------------------------------------

pub fn write_bool<W: Write + ?Sized>(out: &mut W, v: bool) -> CodecResult<()> {
    out.write_u8(if v { BYTE_TRUE } else { BYTE_FALSE })?;
    Ok(())
}

pub fn read_bool<R: Read + ?Sized>(input: &mut R) -> CodecResult<bool> {
    match input.read_u8()? {
        BYTE_TRUE => Ok(true),
        BYTE_FALSE => Ok(false),
        other => Err(CodecError::InvalidData(format!(
            "invalid bool byte 0x{:02x}",
            other
        ))),
    }
}

pub fn write_i32<W: Write + ?Sized>(out: &mut W, v: i32) -> CodecResult<()> {
    out.write_i32::<LittleEndian>(v)?;
    Ok(())
}

pub fn read_i32<R: Read + ?Sized>(input: &mut R) -> CodecResult<i32> {
    Ok(input.read_i32::<LittleEndian>()?)
}

pub fn write_i64<W: Write + ?Sized>(out: &mut W, v: i64) -> CodecResult<()> {
    out.write_i64::<LittleEndian>(v)?;
    Ok(())
}

pub fn read_i64<R: Read + ?Sized>(input: &mut R) -> CodecResult<i64> {
    Ok(input.read_i64::<LittleEndian>()?)
}

pub fn write_f64<W: Write + ?Sized>(out: &mut W, v: f64) -> CodecResult<()> {
    out.write_f64::<LittleEndian>(v)?;
    Ok(())
}

pub fn read_f64<R: Read + ?Sized>(input: &mut R) -> CodecResult<f64> {
    Ok(input.read_f64::<LittleEndian>()?)
}

// ---------------------------------------------------------------------------
// Variable length
// ---------------------------------------------------------------------------

pub fn write_bytes<W: Write + ?Sized>(out: &mut W, bytes: &[u8]) -> CodecResult<()> {
    write_len(out, bytes.len(), &TypeId::Bytes)?;
    out.write_all(bytes)?;
    Ok(())
}

pub fn read_bytes<R: Read + ?Sized>(input: &mut R) -> CodecResult<Vec<u8>> {
    let len = read_len(input)?;
    let mut buf = Vec::with_capacity(prealloc_capacity::<u8>(len));
    let got = (&mut *input).take(len as u64).read_to_end(&mut buf)?;
    if got != len {
        return Err(CodecError::TruncatedStream(format!(
            "expected {} bytes, got {}",
            len, got
        )));
    }
    Ok(buf)
}

pub fn write_text<W: Write + ?Sized>(out: &mut W, text: &str) -> CodecResult<()> {
    write_bytes(out, text.as_bytes())
}

pub fn read_text<R: Read + ?Sized>(input: &mut R) -> CodecResult<String> {
    Ok(String::from_utf8(read_bytes(input)?)?)
}

/// Write a timestamp as whole seconds since the epoch.
///
/// Sub-second precision is dropped (chrono's `timestamp()` floors toward
/// negative infinity, so pre-epoch instants stay on the second they fall in).
pub fn write_datetime<W: Write + ?Sized>(out: &mut W, v: &DateTime<Utc>) -> CodecResult<()> {
    write_i64(out, v.timestamp())
}

pub fn read_datetime<R: Read + ?Sized>(input: &mut R) -> CodecResult<DateTime<Utc>> {
    let secs = read_i64(input)?;
    DateTime::from_timestamp(secs, 0).ok_or_else(|| CodecError::OutOfRange {
        ty: TypeId::DateTime,
        detail: format!("{} seconds is not a representable timestamp", secs),
    })
}

pub fn write_json<W: Write + ?Sized>(out: &mut W, v: &serde_json::Value) -> CodecResult<()> {
    write_text(out, &serde_json::to_string(v)?)
}

pub fn read_json<R: Read + ?Sized>(input: &mut R) -> CodecResult<serde_json::Value> {
    Ok(serde_json::from_str(&read_text(input)?)?)
}

pub fn write_opaque<W: Write + ?Sized>(out: &mut W, v: &OpaqueValue) -> CodecResult<()> {
    write_bytes(out, &opaque::to_bytes(v)?)
}

pub fn read_opaque<R: Read + ?Sized>(input: &mut R) -> CodecResult<OpaqueValue> {
    opaque::from_bytes(&read_bytes(input)?)
}

pub fn write_key<W: Write + ?Sized>(out: &mut W, key: &RecordKey) -> CodecResult<()> {
    write_bytes(out, key.as_bytes())
}

pub fn read_key<R: Read + ?Sized>(input: &mut R) -> CodecResult<RecordKey> {
    Ok(RecordKey::new(read_bytes(input)?))
}

// ---------------------------------------------------------------------------
// Value adapters
// ---------------------------------------------------------------------------

fn encode_string(value: &Value, out: &mut dyn Write) -> CodecResult<()> {
    match value {
        Value::String(s) => write_text(out, s),
        other => Err(CodecError::mismatch(&TypeId::String, other)),
    }
}

fn decode_string(input: &mut dyn Read) -> CodecResult<Value> {
    read_text(input).map(Value::String)
}

fn encode_bytes(value: &Value, out: &mut dyn Write) -> CodecResult<()> {
    match value {
        Value::Bytes(b) => write_bytes(out, b),
        other => Err(CodecError::mismatch(&TypeId::Bytes, other)),
    }
}

fn decode_bytes(input: &mut dyn Read) -> CodecResult<Value> {
    read_bytes(input).map(Value::Bytes)
}

fn encode_bool(value: &Value, out: &mut dyn Write) -> CodecResult<()> {
    match value {
        Value::Bool(b) => write_bool(out, *b),
        other => Err(CodecError::mismatch(&TypeId::Bool, other)),
    }
}

fn decode_bool(input: &mut dyn Read) -> CodecResult<Value> {
    read_bool(input).map(Value::Bool)
}

fn encode_int32(value: &Value, out: &mut dyn Write) -> CodecResult<()> {
    match value {
        Value::Int32(v) => write_i32(out, *v),
        Value::Int64(v) => {
            let narrowed = i32::try_from(*v).map_err(|_| CodecError::OutOfRange {
                ty: TypeId::Int32,
                detail: format!("{} does not fit in 32 bits", v),
            })?;
            write_i32(out, narrowed)
        }
        other => Err(CodecError::mismatch(&TypeId::Int32, other)),
    }
}

fn decode_int32(input: &mut dyn Read) -> CodecResult<Value> {
    read_i32(input).map(Value::Int32)
}

fn encode_int64(value: &Value, out: &mut dyn Write) -> CodecResult<()> {
    match value {
        Value::Int64(v) => write_i64(out, *v),
        Value::Int32(v) => write_i64(out, i64::from(*v)),
        other => Err(CodecError::mismatch(&TypeId::Int64, other)),
    }
}

fn decode_int64(input: &mut dyn Read) -> CodecResult<Value> {
    read_i64(input).map(Value::Int64)
}

fn encode_float64(value: &Value, out: &mut dyn Write) -> CodecResult<()> {
    match value {
        Value::Float64(v) => write_f64(out, *v),
        other => Err(CodecError::mismatch(&TypeId::Float64, other)),
    }
}

fn decode_float64(input: &mut dyn Read) -> CodecResult<Value> {
    read_f64(input).map(Value::Float64)
}

fn encode_datetime(value: &Value, out: &mut dyn Write) -> CodecResult<()> {
    match value {
        Value::DateTime(dt) => write_datetime(out, dt),
        other => Err(CodecError::mismatch(&TypeId::DateTime, other)),
    }
}

fn decode_datetime(input: &mut dyn Read) -> CodecResult<Value> {
    read_datetime(input).map(Value::DateTime)
}

fn encode_json(value: &Value, out: &mut dyn Write) -> CodecResult<()> {
    match value {
        Value::Json(v) => write_json(out, v),
        other => Err(CodecError::mismatch(&TypeId::JsonBlob, other)),
    }
}

fn decode_json(input: &mut dyn Read) -> CodecResult<Value> {
    read_json(input).map(Value::Json)
}

fn encode_opaque(value: &Value, out: &mut dyn Write) -> CodecResult<()> {
    match value {
        Value::Opaque(v) => write_opaque(out, v),
        other => Err(CodecError::mismatch(&TypeId::OpaqueAny, other)),
    }
}

fn decode_opaque(input: &mut dyn Read) -> CodecResult<Value> {
    read_opaque(input).map(Value::Opaque)
}

fn encode_key(value: &Value, out: &mut dyn Write) -> CodecResult<()> {
    match value {
        Value::Key(k) => write_key(out, k),
        other => Err(CodecError::mismatch(&TypeId::KeyRef, other)),
    }
}

fn decode_key(input: &mut dyn Read) -> CodecResult<Value> {
    read_key(input).map(Value::Key)
}

/// Encoder/decoder pair for every primitive type identifier.
pub(crate) fn primitive_codecs() -> [(TypeId, EncodeFn, DecodeFn); 10] {
    [
        (TypeId::String, encode_string, decode_string),
        (TypeId::Bytes, encode_bytes, decode_bytes),
        (TypeId::Bool, encode_bool, decode_bool),
        (TypeId::Int32, encode_int32, decode_int32),
        (TypeId::Int64, encode_int64, decode_int64),
        (TypeId::Float64, encode_float64, decode_float64),
        (TypeId::DateTime, encode_datetime, decode_datetime),
        (TypeId::JsonBlob, encode_json, decode_json),
        (TypeId::OpaqueAny, encode_opaque, decode_opaque),
        (TypeId::KeyRef, encode_key, decode_key),
    ]
}
