// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Presence envelope: makes any codec nullable.
//!
//! ```text
//! absent  : '0'
//! present : '1' | inner encoding
//! ```

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::error::{CodecError, CodecResult};
use crate::primitives::{BYTE_FALSE, BYTE_TRUE};
use crate::registry::ValueCodec;
use crate::types::Value;

/// Flag byte for an absent value.
pub const ABSENT: u8 = BYTE_FALSE;
/// Flag byte for a present value.
pub const PRESENT: u8 = BYTE_TRUE;

pub fn write_flag<W: Write + ?Sized>(out: &mut W, present: bool) -> CodecResult<()> {
    out.write_u8(if present { PRESENT } else { ABSENT })?;
    Ok(())
}

pub fn read_flag<R: Read + ?Sized>(input: &mut R) -> CodecResult<bool> {
    match input.read_u8()? {
        PRESENT => Ok(true),
        ABSENT => Ok(false),
        other => Err(CodecError::InvalidData(format!(
            "invalid presence flag 0x{:02x}",
            other
        ))),
    }
}

/// Borrowing wrapper adding the presence flag around an inner codec.
pub struct Presence<'a, C: ValueCodec + ?Sized> {
    inner: &'a C,
}

impl<'a, C: ValueCodec + ?Sized> Presence<'a, C> {
    pub fn new(inner: &'a C) -> Self {
        Self { inner }
    }

    pub fn encode(&self, value: Option<&Value>, out: &mut dyn Write) -> CodecResult<()> {
        match value {
            Some(v) => {
                write_flag(out, true)?;
                self.inner.encode(v, out)
            }
            None => write_flag(out, false),
        }
    }

    pub fn decode(&self, input: &mut dyn Read) -> CodecResult<Option<Value>> {
        if read_flag(input)? {
            self.inner.decode(input).map(Some)
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use crate::types::TypeId;
    use std::io::Cursor;

    #[test]
    fn absent_is_a_single_zero_byte() {
        let registry = TypeRegistry::standard();
        let codec = registry.get_codec(&TypeId::Int64).expect("codec");
        let mut buf = Vec::new();
        Presence::new(&**codec)
            .encode(None, &mut buf)
            .expect("encode");
        assert_eq!(buf, b"0");

        let decoded = Presence::new(&**codec)
            .decode(&mut Cursor::new(buf))
            .expect("decode");
        assert!(decoded.is_none());
    }

    #[test]
    fn present_prefixes_inner_encoding() {
        let registry = TypeRegistry::standard();
        let codec = registry.get_codec(&TypeId::Bool).expect("codec");
        let envelope = Presence::new(&**codec);

        let mut buf = Vec::new();
        envelope.encode(Some(&Value::Bool(false)), &mut buf).expect("encode");
        assert_eq!(buf, b"10");

        let decoded = envelope.decode(&mut Cursor::new(buf)).expect("decode");
        assert_eq!(decoded, Some(Value::Bool(false)));
    }

    #[test]
    fn bad_flag_rejected() {
        let err = read_flag(&mut Cursor::new([2u8])).unwrap_err();
        assert!(matches!(err, CodecError::InvalidData(_)));

        let err = read_flag(&mut Cursor::new([0u8; 0])).unwrap_err();
        assert!(matches!(err, CodecError::TruncatedStream(_)));
    }
}
