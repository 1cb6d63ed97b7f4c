// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use std::io::Cursor;
use std::sync::{Arc, OnceLock};

use hdds_objcodec::{EmailProperty, RecordCodec, SchemaCatalog, TypeRegistry};
use libfuzzer_sys::fuzz_target;

const SCHEMA: &str = r#"
[[record]]
kind = "Node"
fields = [
  { name = "label",  type = "String" },
  { name = "weight", type = "Float64" },
  { name = "tags",   type = "List<String>" },
  { name = "meta",   type = "JsonBlob" },
  { name = "blob",   type = "OpaqueAny" },
  { name = "emails", type = "String", repeated = true, custom = "email" },
  { name = "next",   type = "Record<Node>" },
]
"#;

fn codec() -> &'static RecordCodec {
    static CODEC: OnceLock<RecordCodec> = OnceLock::new();
    CODEC.get_or_init(|| {
        let mut catalog = SchemaCatalog::from_toml_str(SCHEMA).expect("fuzz schema");
        catalog
            .register_custom(Arc::new(EmailProperty))
            .expect("email property");
        RecordCodec::new(Arc::new(TypeRegistry::standard()), Arc::new(catalog))
    })
}

fuzz_target!(|data: &[u8]| {
    let codec = codec();

    // Fuzz the record decoder, then re-encode whatever it accepted
    if let Ok(record) = codec.decode_record(data, "Node") {
        let bytes = codec.serialize_record(&record).expect("re-encode decoded record");
        codec
            .decode_record(&bytes, "Node")
            .expect("decode re-encoded record");
    }

    // Fuzz every registered value decoder
    for ty in codec.registry().type_ids() {
        let _ = codec.registry().deserialize(&ty, &mut Cursor::new(data));
    }
});
