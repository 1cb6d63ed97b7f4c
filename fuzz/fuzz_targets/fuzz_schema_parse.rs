// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use hdds_objcodec::SchemaCatalog;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        // Fuzz TOML schema loading
        let _ = SchemaCatalog::from_toml_str(text);

        // Fuzz JSON schema loading
        let _ = SchemaCatalog::from_json_str(text);
    }
});
