// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Canonical JSON Messages
//!
//! Free-form signing mode: every request field except the excluded ones
//! (`signature`, `publicAddress`) is serialized as compact JSON with object
//! keys sorted lexicographically (by UTF-8 bytes) at every nesting level,
//! then signed as an EIP-191 personal message.
//!
//! Any drift in field order or whitespace on the client breaks verification,
//! so the serializer below is the single definition of the canonical form.

use serde_json::{Map, Value};

use super::signature::keccak256;

/// Serialize `body` canonically, omitting top-level `excluded` keys
pub fn canonical_json(body: &Value, excluded: &[&str]) -> String {
    let mut out = String::new();
    match body {
        Value::Object(map) => write_object(map, excluded, &mut out),
        other => write_value(other, &mut out),
    }
    out
}

fn write_object(map: &Map<String, Value>, excluded: &[&str], out: &mut String) {
    let mut keys: Vec<&String> = map
        .keys()
        .filter(|k| !excluded.contains(&k.as_str()))
        .collect();
    keys.sort();

    out.push('{');
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&Value::String(key.clone()).to_string());
        out.push(':');
        write_value(&map[key.as_str()], out);
    }
    out.push('}');
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_object(map, &[], out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// EIP-191 personal message hash
///
/// `keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)`
pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", message.len());
    let mut data = Vec::with_capacity(prefix.len() + message.len());
    data.extend_from_slice(prefix.as_bytes());
    data.extend_from_slice(message);
    keccak256(&data)
}
