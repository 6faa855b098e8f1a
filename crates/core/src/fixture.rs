// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic fixtures: request/response pairs captured during a normal
//! run and replayed by fingerprint on a deterministic re-run.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A captured request/response pair, keyed by the canonical fingerprint of
/// the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub request_fingerprint: String,
    pub node_id: String,
    pub request: serde_json::Value,
    pub response: serde_json::Value,
}

impl Fixture {
    pub fn capture(
        node_id: impl Into<String>,
        request: serde_json::Value,
        response: serde_json::Value,
    ) -> Self {
        Self {
            request_fingerprint: canonical_fingerprint(&request),
            node_id: node_id.into(),
            request,
            response,
        }
    }
}

/// Render a JSON value with object keys sorted recursively, so the same
/// logical request always produces the same bytes regardless of field
/// ordering at the call site.
pub fn canonical_json(value: &serde_json::Value) -> String {
    fn write(value: &serde_json::Value, out: &mut String) {
        match value {
            serde_json::Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                out.push('{');
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    // Key serialization cannot fail for a String.
                    out.push_str(&serde_json::Value::String((*key).clone()).to_string());
                    out.push(':');
                    if let Some(v) = map.get(*key) {
                        write(v, out);
                    }
                }
                out.push('}');
            }
            serde_json::Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write(item, out);
                }
                out.push(']');
            }
            other => out.push_str(&other.to_string()),
        }
    }

    let mut out = String::new();
    write(value, &mut out);
    out
}

/// SHA-256 of the canonical JSON rendering, hex-encoded.
pub fn canonical_fingerprint(value: &serde_json::Value) -> String {
    format!("{:x}", Sha256::digest(canonical_json(value).as_bytes()))
}

#[cfg(test)]
#[path = "fixture_tests.rs"]
mod tests;
