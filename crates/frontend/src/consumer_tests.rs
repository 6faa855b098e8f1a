// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn bulk(s: &str) -> Value {
    Value::BulkString(s.as_bytes().to_vec())
}

fn entry(id: &str, fields: &[(&str, &str)]) -> Value {
    let mut kv = Vec::new();
    for (k, v) in fields {
        kv.push(bulk(k));
        kv.push(bulk(v));
    }
    Value::Array(vec![bulk(id), Value::Array(kv)])
}

#[test]
fn parses_xreadgroup_reply() {
    let reply = Value::Array(vec![Value::Array(vec![
        bulk("lf:jobs"),
        Value::Array(vec![
            entry("1-0", &[("payload", "{\"a\":1}")]),
            entry("1-1", &[("payload", "{\"b\":2}"), ("extra", "x")]),
        ]),
    ])]);

    let entries = parse_stream_reply(&reply, "lf:jobs");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].0, "1-0");
    assert_eq!(entries[0].1.get("payload").unwrap(), b"{\"a\":1}");
    assert_eq!(entries[1].1.len(), 2);
}

#[test]
fn other_streams_are_ignored() {
    let reply = Value::Array(vec![Value::Array(vec![
        bulk("other:stream"),
        Value::Array(vec![entry("1-0", &[("payload", "{}")])]),
    ])]);
    assert!(parse_stream_reply(&reply, "lf:jobs").is_empty());
}

#[test]
fn nil_reply_is_empty() {
    assert!(parse_stream_reply(&Value::Nil, "lf:jobs").is_empty());
    assert!(parse_entries(&Value::Nil).is_empty());
    assert!(parse_pending_reply(&Value::Nil).is_empty());
}

#[test]
fn parses_pending_rows() {
    let reply = Value::Array(vec![
        Value::Array(vec![bulk("1-0"), bulk("lf-frontend-0"), Value::Int(75_000), Value::Int(6)]),
        Value::Array(vec![bulk("1-1"), bulk("lf-frontend-1"), Value::Int(61_000), Value::Int(1)]),
    ]);

    let pending = parse_pending_reply(&reply);
    assert_eq!(
        pending,
        vec![
            PendingEntry {
                entry_id: "1-0".to_string(),
                consumer: "lf-frontend-0".to_string(),
                idle_ms: 75_000,
                deliveries: 6,
            },
            PendingEntry {
                entry_id: "1-1".to_string(),
                consumer: "lf-frontend-1".to_string(),
                idle_ms: 61_000,
                deliveries: 1,
            },
        ]
    );
}

#[test]
fn malformed_entries_are_skipped() {
    let reply = Value::Array(vec![
        Value::Int(3),
        entry("2-0", &[("payload", "{}")]),
    ]);
    let entries = parse_entries(&reply);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "2-0");
}
