// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn routing_is_stable() {
    assert_eq!(shard_for("wf-1", 16), shard_for("wf-1", 16));
}

#[test]
fn routing_is_in_range() {
    for i in 0..100 {
        let shard = shard_for(&format!("wf-{i}"), 7);
        assert!(shard < 7);
    }
}

#[test]
fn single_shard_takes_everything() {
    assert_eq!(shard_for("anything", 1), 0);
}

#[test]
fn distribution_hits_multiple_shards() {
    let shards: std::collections::HashSet<u32> =
        (0..64).map(|i| shard_for(&format!("wf-{i}"), 8)).collect();
    assert!(shards.len() > 4, "expected spread across shards, got {:?}", shards);
}
