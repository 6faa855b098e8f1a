// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn permits_release_on_drop() {
    let bulkhead = Bulkhead::new("db", 2, Duration::from_millis(50));
    let a = bulkhead.acquire().await.unwrap();
    let _b = bulkhead.acquire().await.unwrap();
    assert_eq!(bulkhead.available(), 0);

    drop(a);
    assert_eq!(bulkhead.available(), 1);
    let _c = bulkhead.acquire().await.unwrap();
}

#[tokio::test]
async fn acquire_times_out_when_full() {
    let bulkhead = Bulkhead::new("db", 1, Duration::from_millis(20));
    let _held = bulkhead.acquire().await.unwrap();

    let err = bulkhead.acquire().await.unwrap_err();
    assert_eq!(err.code, "BULKHEAD_TIMEOUT");
    assert!(err.is_retryable());
}
