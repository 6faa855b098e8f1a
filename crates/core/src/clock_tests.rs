// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_starts_at_the_named_epoch() {
    assert_eq!(FakeClock::new().epoch_ms(), FAKE_EPOCH_MS);
}

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    clock.advance(Duration::from_secs(10));
    assert_eq!(clock.epoch_ms(), FAKE_EPOCH_MS + 10_000);

    clock.advance_ms(500);
    assert_eq!(clock.epoch_ms(), FAKE_EPOCH_MS + 10_500);
}

#[test]
fn fake_clock_set_epoch() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(42);
    assert_eq!(clock.epoch_ms(), 42);
}

#[test]
fn clones_share_the_same_time() {
    let clock = FakeClock::new();
    let handed_to_service = clock.clone();
    clock.advance_ms(7_000);
    assert_eq!(handed_to_service.epoch_ms(), FAKE_EPOCH_MS + 7_000);
}

#[test]
fn system_clock_is_past_2020() {
    // 2020-01-01T00:00:00Z
    assert!(SystemClock.epoch_ms() > 1_577_836_800_000);
}
