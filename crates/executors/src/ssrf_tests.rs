// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    loopback = { "127.0.0.1", Some("loopback") },
    loopback_high = { "127.8.3.2", Some("loopback") },
    unspecified = { "0.0.0.0", Some("unspecified") },
    metadata = { "169.254.169.254", Some("cloud metadata") },
    link_local = { "169.254.1.1", Some("link-local") },
    rfc1918_10 = { "10.0.0.5", Some("rfc1918 private") },
    rfc1918_172 = { "172.16.9.1", Some("rfc1918 private") },
    rfc1918_192 = { "192.168.1.1", Some("rfc1918 private") },
    broadcast = { "255.255.255.255", Some("broadcast") },
    public = { "93.184.216.34", None },
    public_dns = { "8.8.8.8", None },
)]
fn v4_ranges(ip: &str, expected: Option<&'static str>) {
    let ip: IpAddr = ip.parse().unwrap();
    assert_eq!(blocked_range(ip), expected);
}

#[parameterized(
    loopback = { "::1", Some("loopback") },
    unspecified = { "::", Some("unspecified") },
    link_local = { "fe80::1", Some("link-local") },
    unique_local = { "fd00::1", Some("rfc4193 unique-local") },
    unique_local_fc = { "fc00::1", Some("rfc4193 unique-local") },
    mapped_loopback = { "::ffff:127.0.0.1", Some("loopback") },
    mapped_private = { "::ffff:10.0.0.1", Some("rfc1918 private") },
    public = { "2606:2800:220:1:248:1893:25c8:1946", None },
)]
fn v6_ranges(ip: &str, expected: Option<&'static str>) {
    let ip: IpAddr = ip.parse().unwrap();
    assert_eq!(blocked_range(ip), expected);
}

#[tokio::test]
async fn resolve_blocks_loopback_host() {
    let policy = SsrfPolicy::default();
    let err = policy.resolve_and_check("127.0.0.1", 80).await.unwrap_err();
    assert_eq!(err.code, error_code::SSRF_BLOCKED);
    assert_eq!(err.kind, lf_core::ErrorKind::NonRetryable);
}

#[tokio::test]
async fn allow_private_permits_loopback() {
    let policy = SsrfPolicy { allow_private: true };
    let addrs = policy.resolve_and_check("127.0.0.1", 8080).await.unwrap();
    assert!(!addrs.is_empty());
}
