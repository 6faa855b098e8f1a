// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSRF guard for network executors.
//!
//! DNS is resolved before dialing; any resolved address in a blocked range
//! rejects the whole request with zero bytes transmitted.

use lf_core::{error_code, NodeError};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Address policy. `allow_private` exists for tests and trusted internal
/// deployments; production leaves it off.
#[derive(Debug, Clone, Default)]
pub struct SsrfPolicy {
    pub allow_private: bool,
}

impl SsrfPolicy {
    /// Resolve `host:port` and verify every address against the policy.
    pub async fn resolve_and_check(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Vec<SocketAddr>, NodeError> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| {
                NodeError::retryable("DNS_ERROR", format!("failed to resolve {host}: {e}"))
            })?
            .collect();

        if addrs.is_empty() {
            return Err(NodeError::retryable("DNS_ERROR", format!("no addresses for {host}")));
        }

        if self.allow_private {
            return Ok(addrs);
        }

        for addr in &addrs {
            if let Some(range) = blocked_range(addr.ip()) {
                return Err(NodeError::non_retryable(
                    error_code::SSRF_BLOCKED,
                    format!("{host} resolves to {} ({range})", addr.ip()),
                ));
            }
        }
        Ok(addrs)
    }
}

/// Name of the blocked range an address falls into, if any.
pub(crate) fn blocked_range(ip: IpAddr) -> Option<&'static str> {
    match ip {
        IpAddr::V4(v4) => blocked_v4(v4),
        IpAddr::V6(v6) => blocked_v6(v6),
    }
}

fn blocked_v4(ip: Ipv4Addr) -> Option<&'static str> {
    if ip.is_unspecified() {
        Some("unspecified")
    } else if ip.is_loopback() {
        Some("loopback")
    } else if ip.octets() == [169, 254, 169, 254] {
        Some("cloud metadata")
    } else if ip.is_link_local() {
        Some("link-local")
    } else if ip.is_private() {
        Some("rfc1918 private")
    } else if ip.is_broadcast() {
        Some("broadcast")
    } else {
        None
    }
}

fn blocked_v6(ip: Ipv6Addr) -> Option<&'static str> {
    let segments = ip.segments();
    if ip.is_unspecified() {
        Some("unspecified")
    } else if ip.is_loopback() {
        Some("loopback")
    } else if (segments[0] & 0xffc0) == 0xfe80 {
        Some("link-local")
    } else if (segments[0] & 0xfe00) == 0xfc00 {
        Some("rfc4193 unique-local")
    } else if let Some(mapped) = ip.to_ipv4_mapped() {
        blocked_v4(mapped)
    } else {
        None
    }
}

#[cfg(test)]
#[path = "ssrf_tests.rs"]
mod tests;
