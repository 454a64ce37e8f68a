// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SSH Tunnel Manager Contributors

// Network utility functions

use std::collections::BTreeSet;
use std::net::IpAddr;

use crate::error::{Error, Result};

/// Check if a host address is a loopback address
/// Supports IPv4 (127.0.0.1, 127.x.x.x), IPv6 (::1), and hostname (localhost)
pub fn is_loopback_address(host: &str) -> bool {
    // Handle "localhost" as special case
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }

    // Try parsing as IpAddr (handles "127.0.0.1", "::1", etc.)
    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback();
    }

    false
}

/// Extract the loopback addresses from `ifconfig` output.
///
/// Accepts both the BSD (`inet 127.0.0.2 netmask 0xff000000`) and the legacy
/// net-tools (`inet addr:127.0.0.1  Mask:255.0.0.0`) layouts. Output without
/// a single loopback address is treated as unparseable.
pub fn parse_loopback_aliases(output: &str) -> Result<BTreeSet<String>> {
    let mut aliases = BTreeSet::new();

    for line in output.lines() {
        let mut fields = line.split_whitespace();
        if !matches!(fields.next(), Some("inet") | Some("inet6")) {
            continue;
        }
        let Some(address) = fields.next() else {
            continue;
        };
        let address = address.strip_prefix("addr:").unwrap_or(address);
        // inet6 lines may carry a prefix length or zone suffix
        let address = address.split(['/', '%']).next().unwrap_or(address);

        if is_loopback_address(address) {
            aliases.insert(address.to_string());
        }
    }

    if aliases.is_empty() {
        return Err(Error::Probe(
            "no loopback addresses found in interface listing".to_string(),
        ));
    }

    Ok(aliases)
}

/// Bind addresses required by some tunnel but not aliased on loopback.
///
/// Keeps first-seen order and drops duplicates, so tunnels sharing an
/// address produce a single alias command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasGap {
    addresses: Vec<String>,
}

impl AliasGap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: &str) {
        if !self.addresses.iter().any(|a| a == address) {
            self.addresses.push(address.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }
}
