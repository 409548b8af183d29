// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Guest address discovery
//!
//! A freshly powered-on guest takes a while to report networking through
//! its tools, so discovery polls the guest interfaces on a fixed cadence
//! up to a wait budget. Finding a MAC but never an address is a degraded
//! result, not a failure.

use std::net::IpAddr;
use std::time::Duration;

use tokio::time::sleep;

use vcenter_api::MoRef;
use vcenter_client::{SessionError, VimSession};

const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// What discovery found for one VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredAddress {
    /// Hardware address of the first interface that reported one
    pub mac: String,
    /// First address of the requested family, when one appeared within
    /// the wait budget
    pub ip: Option<IpAddr>,
}

/// Does `ip` qualify for the requested address family?
///
/// IPv4 excludes loopback; IPv6 excludes the `fe83::` prefix, under
/// which some guest-tools versions report a bogus link-local-looking
/// address.
pub fn address_matches(ip: &IpAddr, ipv6: bool) -> bool {
    match ip {
        IpAddr::V4(v4) => !ipv6 && !v4.is_loopback(),
        IpAddr::V6(v6) => ipv6 && v6.segments()[0] != 0xfe83,
    }
}

/// Poll the guest interfaces of `vm` until a MAC and an address of the
/// requested family are known, or the wait budget runs out.
///
/// Returns the full pair as soon as both are seen, the MAC alone after
/// the budget expires, or `None` when the guest never reported a MAC.
pub async fn wait_for_address(
    session: &dyn VimSession,
    vm: &MoRef,
    name: &str,
    ipv6: bool,
    max_wait: Duration,
) -> Result<Option<DiscoveredAddress>, SessionError> {
    let mut waited = Duration::ZERO;
    let mut mac: Option<String> = None;

    loop {
        tracing::debug!(vm = %name, waited_secs = waited.as_secs(), "gathering guest network info");
        let nics = session.guest_networks(vm).await?;

        for nic in &nics {
            let Some(nic_mac) = &nic.mac_address else {
                continue;
            };
            tracing::debug!(vm = %name, mac = %nic_mac, "guest reports hardware address");
            mac = Some(nic_mac.clone());

            if let Some(ip) = nic.ip_addresses.iter().find(|ip| address_matches(ip, ipv6)) {
                tracing::info!(vm = %name, mac = %nic_mac, ip = %ip, "guest address found");
                return Ok(Some(DiscoveredAddress {
                    mac: nic_mac.clone(),
                    ip: Some(*ip),
                }));
            }
        }

        waited += POLL_INTERVAL;
        if waited >= max_wait {
            break;
        }
        tracing::debug!(vm = %name, "no address yet, retrying");
        sleep(POLL_INTERVAL).await;
    }

    match mac {
        Some(mac) => {
            tracing::info!(vm = %name, mac = %mac, "hardware address found but no usable IP");
            Ok(Some(DiscoveredAddress { mac, ip: None }))
        }
        None => {
            tracing::info!(vm = %name, "no hardware address or IP found");
            Ok(None)
        }
    }
}
