// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Ips command: report guest addresses of VMs

use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use clap::Args;

use vcenter_api::{GuestNic, InventoryKind, InventoryObject, PowerState};
use vcenter_client::VimSession;

use crate::netinfo;
use crate::resolve::{PoolMatchPolicy, Resolver};

#[derive(Args, Clone)]
pub struct IpsArgs {
    /// VM to report on
    #[arg(long, short = 'n', required_unless_present = "all", conflicts_with = "all")]
    pub name: Option<String>,

    /// Report every powered-on VM
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Collect IPv6 addresses instead of IPv4
    #[arg(long, short = '6')]
    pub ipv6: bool,
}

pub async fn run(args: IpsArgs, session: Arc<dyn VimSession>) -> Result<()> {
    if args.all {
        for object in session.list_objects(InventoryKind::VirtualMachine).await? {
            if session.power_state(&object.moref).await? != PowerState::PoweredOn {
                continue;
            }
            report(session.as_ref(), &object, args.ipv6).await?;
        }
        return Ok(());
    }

    let Some(name) = args.name.as_deref() else {
        bail!("either --name or --all is required");
    };
    let resolver = Resolver::new(Arc::clone(&session), PoolMatchPolicy::ExactName);
    let object = resolver
        .find(InventoryKind::VirtualMachine, name)
        .await?
        .ok_or_else(|| anyhow!("VM not found: {name}"))?;
    report(session.as_ref(), &object, args.ipv6).await
}

async fn report(session: &dyn VimSession, vm: &InventoryObject, ipv6: bool) -> Result<()> {
    let addresses = collect(&session.guest_networks(&vm.moref).await?, ipv6);
    if addresses.is_empty() {
        tracing::error!(vm = %vm.name, "no guest IP addresses found");
    } else {
        println!("{} : {}", vm.name, addresses.join(";"));
    }
    Ok(())
}

/// Every guest address of the requested family, in interface order.
fn collect(nics: &[GuestNic], ipv6: bool) -> Vec<String> {
    nics.iter()
        .flat_map(|nic| nic.ip_addresses.iter())
        .filter(|ip| netinfo::address_matches(ip, ipv6))
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nic(ips: &[&str]) -> GuestNic {
        GuestNic {
            mac_address: Some("00:50:56:aa:bb:cc".to_string()),
            ip_addresses: ips.iter().map(|ip| ip.parse().unwrap()).collect(),
        }
    }

    #[test]
    fn test_collect_joins_all_matching_addresses() {
        let nics = vec![nic(&["127.0.0.1", "10.0.0.4"]), nic(&["10.0.0.5", "2001:db8::1"])];
        assert_eq!(collect(&nics, false), ["10.0.0.4", "10.0.0.5"]);
        assert_eq!(collect(&nics, true), ["2001:db8::1"]);
    }
}
