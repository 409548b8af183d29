// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Post-processing script invocation
//!
//! The script receives positional arguments depending on what is known
//! about the VM:
//!
//! * `name mac ip` when an address of the requested family was discovered
//! * `name mac`    when only a fixed hardware address is known
//! * `name`        otherwise
//!
//! Any non-zero exit (or death by signal) is logged as a warning and
//! never fails the job or the run.

use std::ffi::OsString;
use std::path::Path;

use crate::netinfo::DiscoveredAddress;

/// Assemble the positional arguments for one invocation.
fn build_args(
    name: &str,
    discovered: Option<&DiscoveredAddress>,
    custom_mac: Option<&str>,
) -> Vec<OsString> {
    if let Some(found) = discovered
        && let Some(ip) = found.ip
    {
        return vec![name.into(), found.mac.clone().into(), ip.to_string().into()];
    }
    if let Some(mac) = custom_mac {
        return vec![name.into(), mac.into()];
    }
    vec![name.into()]
}

/// Run `script` for one VM. Failures are warnings only.
pub async fn run(
    script: &Path,
    name: &str,
    discovered: Option<&DiscoveredAddress>,
    custom_mac: Option<&str>,
) {
    let args = build_args(name, discovered, custom_mac);
    tracing::info!(vm = %name, script = %script.display(), args = ?args, "running post-script");

    let status = tokio::process::Command::new(script).args(&args).status().await;
    match status {
        Ok(status) if status.success() => {
            tracing::debug!(vm = %name, script = %script.display(), "post-script succeeded");
        }
        Ok(status) => {
            tracing::warn!(
                vm = %name,
                script = %script.display(),
                code = status.code(),
                "post-script exited non-zero"
            );
        }
        Err(error) => {
            tracing::warn!(
                vm = %name,
                script = %script.display(),
                error = %error,
                "post-script could not be run"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discovered(mac: &str, ip: Option<&str>) -> DiscoveredAddress {
        DiscoveredAddress {
            mac: mac.to_string(),
            ip: ip.map(|ip| ip.parse().unwrap()),
        }
    }

    #[test]
    fn test_full_discovery_passes_name_mac_ip() {
        let found = discovered("00:50:56:aa:bb:cc", Some("10.0.0.9"));
        let args = build_args("web-1", Some(&found), Some("00:50:56:11:11:11"));
        assert_eq!(args, ["web-1", "00:50:56:aa:bb:cc", "10.0.0.9"].map(OsString::from));
    }

    #[test]
    fn test_mac_only_discovery_falls_back_to_custom_mac() {
        // Discovery without an IP does not qualify for the three-argument
        // form; a fixed MAC gives the two-argument form.
        let found = discovered("00:50:56:aa:bb:cc", None);
        let args = build_args("web-1", Some(&found), Some("00:50:56:11:11:11"));
        assert_eq!(args, ["web-1", "00:50:56:11:11:11"].map(OsString::from));
    }

    #[test]
    fn test_no_addresses_passes_name_only() {
        let args = build_args("web-1", None, None);
        assert_eq!(args, ["web-1"].map(OsString::from));
    }
}
