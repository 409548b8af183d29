// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Virtual-machine types: power, guest networking, snapshots, and the
//! request payloads for clone / reconfigure / relocate operations

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;

use super::common::MoRef;

/// VM power state as reported by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    Suspended,
}

/// One guest network interface, as reported by guest tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestNic {
    /// Hardware address, when the guest reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    /// Addresses currently assigned to the interface
    #[serde(default)]
    pub ip_addresses: Vec<IpAddr>,
}

/// Placement of a clone or relocation. Every field is optional; an unset
/// field means "inherit from the source object".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_pool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datastore: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// Request payload for cloning a VM or template.
///
/// The clone itself never powers the new VM on; power-on is submitted as a
/// separate task so hardware reconfiguration can happen before first boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneSpec {
    /// Identifier of the source VM or template
    pub source: String,
    /// Name of the new VM
    pub name: String,
    /// Target placement; unset fields inherit from the source
    #[serde(default)]
    pub placement: Placement,
    /// Create a linked clone backed by `snapshot` instead of a full copy
    #[serde(default)]
    pub linked: bool,
    /// Snapshot identifier a linked clone is based on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
}

/// One reconfiguration of an existing VM. Each value is submitted as its
/// own task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum ReconfigSpec {
    /// Pin the primary ethernet device to a fixed hardware address
    MacAddress(String),
    /// Set advanced config key/value options
    ExtraConfig(BTreeMap<String, String>),
}

/// One node of a VM's snapshot tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    /// Snapshot identifier (`snapshot` on the wire)
    #[serde(alias = "snapshot")]
    pub id: String,
    /// Snapshot name
    pub name: String,
    /// Child snapshots taken after this one
    #[serde(default)]
    pub children: Vec<SnapshotNode>,
}

/// Identity details of a host, used by read-only inventory reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSummary {
    /// Reference to the host
    pub moref: MoRef,
    /// Host name
    pub name: String,
    /// BIOS hardware UUID, when the endpoint reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_uuid: Option<String>,
}
