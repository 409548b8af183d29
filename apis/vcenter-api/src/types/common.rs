// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Inventory-related types

use serde::{Deserialize, Serialize};
use std::fmt;

/// The inventory container kinds a session can enumerate.
///
/// The string form of each variant matches the collection segment of the
/// Automation API (`/api/vcenter/<kind>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum InventoryKind {
    #[serde(rename = "datacenter")]
    #[strum(serialize = "datacenter")]
    Datacenter,
    #[serde(rename = "cluster")]
    #[strum(serialize = "cluster")]
    Cluster,
    #[serde(rename = "resource-pool")]
    #[strum(serialize = "resource-pool")]
    ResourcePool,
    #[serde(rename = "folder")]
    #[strum(serialize = "folder")]
    Folder,
    #[serde(rename = "datastore")]
    #[strum(serialize = "datastore")]
    Datastore,
    #[serde(rename = "host")]
    #[strum(serialize = "host")]
    HostSystem,
    #[serde(rename = "vm")]
    #[strum(serialize = "vm")]
    VirtualMachine,
}

/// A managed-object reference: the kind of the object plus its opaque
/// endpoint-assigned identifier (e.g. `vm-1042`, `host-21`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoRef {
    /// Object kind
    pub kind: InventoryKind,
    /// Endpoint-assigned identifier
    pub value: String,
}

impl MoRef {
    pub fn new(kind: InventoryKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

impl fmt::Display for MoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// One entry from an inventory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryObject {
    /// Reference to the object
    pub moref: MoRef,
    /// Display name
    pub name: String,
    /// Full inventory path, when the endpoint reports one. Resource pools
    /// carry this so path-based matching is possible; most other kinds
    /// leave it unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl InventoryObject {
    pub fn new(moref: MoRef, name: impl Into<String>) -> Self {
        Self {
            moref,
            name: name.into(),
            path: None,
        }
    }
}
