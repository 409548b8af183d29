// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Shared data types for the vCenter Automation API surface
//!
//! These types are deliberately protocol-neutral: they describe inventory
//! objects, asynchronous task state, and the request payloads the
//! orchestration layer submits, without tying callers to the REST client
//! that happens to implement them today.

pub mod types;

pub use types::common::{InventoryKind, InventoryObject, MoRef};
pub use types::task::{TaskHandle, TaskInfo, TaskState};
pub use types::vm::{
    CloneSpec, GuestNic, HostSummary, Placement, PowerState, ReconfigSpec, SnapshotNode,
};
