// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! vCenter session client
//!
//! [`VimSession`] is the capability surface the orchestration layer is
//! written against: inventory listings, task-returning mutations, task
//! polling, and guest/network reads. [`RestSession`] implements it over
//! the vCenter Automation (JSON REST) API.
//!
//! One session is shared by every concurrent worker in a run, so
//! implementations must be safe for concurrent calls without external
//! locking. `RestSession` satisfies this by construction: `reqwest`'s
//! client is internally pooled and the session token is immutable after
//! login.

mod error;
mod rest;

use async_trait::async_trait;

use vcenter_api::{
    CloneSpec, GuestNic, HostSummary, InventoryKind, InventoryObject, MoRef, PowerState,
    ReconfigSpec, SnapshotNode, TaskHandle, TaskInfo,
};

pub use error::SessionError;
pub use rest::{ConnectConfig, RestSession};

/// The remote-endpoint capability surface consumed by the orchestrator.
///
/// Every mutation returns a [`TaskHandle`]; callers observe completion by
/// polling [`VimSession::poll_task`]. Enqueueing and scheduling of the
/// submitted work is entirely the endpoint's business.
#[async_trait]
pub trait VimSession: Send + Sync {
    /// Enumerate all objects of one inventory kind.
    async fn list_objects(
        &self,
        kind: InventoryKind,
    ) -> Result<Vec<InventoryObject>, SessionError>;

    /// Submit a clone of a VM or template. The produced VM is the task's
    /// success result.
    async fn submit_clone(&self, spec: &CloneSpec) -> Result<TaskHandle, SessionError>;

    /// Submit a reconfiguration of an existing VM.
    async fn submit_reconfigure(
        &self,
        vm: &MoRef,
        spec: &ReconfigSpec,
    ) -> Result<TaskHandle, SessionError>;

    /// Submit a power-on of an existing VM.
    async fn submit_power_on(&self, vm: &MoRef) -> Result<TaskHandle, SessionError>;

    /// Submit a live migration of a VM to another host.
    async fn submit_migrate(&self, vm: &MoRef, host: &MoRef) -> Result<TaskHandle, SessionError>;

    /// Observe the current state of a submitted task.
    async fn poll_task(&self, task: &TaskHandle) -> Result<TaskInfo, SessionError>;

    /// Read the guest network interfaces of a VM, as reported by guest
    /// tools. Empty until the guest has booted far enough to report.
    async fn guest_networks(&self, vm: &MoRef) -> Result<Vec<GuestNic>, SessionError>;

    /// Read the current power state of a VM.
    async fn power_state(&self, vm: &MoRef) -> Result<PowerState, SessionError>;

    /// Read the snapshot tree of a VM (roots with nested children).
    async fn snapshot_tree(&self, vm: &MoRef) -> Result<Vec<SnapshotNode>, SessionError>;

    /// Read identity details of a host.
    async fn host_summary(&self, host: &MoRef) -> Result<HostSummary, SessionError>;
}
