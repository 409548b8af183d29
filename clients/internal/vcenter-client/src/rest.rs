// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! REST implementation of [`VimSession`]
//!
//! Speaks the vCenter Automation API: a basic-auth login is exchanged for
//! a `vmware-api-session-id` token, inventory kinds map to collection
//! endpoints under `/api/vcenter/`, mutations carry `vmw-task=true` and
//! answer with a task id, and tasks are observed via `/api/cis/tasks/`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use vcenter_api::{
    CloneSpec, GuestNic, HostSummary, InventoryKind, InventoryObject, MoRef, Placement,
    PowerState, ReconfigSpec, SnapshotNode, TaskHandle, TaskInfo, TaskState,
};

use crate::{SessionError, VimSession};

const SESSION_HEADER: &str = "vmware-api-session-id";

/// Connection parameters for [`RestSession::connect`].
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Host name or address of the vCenter endpoint
    pub server: String,
    /// HTTPS port
    pub port: u16,
    /// Login user
    pub username: String,
    /// Login password
    pub password: String,
    /// Skip TLS certificate verification
    pub insecure: bool,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ConnectConfig {
    fn base_url(&self) -> Result<Url, SessionError> {
        let url = format!("https://{}:{}/", self.server, self.port);
        Url::parse(&url).map_err(|source| SessionError::BadUrl { url, source })
    }
}

/// A logged-in REST session. Cheap to share behind an `Arc`; all methods
/// take `&self` and the underlying HTTP client is connection-pooled.
pub struct RestSession {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl RestSession {
    /// Establish a session: build the HTTP client and trade the
    /// credentials for a session token.
    pub async fn connect(config: &ConnectConfig) -> Result<Self, SessionError> {
        let base = config.base_url()?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure)
            .build()?;

        tracing::debug!(server = %config.server, username = %config.username, "logging in");

        let response = http
            .post(join(&base, "api/session")?)
            .basic_auth(&config.username, Some(&config.password))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SessionError::Auth {
                server: config.server.clone(),
                username: config.username.clone(),
            });
        }
        let response = check_status(response, "api/session")?;
        let token: String = decode(response, "api/session").await?;

        tracing::debug!(server = %config.server, "session established");

        Ok(Self { http, base, token })
    }

    fn get(&self, path: &str) -> Result<reqwest::RequestBuilder, SessionError> {
        Ok(self
            .http
            .get(join(&self.base, path)?)
            .header(SESSION_HEADER, &self.token))
    }

    fn post(&self, path: &str) -> Result<reqwest::RequestBuilder, SessionError> {
        Ok(self
            .http
            .post(join(&self.base, path)?)
            .header(SESSION_HEADER, &self.token))
    }

    /// Submit a task-returning action and decode the task id it answers
    /// with.
    async fn submit_task(
        &self,
        path: &str,
        action: &str,
        body: Option<serde_json::Value>,
    ) -> Result<TaskHandle, SessionError> {
        let mut request = self
            .post(path)?
            .query(&[("action", action), ("vmw-task", "true")]);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = check_status(request.send().await?, path)?;
        let task_id: String = decode(response, path).await?;
        Ok(TaskHandle(task_id))
    }
}

fn join(base: &Url, path: &str) -> Result<Url, SessionError> {
    base.join(path).map_err(|source| SessionError::BadUrl {
        url: format!("{base}{path}"),
        source,
    })
}

fn check_status(
    response: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response, SessionError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(SessionError::Api {
            status: status.as_u16(),
            context: context.to_string(),
        })
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T, SessionError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|source| SessionError::Decode {
        context: context.to_string(),
        source,
    })
}

/// One row of a collection listing. The id property is named after its
/// collection (`{"vm": "vm-12", ...}` from `/api/vcenter/vm`), hence the
/// alias per kind.
#[derive(Deserialize)]
struct ListItem {
    #[serde(
        alias = "datacenter",
        alias = "cluster",
        alias = "resource_pool",
        alias = "folder",
        alias = "datastore",
        alias = "host",
        alias = "vm"
    )]
    id: String,
    name: String,
    #[serde(default)]
    path: Option<String>,
}

#[derive(Deserialize)]
struct WireProgress {
    total: u64,
    completed: u64,
}

#[derive(Deserialize)]
struct WireMessage {
    default_message: String,
}

#[derive(Deserialize)]
struct WireTaskError {
    #[serde(default)]
    messages: Vec<WireMessage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum WireTaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Deserialize)]
struct WireTask {
    status: WireTaskStatus,
    #[serde(default)]
    progress: Option<WireProgress>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<WireTaskError>,
}

impl WireTask {
    fn into_info(self) -> TaskInfo {
        match self.status {
            WireTaskStatus::Pending => TaskInfo::pending(TaskState::Queued, None),
            WireTaskStatus::Running => {
                let percent = self.progress.and_then(|p| {
                    (p.total > 0).then(|| ((p.completed * 100) / p.total).min(100) as u8)
                });
                TaskInfo::pending(TaskState::Running, percent)
            }
            // Produced objects on this surface are always VMs (clone and
            // relocate); other operations report no result.
            WireTaskStatus::Succeeded => TaskInfo::success(
                self.result
                    .map(|id| MoRef::new(InventoryKind::VirtualMachine, id)),
            ),
            // A failed task with no fault messages was canceled rather
            // than failed.
            WireTaskStatus::Failed => TaskInfo::error(
                self.error
                    .and_then(|e| e.messages.into_iter().next())
                    .map(|m| m.default_message),
            ),
        }
    }
}

#[derive(Deserialize)]
struct WireIpAddress {
    ip_address: String,
}

#[derive(Deserialize)]
struct WireIpConfig {
    #[serde(default)]
    ip_addresses: Vec<WireIpAddress>,
}

#[derive(Deserialize)]
struct WireInterface {
    #[serde(default)]
    mac_address: Option<String>,
    #[serde(default)]
    ip: Option<WireIpConfig>,
}

#[derive(Deserialize)]
struct WirePower {
    state: PowerState,
}

#[derive(Deserialize)]
struct WireHost {
    name: String,
    #[serde(default)]
    hardware_uuid: Option<String>,
}

#[async_trait]
impl VimSession for RestSession {
    async fn list_objects(
        &self,
        kind: InventoryKind,
    ) -> Result<Vec<InventoryObject>, SessionError> {
        let path = format!("api/vcenter/{kind}");
        tracing::debug!(kind = %kind, "listing inventory");
        let response = check_status(self.get(&path)?.send().await?, &path)?;
        let items: Vec<ListItem> = decode(response, &path).await?;
        Ok(items
            .into_iter()
            .map(|item| InventoryObject {
                moref: MoRef::new(kind, item.id),
                name: item.name,
                path: item.path,
            })
            .collect())
    }

    async fn submit_clone(&self, spec: &CloneSpec) -> Result<TaskHandle, SessionError> {
        tracing::debug!(source = %spec.source, name = %spec.name, "submitting clone");
        self.submit_task(
            "api/vcenter/vm",
            "clone",
            Some(serde_json::json!({ "spec": spec })),
        )
        .await
    }

    async fn submit_reconfigure(
        &self,
        vm: &MoRef,
        spec: &ReconfigSpec,
    ) -> Result<TaskHandle, SessionError> {
        tracing::debug!(vm = %vm, "submitting reconfigure");
        let path = format!("api/vcenter/vm/{}", vm.value);
        self.submit_task(&path, "reconfigure", Some(serde_json::json!({ "spec": spec })))
            .await
    }

    async fn submit_power_on(&self, vm: &MoRef) -> Result<TaskHandle, SessionError> {
        tracing::debug!(vm = %vm, "submitting power-on");
        let path = format!("api/vcenter/vm/{}/power", vm.value);
        self.submit_task(&path, "start", None).await
    }

    async fn submit_migrate(&self, vm: &MoRef, host: &MoRef) -> Result<TaskHandle, SessionError> {
        tracing::debug!(vm = %vm, host = %host, "submitting relocate");
        let path = format!("api/vcenter/vm/{}", vm.value);
        let placement = Placement {
            host: Some(host.value.clone()),
            ..Placement::default()
        };
        self.submit_task(
            &path,
            "relocate",
            Some(serde_json::json!({ "spec": { "placement": placement } })),
        )
        .await
    }

    async fn poll_task(&self, task: &TaskHandle) -> Result<TaskInfo, SessionError> {
        let path = format!("api/cis/tasks/{task}");
        let response = check_status(self.get(&path)?.send().await?, &path)?;
        let wire: WireTask = decode(response, &path).await?;
        Ok(wire.into_info())
    }

    async fn guest_networks(&self, vm: &MoRef) -> Result<Vec<GuestNic>, SessionError> {
        let path = format!("api/vcenter/vm/{}/guest/networking/interfaces", vm.value);
        let response = check_status(self.get(&path)?.send().await?, &path)?;
        let interfaces: Vec<WireInterface> = decode(response, &path).await?;
        Ok(interfaces
            .into_iter()
            .map(|iface| GuestNic {
                mac_address: iface.mac_address,
                // Entries the guest reports that do not parse as
                // addresses are dropped rather than failing the read.
                ip_addresses: iface
                    .ip
                    .map(|ip| {
                        ip.ip_addresses
                            .into_iter()
                            .filter_map(|a| a.ip_address.parse().ok())
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn power_state(&self, vm: &MoRef) -> Result<PowerState, SessionError> {
        let path = format!("api/vcenter/vm/{}/power", vm.value);
        let response = check_status(self.get(&path)?.send().await?, &path)?;
        let wire: WirePower = decode(response, &path).await?;
        Ok(wire.state)
    }

    async fn snapshot_tree(&self, vm: &MoRef) -> Result<Vec<SnapshotNode>, SessionError> {
        let path = format!("api/vcenter/vm/{}/snapshot", vm.value);
        let response = check_status(self.get(&path)?.send().await?, &path)?;
        decode(response, &path).await
    }

    async fn host_summary(&self, host: &MoRef) -> Result<HostSummary, SessionError> {
        let path = format!("api/vcenter/host/{}", host.value);
        let response = check_status(self.get(&path)?.send().await?, &path)?;
        let wire: WireHost = decode(response, &path).await?;
        Ok(HostSummary {
            moref: host.clone(),
            name: wire.name,
            hardware_uuid: wire.hardware_uuid,
        })
    }
}
