// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Two-tier bounded worker pool for batch cloning
//!
//! The primary pool runs one job per semaphore permit: resolve placement,
//! clone, reconfigure, power on. Jobs that come up powered-on with
//! address discovery or a post-script requested are handed to the
//! secondary pool over a channel; the secondary pool has its own permit
//! budget, so slow guest boots never hold a primary slot hostage.
//!
//! An interrupt stops the submission of new jobs only; anything already
//! holding a permit runs to its terminal state.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc, watch};
use tokio::task::JoinSet;

use vcenter_api::{CloneSpec, InventoryKind, InventoryObject, MoRef, Placement, ReconfigSpec, TaskHandle};
use vcenter_client::{SessionError, VimSession};

use crate::netinfo;
use crate::plan::JobSpec;
use crate::postscript;
use crate::resolve::{PoolMatchPolicy, Resolver};
use crate::task::{TaskOutcome, TaskWatcher};

/// Run-level knobs for one batch dispatch.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Primary pool size: jobs in flight at once
    pub concurrency: usize,
    /// Secondary pool size: discovery/post-script units in flight at once
    pub secondary_concurrency: usize,
    /// Task poll cadence
    pub poll_interval: Duration,
    /// Overall bound per remote task; `None` polls forever
    pub task_timeout: Option<Duration>,
    /// Budget for guest address discovery
    pub address_wait: Duration,
    /// Discover IPv6 instead of IPv4 addresses
    pub ipv6: bool,
    /// Print discovered addresses to stdout
    pub print_ips: bool,
    /// Print discovered hardware addresses to stdout
    pub print_macs: bool,
    /// Resource-pool matching policy
    pub pool_policy: PoolMatchPolicy,
}

/// Source material every job clones from.
#[derive(Debug, Clone)]
pub struct CloneContext {
    /// Template or source VM
    pub template: InventoryObject,
    /// Snapshot id linked clones are based on
    pub snapshot: Option<String>,
}

/// Tally of terminal job outcomes for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobOutcome {
    Created,
    Skipped,
    Failed,
}

/// Work handed from a finished primary job to the secondary pool.
struct SecondaryJob {
    vm: MoRef,
    name: String,
    custom_mac: Option<String>,
    post_script: Option<PathBuf>,
}

/// Execute every job and return once all of them, and all secondary
/// work they spawned, are terminal.
pub async fn run_plan(
    session: Arc<dyn VimSession>,
    context: CloneContext,
    jobs: Vec<JobSpec>,
    config: DispatchConfig,
    mut shutdown: watch::Receiver<bool>,
) -> DispatchSummary {
    let (secondary_tx, secondary_rx) = mpsc::unbounded_channel();
    let secondary = tokio::spawn(secondary_pool(
        Arc::clone(&session),
        secondary_rx,
        SecondaryConfig {
            concurrency: config.secondary_concurrency.max(1),
            address_wait: config.address_wait,
            ipv6: config.ipv6,
            print_ips: config.print_ips,
            print_macs: config.print_macs,
        },
    ));

    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let worker = Arc::new(Worker {
        session: Arc::clone(&session),
        watcher: TaskWatcher::new(config.poll_interval, config.task_timeout),
        context,
        pool_policy: config.pool_policy,
        secondary_requested: config.print_ips || config.print_macs,
    });

    let mut workers: JoinSet<JobOutcome> = JoinSet::new();
    let mut pending = jobs.into_iter();
    for job in pending.by_ref() {
        if *shutdown.borrow() {
            tracing::warn!(vm = %job.name, "interrupt received, submitting no further jobs");
            break;
        }
        // Bounded-queue wait: hold the submission loop until a primary
        // slot frees up, but stay responsive to an interrupt.
        let permit = tokio::select! {
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
            _ = shutdown.changed() => {
                tracing::warn!(vm = %job.name, "interrupt received, submitting no further jobs");
                break;
            }
        };

        let worker = Arc::clone(&worker);
        let secondary_tx = secondary_tx.clone();
        workers.spawn(async move {
            let _permit = permit;
            worker.run(job, secondary_tx).await
        });
    }
    let unsubmitted = pending.count();
    if unsubmitted > 0 {
        tracing::warn!(count = unsubmitted, "jobs were never submitted");
    }
    drop(secondary_tx);

    let mut summary = DispatchSummary::default();
    while let Some(result) = workers.join_next().await {
        match result {
            Ok(JobOutcome::Created) => summary.created += 1,
            Ok(JobOutcome::Skipped) => summary.skipped += 1,
            Ok(JobOutcome::Failed) => summary.failed += 1,
            Err(error) => {
                tracing::error!(error = %error, "clone worker panicked");
                summary.failed += 1;
            }
        }
    }

    // Primary work is accounted for; wait out address discovery and
    // post-scripts before reporting.
    tracing::debug!("waiting for address discovery and post-script work");
    if let Err(error) = secondary.await {
        tracing::error!(error = %error, "secondary pool panicked");
    }

    summary
}

struct Worker {
    session: Arc<dyn VimSession>,
    watcher: TaskWatcher,
    context: CloneContext,
    pool_policy: PoolMatchPolicy,
    /// Address printing was requested at run level
    secondary_requested: bool,
}

impl Worker {
    async fn run(
        &self,
        job: JobSpec,
        secondary_tx: mpsc::UnboundedSender<SecondaryJob>,
    ) -> JobOutcome {
        tracing::info!(vm = %job.name, template = %self.context.template.name, "cloning");
        let resolver = Resolver::new(Arc::clone(&self.session), self.pool_policy);

        let Some(placement) = self.build_placement(&resolver, &job).await else {
            return JobOutcome::Failed;
        };

        match resolver.find(InventoryKind::VirtualMachine, &job.name).await {
            Ok(Some(_)) => {
                tracing::warn!(vm = %job.name, "virtual machine already exists, not creating");
                return JobOutcome::Skipped;
            }
            Ok(None) => {}
            Err(error) => {
                tracing::error!(vm = %job.name, error = %error, "duplicate check failed");
                return JobOutcome::Failed;
            }
        }

        let spec = CloneSpec {
            source: self.context.template.moref.value.clone(),
            name: job.name.clone(),
            placement,
            linked: job.linked,
            snapshot: self.context.snapshot.clone(),
        };
        let submitted = self.session.submit_clone(&spec).await;
        let Some(vm) = self.drive(&job.name, "clone", submitted).await else {
            return JobOutcome::Failed;
        };
        let Some(vm) = vm else {
            tracing::error!(vm = %job.name, "clone task reported no produced object");
            return JobOutcome::Failed;
        };
        tracing::info!(vm = %job.name, moref = %vm, "cloned");

        if let Some(mac) = &job.custom_mac {
            tracing::info!(vm = %job.name, mac = %mac, "setting hardware address");
            let submitted = self
                .session
                .submit_reconfigure(&vm, &ReconfigSpec::MacAddress(mac.clone()))
                .await;
            if self.drive(&job.name, "set-mac", submitted).await.is_none() {
                return JobOutcome::Failed;
            }
        }

        if let Some(raw) = &job.extra_params {
            let options = match parse_extra_params(raw) {
                Ok(options) => options,
                Err(error) => {
                    tracing::error!(
                        vm = %job.name,
                        error = %error,
                        "advanced parameters are not a JSON object, abandoning job"
                    );
                    return JobOutcome::Failed;
                }
            };
            tracing::info!(vm = %job.name, count = options.len(), "applying advanced parameters");
            let submitted = self
                .session
                .submit_reconfigure(&vm, &ReconfigSpec::ExtraConfig(options))
                .await;
            if self.drive(&job.name, "extra-config", submitted).await.is_none() {
                return JobOutcome::Failed;
            }
        }

        if job.power_on {
            tracing::info!(vm = %job.name, "powering on");
            let submitted = self.session.submit_power_on(&vm).await;
            if self.drive(&job.name, "power-on", submitted).await.is_none() {
                return JobOutcome::Failed;
            }
        }

        if job.post_script.is_some() || self.secondary_requested {
            if job.power_on {
                // The send only fails when the secondary pool is gone,
                // which cannot happen while primary jobs still run.
                let _ = secondary_tx.send(SecondaryJob {
                    vm,
                    name: job.name.clone(),
                    custom_mac: job.custom_mac.clone(),
                    post_script: job.post_script.clone(),
                });
            } else {
                tracing::warn!(
                    vm = %job.name,
                    "power-on disabled, skipping address discovery and post-script"
                );
            }
        }

        JobOutcome::Created
    }

    /// Resolve every named placement override. `None` means a required
    /// target was missing or unreadable (already logged) and the job is
    /// abandoned.
    async fn build_placement(&self, resolver: &Resolver, job: &JobSpec) -> Option<Placement> {
        Some(Placement {
            datacenter: self
                .lookup(resolver, &job.name, InventoryKind::Datacenter, job.datacenter.as_deref())
                .await?,
            cluster: self
                .lookup(resolver, &job.name, InventoryKind::Cluster, job.cluster.as_deref())
                .await?,
            resource_pool: self
                .lookup(
                    resolver,
                    &job.name,
                    InventoryKind::ResourcePool,
                    job.resource_pool.as_deref(),
                )
                .await?,
            folder: self
                .lookup(resolver, &job.name, InventoryKind::Folder, job.folder.as_deref())
                .await?,
            datastore: self
                .lookup(resolver, &job.name, InventoryKind::Datastore, job.datastore.as_deref())
                .await?,
            host: None,
        })
    }

    /// One placement lookup. Outer `None` aborts the job; the inner
    /// option is the resolved id, or `None` when the field was not
    /// requested and inherits from the source.
    async fn lookup(
        &self,
        resolver: &Resolver,
        vm: &str,
        kind: InventoryKind,
        requested: Option<&str>,
    ) -> Option<Option<String>> {
        let Some(name) = requested else {
            return Some(None);
        };
        match resolver.find(kind, name).await {
            Ok(Some(object)) => {
                tracing::info!(vm = %vm, kind = %kind, name = %name, "placement target found");
                Some(Some(object.moref.value))
            }
            Ok(None) => {
                tracing::error!(
                    vm = %vm,
                    kind = %kind,
                    name = %name,
                    "placement target not found, abandoning job"
                );
                None
            }
            Err(error) => {
                tracing::error!(
                    vm = %vm,
                    kind = %kind,
                    name = %name,
                    error = %error,
                    "placement lookup failed, abandoning job"
                );
                None
            }
        }
    }

    /// Drive one submitted task to success. `Some(result)` on success
    /// (the inner option is the produced object, when the operation
    /// yields one); `None` on any failure, already logged.
    async fn drive(
        &self,
        vm: &str,
        op: &str,
        submitted: Result<TaskHandle, SessionError>,
    ) -> Option<Option<MoRef>> {
        let handle = match submitted {
            Ok(handle) => handle,
            Err(error) => {
                tracing::error!(vm = %vm, op = %op, error = %error, "task submission failed");
                return None;
            }
        };
        match self.watcher.drive(self.session.as_ref(), vm, op, &handle).await {
            Ok(TaskOutcome::Completed(result)) => Some(result),
            Ok(TaskOutcome::Failed(fault)) => {
                tracing::error!(vm = %vm, op = %op, fault = %fault, "task failed");
                None
            }
            Ok(TaskOutcome::Canceled) => {
                tracing::error!(vm = %vm, op = %op, "task was canceled");
                None
            }
            // drive() already logged the deadline.
            Ok(TaskOutcome::TimedOut) => None,
            Err(error) => {
                tracing::error!(vm = %vm, op = %op, error = %error, "task polling failed");
                None
            }
        }
    }
}

/// Parse the advanced-parameters column: a JSON object whose values are
/// taken as strings (non-string scalars keep their JSON rendering).
fn parse_extra_params(raw: &str) -> Result<BTreeMap<String, String>, serde_json::Error> {
    let object: BTreeMap<String, serde_json::Value> = serde_json::from_str(raw)?;
    Ok(object
        .into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(text) => (key, text),
            other => (key, other.to_string()),
        })
        .collect())
}

#[derive(Clone)]
struct SecondaryConfig {
    concurrency: usize,
    address_wait: Duration,
    ipv6: bool,
    print_ips: bool,
    print_macs: bool,
}

/// Drain the secondary channel into its own bounded pool; returns when
/// the channel closes and every spawned unit has finished.
async fn secondary_pool(
    session: Arc<dyn VimSession>,
    mut jobs: mpsc::UnboundedReceiver<SecondaryJob>,
    config: SecondaryConfig,
) {
    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let mut workers = JoinSet::new();
    while let Some(job) = jobs.recv().await {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let session = Arc::clone(&session);
        let config = config.clone();
        workers.spawn(async move {
            let _permit = permit;
            run_secondary(session, job, config).await;
        });
    }
    while workers.join_next().await.is_some() {}
}

async fn run_secondary(session: Arc<dyn VimSession>, job: SecondaryJob, config: SecondaryConfig) {
    let discovered = if config.print_ips || config.print_macs {
        match netinfo::wait_for_address(
            session.as_ref(),
            &job.vm,
            &job.name,
            config.ipv6,
            config.address_wait,
        )
        .await
        {
            Ok(Some(found)) => {
                report_addresses(&job.name, &found, config.print_macs, config.print_ips);
                Some(found)
            }
            Ok(None) => {
                tracing::error!(
                    vm = %job.name,
                    wait_secs = config.address_wait.as_secs(),
                    "no address information found within the wait budget"
                );
                None
            }
            Err(error) => {
                tracing::error!(vm = %job.name, error = %error, "address discovery failed");
                None
            }
        }
    } else {
        None
    };

    if let Some(script) = &job.post_script {
        postscript::run(script, &job.name, discovered.as_ref(), job.custom_mac.as_deref()).await;
    }
}

fn report_addresses(name: &str, found: &netinfo::DiscoveredAddress, macs: bool, ips: bool) {
    match (macs, ips, found.ip) {
        (true, true, Some(ip)) => println!("{} {} {}", name, found.mac, ip),
        (true, _, _) => println!("{} {}", name, found.mac),
        (_, true, Some(ip)) => println!("{} {}", name, ip),
        (_, true, None) => {
            tracing::error!(vm = %name, "no IP address to print")
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanDefaults;
    use crate::testutil::FakeSession;
    use vcenter_api::{GuestNic, TaskInfo};

    fn template() -> InventoryObject {
        InventoryObject::new(MoRef::new(InventoryKind::VirtualMachine, "vm-template"), "golden")
    }

    fn config(concurrency: usize) -> DispatchConfig {
        DispatchConfig {
            concurrency,
            secondary_concurrency: concurrency,
            poll_interval: Duration::from_secs(2),
            task_timeout: None,
            address_wait: Duration::from_secs(20),
            ipv6: false,
            print_ips: false,
            print_macs: false,
            pool_policy: PoolMatchPolicy::ExactName,
        }
    }

    fn jobs(names: &[&str], defaults: &PlanDefaults) -> Vec<JobSpec> {
        names.iter().map(|name| defaults.job(*name)).collect()
    }

    fn no_shutdown() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_pool_never_exceeds_concurrency() {
        let session = Arc::new(FakeSession::new());
        session.set_clone_running_polls(3);
        let names: Vec<String> = (0..10).map(|n| format!("vm-{n:02}")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let (_tx, shutdown) = no_shutdown();

        let summary = run_plan(
            session.clone(),
            CloneContext { template: template(), snapshot: None },
            jobs(&name_refs, &PlanDefaults::default()),
            config(2),
            shutdown,
        )
        .await;

        assert_eq!(summary, DispatchSummary { created: 10, skipped: 0, failed: 0 });
        assert_eq!(session.max_in_flight_clones(), 2);
        assert_eq!(session.clones().len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_name_is_skipped_and_run_continues() {
        let session = Arc::new(FakeSession::new());
        session.add_object(InventoryObject::new(
            MoRef::new(InventoryKind::VirtualMachine, "vm-77"),
            "web-2",
        ));
        let (_tx, shutdown) = no_shutdown();

        let summary = run_plan(
            session.clone(),
            CloneContext { template: template(), snapshot: None },
            jobs(&["web-1", "web-2", "web-3"], &PlanDefaults::default()),
            config(2),
            shutdown,
        )
        .await;

        assert_eq!(summary, DispatchSummary { created: 2, skipped: 1, failed: 0 });
        let cloned: Vec<String> = session.clones().into_iter().map(|c| c.name).collect();
        assert_eq!(cloned.len(), 2);
        assert!(!cloned.contains(&"web-2".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_placement_target_fails_only_that_job() {
        let session = Arc::new(FakeSession::new());
        let defaults = PlanDefaults::default();
        let mut batch = jobs(&["web-1", "web-2"], &defaults);
        batch[0].datacenter = Some("No-Such-DC".to_string());
        let (_tx, shutdown) = no_shutdown();

        let summary = run_plan(
            session.clone(),
            CloneContext { template: template(), snapshot: None },
            batch,
            config(1),
            shutdown,
        )
        .await;

        assert_eq!(summary, DispatchSummary { created: 1, skipped: 0, failed: 1 });
        assert_eq!(session.clones().len(), 1);
        assert_eq!(session.clones()[0].name, "web-2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_placement_ids_reach_the_clone_spec() {
        let session = Arc::new(FakeSession::new());
        session.add_object(InventoryObject {
            moref: MoRef::new(InventoryKind::ResourcePool, "resgroup-8"),
            name: "Development".to_string(),
            path: Some("/NY/host/C1/Resources/Development".to_string()),
        });
        session.add_object(InventoryObject::new(
            MoRef::new(InventoryKind::Datastore, "datastore-3"),
            "VSAN-DS",
        ));
        let defaults = PlanDefaults {
            resource_pool: Some("Development".to_string()),
            datastore: Some("VSAN-DS".to_string()),
            ..PlanDefaults::default()
        };
        let (_tx, shutdown) = no_shutdown();

        let summary = run_plan(
            session.clone(),
            CloneContext { template: template(), snapshot: None },
            jobs(&["web-1"], &defaults),
            config(1),
            shutdown,
        )
        .await;

        assert_eq!(summary.created, 1);
        let spec = &session.clones()[0];
        assert_eq!(spec.placement.resource_pool.as_deref(), Some("resgroup-8"));
        assert_eq!(spec.placement.datastore.as_deref(), Some("datastore-3"));
        assert_eq!(spec.source, "vm-template");
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_extra_params_fail_the_job_after_clone() {
        let session = Arc::new(FakeSession::new());
        let defaults = PlanDefaults::default();
        let mut batch = jobs(&["web-1"], &defaults);
        batch[0].extra_params = Some("{'single': 'quotes'}".to_string());
        let (_tx, shutdown) = no_shutdown();

        let summary = run_plan(
            session.clone(),
            CloneContext { template: template(), snapshot: None },
            batch,
            config(1),
            shutdown,
        )
        .await;

        assert_eq!(summary, DispatchSummary { created: 0, skipped: 0, failed: 1 });
        assert_eq!(session.clones().len(), 1, "the clone itself was submitted");
        assert!(session.reconfigs().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_secondary_mutations_run_sequentially_then_power_on() {
        let session = Arc::new(FakeSession::new());
        let defaults = PlanDefaults {
            power_on: true,
            ..PlanDefaults::default()
        };
        let mut batch = jobs(&["web-1"], &defaults);
        batch[0].custom_mac = Some("00:50:56:11:11:11".to_string());
        batch[0].extra_params = Some(r#"{"guestinfo.role": "web", "guestinfo.tier": 2}"#.to_string());
        let (_tx, shutdown) = no_shutdown();

        let summary = run_plan(
            session.clone(),
            CloneContext { template: template(), snapshot: None },
            batch,
            config(1),
            shutdown,
        )
        .await;

        assert_eq!(summary.created, 1);
        let reconfigs = session.reconfigs();
        assert_eq!(reconfigs.len(), 2);
        assert_eq!(
            reconfigs[0].1,
            ReconfigSpec::MacAddress("00:50:56:11:11:11".to_string())
        );
        match &reconfigs[1].1 {
            ReconfigSpec::ExtraConfig(options) => {
                assert_eq!(options.get("guestinfo.role").map(String::as_str), Some("web"));
                // Non-string scalars keep their JSON rendering.
                assert_eq!(options.get("guestinfo.tier").map(String::as_str), Some("2"));
            }
            other => panic!("unexpected reconfigure {other:?}"),
        }
        assert_eq!(session.power_ons().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clone_fault_fails_the_job() {
        let session = Arc::new(FakeSession::new());
        session.set_clone_script(vec![TaskInfo::error(Some(
            "Insufficient capacity".to_string(),
        ))]);
        let (_tx, shutdown) = no_shutdown();

        let summary = run_plan(
            session.clone(),
            CloneContext { template: template(), snapshot: None },
            jobs(&["web-1"], &PlanDefaults::default()),
            config(1),
            shutdown,
        )
        .await;

        assert_eq!(summary, DispatchSummary { created: 0, skipped: 0, failed: 1 });
        assert!(session.power_ons().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconfigure_fault_abandons_the_job_before_power_on() {
        let session = Arc::new(FakeSession::new());
        session.set_reconfig_script(vec![TaskInfo::error(Some(
            "Invalid device configuration".to_string(),
        ))]);
        let defaults = PlanDefaults {
            power_on: true,
            ..PlanDefaults::default()
        };
        let mut batch = jobs(&["web-1"], &defaults);
        batch[0].custom_mac = Some("00:50:56:11:11:11".to_string());
        let (_tx, shutdown) = no_shutdown();

        let summary = run_plan(
            session.clone(),
            CloneContext { template: template(), snapshot: None },
            batch,
            config(1),
            shutdown,
        )
        .await;

        assert_eq!(summary, DispatchSummary { created: 0, skipped: 0, failed: 1 });
        assert!(session.power_ons().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_power_on_fault_fails_the_job_without_secondary_work() {
        let session = Arc::new(FakeSession::new());
        session.set_power_script(vec![TaskInfo::error(Some(
            "No host is compatible with the virtual machine".to_string(),
        ))]);
        let defaults = PlanDefaults {
            power_on: true,
            ..PlanDefaults::default()
        };
        let (_tx, shutdown) = no_shutdown();

        let mut cfg = config(1);
        cfg.print_ips = true;
        let summary = run_plan(
            session.clone(),
            CloneContext { template: template(), snapshot: None },
            jobs(&["web-1"], &defaults),
            cfg,
            shutdown,
        )
        .await;

        assert_eq!(summary, DispatchSummary { created: 0, skipped: 0, failed: 1 });
        assert_eq!(session.guest_network_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_secondary_without_power_on_is_a_conflict_not_a_failure() {
        let session = Arc::new(FakeSession::new());
        let defaults = PlanDefaults {
            post_script: Some(PathBuf::from("/usr/local/bin/register.sh")),
            power_on: false,
            ..PlanDefaults::default()
        };
        let (_tx, shutdown) = no_shutdown();

        let mut cfg = config(1);
        cfg.print_ips = true;
        let summary = run_plan(
            session.clone(),
            CloneContext { template: template(), snapshot: None },
            jobs(&["web-1"], &defaults),
            cfg,
            shutdown,
        )
        .await;

        // The job itself still counts as created; only the secondary
        // phase is skipped.
        assert_eq!(summary, DispatchSummary { created: 1, skipped: 0, failed: 0 });
        assert!(session.power_ons().is_empty());
        assert_eq!(session.guest_network_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_powered_on_job_reaches_address_discovery() {
        let session = Arc::new(FakeSession::new());
        let vm = MoRef::new(InventoryKind::VirtualMachine, "vm-cloned-0");
        session.set_guest_networks(
            &vm,
            vec![vec![GuestNic {
                mac_address: Some("00:50:56:aa:bb:cc".to_string()),
                ip_addresses: vec!["10.0.0.4".parse().unwrap()],
            }]],
        );
        let defaults = PlanDefaults {
            power_on: true,
            ..PlanDefaults::default()
        };
        let (_tx, shutdown) = no_shutdown();

        let mut cfg = config(1);
        cfg.print_ips = true;
        cfg.print_macs = true;
        let summary = run_plan(
            session.clone(),
            CloneContext { template: template(), snapshot: None },
            jobs(&["web-1"], &defaults),
            cfg,
            shutdown,
        )
        .await;

        assert_eq!(summary.created, 1);
        assert!(session.guest_network_calls() > 0, "secondary pool polled the guest");
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_before_start_submits_nothing() {
        let session = Arc::new(FakeSession::new());
        let (tx, shutdown) = no_shutdown();
        tx.send(true).unwrap();

        let summary = run_plan(
            session.clone(),
            CloneContext { template: template(), snapshot: None },
            jobs(&["web-1", "web-2"], &PlanDefaults::default()),
            config(2),
            shutdown,
        )
        .await;

        assert_eq!(summary, DispatchSummary::default());
        assert!(session.clones().is_empty());
    }
}
