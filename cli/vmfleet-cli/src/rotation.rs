// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Continuous redistribution scheduler
//!
//! Cycles through a fixed list of VMs, pairing each in turn with a
//! uniformly random destination host and submitting the migration to a
//! bounded pool. The index wraps forever unless single-pass mode stops
//! the run after every VM has been paired exactly once. An interrupt
//! stops pairing; in-flight migrations finish.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::IndexedRandom;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::sleep;

use vcenter_api::{InventoryObject, PowerState};
use vcenter_client::VimSession;

use crate::task::{TaskOutcome, TaskWatcher};

/// Run-level knobs for one rotation run.
#[derive(Debug, Clone, Copy)]
pub struct RotationConfig {
    /// Migrations in flight at once
    pub concurrency: usize,
    /// Pause after each migration before its slot is reused
    pub settle: Duration,
    /// Wait between scheduling attempts while the pool is full
    pub poll_delay: Duration,
    /// Task poll cadence
    pub poll_interval: Duration,
    /// Overall bound per remote task; `None` polls forever
    pub task_timeout: Option<Duration>,
    /// Stop after pairing every VM once
    pub single_pass: bool,
}

/// Tally of terminal migration outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationSummary {
    pub migrated: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MigrationOutcome {
    Migrated,
    Skipped,
    Failed,
}

/// Drive the rotation until single-pass completion or interrupt, then
/// wait out every in-flight migration.
pub async fn run(
    session: Arc<dyn VimSession>,
    vms: Vec<InventoryObject>,
    hosts: Vec<InventoryObject>,
    config: RotationConfig,
    shutdown: watch::Receiver<bool>,
) -> RotationSummary {
    let mut summary = RotationSummary::default();
    if vms.is_empty() {
        tracing::warn!("VM list is empty, nothing to rotate");
        return summary;
    }

    let watcher = TaskWatcher::new(config.poll_interval, config.task_timeout);
    let limit = config.concurrency.max(1);
    let mut workers: JoinSet<MigrationOutcome> = JoinSet::new();
    let mut index = 0;

    loop {
        if *shutdown.borrow() {
            tracing::info!("interrupt received, scheduling no further migrations");
            break;
        }

        // Purge whatever has finished since the last pass.
        while let Some(result) = workers.try_join_next() {
            tally(&mut summary, result);
        }

        // Saturated: retry without advancing the index.
        if workers.len() >= limit {
            tracing::debug!("all migration slots busy, waiting to schedule");
            sleep(config.poll_delay).await;
            continue;
        }

        let vm = vms[index].clone();
        let Some(host) = hosts.choose(&mut rand::rng()).cloned() else {
            tracing::error!("destination list is empty, stopping");
            break;
        };
        tracing::info!(vm = %vm.name, host = %host.name, "creating migration");
        let session = Arc::clone(&session);
        let settle = config.settle;
        workers.spawn(async move { migrate_one(session, watcher, vm, host, settle).await });

        index += 1;
        if index >= vms.len() {
            if config.single_pass {
                tracing::debug!("single pass complete, waiting for in-flight migrations");
                break;
            }
            tracing::debug!("looping back to the first VM");
            index = 0;
        }
    }

    while let Some(result) = workers.join_next().await {
        tally(&mut summary, result);
    }
    summary
}

fn tally(
    summary: &mut RotationSummary,
    result: Result<MigrationOutcome, tokio::task::JoinError>,
) {
    match result {
        Ok(MigrationOutcome::Migrated) => summary.migrated += 1,
        Ok(MigrationOutcome::Skipped) => summary.skipped += 1,
        Ok(MigrationOutcome::Failed) => summary.failed += 1,
        Err(error) => {
            tracing::error!(error = %error, "migration worker panicked");
            summary.failed += 1;
        }
    }
}

async fn migrate_one(
    session: Arc<dyn VimSession>,
    watcher: TaskWatcher,
    vm: InventoryObject,
    host: InventoryObject,
    settle: Duration,
) -> MigrationOutcome {
    match session.power_state(&vm.moref).await {
        Ok(PowerState::PoweredOn) => {}
        Ok(_) => {
            tracing::warn!(
                vm = %vm.name,
                "not powered on, relocation requires a running VM"
            );
            return MigrationOutcome::Skipped;
        }
        Err(error) => {
            tracing::error!(vm = %vm.name, error = %error, "power state check failed");
            return MigrationOutcome::Failed;
        }
    }

    let outcome = match session.submit_migrate(&vm.moref, &host.moref).await {
        Err(error) => {
            tracing::error!(vm = %vm.name, host = %host.name, error = %error, "relocation submission failed");
            MigrationOutcome::Failed
        }
        Ok(handle) => {
            match watcher.drive(session.as_ref(), &vm.name, "relocate", &handle).await {
                Ok(TaskOutcome::Completed(_)) => {
                    tracing::debug!(vm = %vm.name, host = %host.name, "migration finished");
                    MigrationOutcome::Migrated
                }
                Ok(TaskOutcome::Failed(fault)) => {
                    tracing::error!(vm = %vm.name, fault = %fault, "migration failed");
                    MigrationOutcome::Failed
                }
                Ok(TaskOutcome::Canceled) => {
                    tracing::error!(vm = %vm.name, "migration was canceled");
                    MigrationOutcome::Failed
                }
                Ok(TaskOutcome::TimedOut) => MigrationOutcome::Failed,
                Err(error) => {
                    tracing::error!(vm = %vm.name, error = %error, "migration polling failed");
                    MigrationOutcome::Failed
                }
            }
        }
    };

    // Hold the slot through the settle interval so the scheduler cannot
    // immediately re-pick this VM while the cluster is still absorbing
    // the move.
    sleep(settle).await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeSession;
    use std::collections::HashMap;
    use vcenter_api::{InventoryKind, MoRef};

    fn vm(id: &str, name: &str) -> InventoryObject {
        InventoryObject::new(MoRef::new(InventoryKind::VirtualMachine, id), name)
    }

    fn host(id: &str, name: &str) -> InventoryObject {
        InventoryObject::new(MoRef::new(InventoryKind::HostSystem, id), name)
    }

    fn config(single_pass: bool) -> RotationConfig {
        RotationConfig {
            concurrency: 2,
            settle: Duration::from_secs(30),
            poll_delay: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
            task_timeout: None,
            single_pass,
        }
    }

    fn fleet() -> (Vec<InventoryObject>, Vec<InventoryObject>) {
        (
            vec![
                vm("vm-1", "app-1"),
                vm("vm-2", "app-2"),
                vm("vm-3", "app-3"),
                vm("vm-4", "app-4"),
            ],
            vec![host("host-1", "esx-1"), host("host-2", "esx-2")],
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_pass_migrates_each_vm_exactly_once() {
        let session = Arc::new(FakeSession::new());
        let (vms, hosts) = fleet();
        let (_tx, shutdown) = watch::channel(false);

        let summary = run(session.clone(), vms, hosts, config(true), shutdown).await;

        assert_eq!(summary, RotationSummary { migrated: 4, skipped: 0, failed: 0 });
        let migrations = session.migrations();
        assert_eq!(migrations.len(), 4);

        let mut per_source: HashMap<String, usize> = HashMap::new();
        for (source, destination) in &migrations {
            *per_source.entry(source.value.clone()).or_default() += 1;
            assert!(matches!(destination.value.as_str(), "host-1" | "host-2"));
        }
        assert_eq!(per_source.len(), 4, "every VM appears as a source");
        assert!(per_source.values().all(|&count| count == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_powered_off_vm_is_skipped() {
        let session = Arc::new(FakeSession::new());
        let (vms, hosts) = fleet();
        session.set_power_state(&vms[2].moref, PowerState::PoweredOff);
        let (_tx, shutdown) = watch::channel(false);

        let summary = run(session.clone(), vms, hosts, config(true), shutdown).await;

        assert_eq!(summary, RotationSummary { migrated: 3, skipped: 1, failed: 0 });
        assert_eq!(session.migrations().len(), 3);
        assert!(
            session
                .migrations()
                .iter()
                .all(|(source, _)| source.value != "vm-3")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_migration_fault_is_counted_and_does_not_stop_the_pass() {
        let session = Arc::new(FakeSession::new());
        session.set_migrate_script(vec![vcenter_api::TaskInfo::error(Some(
            "The operation is not allowed in the current state".to_string(),
        ))]);
        let (vms, hosts) = fleet();
        let (_tx, shutdown) = watch::channel(false);

        let summary = run(session.clone(), vms, hosts, config(true), shutdown).await;

        assert_eq!(summary, RotationSummary { migrated: 0, skipped: 0, failed: 4 });
        assert_eq!(session.migrations().len(), 4, "every pairing was still submitted");
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_mode_wraps_until_interrupted() {
        let session = Arc::new(FakeSession::new());
        let (vms, hosts) = fleet();
        let (tx, shutdown) = watch::channel(false);

        let runner = tokio::spawn(run(session.clone(), vms, hosts, config(false), shutdown));
        tokio::time::sleep(Duration::from_secs(300)).await;
        tx.send(true).unwrap();
        let summary = runner.await.unwrap();

        let total = summary.migrated + summary.skipped + summary.failed;
        assert!(total > 4, "the index wrapped past the end of the list");
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_before_start_schedules_nothing() {
        let session = Arc::new(FakeSession::new());
        let (vms, hosts) = fleet();
        let (tx, shutdown) = watch::channel(false);
        tx.send(true).unwrap();

        let summary = run(session.clone(), vms, hosts, config(false), shutdown).await;

        assert_eq!(summary, RotationSummary::default());
        assert!(session.migrations().is_empty());
    }
}
