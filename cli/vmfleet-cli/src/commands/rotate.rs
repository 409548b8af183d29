// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Rotate command: continuously migrate listed VMs across listed hosts

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;
use tokio::sync::watch;

use vcenter_api::{InventoryKind, InventoryObject};
use vcenter_client::VimSession;

use crate::plan;
use crate::rotation::{self, RotationConfig};

#[derive(Args, Clone)]
pub struct RotateArgs {
    /// File listing the VMs to migrate, one 'name' per row
    #[arg(long, short = 'V')]
    pub vm_file: PathBuf,

    /// File listing the destination hosts, one 'name' per row
    #[arg(long, short = 't')]
    pub target_file: PathBuf,

    /// Seconds to wait after a migration finishes before its slot is
    /// reused
    #[arg(long, short = 'i', default_value_t = 30)]
    pub interval: u64,

    /// Simultaneous migrations
    #[arg(long, short = 'T', default_value_t = 1)]
    pub threads: usize,

    /// Stop after migrating each VM once
    #[arg(long, short = '1')]
    pub one_run: bool,

    /// Seconds before an in-flight remote task is abandoned (0 = wait
    /// forever)
    #[arg(long, default_value_t = 3600)]
    pub task_timeout: u64,
}

pub async fn run(
    args: RotateArgs,
    session: Arc<dyn VimSession>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let vm_names = plan::names_from_list_file(&args.vm_file)?;
    let host_names = plan::names_from_list_file(&args.target_file)?;

    // Both lists are resolved once, up front; the rotation loop itself
    // never performs lookups.
    let vms = select_named(
        session.list_objects(InventoryKind::VirtualMachine).await?,
        &vm_names,
    );
    let hosts = select_named(
        session.list_objects(InventoryKind::HostSystem).await?,
        &host_names,
    );
    if vms.is_empty() {
        bail!("none of the listed VMs exist, nothing to migrate");
    }
    if hosts.is_empty() {
        bail!("none of the listed hosts exist, nowhere to migrate to");
    }

    let mut threads = args.threads.max(1);
    if vms.len() < threads {
        tracing::warn!(
            threads,
            vms = vms.len(),
            "thread count cannot exceed the VM count, reducing"
        );
        threads = vms.len();
    }
    tracing::info!(
        vms = vms.len(),
        hosts = hosts.len(),
        threads,
        one_run = args.one_run,
        "starting rotation"
    );

    let config = RotationConfig {
        concurrency: threads,
        settle: Duration::from_secs(args.interval),
        poll_delay: Duration::from_secs(1),
        poll_interval: Duration::from_secs(1),
        task_timeout: (args.task_timeout > 0).then(|| Duration::from_secs(args.task_timeout)),
        single_pass: args.one_run,
    };
    let summary = rotation::run(session, vms, hosts, config, shutdown).await;

    tracing::info!(
        migrated = summary.migrated,
        skipped = summary.skipped,
        failed = summary.failed,
        "finished all migrations"
    );
    println!(
        "Migrated {} VM(s), skipped {}, failed {}",
        summary.migrated, summary.skipped, summary.failed
    );
    Ok(())
}

/// Pick the listed names out of an inventory listing, preserving list
/// order. Matched entries are removed from the listing so later scans
/// shrink; unknown names are warned about and dropped.
fn select_named(mut listing: Vec<InventoryObject>, names: &[String]) -> Vec<InventoryObject> {
    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        match listing.iter().position(|object| object.name == *name) {
            Some(position) => selected.push(listing.remove(position)),
            None => {
                tracing::warn!(name = %name, "listed object does not exist, skipping");
            }
        }
    }
    selected
}
