// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Clone command: deploy a template into many VMs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Args, ValueEnum};
use tokio::sync::watch;

use vcenter_api::InventoryKind;
use vcenter_client::VimSession;

use crate::dispatch::{self, CloneContext, DispatchConfig};
use crate::plan::{self, PlanDefaults};
use crate::resolve::{PoolMatchPolicy, Resolver};

/// Resource-pool name matching, exposed as a CLI choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PoolMatch {
    /// Exact name equality
    Exact,
    /// Requested name is a substring of the pool's inventory path
    PathSubstring,
}

impl From<PoolMatch> for PoolMatchPolicy {
    fn from(choice: PoolMatch) -> Self {
        match choice {
            PoolMatch::Exact => PoolMatchPolicy::ExactName,
            PoolMatch::PathSubstring => PoolMatchPolicy::PathSubstring,
        }
    }
}

#[derive(Args, Clone)]
pub struct CloneArgs {
    /// Template or source VM to deploy from
    #[arg(long, short = 't')]
    pub template: String,

    /// Basename of the deployed VMs; names are <basename>-<count>
    #[arg(
        long,
        short = 'b',
        required_unless_present = "batch_file",
        conflicts_with = "batch_file"
    )]
    pub basename: Option<String>,

    /// Starting count; the first VM is <basename>-<count>
    #[arg(long, short = 'c', default_value_t = 1)]
    pub count: u32,

    /// Amount of VMs to deploy
    #[arg(long, short = 'n', default_value_t = 1)]
    pub amount: u32,

    /// Batch file with one clone per row, overriding basename/amount.
    /// Row format (blank fields inherit the flags below):
    /// "name";"datacenter";"cluster";"resource-pool";"folder";"datastore";"mac";"post-script";"extra-params-JSON"
    #[arg(long, short = 'C', verbatim_doc_comment)]
    pub batch_file: Option<PathBuf>,

    /// Datacenter the new VMs should reside in (default: same as template)
    #[arg(long)]
    pub datacenter: Option<String>,

    /// Cluster the new VMs should reside in (default: same as template)
    #[arg(long)]
    pub cluster: Option<String>,

    /// Resource pool the new VMs should reside in (default: same as template)
    #[arg(long)]
    pub resource_pool: Option<String>,

    /// Folder the new VMs should reside in (default: same as template)
    #[arg(long)]
    pub folder: Option<String>,

    /// Datastore the new VMs should reside in (default: same as template)
    #[arg(long)]
    pub datastore: Option<String>,

    /// Clone as linked clones off --snapshot
    #[arg(long, short = 'L', requires = "snapshot")]
    pub linked: bool,

    /// Snapshot linked clones are based on
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Do not power on the cloned VMs
    #[arg(long, short = 'P')]
    pub no_power_on: bool,

    /// Print each VM's discovered IP to stdout
    #[arg(long, short = 'i')]
    pub print_ips: bool,

    /// Print each VM's discovered hardware address to stdout
    #[arg(long, short = 'm')]
    pub print_macs: bool,

    /// Discover IPv6 addresses instead of IPv4
    #[arg(long, short = '6')]
    pub ipv6: bool,

    /// Script run for each VM once it is up: <name> [mac] [ip]
    #[arg(long)]
    pub post_script: Option<PathBuf>,

    /// Simultaneous clone jobs. The endpoint only runs a handful of
    /// deployment tasks at once and queues the rest, so large values
    /// mostly shift the queue client-side.
    #[arg(long, short = 'T', default_value_t = 1)]
    pub threads: usize,

    /// Simultaneous discovery/post-script units (default: --threads)
    #[arg(long)]
    pub secondary_threads: Option<usize>,

    /// Seconds to wait for guest address information
    #[arg(long, short = 'w', default_value_t = 120)]
    pub wait_max: u64,

    /// Resource-pool name matching policy
    #[arg(long, value_enum, default_value = "exact")]
    pub pool_match: PoolMatch,

    /// Seconds before an in-flight remote task is abandoned (0 = wait
    /// forever)
    #[arg(long, default_value_t = 3600)]
    pub task_timeout: u64,
}

pub async fn run(
    args: CloneArgs,
    session: Arc<dyn VimSession>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let pool_policy: PoolMatchPolicy = args.pool_match.into();
    let resolver = Resolver::new(Arc::clone(&session), pool_policy);

    let Some(template) = resolver
        .find(InventoryKind::VirtualMachine, &args.template)
        .await?
    else {
        bail!("template not found: {}", args.template);
    };
    tracing::info!(template = %template.name, "template found");

    let snapshot = if args.linked {
        let Some(name) = args.snapshot.as_deref() else {
            bail!("linked cloning requires --snapshot");
        };
        let mut matches = resolver.find_snapshots(&template.moref, name).await?;
        if matches.len() != 1 {
            bail!(
                "snapshot {} matched {} snapshots on {}, expected exactly one",
                name,
                matches.len(),
                template.name
            );
        }
        tracing::info!(snapshot = %name, "snapshot found");
        Some(matches.remove(0).id)
    } else {
        None
    };

    let defaults = PlanDefaults {
        datacenter: args.datacenter.clone(),
        cluster: args.cluster.clone(),
        resource_pool: args.resource_pool.clone(),
        folder: args.folder.clone(),
        datastore: args.datastore.clone(),
        post_script: args.post_script.clone(),
        linked: args.linked,
        power_on: !args.no_power_on,
    };
    let jobs = match &args.batch_file {
        Some(path) => plan::from_batch_file(path, &defaults)?,
        None => {
            let Some(basename) = args.basename.as_deref() else {
                bail!("either --basename or --batch-file is required");
            };
            plan::sequential(basename, args.count, args.amount, &defaults)
        }
    };
    if jobs.is_empty() {
        tracing::warn!("the plan contains no jobs, nothing to do");
        return Ok(());
    }
    tracing::info!(count = jobs.len(), threads = args.threads, "dispatching clone jobs");

    let config = DispatchConfig {
        concurrency: args.threads,
        secondary_concurrency: args.secondary_threads.unwrap_or(args.threads),
        poll_interval: Duration::from_secs(2),
        task_timeout: (args.task_timeout > 0).then(|| Duration::from_secs(args.task_timeout)),
        address_wait: Duration::from_secs(args.wait_max),
        ipv6: args.ipv6,
        print_ips: args.print_ips,
        print_macs: args.print_macs,
        pool_policy,
    };

    let summary =
        dispatch::run_plan(session, CloneContext { template, snapshot }, jobs, config, shutdown)
            .await;

    tracing::info!(
        created = summary.created,
        skipped = summary.skipped,
        failed = summary.failed,
        "finished all clone jobs"
    );
    println!(
        "Created {} VM(s), skipped {}, failed {}",
        summary.created, summary.skipped, summary.failed
    );
    Ok(())
}
