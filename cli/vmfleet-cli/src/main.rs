// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! vmfleet - bulk clone and continuous-migration driver for vCenter

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use tokio::sync::watch;

use vcenter_client::{ConnectConfig, RestSession, VimSession};

mod commands;
mod dispatch;
mod netinfo;
mod output;
mod plan;
mod postscript;
mod resolve;
mod rotation;
mod task;
#[cfg(test)]
mod testutil;

#[derive(Parser)]
#[command(
    name = "vmfleet",
    version,
    about = "Bulk clone and continuous-migration driver for vCenter",
    long_about = "Deploys a template into many VMs, continuously migrates a set of VMs \
                  across a set of hosts, and reports host and guest-address inventory. \
                  Every mutation is a remote task polled to completion under a bounded \
                  worker budget."
)]
struct Cli {
    /// vCenter or ESXi endpoint to connect to
    #[arg(long, global = true, env = "VMFLEET_SERVER")]
    server: Option<String>,

    /// Endpoint HTTPS port
    #[arg(long, global = true, default_value_t = 443)]
    port: u16,

    /// Login user
    #[arg(long, short = 'u', global = true, env = "VMFLEET_USER")]
    username: Option<String>,

    /// Login password; prompted when absent
    #[arg(long, global = true, env = "VMFLEET_PASSWORD")]
    password: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,

    /// File to log to instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Log informational output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Log debug output
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a template into multiple VMs
    Clone(commands::clone::CloneArgs),

    /// Migrate listed VMs to random listed hosts, until stopped
    Rotate(commands::rotate::RotateArgs),

    /// Report managed-object details of hosts
    Hosts(commands::hosts::HostsArgs),

    /// Report guest IP addresses of VMs
    Ips(commands::ips::IpsArgs),
}

impl Cli {
    fn init_logging(&self) -> Result<()> {
        let default_filter = if self.debug {
            "vmfleet=debug,vcenter_client=debug"
        } else if self.verbose {
            "vmfleet=info,vcenter_client=info"
        } else {
            "vmfleet=warn,vcenter_client=warn"
        };
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

        match &self.log_file {
            Some(path) => {
                let file = std::fs::File::create(path)
                    .with_context(|| format!("cannot open log file {}", path.display()))?;
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file))
                    .init();
            }
            None => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
        }
        Ok(())
    }

    /// Establish the one session every worker in the run shares.
    async fn connect(&self) -> Result<Arc<dyn VimSession>> {
        let server = self.server.clone().ok_or_else(|| {
            anyhow!("no endpoint configured; pass --server or set VMFLEET_SERVER")
        })?;
        let username = self.username.clone().ok_or_else(|| {
            anyhow!("no user configured; pass --username or set VMFLEET_USER")
        })?;
        let password = match &self.password {
            Some(password) => password.clone(),
            None => rpassword::prompt_password(format!(
                "Enter password for {username}@{server}: "
            ))?,
        };

        tracing::info!(server = %server, port = self.port, username = %username, "connecting");
        let session = RestSession::connect(&ConnectConfig {
            server,
            port: self.port,
            username,
            password,
            insecure: self.insecure,
            timeout: Duration::from_secs(30),
        })
        .await
        .context("could not establish a session")?;

        Ok(Arc::new(session))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging()?;

    // An interrupt stops the submission of new work; everything already
    // in flight runs to its terminal state before the process exits.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, finishing in-flight work");
            let _ = shutdown_tx.send(true);
        }
    });

    match &cli.command {
        Commands::Clone(args) => {
            let session = cli.connect().await?;
            commands::clone::run(args.clone(), session, shutdown_rx).await
        }
        Commands::Rotate(args) => {
            let session = cli.connect().await?;
            commands::rotate::run(args.clone(), session, shutdown_rx).await
        }
        Commands::Hosts(args) => {
            let session = cli.connect().await?;
            commands::hosts::run(args.clone(), session).await
        }
        Commands::Ips(args) => {
            let session = cli.connect().await?;
            commands::ips::run(args.clone(), session).await
        }
    }
}
