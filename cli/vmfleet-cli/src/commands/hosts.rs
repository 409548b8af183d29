// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Hosts command: report managed-object details of hosts

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Args;
use serde::Serialize;

use vcenter_api::InventoryKind;
use vcenter_client::VimSession;

use crate::output;

#[derive(Args, Clone)]
pub struct HostsArgs {
    /// Host to report on; all hosts when omitted
    #[arg(long, short = 'H')]
    pub host: Option<String>,

    /// Print as JSON instead of a table
    #[arg(long, short = 'j')]
    pub json: bool,
}

#[derive(Serialize)]
struct HostRow {
    name: String,
    moref: String,
    hardware_uuid: Option<String>,
}

pub async fn run(args: HostsArgs, session: Arc<dyn VimSession>) -> Result<()> {
    let listing = session.list_objects(InventoryKind::HostSystem).await?;
    let selected: Vec<_> = match &args.host {
        Some(name) => {
            let found: Vec<_> = listing
                .into_iter()
                .filter(|object| object.name == *name)
                .take(1)
                .collect();
            if found.is_empty() {
                bail!("host not found: {name}");
            }
            found
        }
        None => listing,
    };

    let mut rows = Vec::with_capacity(selected.len());
    for object in selected {
        tracing::debug!(host = %object.name, "fetching host details");
        let summary = session.host_summary(&object.moref).await?;
        rows.push(HostRow {
            name: summary.name,
            moref: summary.moref.value,
            hardware_uuid: summary.hardware_uuid,
        });
    }

    if args.json {
        output::print_json(&rows)?;
    } else {
        let mut table = output::table(&["Name", "MOR value", "HW UUID"]);
        for row in &rows {
            table.add_row([
                row.name.as_str(),
                row.moref.as_str(),
                row.hardware_uuid.as_deref().unwrap_or("-"),
            ]);
        }
        output::print_table(table);
    }
    Ok(())
}
