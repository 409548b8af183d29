// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Batch plan construction
//!
//! Turns either a basename/count/amount triple or a batch file into an
//! ordered list of [`JobSpec`]s. Planning is purely local: no remote call
//! happens until a job is dispatched.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// The fully-specified intent for producing one VM. Built once by the
/// planner, consumed exactly once by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    /// Name of the VM to create; unique within a run
    pub name: String,
    /// Placement overrides; `None` inherits from the source template
    pub datacenter: Option<String>,
    pub cluster: Option<String>,
    pub resource_pool: Option<String>,
    pub folder: Option<String>,
    pub datastore: Option<String>,
    /// Fixed hardware address to set after cloning
    pub custom_mac: Option<String>,
    /// Post-processing script to run once the VM is up
    pub post_script: Option<PathBuf>,
    /// Advanced config options as a raw JSON object. Kept unparsed so a
    /// malformed value fails its own job at dispatch time, not the run.
    pub extra_params: Option<String>,
    /// Clone as a linked clone
    pub linked: bool,
    /// Power the VM on after cloning
    pub power_on: bool,
}

/// Run-level defaults a batch row falls back to for every blank field.
#[derive(Debug, Clone, Default)]
pub struct PlanDefaults {
    pub datacenter: Option<String>,
    pub cluster: Option<String>,
    pub resource_pool: Option<String>,
    pub folder: Option<String>,
    pub datastore: Option<String>,
    pub post_script: Option<PathBuf>,
    pub linked: bool,
    pub power_on: bool,
}

impl PlanDefaults {
    /// A job for `name` carrying every run-level default.
    pub fn job(&self, name: impl Into<String>) -> JobSpec {
        JobSpec {
            name: name.into(),
            datacenter: self.datacenter.clone(),
            cluster: self.cluster.clone(),
            resource_pool: self.resource_pool.clone(),
            folder: self.folder.clone(),
            datastore: self.datastore.clone(),
            custom_mac: None,
            post_script: self.post_script.clone(),
            extra_params: None,
            linked: self.linked,
            power_on: self.power_on,
        }
    }
}

/// Expand `basename`/`start_count`/`amount` into numbered names, sorted
/// lexicographically before assignment.
///
/// The sort is over the plain string names, so unpadded numeric suffixes
/// order textually: `vm-10` and `vm-11` sort before `vm-9`. Submission
/// order has followed that sort for as long as this tool has existed and
/// downstream tooling keys off it, so it stays.
pub fn sequential(basename: &str, start_count: u32, amount: u32, defaults: &PlanDefaults) -> Vec<JobSpec> {
    let mut names: Vec<String> = (0..amount)
        .map(|offset| format!("{}-{}", basename, start_count + offset))
        .collect();
    names.sort();
    names.into_iter().map(|name| defaults.job(name)).collect()
}

/// Batch-file column order. The set and order are a versioned contract
/// with existing batch files; blank ⇒ inherit the run default.
mod column {
    pub const NAME: usize = 0;
    pub const DATACENTER: usize = 1;
    pub const CLUSTER: usize = 2;
    pub const RESOURCE_POOL: usize = 3;
    pub const FOLDER: usize = 4;
    pub const DATASTORE: usize = 5;
    pub const MAC: usize = 6;
    pub const POST_SCRIPT: usize = 7;
    pub const EXTRA_PARAMS: usize = 8;
}

/// Parse a semicolon-delimited, double-quoted batch file into jobs.
///
/// A row without a name is skipped with a warning; a missing file is
/// fatal to the run.
pub fn from_batch_file(path: &Path, defaults: &PlanDefaults) -> Result<Vec<JobSpec>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .quote(b'"')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("batch file {} is not readable", path.display()))?;

    let mut jobs = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| {
            format!("batch file {} is malformed at row {}", path.display(), line + 1)
        })?;

        let field = |index: usize| {
            record
                .get(index)
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let Some(name) = field(column::NAME) else {
            tracing::warn!(row = line + 1, "batch row has no name, skipping");
            continue;
        };

        let mut job = defaults.job(name.to_string());
        if let Some(value) = field(column::DATACENTER) {
            job.datacenter = Some(value.to_string());
        }
        if let Some(value) = field(column::CLUSTER) {
            job.cluster = Some(value.to_string());
        }
        if let Some(value) = field(column::RESOURCE_POOL) {
            job.resource_pool = Some(value.to_string());
        }
        if let Some(value) = field(column::FOLDER) {
            job.folder = Some(value.to_string());
        }
        if let Some(value) = field(column::DATASTORE) {
            job.datastore = Some(value.to_string());
        }
        if let Some(value) = field(column::MAC) {
            job.custom_mac = Some(value.to_string());
        }
        if let Some(value) = field(column::POST_SCRIPT) {
            job.post_script = Some(PathBuf::from(value));
        }
        if let Some(value) = field(column::EXTRA_PARAMS) {
            job.extra_params = Some(value.to_string());
        }
        jobs.push(job);
    }
    Ok(jobs)
}

/// Read a one-name-per-row list file (semicolon-delimited, single-quoted),
/// as used by the rotation command's VM and target lists. Blank rows are
/// skipped with a warning.
pub fn names_from_list_file(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .quote(b'\'')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("list file {} is not readable", path.display()))?;

    let mut names = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| {
            format!("list file {} is malformed at row {}", path.display(), line + 1)
        })?;
        match record.get(0).map(str::trim).filter(|value| !value.is_empty()) {
            Some(name) => names.push(name.to_string()),
            None => tracing::warn!(row = line + 1, "list row has no name, skipping"),
        }
    }
    Ok(names)
}
