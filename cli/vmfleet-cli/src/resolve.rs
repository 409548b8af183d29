// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Name-based inventory resolution
//!
//! Every lookup lists the full container for its kind and scans it; there
//! is no cross-lookup cache, so results can never go stale mid-run (and a
//! run resolving one name many times pays for the re-listing, see
//! DESIGN.md).

use std::collections::VecDeque;
use std::sync::Arc;

use vcenter_api::{InventoryKind, InventoryObject, MoRef, SnapshotNode};
use vcenter_client::{SessionError, VimSession};

/// How resource-pool names are matched.
///
/// The two semantics are materially different and both are depended on by
/// existing automation, so the caller picks one per run instead of the
/// tool unifying them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolMatchPolicy {
    /// Exact, case-sensitive name equality (like every other kind).
    ExactName,
    /// The requested name is a substring of the pool's full inventory
    /// path, so `Development` matches `/DC/host/Cluster/Resources/Development`.
    PathSubstring,
}

/// Resolves names to inventory objects through a shared session.
pub struct Resolver {
    session: Arc<dyn VimSession>,
    pool_policy: PoolMatchPolicy,
}

impl Resolver {
    pub fn new(session: Arc<dyn VimSession>, pool_policy: PoolMatchPolicy) -> Self {
        Self {
            session,
            pool_policy,
        }
    }

    /// Find the object of `kind` matching `name`.
    ///
    /// Matching is exact, case-sensitive name equality, except resource
    /// pools under [`PoolMatchPolicy::PathSubstring`]. The first match in
    /// listing order wins; when the remote inventory holds duplicate
    /// names, which duplicate that is is undefined. `Ok(None)` is the
    /// not-found result; only transport/session failures are errors.
    pub async fn find(
        &self,
        kind: InventoryKind,
        name: &str,
    ) -> Result<Option<InventoryObject>, SessionError> {
        let objects = self.session.list_objects(kind).await?;
        let found = objects.into_iter().find(|object| {
            if kind == InventoryKind::ResourcePool
                && self.pool_policy == PoolMatchPolicy::PathSubstring
            {
                object.path.as_deref().is_some_and(|path| path.contains(name))
            } else {
                object.name == name
            }
        });
        if let Some(object) = &found {
            tracing::debug!(kind = %kind, name = %name, moref = %object.moref, "resolved");
        }
        Ok(found)
    }

    /// Find every snapshot named `name` in the VM's snapshot tree.
    ///
    /// The tree is walked iteratively so arbitrarily deep snapshot chains
    /// cannot exhaust the stack. Callers that need a unique snapshot (a
    /// linked-clone base) must check for exactly one match.
    pub async fn find_snapshots(
        &self,
        vm: &MoRef,
        name: &str,
    ) -> Result<Vec<SnapshotNode>, SessionError> {
        let roots = self.session.snapshot_tree(vm).await?;
        let mut queue: VecDeque<SnapshotNode> = roots.into();
        let mut matches = Vec::new();
        while let Some(node) = queue.pop_front() {
            queue.extend(node.children.iter().cloned());
            if node.name == name {
                matches.push(node);
            }
        }
        Ok(matches)
    }
}
