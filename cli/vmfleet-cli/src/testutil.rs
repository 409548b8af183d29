// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! In-memory session fake for orchestration tests
//!
//! Tasks are scripted as sequences of [`TaskInfo`] observations; each poll
//! consumes one and the final observation repeats, so a one-entry script
//! is a task that is already terminal on the first poll. Clone
//! submissions additionally track how many clones are unresolved at once,
//! which is how the bounded-concurrency property is sampled.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use vcenter_api::{
    CloneSpec, GuestNic, HostSummary, InventoryKind, InventoryObject, MoRef, PowerState,
    ReconfigSpec, SnapshotNode, TaskHandle, TaskInfo, TaskState,
};
use vcenter_client::{SessionError, VimSession};

#[derive(Default)]
struct State {
    objects: Vec<InventoryObject>,
    tasks: HashMap<String, VecDeque<TaskInfo>>,
    clone_task_ids: Vec<String>,
    clones: Vec<CloneSpec>,
    reconfigs: Vec<(MoRef, ReconfigSpec)>,
    power_ons: Vec<MoRef>,
    migrations: Vec<(MoRef, MoRef)>,
    power_states: HashMap<String, PowerState>,
    networks: HashMap<String, VecDeque<Vec<GuestNic>>>,
    snapshots: HashMap<String, Vec<SnapshotNode>>,
    hosts: HashMap<String, HostSummary>,
    clone_script: Option<Vec<TaskInfo>>,
    reconfig_script: Option<Vec<TaskInfo>>,
    power_script: Option<Vec<TaskInfo>>,
    migrate_script: Option<Vec<TaskInfo>>,
    clone_running_polls: usize,
}

pub(crate) struct FakeSession {
    state: Mutex<State>,
    task_counter: AtomicUsize,
    vm_counter: AtomicUsize,
    in_flight_clones: AtomicUsize,
    max_in_flight_clones: AtomicUsize,
    guest_network_calls: AtomicUsize,
}

impl FakeSession {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            task_counter: AtomicUsize::new(0),
            vm_counter: AtomicUsize::new(0),
            in_flight_clones: AtomicUsize::new(0),
            max_in_flight_clones: AtomicUsize::new(0),
            guest_network_calls: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub(crate) fn add_object(&self, object: InventoryObject) {
        self.lock().objects.push(object);
    }

    /// Register a task whose polls observe `states` in order, repeating
    /// the last entry.
    pub(crate) fn script_task(&self, states: Vec<TaskInfo>) -> TaskHandle {
        assert!(!states.is_empty(), "a task script needs at least one state");
        let id = format!("task-{}", self.task_counter.fetch_add(1, Ordering::SeqCst));
        self.lock().tasks.insert(id.clone(), states.into());
        TaskHandle(id)
    }

    /// Number of `Running` observations a submitted clone reports before
    /// succeeding (default 0: success on the first poll).
    pub(crate) fn set_clone_running_polls(&self, polls: usize) {
        self.lock().clone_running_polls = polls;
    }

    pub(crate) fn set_clone_script(&self, states: Vec<TaskInfo>) {
        self.lock().clone_script = Some(states);
    }

    pub(crate) fn set_reconfig_script(&self, states: Vec<TaskInfo>) {
        self.lock().reconfig_script = Some(states);
    }

    pub(crate) fn set_power_script(&self, states: Vec<TaskInfo>) {
        self.lock().power_script = Some(states);
    }

    pub(crate) fn set_migrate_script(&self, states: Vec<TaskInfo>) {
        self.lock().migrate_script = Some(states);
    }

    pub(crate) fn set_power_state(&self, vm: &MoRef, state: PowerState) {
        self.lock().power_states.insert(vm.value.clone(), state);
    }

    /// Script the per-poll guest network reports for a VM; the last entry
    /// repeats. A VM with no script reports no interfaces.
    pub(crate) fn set_guest_networks(&self, vm: &MoRef, polls: Vec<Vec<GuestNic>>) {
        self.lock().networks.insert(vm.value.clone(), polls.into());
    }

    pub(crate) fn set_snapshot_tree(&self, vm: &MoRef, roots: Vec<SnapshotNode>) {
        self.lock().snapshots.insert(vm.value.clone(), roots);
    }

    pub(crate) fn set_host_summary(&self, summary: HostSummary) {
        self.lock()
            .hosts
            .insert(summary.moref.value.clone(), summary);
    }

    pub(crate) fn clones(&self) -> Vec<CloneSpec> {
        self.lock().clones.clone()
    }

    pub(crate) fn reconfigs(&self) -> Vec<(MoRef, ReconfigSpec)> {
        self.lock().reconfigs.clone()
    }

    pub(crate) fn power_ons(&self) -> Vec<MoRef> {
        self.lock().power_ons.clone()
    }

    pub(crate) fn migrations(&self) -> Vec<(MoRef, MoRef)> {
        self.lock().migrations.clone()
    }

    /// High-water mark of clones submitted but not yet observed terminal.
    pub(crate) fn max_in_flight_clones(&self) -> usize {
        self.max_in_flight_clones.load(Ordering::SeqCst)
    }

    /// How many times guest networking was read, across all VMs.
    pub(crate) fn guest_network_calls(&self) -> usize {
        self.guest_network_calls.load(Ordering::SeqCst)
    }

    fn register_task(&self, state: &mut State, states: Vec<TaskInfo>) -> TaskHandle {
        let id = format!("task-{}", self.task_counter.fetch_add(1, Ordering::SeqCst));
        state.tasks.insert(id.clone(), states.into());
        TaskHandle(id)
    }
}

#[async_trait]
impl VimSession for FakeSession {
    async fn list_objects(
        &self,
        kind: InventoryKind,
    ) -> Result<Vec<InventoryObject>, SessionError> {
        Ok(self
            .lock()
            .objects
            .iter()
            .filter(|object| object.moref.kind == kind)
            .cloned()
            .collect())
    }

    async fn submit_clone(&self, spec: &CloneSpec) -> Result<TaskHandle, SessionError> {
        let in_flight = self.in_flight_clones.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight_clones.fetch_max(in_flight, Ordering::SeqCst);

        let mut state = self.lock();
        state.clones.push(spec.clone());
        let states = match &state.clone_script {
            Some(script) => script.clone(),
            None => {
                let vm_id = format!("vm-cloned-{}", self.vm_counter.fetch_add(1, Ordering::SeqCst));
                let mut states: Vec<TaskInfo> = (0..state.clone_running_polls)
                    .map(|_| TaskInfo::pending(TaskState::Running, None))
                    .collect();
                states.push(TaskInfo::success(Some(MoRef::new(
                    InventoryKind::VirtualMachine,
                    vm_id,
                ))));
                states
            }
        };
        let handle = self.register_task(&mut state, states);
        state.clone_task_ids.push(handle.0.clone());
        Ok(handle)
    }

    async fn submit_reconfigure(
        &self,
        vm: &MoRef,
        spec: &ReconfigSpec,
    ) -> Result<TaskHandle, SessionError> {
        let mut state = self.lock();
        state.reconfigs.push((vm.clone(), spec.clone()));
        let states = state
            .reconfig_script
            .clone()
            .unwrap_or_else(|| vec![TaskInfo::success(None)]);
        Ok(self.register_task(&mut state, states))
    }

    async fn submit_power_on(&self, vm: &MoRef) -> Result<TaskHandle, SessionError> {
        let mut state = self.lock();
        state.power_ons.push(vm.clone());
        let states = state
            .power_script
            .clone()
            .unwrap_or_else(|| vec![TaskInfo::success(None)]);
        Ok(self.register_task(&mut state, states))
    }

    async fn submit_migrate(&self, vm: &MoRef, host: &MoRef) -> Result<TaskHandle, SessionError> {
        let mut state = self.lock();
        state.migrations.push((vm.clone(), host.clone()));
        let states = state
            .migrate_script
            .clone()
            .unwrap_or_else(|| vec![TaskInfo::success(None)]);
        Ok(self.register_task(&mut state, states))
    }

    async fn poll_task(&self, task: &TaskHandle) -> Result<TaskInfo, SessionError> {
        let mut state = self.lock();
        let states = state
            .tasks
            .get_mut(&task.0)
            .unwrap_or_else(|| panic!("poll of unknown task {task}"));
        let info = if states.len() > 1 {
            states.pop_front().unwrap()
        } else {
            states.front().cloned().unwrap()
        };
        if info.state.is_terminal()
            && let Some(position) = state.clone_task_ids.iter().position(|id| *id == task.0)
        {
            state.clone_task_ids.swap_remove(position);
            self.in_flight_clones.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(info)
    }

    async fn guest_networks(&self, vm: &MoRef) -> Result<Vec<GuestNic>, SessionError> {
        self.guest_network_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        let Some(polls) = state.networks.get_mut(&vm.value) else {
            return Ok(Vec::new());
        };
        Ok(if polls.len() > 1 {
            polls.pop_front().unwrap()
        } else {
            polls.front().cloned().unwrap_or_default()
        })
    }

    async fn power_state(&self, vm: &MoRef) -> Result<PowerState, SessionError> {
        Ok(self
            .lock()
            .power_states
            .get(&vm.value)
            .copied()
            .unwrap_or(PowerState::PoweredOn))
    }

    async fn snapshot_tree(&self, vm: &MoRef) -> Result<Vec<SnapshotNode>, SessionError> {
        Ok(self.lock().snapshots.get(&vm.value).cloned().unwrap_or_default())
    }

    async fn host_summary(&self, host: &MoRef) -> Result<HostSummary, SessionError> {
        let state = self.lock();
        Ok(state
            .hosts
            .get(&host.value)
            .cloned()
            .unwrap_or_else(|| HostSummary {
                moref: host.clone(),
                name: host.value.clone(),
                hardware_uuid: None,
            }))
    }
}
