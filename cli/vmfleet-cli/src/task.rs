// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Remote task driving
//!
//! [`TaskWatcher`] polls a submitted task at a fixed interval until it
//! reaches a terminal state, regardless of which operation produced the
//! handle; callers interpret the success payload. The optional overall
//! timeout bounds a stuck remote task: without it, one wedged task holds
//! its worker slot forever.

use std::time::Duration;

use tokio::time::{Instant, sleep};

use vcenter_api::{MoRef, TaskHandle, TaskState};
use vcenter_client::{SessionError, VimSession};

/// Terminal outcome of driving one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The task succeeded; the produced object reference, if the
    /// operation yields one.
    Completed(Option<MoRef>),
    /// The task failed with the endpoint's fault message.
    Failed(String),
    /// The task ended in error without a fault: canceled externally.
    Canceled,
    /// The watcher's own deadline elapsed; the remote task may still be
    /// running.
    TimedOut,
}

/// Fixed-interval poller for remote tasks.
#[derive(Debug, Clone, Copy)]
pub struct TaskWatcher {
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl TaskWatcher {
    pub fn new(poll_interval: Duration, timeout: Option<Duration>) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    /// Drive `task` to a terminal state, logging progress under the
    /// `vm`/`op` context. Transport failures while polling propagate
    /// unmodified.
    pub async fn drive(
        &self,
        session: &dyn VimSession,
        vm: &str,
        op: &str,
        task: &TaskHandle,
    ) -> Result<TaskOutcome, SessionError> {
        let started = Instant::now();
        loop {
            let info = session.poll_task(task).await?;
            match info.state {
                TaskState::Queued => {
                    tracing::debug!(vm = %vm, op = %op, task = %task, "task is queued");
                }
                TaskState::Running => match info.progress {
                    Some(percent) => {
                        tracing::debug!(vm = %vm, op = %op, percent, "task is running");
                    }
                    None => tracing::debug!(vm = %vm, op = %op, "task is running"),
                },
                TaskState::Success => return Ok(TaskOutcome::Completed(info.result)),
                TaskState::Error => {
                    return Ok(match info.fault {
                        Some(fault) => TaskOutcome::Failed(fault),
                        None => TaskOutcome::Canceled,
                    });
                }
            }

            if let Some(timeout) = self.timeout
                && started.elapsed() + self.poll_interval > timeout
            {
                tracing::error!(
                    vm = %vm,
                    op = %op,
                    task = %task,
                    timeout_secs = timeout.as_secs(),
                    "task did not reach a terminal state in time"
                );
                return Ok(TaskOutcome::TimedOut);
            }
            sleep(self.poll_interval).await;
        }
    }
}
