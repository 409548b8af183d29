// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Asynchronous task types
//!
//! Every mutating call against the endpoint returns a [`TaskHandle`] that
//! must be polled until it reaches a terminal [`TaskState`].

use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::MoRef;

/// Opaque identifier of a remote asynchronous task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle(pub String);

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task lifecycle: `Queued → Running → {Success, Error}`, with `Running`
/// self-looping while the endpoint reports progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Queued,
    Running,
    Success,
    Error,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Success | TaskState::Error)
    }
}

/// One observation of a task's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    /// Current state
    pub state: TaskState,
    /// Completion percentage while running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Reference to the produced object, set on `Success` for operations
    /// that create or return one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<MoRef>,
    /// Fault description, set on `Error` when the task failed. An `Error`
    /// state with no fault means the task was canceled externally rather
    /// than failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
}

impl TaskInfo {
    /// A task observation in a non-terminal state.
    pub fn pending(state: TaskState, progress: Option<u8>) -> Self {
        Self {
            state,
            progress,
            result: None,
            fault: None,
        }
    }

    /// A successful terminal observation.
    pub fn success(result: Option<MoRef>) -> Self {
        Self {
            state: TaskState::Success,
            progress: None,
            result,
            fault: None,
        }
    }

    /// A failed terminal observation; `fault = None` means canceled.
    pub fn error(fault: Option<String>) -> Self {
        Self {
            state: TaskState::Error,
            progress: None,
            result: None,
            fault,
        }
    }
}
