// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow run states, as proposed to and returned by the orchestration API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical state kinds recognized by the orchestration API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateType {
    Scheduled,
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Crashed,
}

crate::simple_display! {
    StateType {
        Scheduled => "SCHEDULED",
        Pending => "PENDING",
        Running => "RUNNING",
        Completed => "COMPLETED",
        Failed => "FAILED",
        Cancelled => "CANCELLED",
        Crashed => "CRASHED",
    }
}

/// A state attached to (or proposed for) a flow run.
///
/// The `data` payload is opaque to the agent: it is carried to the server
/// verbatim (e.g. a serialized submission failure) and never inspected here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(rename = "type")]
    pub state_type: StateType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl State {
    pub fn new(state_type: StateType) -> Self {
        Self {
            state_type,
            name: None,
            message: None,
            data: None,
            timestamp: Utc::now(),
        }
    }

    /// The state an agent proposes to claim a run.
    pub fn pending() -> Self {
        Self::new(StateType::Pending)
    }

    pub fn scheduled() -> Self {
        Self::new(StateType::Scheduled)
    }

    pub fn running() -> Self {
        Self::new(StateType::Running)
    }

    /// A terminal failure with a human-readable message and an opaque payload.
    pub fn failed(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            message: Some(message.into()),
            data,
            ..Self::new(StateType::Failed)
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state_type == StateType::Pending
    }

    pub fn is_scheduled(&self) -> bool {
        self.state_type == StateType::Scheduled
    }

    /// Terminal states: no further transition will be proposed by anyone.
    pub fn is_final(&self) -> bool {
        matches!(
            self.state_type,
            StateType::Completed | StateType::Failed | StateType::Cancelled | StateType::Crashed
        )
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
