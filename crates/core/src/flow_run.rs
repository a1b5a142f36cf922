// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow run record as read from the orchestration API.

use crate::deployment::DeploymentId;
use crate::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_uuid_id! {
    /// Unique identifier for a single scheduled execution of a workflow.
    pub struct FlowRunId;
}

/// A single scheduled execution of a workflow.
///
/// Immutable from the agent's perspective: the only way the agent changes a
/// run is by proposing a state transition through the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRun {
    pub id: FlowRunId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<DeploymentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,
    /// When the server scheduled the run to start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_scheduled_start_time: Option<DateTime<Utc>>,
}
