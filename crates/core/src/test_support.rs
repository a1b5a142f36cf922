// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders for server-side records.
//!
//! Compiled for this crate's tests and, via the `test-support` feature, for
//! dependent crates' tests.

use crate::block::BlockDocumentId;
use crate::deployment::{Deployment, DeploymentId};
use crate::flow_run::{FlowRun, FlowRunId};
use crate::state::State;
use crate::work_queue::{WorkQueue, WorkQueueId};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

crate::builder! {
    pub struct FlowRunBuilder => FlowRun {
        into { name: String = "test-run" }
        option {
            deployment_id: DeploymentId = None,
            state: State = None,
            expected_start_time: DateTime<Utc> = None,
            next_scheduled_start_time: DateTime<Utc> = None,
        }
        computed { id: FlowRunId = FlowRunId::new() }
    }
}

crate::builder! {
    pub struct DeploymentBuilder => Deployment {
        into { name: String = "test-deployment" }
        set { infra_overrides: IndexMap<String, serde_json::Value> = IndexMap::new() }
        option { infrastructure_document_id: BlockDocumentId = None }
        computed { id: DeploymentId = DeploymentId::new() }
    }
}

crate::builder! {
    pub struct WorkQueueBuilder => WorkQueue {
        into { name: String = "default" }
        set { is_paused: bool = false }
        computed { id: WorkQueueId = WorkQueueId::new() }
    }
}

/// A run in the shape the server hands to agents: scheduled, with a
/// deployment attached.
pub fn scheduled_run(deployment_id: DeploymentId) -> FlowRun {
    FlowRun::builder()
        .deployment_id(deployment_id)
        .state(State::scheduled())
        .build()
}
