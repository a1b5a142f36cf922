// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording fake of the orchestration API.
//!
//! Backed by shared state so a clone handed to an [`crate::Agent`] can still
//! be scripted and inspected from the test. Proposals can be held open with
//! [`FakeApi::hold_proposals`] to keep coordinators in flight across ticks.

use crate::client::{ClientError, OrchestrationApi};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use prefect_core::{
    BlockDocument, BlockDocumentId, Deployment, DeploymentId, FlowRun, FlowRunId, State,
    StateType, WorkQueue, WorkQueueId,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;

/// One recorded client call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    ReadWorkQueueByName(String),
    CreateWorkQueue(String),
    GetRunsInWorkQueue {
        id: WorkQueueId,
        scheduled_before: DateTime<Utc>,
    },
    ReadDeployment(DeploymentId),
    ReadBlockDocument(BlockDocumentId),
    CreateBlockDocument,
    ProposeState {
        flow_run_id: FlowRunId,
        state_type: StateType,
    },
}

/// Scripted response to a state proposal.
#[derive(Debug, Clone)]
pub enum ProposeOutcome {
    /// Accept the proposal, echoing the proposed state back.
    Accept,
    /// Another orchestration decision: return this state instead.
    Return(StateType),
    /// Explicit abort signal.
    Abort(String),
    /// Transport failure.
    Error(String),
}

#[derive(Default)]
struct FakeState {
    queues: HashMap<String, WorkQueue>,
    runs: HashMap<WorkQueueId, Vec<FlowRun>>,
    unreachable_run_queues: HashSet<WorkQueueId>,
    deployments: HashMap<DeploymentId, Deployment>,
    documents: HashMap<BlockDocumentId, BlockDocument>,
    propose_outcomes: HashMap<FlowRunId, ProposeOutcome>,
    proposed: Vec<(FlowRunId, State)>,
    calls: Vec<ApiCall>,
    fail_queue_creation: bool,
}

/// In-memory orchestration API with call recording.
#[derive(Clone)]
pub struct FakeApi {
    state: Arc<Mutex<FakeState>>,
    hold: Arc<watch::Sender<bool>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeApi {
    pub fn new() -> Self {
        let (hold, _) = watch::channel(false);
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            hold: Arc::new(hold),
        }
    }

    /// Register a work queue and return it.
    pub fn with_queue(&self, name: &str) -> WorkQueue {
        let queue = WorkQueue {
            id: WorkQueueId::new(),
            name: name.to_string(),
            is_paused: false,
        };
        self.state.lock().queues.insert(name.to_string(), queue.clone());
        queue
    }

    pub fn pause_queue(&self, name: &str) {
        if let Some(queue) = self.state.lock().queues.get_mut(name) {
            queue.is_paused = true;
        }
    }

    /// Script the runs a queue returns on every poll.
    pub fn set_runs(&self, queue: WorkQueueId, runs: Vec<FlowRun>) {
        self.state.lock().runs.insert(queue, runs);
    }

    /// Make run queries against this queue fail with not-found.
    pub fn fail_runs_for(&self, queue: WorkQueueId) {
        self.state.lock().unreachable_run_queues.insert(queue);
    }

    pub fn insert_deployment(&self, deployment: Deployment) {
        self.state.lock().deployments.insert(deployment.id, deployment);
    }

    pub fn insert_document(&self, document: BlockDocument) {
        self.state.lock().documents.insert(document.id, document);
    }

    /// Make queue creation fail, as when another agent wins the race.
    pub fn fail_queue_creation(&self) {
        self.state.lock().fail_queue_creation = true;
    }

    pub fn script_propose(&self, flow_run_id: FlowRunId, outcome: ProposeOutcome) {
        self.state.lock().propose_outcomes.insert(flow_run_id, outcome);
    }

    /// Park every state proposal until [`Self::release_proposals`].
    pub fn hold_proposals(&self) {
        let _ = self.hold.send(true);
    }

    pub fn release_proposals(&self) {
        let _ = self.hold.send(false);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().calls.clone()
    }

    /// States that reached the server, in order.
    pub fn proposed(&self) -> Vec<(FlowRunId, State)> {
        self.state.lock().proposed.clone()
    }

    fn record(&self, call: ApiCall) {
        self.state.lock().calls.push(call);
    }
}

#[async_trait]
impl OrchestrationApi for FakeApi {
    async fn read_work_queue_by_name(&self, name: &str) -> Result<WorkQueue, ClientError> {
        self.record(ApiCall::ReadWorkQueueByName(name.to_string()));
        self.state
            .lock()
            .queues
            .get(name)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("work queue '{name}'")))
    }

    async fn create_work_queue(&self, name: &str) -> Result<WorkQueue, ClientError> {
        self.record(ApiCall::CreateWorkQueue(name.to_string()));
        let mut state = self.state.lock();
        if state.fail_queue_creation {
            return Err(ClientError::Request(format!(
                "work queue '{name}' already exists"
            )));
        }
        let queue = WorkQueue {
            id: WorkQueueId::new(),
            name: name.to_string(),
            is_paused: false,
        };
        state.queues.insert(name.to_string(), queue.clone());
        Ok(queue)
    }

    async fn get_runs_in_work_queue(
        &self,
        id: WorkQueueId,
        limit: usize,
        scheduled_before: DateTime<Utc>,
    ) -> Result<Vec<FlowRun>, ClientError> {
        self.record(ApiCall::GetRunsInWorkQueue {
            id,
            scheduled_before,
        });
        let state = self.state.lock();
        if state.unreachable_run_queues.contains(&id) {
            return Err(ClientError::NotFound(format!("work queue {id}")));
        }
        let runs = state.runs.get(&id).cloned().unwrap_or_default();
        Ok(runs.into_iter().take(limit).collect())
    }

    async fn read_deployment(&self, id: DeploymentId) -> Result<Deployment, ClientError> {
        self.record(ApiCall::ReadDeployment(id));
        self.state
            .lock()
            .deployments
            .get(&id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("deployment {id}")))
    }

    async fn read_block_document(
        &self,
        id: BlockDocumentId,
    ) -> Result<BlockDocument, ClientError> {
        self.record(ApiCall::ReadBlockDocument(id));
        self.state
            .lock()
            .documents
            .get(&id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("block document {id}")))
    }

    async fn create_block_document(
        &self,
        document: BlockDocument,
    ) -> Result<BlockDocument, ClientError> {
        self.record(ApiCall::CreateBlockDocument);
        self.state.lock().documents.insert(document.id, document.clone());
        Ok(document)
    }

    async fn propose_state(
        &self,
        state: State,
        flow_run_id: FlowRunId,
    ) -> Result<State, ClientError> {
        self.record(ApiCall::ProposeState {
            flow_run_id,
            state_type: state.state_type,
        });

        let mut held = self.hold.subscribe();
        while *held.borrow() {
            if held.changed().await.is_err() {
                break;
            }
        }

        let outcome = {
            let mut guard = self.state.lock();
            guard.proposed.push((flow_run_id, state.clone()));
            guard
                .propose_outcomes
                .get(&flow_run_id)
                .cloned()
                .unwrap_or(ProposeOutcome::Accept)
        };
        match outcome {
            ProposeOutcome::Accept => Ok(state),
            ProposeOutcome::Return(state_type) => Ok(State::new(state_type)),
            ProposeOutcome::Abort(reason) => Err(ClientError::Abort(reason)),
            ProposeOutcome::Error(message) => Err(ClientError::Request(message)),
        }
    }
}
