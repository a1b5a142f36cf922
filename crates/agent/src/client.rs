// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestration API surface consumed by the agent.
//!
//! Transport-agnostic: the agent depends only on these operations and on the
//! error distinctions below. `Abort` is part of the state-proposal protocol
//! (the server explicitly refusing a transition), not a transport failure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prefect_core::{
    BlockDocument, BlockDocumentId, Deployment, DeploymentId, FlowRun, FlowRunId, State,
    WorkQueue, WorkQueueId,
};
use thiserror::Error;

/// Errors surfaced by an orchestration client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The requested object does not exist server-side.
    #[error("object not found: {0}")]
    NotFound(String),
    /// The server refused a proposed state transition outright.
    #[error("server aborted the state transition: {0}")]
    Abort(String),
    /// Transport or protocol failure.
    #[error("request failed: {0}")]
    Request(String),
}

/// Client contract against the orchestration server.
#[async_trait]
pub trait OrchestrationApi: Send + Sync + 'static {
    async fn read_work_queue_by_name(&self, name: &str) -> Result<WorkQueue, ClientError>;

    async fn create_work_queue(&self, name: &str) -> Result<WorkQueue, ClientError>;

    /// Runs scheduled at or before `scheduled_before`, in server order.
    async fn get_runs_in_work_queue(
        &self,
        id: WorkQueueId,
        limit: usize,
        scheduled_before: DateTime<Utc>,
    ) -> Result<Vec<FlowRun>, ClientError>;

    async fn read_deployment(&self, id: DeploymentId) -> Result<Deployment, ClientError>;

    async fn read_block_document(&self, id: BlockDocumentId) -> Result<BlockDocument, ClientError>;

    /// Persist a block document (used for anonymous default-infrastructure
    /// blocks); returns the stored document with its server-assigned id.
    async fn create_block_document(
        &self,
        document: BlockDocument,
    ) -> Result<BlockDocument, ClientError>;

    /// Propose a state transition; returns the state the server settled on,
    /// which may differ from the proposal.
    async fn propose_state(
        &self,
        state: State,
        flow_run_id: FlowRunId,
    ) -> Result<State, ClientError>;
}
