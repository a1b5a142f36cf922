// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workload dispatch with a one-shot startup handshake.
//!
//! `submit_flow_run` spawns the infrastructure's `run` operation on the
//! agent's task tracker and blocks only until the workload reports that it is
//! observably running. The workload itself keeps executing in the background;
//! its terminal outcome is logged, never awaited by the caller.

use crate::infrastructure::{InfraError, Infrastructure, InfrastructureResult};
use prefect_core::{FlowRun, FlowRunId};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// One-shot signal an infrastructure fires once its workload is observably
/// running. The payload identifies where the workload runs.
pub struct TaskStatus {
    tx: oneshot::Sender<String>,
}

impl TaskStatus {
    pub fn channel() -> (Self, oneshot::Receiver<String>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Report startup. Consumes the handshake: it fires at most once.
    pub fn started(self, identifier: impl Into<String>) {
        // A dropped receiver means the dispatcher was cancelled; the workload
        // carries on regardless.
        let _ = self.tx.send(identifier.into());
    }
}

/// Errors from dispatching a workload.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Infrastructure(#[from] InfraError),
    #[error("workload task ended before reporting startup: {0}")]
    Aborted(String),
}

/// Dispatch a claimed flow run onto its infrastructure.
///
/// Returns the workload identifier once the startup handshake fires. If the
/// `run` operation fails before signaling, that failure is returned here so
/// the caller can report it against the flow run.
pub async fn submit_flow_run(
    tasks: &TaskTracker,
    flow_run: &FlowRun,
    infrastructure: Infrastructure,
) -> Result<String, SubmitError> {
    let infrastructure = infrastructure.prepared_for(flow_run);
    let kind = infrastructure.kind();
    let run_id = flow_run.id;

    let (task_status, started) = TaskStatus::channel();
    let handle = tasks.spawn(infrastructure.run(task_status));

    match started.await {
        Ok(identifier) => {
            tracing::info!(
                run = %run_id,
                infrastructure = kind,
                %identifier,
                "workload reported startup"
            );
            tasks.spawn(report_outcome(run_id, handle));
            Ok(identifier)
        }
        // The handshake sender was dropped: the run task finished (or died)
        // before the workload became observable.
        Err(_) => match handle.await {
            Ok(Ok(result)) => Ok(result.identifier),
            Ok(Err(error)) => Err(SubmitError::Infrastructure(error)),
            Err(join_error) => Err(SubmitError::Aborted(join_error.to_string())),
        },
    }
}

async fn report_outcome(
    run_id: FlowRunId,
    handle: JoinHandle<Result<InfrastructureResult, InfraError>>,
) {
    match handle.await {
        Ok(Ok(result)) if result.completed => {
            tracing::info!(run = %run_id, identifier = %result.identifier, "workload completed");
        }
        Ok(Ok(result)) => {
            tracing::warn!(
                run = %run_id,
                identifier = %result.identifier,
                "workload ended without observing completion"
            );
        }
        Ok(Err(error)) => {
            tracing::error!(run = %run_id, error = %error, "workload failed after startup");
        }
        Err(join_error) => {
            tracing::error!(run = %run_id, error = %join_error, "workload task aborted");
        }
    }
}

#[cfg(test)]
#[path = "submission_tests.rs"]
mod tests;
