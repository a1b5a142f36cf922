// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tagged infrastructure variant and its block-document codec.

use crate::kubernetes::manifest::BuildJobError;
use crate::kubernetes::KubernetesJob;
use crate::process::Process;
use crate::submission::TaskStatus;
use prefect_core::{BlockDocument, FlowRun};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable handed to process workloads so the executing flow
/// can find its run.
pub const FLOW_RUN_ID_ENV: &str = "PREFECT__FLOW_RUN_ID";

/// Label stamped on Kubernetes workloads with the flow run id.
pub const FLOW_RUN_ID_LABEL: &str = "prefect.io/flow-run-id";

/// A block document whose `data` does not decode into a known infrastructure.
#[derive(Debug, Error)]
#[error("block document does not describe a known infrastructure: {0}")]
pub struct BlockDecodeError(#[from] serde_json::Error);

/// Errors raised while starting or watching a workload.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("process infrastructure requires a non-empty command")]
    MissingCommand,
    #[error("process error: {0}")]
    Process(#[from] std::io::Error),
    #[error(transparent)]
    BuildJob(#[from] BuildJobError),
    #[error("failed to load kubernetes configuration: {0}")]
    ClusterConfig(String),
    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),
    #[error("built manifest is not a valid job object: {0}")]
    ManifestShape(#[source] serde_json::Error),
    #[error("created job has no server-assigned name")]
    UnnamedJob,
}

/// Outcome of running a workload to the end of its watch window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfrastructureResult {
    /// Where the workload ran: `<pid>` for processes,
    /// `<namespace>/<job-name>` for Kubernetes jobs.
    pub identifier: String,
    /// Whether the workload was observed reaching its terminal success state.
    /// A watch window that ends first yields `false` without failing the run.
    pub completed: bool,
}

/// Where a claimed flow run executes.
///
/// The `type` discriminator lives inside the serialized form, so a block
/// document's `data` round-trips through this enum directly and deployment
/// overrides can retarget any field before the variant is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Infrastructure {
    #[serde(rename = "process")]
    Process(Process),
    #[serde(rename = "kubernetes-job")]
    KubernetesJob(KubernetesJob),
}

impl Infrastructure {
    /// The wire tag for this variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Process(_) => "process",
            Self::KubernetesJob(_) => "kubernetes-job",
        }
    }

    /// Reconstruct a typed infrastructure from a block document's data.
    pub fn from_document(document: &BlockDocument) -> Result<Self, BlockDecodeError> {
        Ok(serde_json::from_value(document.data.clone())?)
    }

    /// Serialize into an anonymous block document, as persisted when an agent
    /// saves its default infrastructure at startup.
    pub fn to_document(&self) -> Result<BlockDocument, BlockDecodeError> {
        Ok(BlockDocument::anonymous(serde_json::to_value(self)?))
    }

    /// Specialize this infrastructure for one flow run: inject the run id
    /// where the executing side can see it, and fall back to the run name
    /// when no workload name was configured.
    pub fn prepared_for(mut self, flow_run: &FlowRun) -> Self {
        match &mut self {
            Self::Process(process) => {
                process
                    .env
                    .insert(FLOW_RUN_ID_ENV.to_string(), flow_run.id.to_string());
            }
            Self::KubernetesJob(job) => {
                if job.name.is_none() {
                    job.name = Some(flow_run.name.clone());
                }
                job.labels
                    .insert(FLOW_RUN_ID_LABEL.to_string(), flow_run.id.to_string());
            }
        }
        self
    }

    /// Run the workload. Signals `task_status` once the workload is
    /// observably running; see [`crate::submission::submit_flow_run`] for the
    /// dispatch side of the handshake.
    pub async fn run(self, task_status: TaskStatus) -> Result<InfrastructureResult, InfraError> {
        match self {
            Self::Process(process) => process.run(task_status).await,
            Self::KubernetesJob(job) => job.run(task_status).await,
        }
    }
}

#[cfg(test)]
#[path = "infrastructure_tests.rs"]
mod tests;
