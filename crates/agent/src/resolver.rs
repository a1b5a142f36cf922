// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Infrastructure resolution: from a claimed flow run to a typed,
//! override-applied infrastructure instance.

use crate::client::{ClientError, OrchestrationApi};
use prefect_core::{BlockDocumentId, DeploymentId, FlowRun, OverrideError};
use prefect_infra::{BlockDecodeError, Infrastructure};
use thiserror::Error;

/// Errors resolving the infrastructure for a flow run.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("flow run has no deployment")]
    NoDeployment,
    #[error("deployment '{0}' names no infrastructure document and the agent has no default")]
    NoInfrastructure(DeploymentId),
    #[error(transparent)]
    Override(#[from] OverrideError),
    #[error(transparent)]
    Decode(#[from] BlockDecodeError),
}

/// Read the run's deployment, pick its infrastructure document (or the agent
/// default), apply dot-path overrides to the raw document, and reconstruct
/// the typed variant.
pub(crate) async fn resolve_infrastructure<C: OrchestrationApi>(
    client: &C,
    flow_run: &FlowRun,
    default_document_id: Option<BlockDocumentId>,
) -> Result<Infrastructure, ResolveError> {
    let deployment_id = flow_run.deployment_id.ok_or(ResolveError::NoDeployment)?;
    let deployment = client.read_deployment(deployment_id).await?;

    let document_id = deployment
        .infrastructure_document_id
        .or(default_document_id)
        .ok_or(ResolveError::NoInfrastructure(deployment.id))?;
    let mut document = client.read_block_document(document_id).await?;

    for (path, value) in &deployment.infra_overrides {
        document.apply_override(path, value.clone())?;
    }

    Ok(Infrastructure::from_document(&document)?)
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
