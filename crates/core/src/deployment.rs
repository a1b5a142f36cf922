// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment record: binds a workflow to an infrastructure document.

use crate::block::BlockDocumentId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

crate::define_uuid_id! {
    /// Server-assigned identifier for a deployment.
    pub struct DeploymentId;
}

/// Server-side record binding a workflow to an infrastructure document and
/// per-deployment overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: DeploymentId,
    pub name: String,
    /// Infrastructure block to run this deployment on; falls back to the
    /// agent default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_document_id: Option<BlockDocumentId>,
    /// Dot-delimited attribute path → replacement value, applied to the
    /// block document's `data` in insertion order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub infra_overrides: IndexMap<String, serde_json::Value>,
}
