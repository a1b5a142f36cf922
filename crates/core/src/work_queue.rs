// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work queue record: a named bucket the server routes runs through.

use serde::{Deserialize, Serialize};

crate::define_uuid_id! {
    /// Server-assigned identifier for a work queue.
    pub struct WorkQueueId;
}

/// A named bucket the server uses to route runs to agents.
///
/// Agents subscribe by name; the id is server-assigned at creation and is
/// what run queries are keyed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkQueue {
    pub id: WorkQueueId,
    pub name: String,
    #[serde(default)]
    pub is_paused: bool,
}
