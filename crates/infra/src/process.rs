// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process infrastructure: runs a flow as a local child process.

use crate::infrastructure::{InfraError, InfrastructureResult};
use crate::submission::TaskStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Runs the flow in a child process on the agent's host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Process {
    pub command: Vec<String>,
    pub env: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl Process {
    prefect_core::setters! {
        set {
            command: Vec<String>,
            env: BTreeMap<String, String>,
        }
        option {
            working_dir: PathBuf,
        }
    }

    pub(crate) async fn run(
        self,
        task_status: TaskStatus,
    ) -> Result<InfrastructureResult, InfraError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or(InfraError::MissingCommand)?;

        let mut command = tokio::process::Command::new(program);
        command.args(args).envs(&self.env);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn()?;
        let identifier = child
            .id()
            .map(|pid| pid.to_string())
            .unwrap_or_default();
        tracing::info!(pid = %identifier, program = %program, "process started");
        task_status.started(&identifier);

        let status = child.wait().await?;
        if !status.success() {
            tracing::warn!(
                pid = %identifier,
                code = status.code().unwrap_or(-1),
                "process exited with a nonzero status"
            );
        }
        Ok(InfrastructureResult {
            identifier,
            completed: status.success(),
        })
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
