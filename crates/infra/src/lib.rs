// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! prefect-infra: workload execution backends for the agent.
//!
//! An [`Infrastructure`] is a tagged variant describing where a claimed flow
//! run executes: a local child process or a Kubernetes job. Each variant
//! exposes a single `run` operation that signals a one-shot startup handshake
//! ([`TaskStatus`]) once the workload is observably running, then keeps
//! executing in the background.

pub mod infrastructure;
pub mod kubernetes;
pub mod process;
pub mod submission;

pub use infrastructure::{
    BlockDecodeError, InfraError, Infrastructure, InfrastructureResult,
};
pub use kubernetes::manifest::{
    base_job_manifest, BaseJobValidationError, BaseJobViolation, BuildJobError, Manifest,
    ManifestFileError,
};
pub use kubernetes::{ImagePullPolicy, KubernetesJob};
pub use process::Process;
pub use submission::{submit_flow_run, SubmitError, TaskStatus};
