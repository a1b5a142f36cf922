// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! prefect-core: data model shared by the agent and its infrastructures.
//!
//! Leaf types only, no I/O. The agent crate owns the orchestration client
//! and the loop; the infra crate owns workload execution. Everything here is
//! plain data: identifiers, run states, server-side records, and the clock
//! abstraction that makes the work-queue cache testable.

pub mod macros;

pub mod block;
pub mod clock;
pub mod deployment;
pub mod flow_run;
pub mod id;
pub mod state;
pub mod work_queue;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use block::{BlockDocument, BlockDocumentId, OverrideError};
pub use clock::{Clock, FakeClock, SystemClock};
pub use deployment::{Deployment, DeploymentId};
pub use flow_run::{FlowRun, FlowRunId};
pub use state::{State, StateType};
pub use work_queue::{WorkQueue, WorkQueueId};
