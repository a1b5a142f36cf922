// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! prefect-agent: polls an orchestration server for scheduled flow runs and
//! submits them for execution.
//!
//! The [`agent::Agent`] owns the whole pipeline: a work-queue cache with a
//! 30-second TTL, per-tick run queries bounded by a prefetch window, an
//! in-flight set that guarantees each run is dispatched at most once, and a
//! submission coordinator that claims a run server-side before handing it to
//! its infrastructure.

pub mod agent;
pub mod client;
pub mod resolver;
pub mod settings;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use agent::{Agent, AgentConfig, AgentError};
pub use client::{ClientError, OrchestrationApi};
pub use resolver::ResolveError;
