// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the agent crate.

use std::time::Duration;

/// Default prefetch window, used when no per-agent override is supplied.
/// Configured via `PREFECT_AGENT_PREFETCH_SECONDS` (integer seconds).
pub fn agent_prefetch_seconds() -> Duration {
    std::env::var("PREFECT_AGENT_PREFETCH_SECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(10))
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
