// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent: polls work queues for scheduled flow runs, claims them through
//! the state-proposal protocol, and dispatches them onto infrastructure.
//!
//! # Lifecycle
//!
//! `start()` arms the background task tracker and persists a supplied default
//! infrastructure as an anonymous block document. `get_and_submit_flow_runs()`
//! is invoked on a cadence by an external ticker; each tick walks the cached
//! work queues, asks the server for due runs, and spawns one submission
//! coordinator per new run. `shutdown()` drains every in-flight coordinator,
//! then resets the cache and the in-flight set.
//!
//! # At-most-once
//!
//! A run id enters `submitting_flow_run_ids` before its coordinator is
//! spawned and leaves only when the coordinator finishes, so one agent never
//! dispatches the same run twice. Across agents, the server-side claim
//! (`Scheduled → Pending`) is the source of truth.

use crate::client::{ClientError, OrchestrationApi};
use crate::resolver::resolve_infrastructure;
use crate::settings;
use parking_lot::Mutex;
use prefect_core::{
    BlockDocumentId, Clock, FlowRun, FlowRunId, State, SystemClock, WorkQueue,
};
use prefect_infra::{submit_flow_run, BlockDecodeError, Infrastructure, Process};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::task::TaskTracker;

/// How long a refreshed queue set stays live before the server is asked again.
const WORK_QUEUE_CACHE_TTL: Duration = Duration::from_secs(30);

/// Maximum runs requested from one queue per tick.
const RUNS_PER_QUEUE: usize = 10;

/// Errors surfaced by agent lifecycle and polling.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("provide only one of 'default_infrastructure' and 'default_infrastructure_document_id'")]
    ConflictingInfrastructureDefaults,
    #[error("agent is not started; call start() first")]
    NotStarted,
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Document(#[from] BlockDecodeError),
}

/// Construction-time configuration for an [`Agent`].
pub struct AgentConfig {
    pub work_queues: Vec<String>,
    /// Prefetch window; `PREFECT_AGENT_PREFETCH_SECONDS` when unset.
    pub prefetch: Option<Duration>,
    pub default_infrastructure: Option<Infrastructure>,
    pub default_infrastructure_document_id: Option<BlockDocumentId>,
}

impl AgentConfig {
    pub fn new(work_queues: Vec<String>) -> Self {
        Self {
            work_queues,
            prefetch: None,
            default_infrastructure: None,
            default_infrastructure_document_id: None,
        }
    }

    prefect_core::setters! {
        option {
            prefetch: Duration,
            default_infrastructure: Infrastructure,
            default_infrastructure_document_id: BlockDocumentId,
        }
    }
}

#[derive(Default)]
struct QueueCache {
    queues: Vec<WorkQueue>,
    expires_at: Option<Instant>,
}

struct Inner<C, K> {
    client: C,
    clock: K,
    work_queues: Vec<String>,
    prefetch: Option<Duration>,
    default_infrastructure: Option<Infrastructure>,
    default_infrastructure_document_id: Mutex<Option<BlockDocumentId>>,
    submitting_flow_run_ids: Mutex<HashSet<FlowRunId>>,
    queue_cache: Mutex<QueueCache>,
    started: AtomicBool,
    tasks: TaskTracker,
}

/// A long-running poller that claims scheduled flow runs and submits them
/// for execution.
pub struct Agent<C: OrchestrationApi, K: Clock = SystemClock> {
    inner: Arc<Inner<C, K>>,
}

impl<C: OrchestrationApi, K: Clock> Clone for Agent<C, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: OrchestrationApi> Agent<C, SystemClock> {
    pub fn new(client: C, config: AgentConfig) -> Result<Self, AgentError> {
        Self::with_clock(client, config, SystemClock)
    }
}

impl<C: OrchestrationApi, K: Clock> Agent<C, K> {
    pub fn with_clock(client: C, config: AgentConfig, clock: K) -> Result<Self, AgentError> {
        if config.default_infrastructure.is_some()
            && config.default_infrastructure_document_id.is_some()
        {
            return Err(AgentError::ConflictingInfrastructureDefaults);
        }

        // With no default configured at all, fall back to local processes.
        let default_infrastructure = match (
            config.default_infrastructure,
            config.default_infrastructure_document_id,
        ) {
            (None, None) => Some(Infrastructure::Process(Process::default())),
            (infrastructure, _) => infrastructure,
        };

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                clock,
                work_queues: config.work_queues,
                prefetch: config.prefetch,
                default_infrastructure,
                default_infrastructure_document_id: Mutex::new(
                    config.default_infrastructure_document_id,
                ),
                submitting_flow_run_ids: Mutex::new(HashSet::new()),
                queue_cache: Mutex::new(QueueCache::default()),
                started: AtomicBool::new(false),
                tasks: TaskTracker::new(),
            }),
        })
    }

    /// Mark the agent started and persist a supplied default infrastructure
    /// as an anonymous block document.
    pub async fn start(&self) -> Result<(), AgentError> {
        self.inner.tasks.reopen();
        self.inner.started.store(true, Ordering::SeqCst);

        let needs_save = self.inner.default_infrastructure.is_some()
            && self.inner.default_infrastructure_document_id.lock().is_none();
        if needs_save {
            if let Some(infrastructure) = &self.inner.default_infrastructure {
                let document = infrastructure.to_document()?;
                let saved = self.inner.client.create_block_document(document).await?;
                *self.inner.default_infrastructure_document_id.lock() = Some(saved.id);
                tracing::info!(
                    document = %saved.id,
                    infrastructure = infrastructure.kind(),
                    "saved default infrastructure as an anonymous block"
                );
            }
        }
        Ok(())
    }

    /// Drain in-flight coordinators, then reset the cache and in-flight set.
    /// Safe to call repeatedly.
    pub async fn shutdown(&self) {
        self.inner.started.store(false, Ordering::SeqCst);
        self.inner.tasks.close();
        self.inner.tasks.wait().await;

        self.inner.submitting_flow_run_ids.lock().clear();
        let mut cache = self.inner.queue_cache.lock();
        cache.queues.clear();
        cache.expires_at = None;
    }

    /// One tick: query every work queue for due runs and spawn a submission
    /// coordinator for each run not already in flight.
    ///
    /// Returns the runs considered submittable this tick (including ones
    /// skipped by deduplication), for observability.
    pub async fn get_and_submit_flow_runs(&self) -> Result<Vec<FlowRun>, AgentError> {
        if !self.inner.started.load(Ordering::SeqCst) {
            return Err(AgentError::NotStarted);
        }
        tracing::debug!("checking for scheduled flow runs");

        let prefetch = self
            .inner
            .prefetch
            .unwrap_or_else(settings::agent_prefetch_seconds);
        let before = self.inner.clock.now_utc()
            + chrono::Duration::from_std(prefetch).unwrap_or_else(|_| chrono::Duration::zero());

        let mut submittable = Vec::new();
        for queue in self.get_work_queues().await {
            if queue.is_paused {
                tracing::info!(queue = %queue.name, id = %queue.id, "work queue is paused");
                continue;
            }
            match self
                .inner
                .client
                .get_runs_in_work_queue(queue.id, RUNS_PER_QUEUE, before)
                .await
            {
                Ok(runs) => submittable.extend(runs),
                Err(ClientError::NotFound(_)) => {
                    tracing::error!(queue = %queue.name, id = %queue.id, "work queue not found");
                }
                Err(error) => {
                    tracing::error!(
                        queue = %queue.name,
                        id = %queue.id,
                        %error,
                        "failed to query work queue for runs"
                    );
                }
            }
        }

        for flow_run in &submittable {
            // Check-then-insert under one lock: at most one coordinator per id.
            if !self.inner.submitting_flow_run_ids.lock().insert(flow_run.id) {
                continue;
            }
            tracing::info!(run = %flow_run.id, "submitting flow run");
            let agent = self.clone();
            let flow_run = flow_run.clone();
            self.inner
                .tasks
                .spawn(async move { agent.submit_run(flow_run).await });
        }

        Ok(submittable)
    }

    /// Snapshot of the runs currently being processed.
    pub fn submitting_flow_run_ids(&self) -> HashSet<FlowRunId> {
        self.inner.submitting_flow_run_ids.lock().clone()
    }

    /// The work queues this agent polls, refreshing the 30-second cache from
    /// the server (creating queues that don't exist yet) when it has expired.
    async fn get_work_queues(&self) -> Vec<WorkQueue> {
        let now = self.inner.clock.now();
        {
            let cache = self.inner.queue_cache.lock();
            if cache.expires_at.is_some_and(|at| at > now) {
                return cache.queues.clone();
            }
        }

        {
            let mut cache = self.inner.queue_cache.lock();
            cache.queues.clear();
            cache.expires_at = Some(now + WORK_QUEUE_CACHE_TTL);
        }

        let mut queues = Vec::new();
        for name in &self.inner.work_queues {
            let queue = match self.inner.client.read_work_queue_by_name(name).await {
                Ok(queue) => queue,
                Err(ClientError::NotFound(_)) => {
                    match self.inner.client.create_work_queue(name).await {
                        Ok(queue) => {
                            tracing::info!(queue = %name, "created work queue");
                            queue
                        }
                        // Typical race: another agent created it first. The
                        // next refresh re-reads it.
                        Err(error) => {
                            tracing::error!(queue = %name, %error, "failed to create work queue");
                            continue;
                        }
                    }
                }
                Err(error) => {
                    tracing::error!(queue = %name, %error, "failed to read work queue");
                    continue;
                }
            };
            self.inner.queue_cache.lock().queues.push(queue.clone());
            queues.push(queue);
        }
        queues
    }

    /// Submission coordinator for one run: claim, resolve, dispatch, and
    /// report failure. The in-flight id is removed on every exit path.
    async fn submit_run(&self, flow_run: FlowRun) {
        if self.propose_pending(&flow_run).await {
            let default_document_id = *self.inner.default_infrastructure_document_id.lock();
            match resolve_infrastructure(&self.inner.client, &flow_run, default_document_id).await
            {
                Ok(infrastructure) => {
                    match submit_flow_run(&self.inner.tasks, &flow_run, infrastructure).await {
                        Ok(identifier) => tracing::info!(
                            run = %flow_run.id,
                            %identifier,
                            "completed submission of flow run"
                        ),
                        Err(error) => {
                            tracing::error!(
                                run = %flow_run.id,
                                %error,
                                "infrastructure failed to submit flow run"
                            );
                            self.propose_failed(&flow_run, failure_payload("SubmitError", &error))
                                .await;
                        }
                    }
                }
                Err(error) => {
                    tracing::error!(
                        run = %flow_run.id,
                        %error,
                        "failed to resolve infrastructure for flow run"
                    );
                    self.propose_failed(&flow_run, failure_payload("ResolveError", &error))
                        .await;
                }
            }
        }
        self.inner.submitting_flow_run_ids.lock().remove(&flow_run.id);
    }

    /// Claim the run by proposing `Pending`. Any refusal means do not submit.
    async fn propose_pending(&self, flow_run: &FlowRun) -> bool {
        let state = match self
            .inner
            .client
            .propose_state(State::pending(), flow_run.id)
            .await
        {
            Ok(state) => state,
            Err(ClientError::Abort(reason)) => {
                tracing::info!(
                    run = %flow_run.id,
                    %reason,
                    "aborted submission: server sent an abort signal"
                );
                return false;
            }
            Err(error) => {
                tracing::error!(run = %flow_run.id, %error, "failed to update state of flow run");
                return false;
            }
        };

        if !state.is_pending() {
            tracing::info!(
                run = %flow_run.id,
                state = %state.state_type,
                "aborted submission: server returned a non-pending state"
            );
            return false;
        }
        true
    }

    /// Report a submission failure. An abort here is absorbed (the run is
    /// already terminal from our side); any other error is logged.
    async fn propose_failed(&self, flow_run: &FlowRun, payload: serde_json::Value) {
        let failed = State::failed("Submission failed.", Some(payload));
        match self.inner.client.propose_state(failed, flow_run.id).await {
            Ok(_) | Err(ClientError::Abort(_)) => {}
            Err(error) => {
                tracing::error!(run = %flow_run.id, %error, "failed to update state of flow run");
            }
        }
    }
}

/// Opaque payload attached to `Failed` states; any shape the server accepts.
fn failure_payload(kind: &str, error: &dyn std::fmt::Display) -> serde_json::Value {
    serde_json::json!({ "type": kind, "message": error.to_string() })
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
