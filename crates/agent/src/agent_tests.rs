// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{ApiCall, FakeApi, ProposeOutcome};
use prefect_core::test_support::scheduled_run;
use prefect_core::{Deployment, FakeClock, StateType};

fn agent_on(fake: &FakeApi, queues: &[&str]) -> Agent<FakeApi> {
    let names = queues.iter().map(|q| q.to_string()).collect();
    Agent::new(fake.clone(), AgentConfig::new(names)).unwrap()
}

fn process_infrastructure(command: &[&str]) -> Infrastructure {
    Infrastructure::Process(
        Process::default().command(command.iter().map(|c| c.to_string()).collect()),
    )
}

/// Register a deployment whose infrastructure document runs `command`.
fn deployment_running(fake: &FakeApi, command: &[&str]) -> Deployment {
    let document = process_infrastructure(command).to_document().unwrap();
    let deployment = Deployment::builder()
        .infrastructure_document_id(document.id)
        .build();
    fake.insert_document(document);
    fake.insert_deployment(deployment.clone());
    deployment
}

fn pending_proposals_for(fake: &FakeApi, id: FlowRunId) -> usize {
    fake.calls()
        .iter()
        .filter(|call| {
            matches!(
                call,
                ApiCall::ProposeState { flow_run_id, state_type: StateType::Pending }
                    if *flow_run_id == id
            )
        })
        .count()
}

#[tokio::test]
async fn polling_before_start_is_an_error() {
    let fake = FakeApi::new();
    let agent = agent_on(&fake, &["q1"]);
    assert!(matches!(
        agent.get_and_submit_flow_runs().await,
        Err(AgentError::NotStarted)
    ));
}

#[test]
fn conflicting_infrastructure_defaults_are_rejected() {
    let config = AgentConfig::new(vec!["q1".to_string()])
        .default_infrastructure(process_infrastructure(&["true"]))
        .default_infrastructure_document_id(BlockDocumentId::new());
    assert!(matches!(
        Agent::new(FakeApi::new(), config),
        Err(AgentError::ConflictingInfrastructureDefaults)
    ));
}

#[tokio::test]
async fn start_persists_the_default_infrastructure_anonymously() {
    let fake = FakeApi::new();
    let agent = agent_on(&fake, &[]);

    agent.start().await.unwrap();
    assert!(fake.calls().contains(&ApiCall::CreateBlockDocument));

    // a second start does not save another copy
    agent.shutdown().await;
    agent.start().await.unwrap();
    let saves = fake
        .calls()
        .iter()
        .filter(|call| **call == ApiCall::CreateBlockDocument)
        .count();
    assert_eq!(saves, 1);
    agent.shutdown().await;
}

#[tokio::test]
async fn supplied_document_id_is_not_resaved() {
    let fake = FakeApi::new();
    let config = AgentConfig::new(vec![])
        .default_infrastructure_document_id(BlockDocumentId::new());
    let agent = Agent::new(fake.clone(), config).unwrap();

    agent.start().await.unwrap();
    assert!(!fake.calls().contains(&ApiCall::CreateBlockDocument));
    agent.shutdown().await;
}

#[tokio::test]
async fn paused_queues_are_not_polled_for_runs() {
    let fake = FakeApi::new();
    fake.with_queue("q1");
    fake.pause_queue("q1");
    let agent = agent_on(&fake, &["q1"]);

    agent.start().await.unwrap();
    let submittable = agent.get_and_submit_flow_runs().await.unwrap();
    agent.shutdown().await;

    assert!(submittable.is_empty());
    assert!(!fake
        .calls()
        .iter()
        .any(|call| matches!(call, ApiCall::GetRunsInWorkQueue { .. })));
}

#[tokio::test]
async fn missing_queues_are_created_on_first_poll() {
    let fake = FakeApi::new();
    let agent = agent_on(&fake, &["fresh"]);

    agent.start().await.unwrap();
    agent.get_and_submit_flow_runs().await.unwrap();
    agent.shutdown().await;

    let calls = fake.calls();
    assert!(calls.contains(&ApiCall::ReadWorkQueueByName("fresh".to_string())));
    assert!(calls.contains(&ApiCall::CreateWorkQueue("fresh".to_string())));
    assert!(calls
        .iter()
        .any(|call| matches!(call, ApiCall::GetRunsInWorkQueue { .. })));
}

#[tokio::test]
async fn queue_creation_race_skips_the_queue_for_the_tick() {
    let fake = FakeApi::new();
    fake.fail_queue_creation();
    let agent = agent_on(&fake, &["contested"]);

    agent.start().await.unwrap();
    let submittable = agent.get_and_submit_flow_runs().await.unwrap();
    agent.shutdown().await;

    assert!(submittable.is_empty());
    assert!(!fake
        .calls()
        .iter()
        .any(|call| matches!(call, ApiCall::GetRunsInWorkQueue { .. })));
}

#[tokio::test]
async fn a_failing_queue_does_not_abort_the_tick() {
    let fake = FakeApi::new();
    let broken = fake.with_queue("broken");
    fake.fail_runs_for(broken.id);
    let healthy = fake.with_queue("healthy");
    let deployment = deployment_running(&fake, &["true"]);
    let run = scheduled_run(deployment.id);
    fake.set_runs(healthy.id, vec![run.clone()]);

    let agent = agent_on(&fake, &["broken", "healthy"]);
    agent.start().await.unwrap();
    let submittable = agent.get_and_submit_flow_runs().await.unwrap();
    agent.shutdown().await;

    assert_eq!(submittable, vec![run]);
}

#[tokio::test]
async fn queues_are_polled_in_configured_order() {
    let fake = FakeApi::new();
    let first = fake.with_queue("first");
    let second = fake.with_queue("second");
    let deployment = deployment_running(&fake, &["true"]);
    let run_a = scheduled_run(deployment.id);
    let run_b = scheduled_run(deployment.id);
    fake.set_runs(first.id, vec![run_a.clone()]);
    fake.set_runs(second.id, vec![run_b.clone()]);

    let agent = agent_on(&fake, &["first", "second"]);
    agent.start().await.unwrap();
    let submittable = agent.get_and_submit_flow_runs().await.unwrap();
    agent.shutdown().await;

    assert_eq!(submittable, vec![run_a, run_b]);
}

#[tokio::test]
async fn queue_reads_are_cached_for_thirty_seconds() {
    let fake = FakeApi::new();
    fake.with_queue("q1");
    let clock = FakeClock::new();
    let agent = Agent::with_clock(
        fake.clone(),
        AgentConfig::new(vec!["q1".to_string()]),
        clock.clone(),
    )
    .unwrap();

    agent.start().await.unwrap();
    agent.get_and_submit_flow_runs().await.unwrap();
    agent.get_and_submit_flow_runs().await.unwrap();

    let reads = |fake: &FakeApi| {
        fake.calls()
            .iter()
            .filter(|call| matches!(call, ApiCall::ReadWorkQueueByName(_)))
            .count()
    };
    assert_eq!(reads(&fake), 1);

    clock.advance(std::time::Duration::from_secs(30));
    agent.get_and_submit_flow_runs().await.unwrap();
    assert_eq!(reads(&fake), 2);

    agent.shutdown().await;
}

#[tokio::test]
async fn prefetch_window_is_sent_to_the_server() {
    let fake = FakeApi::new();
    fake.with_queue("q1");
    let clock = FakeClock::new();
    let config = AgentConfig::new(vec!["q1".to_string()])
        .prefetch(std::time::Duration::from_secs(42));
    let agent = Agent::with_clock(fake.clone(), config, clock.clone()).unwrap();

    agent.start().await.unwrap();
    agent.get_and_submit_flow_runs().await.unwrap();
    agent.shutdown().await;

    let expected = clock.now_utc() + chrono::Duration::seconds(42);
    assert!(fake.calls().iter().any(|call| matches!(
        call,
        ApiCall::GetRunsInWorkQueue { scheduled_before, .. } if *scheduled_before == expected
    )));
}

#[tokio::test]
async fn a_run_is_dispatched_at_most_once_across_ticks() {
    let fake = FakeApi::new();
    let queue = fake.with_queue("q1");
    let deployment = deployment_running(&fake, &["true"]);
    let run = scheduled_run(deployment.id);
    fake.set_runs(queue.id, vec![run.clone()]);

    let agent = agent_on(&fake, &["q1"]);
    agent.start().await.unwrap();

    // park the coordinator at its claim so it stays in flight across ticks
    fake.hold_proposals();
    let first = agent.get_and_submit_flow_runs().await.unwrap();
    assert!(agent.submitting_flow_run_ids().contains(&run.id));
    let second = agent.get_and_submit_flow_runs().await.unwrap();

    fake.release_proposals();
    agent.shutdown().await;

    // the run was considered on both ticks but claimed only once
    assert_eq!(first, vec![run.clone()]);
    assert_eq!(second, vec![run.clone()]);
    assert_eq!(pending_proposals_for(&fake, run.id), 1);
    assert!(agent.submitting_flow_run_ids().is_empty());
}

#[tokio::test]
async fn claim_lost_to_another_agent_skips_submission() {
    let fake = FakeApi::new();
    let queue = fake.with_queue("q1");
    let deployment = deployment_running(&fake, &["true"]);
    let run = scheduled_run(deployment.id);
    fake.set_runs(queue.id, vec![run.clone()]);
    fake.script_propose(run.id, ProposeOutcome::Return(StateType::Running));

    let agent = agent_on(&fake, &["q1"]);
    agent.start().await.unwrap();
    agent.get_and_submit_flow_runs().await.unwrap();
    agent.shutdown().await;

    // no infrastructure work and no failure report
    assert!(!fake.calls().iter().any(|call| matches!(call, ApiCall::ReadDeployment(_))));
    assert_eq!(fake.proposed().len(), 1);
    assert!(agent.submitting_flow_run_ids().is_empty());
}

#[tokio::test]
async fn claim_abort_skips_submission_without_failure_report() {
    let fake = FakeApi::new();
    let queue = fake.with_queue("q1");
    let deployment = deployment_running(&fake, &["true"]);
    let run = scheduled_run(deployment.id);
    fake.set_runs(queue.id, vec![run.clone()]);
    fake.script_propose(
        run.id,
        ProposeOutcome::Abort("run is already locked".to_string()),
    );

    let agent = agent_on(&fake, &["q1"]);
    agent.start().await.unwrap();
    agent.get_and_submit_flow_runs().await.unwrap();
    agent.shutdown().await;

    assert!(!fake.calls().iter().any(|call| matches!(call, ApiCall::ReadDeployment(_))));
    assert!(!fake
        .proposed()
        .iter()
        .any(|(_, state)| state.state_type == StateType::Failed));
}

#[tokio::test]
async fn claim_transport_error_skips_submission() {
    let fake = FakeApi::new();
    let queue = fake.with_queue("q1");
    let deployment = deployment_running(&fake, &["true"]);
    let run = scheduled_run(deployment.id);
    fake.set_runs(queue.id, vec![run.clone()]);
    fake.script_propose(
        run.id,
        ProposeOutcome::Error("connection reset".to_string()),
    );

    let agent = agent_on(&fake, &["q1"]);
    agent.start().await.unwrap();
    agent.get_and_submit_flow_runs().await.unwrap();
    agent.shutdown().await;

    assert!(!fake.calls().iter().any(|call| matches!(call, ApiCall::ReadDeployment(_))));
    assert!(!fake
        .proposed()
        .iter()
        .any(|(_, state)| state.state_type == StateType::Failed));
}

#[tokio::test]
async fn submit_failure_reports_a_failed_state() {
    let fake = FakeApi::new();
    let queue = fake.with_queue("q1");
    // a process with no command fails before startup
    let deployment = deployment_running(&fake, &[]);
    let run = scheduled_run(deployment.id);
    fake.set_runs(queue.id, vec![run.clone()]);

    let agent = agent_on(&fake, &["q1"]);
    agent.start().await.unwrap();
    agent.get_and_submit_flow_runs().await.unwrap();
    agent.shutdown().await;

    let proposed = fake.proposed();
    assert_eq!(proposed.len(), 2);
    assert_eq!(proposed[0].1.state_type, StateType::Pending);

    let failed = &proposed[1].1;
    assert_eq!(failed.state_type, StateType::Failed);
    assert_eq!(failed.message.as_deref(), Some("Submission failed."));
    assert!(failed.data.is_some());
    assert!(agent.submitting_flow_run_ids().is_empty());
}

#[tokio::test]
async fn successful_submission_proposes_only_pending() {
    let fake = FakeApi::new();
    let queue = fake.with_queue("q1");
    let deployment = deployment_running(&fake, &["true"]);
    let run = scheduled_run(deployment.id);
    fake.set_runs(queue.id, vec![run.clone()]);

    let agent = agent_on(&fake, &["q1"]);
    agent.start().await.unwrap();
    agent.get_and_submit_flow_runs().await.unwrap();
    agent.shutdown().await;

    let proposed = fake.proposed();
    assert_eq!(proposed.len(), 1);
    assert!(proposed[0].1.is_pending());
    assert!(agent.submitting_flow_run_ids().is_empty());
}

#[tokio::test]
async fn deployment_without_a_document_uses_the_agent_default() {
    let fake = FakeApi::new();
    let queue = fake.with_queue("q1");
    let deployment = Deployment::builder().build();
    fake.insert_deployment(deployment.clone());
    let run = scheduled_run(deployment.id);
    fake.set_runs(queue.id, vec![run.clone()]);

    let config = AgentConfig::new(vec!["q1".to_string()])
        .default_infrastructure(process_infrastructure(&["true"]));
    let agent = Agent::new(fake.clone(), config).unwrap();
    agent.start().await.unwrap();
    agent.get_and_submit_flow_runs().await.unwrap();
    agent.shutdown().await;

    // claim accepted, default block read back, and no failure reported
    assert!(fake.calls().iter().any(|call| matches!(call, ApiCall::ReadBlockDocument(_))));
    assert_eq!(fake.proposed().len(), 1);
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let fake = FakeApi::new();
    let agent = agent_on(&fake, &["q1"]);
    agent.start().await.unwrap();
    agent.shutdown().await;
    agent.shutdown().await;
    assert!(matches!(
        agent.get_and_submit_flow_runs().await,
        Err(AgentError::NotStarted)
    ));
}
