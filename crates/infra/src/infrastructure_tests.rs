// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn kind_matches_the_wire_tag() {
    assert_eq!(Infrastructure::Process(Process::default()).kind(), "process");
    assert_eq!(
        Infrastructure::KubernetesJob(KubernetesJob::default()).kind(),
        "kubernetes-job"
    );
}

#[test]
fn round_trips_through_a_block_document() {
    let original = Infrastructure::KubernetesJob(
        KubernetesJob::default()
            .command(vec!["echo".to_string(), "hello".to_string()])
            .image("prefect:2")
            .namespace("flows"),
    );

    let document = original.to_document().unwrap();
    assert!(document.is_anonymous);
    assert_eq!(document.data["type"], "kubernetes-job");

    let decoded = Infrastructure::from_document(&document).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn document_overrides_reach_the_decoded_variant() {
    let original = Infrastructure::KubernetesJob(KubernetesJob::default());
    let mut document = original.to_document().unwrap();
    document.apply_override("namespace", json!("overridden")).unwrap();

    match Infrastructure::from_document(&document).unwrap() {
        Infrastructure::KubernetesJob(job) => assert_eq!(job.namespace, "overridden"),
        other => panic!("expected a kubernetes job, got {other:?}"),
    }
}

#[test]
fn unknown_type_tag_is_rejected() {
    let document = prefect_core::BlockDocument::anonymous(json!({
        "type": "docker-container",
        "image": "busybox",
    }));
    assert!(Infrastructure::from_document(&document).is_err());
}

#[test]
fn prepared_process_carries_the_run_id() {
    let flow_run = prefect_core::FlowRun::builder().build();
    let prepared = Infrastructure::Process(Process::default()).prepared_for(&flow_run);

    match prepared {
        Infrastructure::Process(process) => {
            assert_eq!(
                process.env.get(FLOW_RUN_ID_ENV),
                Some(&flow_run.id.to_string())
            );
        }
        other => panic!("expected a process, got {other:?}"),
    }
}

#[test]
fn prepared_job_is_labeled_and_named_after_the_run() {
    let flow_run = prefect_core::FlowRun::builder().name("nightly-etl").build();
    let prepared =
        Infrastructure::KubernetesJob(KubernetesJob::default()).prepared_for(&flow_run);

    match prepared {
        Infrastructure::KubernetesJob(job) => {
            assert_eq!(job.name.as_deref(), Some("nightly-etl"));
            assert_eq!(
                job.labels.get(FLOW_RUN_ID_LABEL),
                Some(&flow_run.id.to_string())
            );
        }
        other => panic!("expected a kubernetes job, got {other:?}"),
    }
}

#[test]
fn prepared_job_keeps_a_configured_name() {
    let flow_run = prefect_core::FlowRun::builder().name("nightly-etl").build();
    let prepared = Infrastructure::KubernetesJob(KubernetesJob::default().name("configured"))
        .prepared_for(&flow_run);

    match prepared {
        Infrastructure::KubernetesJob(job) => {
            assert_eq!(job.name.as_deref(), Some("configured"));
        }
        other => panic!("expected a kubernetes job, got {other:?}"),
    }
}
