// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::FakeApi;
use prefect_core::test_support::scheduled_run;
use prefect_core::{Deployment, FlowRun};
use prefect_infra::Process;
use serde_json::json;

fn process_document() -> prefect_core::BlockDocument {
    Infrastructure::Process(Process::default().command(vec!["true".to_string()]))
        .to_document()
        .unwrap()
}

#[tokio::test]
async fn resolves_the_deployment_document() {
    let fake = FakeApi::new();
    let document = process_document();
    let deployment = Deployment::builder()
        .infrastructure_document_id(document.id)
        .build();
    fake.insert_document(document);
    fake.insert_deployment(deployment.clone());
    let run = scheduled_run(deployment.id);

    let infrastructure = resolve_infrastructure(&fake, &run, None).await.unwrap();
    assert_eq!(infrastructure.kind(), "process");
}

#[tokio::test]
async fn deployment_document_wins_over_the_agent_default() {
    let fake = FakeApi::new();
    let deployment_doc = process_document();
    let default_doc = process_document();
    let deployment = Deployment::builder()
        .infrastructure_document_id(deployment_doc.id)
        .build();
    let deployment_doc_id = deployment_doc.id;
    fake.insert_document(deployment_doc);
    fake.insert_document(default_doc.clone());
    fake.insert_deployment(deployment.clone());
    let run = scheduled_run(deployment.id);

    resolve_infrastructure(&fake, &run, Some(default_doc.id)).await.unwrap();

    let reads: Vec<_> = fake
        .calls()
        .into_iter()
        .filter(|call| matches!(call, crate::test_support::ApiCall::ReadBlockDocument(_)))
        .collect();
    assert_eq!(
        reads,
        vec![crate::test_support::ApiCall::ReadBlockDocument(deployment_doc_id)]
    );
}

#[tokio::test]
async fn overrides_are_applied_before_the_variant_is_built() {
    let fake = FakeApi::new();
    let document = process_document();
    let mut deployment = Deployment::builder()
        .infrastructure_document_id(document.id)
        .build();
    deployment
        .infra_overrides
        .insert("command".to_string(), json!(["echo", "overridden"]));
    fake.insert_document(document);
    fake.insert_deployment(deployment.clone());
    let run = scheduled_run(deployment.id);

    match resolve_infrastructure(&fake, &run, None).await.unwrap() {
        Infrastructure::Process(process) => {
            assert_eq!(process.command, vec!["echo", "overridden"]);
        }
        other => panic!("expected a process, got {other:?}"),
    }
}

#[tokio::test]
async fn override_through_a_missing_attribute_is_an_error() {
    let fake = FakeApi::new();
    let document = process_document();
    let mut deployment = Deployment::builder()
        .infrastructure_document_id(document.id)
        .build();
    deployment
        .infra_overrides
        .insert("resources.limits.cpu".to_string(), json!("1"));
    fake.insert_document(document);
    fake.insert_deployment(deployment.clone());
    let run = scheduled_run(deployment.id);

    let error = resolve_infrastructure(&fake, &run, None).await.unwrap_err();
    assert!(matches!(error, ResolveError::Override(_)));
}

#[tokio::test]
async fn run_without_a_deployment_is_an_error() {
    let fake = FakeApi::new();
    let run = FlowRun::builder().build();
    let error = resolve_infrastructure(&fake, &run, None).await.unwrap_err();
    assert!(matches!(error, ResolveError::NoDeployment));
}

#[tokio::test]
async fn deployment_without_a_document_and_no_default_is_an_error() {
    let fake = FakeApi::new();
    let deployment = Deployment::builder().build();
    fake.insert_deployment(deployment.clone());
    let run = scheduled_run(deployment.id);

    let error = resolve_infrastructure(&fake, &run, None).await.unwrap_err();
    assert!(matches!(error, ResolveError::NoInfrastructure(id) if id == deployment.id));
}

#[tokio::test]
async fn unknown_infrastructure_type_is_an_error() {
    let fake = FakeApi::new();
    let document = prefect_core::BlockDocument::anonymous(json!({
        "type": "docker-container",
        "image": "busybox",
    }));
    let deployment = Deployment::builder()
        .infrastructure_document_id(document.id)
        .build();
    fake.insert_document(document);
    fake.insert_deployment(deployment.clone());
    let run = scheduled_run(deployment.id);

    let error = resolve_infrastructure(&fake, &run, None).await.unwrap_err();
    assert!(matches!(error, ResolveError::Decode(_)));
}
