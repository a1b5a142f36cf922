// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes job infrastructure.
//!
//! # Module layout
//!
//! - [`manifest`] — base-template validation, field injection, customizations
//! - [`labels`] — DNS-subdomain cleaning for names and labels
//!
//! # Lifecycle
//!
//! `run` builds the manifest, creates the job, signals the startup handshake
//! with `<namespace>/<job-name>`, then watches the job's pod until it reaches
//! `Running` and the job itself until it reports a completion time. Watch
//! windows are caller-chosen; a window that closes early yields a
//! non-completed result without failing the run.

pub mod labels;
pub mod manifest;

use crate::infrastructure::{InfraError, InfrastructureResult};
use crate::submission::TaskStatus;
use futures_util::{StreamExt, TryStreamExt};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, PostParams, WatchEvent, WatchParams};
use kube::config::KubeConfigOptions;
use kube::{Client, Config};
use self::manifest::Manifest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Container image pull behavior, when the agent should state one at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImagePullPolicy {
    IfNotPresent,
    Always,
    Never,
}

prefect_core::simple_display! {
    ImagePullPolicy {
        IfNotPresent => "IfNotPresent",
        Always => "Always",
        Never => "Never",
    }
}

/// Runs a flow as a Kubernetes batch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesJob {
    /// Command for the flow container; left untouched when empty.
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub namespace: String,
    /// Workload name; cleaned into `metadata.generateName`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    /// Omitted from the manifest entirely when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<ImagePullPolicy>,
    pub pod_watch_timeout_seconds: u32,
    pub job_watch_timeout_seconds: u32,
    /// User-supplied base template; validated on build.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<Manifest>,
    /// RFC 6902 patch applied after agent-controlled fields.
    pub customizations: json_patch::Patch,
}

impl Default for KubernetesJob {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            image: None,
            namespace: "default".to_string(),
            name: None,
            labels: BTreeMap::new(),
            service_account_name: None,
            image_pull_policy: None,
            pod_watch_timeout_seconds: 60,
            job_watch_timeout_seconds: 120,
            job: None,
            customizations: json_patch::Patch(Vec::new()),
        }
    }
}

impl KubernetesJob {
    prefect_core::setters! {
        into { namespace: String }
        set {
            command: Vec<String>,
            labels: BTreeMap<String, String>,
            pod_watch_timeout_seconds: u32,
            job_watch_timeout_seconds: u32,
            customizations: json_patch::Patch,
        }
        option {
            name: String,
            image: String,
            service_account_name: String,
            image_pull_policy: ImagePullPolicy,
            job: Manifest,
        }
    }

    pub(crate) async fn run(
        self,
        task_status: TaskStatus,
    ) -> Result<InfrastructureResult, InfraError> {
        let manifest = self.build_job()?;
        let job: Job = serde_json::from_value(manifest).map_err(InfraError::ManifestShape)?;

        let config = load_cluster_config().await?;
        let client = Client::try_from(config)?;
        let jobs: Api<Job> = Api::namespaced(client.clone(), &self.namespace);

        let created = jobs.create(&PostParams::default(), &job).await?;
        let job_name = created.metadata.name.clone().ok_or(InfraError::UnnamedJob)?;
        let identifier = format!("{}/{}", self.namespace, job_name);
        tracing::info!(job = %job_name, namespace = %self.namespace, "created kubernetes job");
        task_status.started(&identifier);

        let pods: Api<Pod> = Api::namespaced(client, &self.namespace);
        self.wait_for_pod(&pods, &job_name).await?;
        let completed = self.wait_for_completion(&jobs, &job_name).await?;
        Ok(InfrastructureResult {
            identifier,
            completed,
        })
    }

    /// Consume pod events until the job's pod reaches `Running` or the watch
    /// window closes, then confirm via a status read.
    async fn wait_for_pod(&self, pods: &Api<Pod>, job_name: &str) -> Result<(), InfraError> {
        let params = WatchParams::default()
            .labels(&pod_selector(job_name))
            .timeout(self.pod_watch_timeout_seconds);
        let mut events = pods.watch(&params, "0").await?.boxed();

        let mut running_pod = None;
        while let Some(event) = events.try_next().await? {
            match event {
                WatchEvent::Added(pod) | WatchEvent::Modified(pod) => {
                    if pod_is_running(&pod) {
                        running_pod = pod.metadata.name.clone();
                        break;
                    }
                }
                WatchEvent::Error(response) => return Err(kube::Error::Api(response).into()),
                _ => {}
            }
        }

        match running_pod {
            Some(name) => {
                let pod = pods.get_status(&name).await?;
                let phase = pod
                    .status
                    .and_then(|status| status.phase)
                    .unwrap_or_default();
                tracing::debug!(pod = %name, %phase, "pod status confirmed");
            }
            None => tracing::warn!(
                job = %job_name,
                timeout_seconds = self.pod_watch_timeout_seconds,
                "pod did not reach Running before the watch window closed"
            ),
        }
        Ok(())
    }

    /// Consume job events until a completion time appears or the watch window
    /// closes. Returns whether completion was observed.
    async fn wait_for_completion(
        &self,
        jobs: &Api<Job>,
        job_name: &str,
    ) -> Result<bool, InfraError> {
        let params = WatchParams::default()
            .fields(&job_selector(job_name))
            .timeout(self.job_watch_timeout_seconds);
        let mut events = jobs.watch(&params, "0").await?.boxed();

        while let Some(event) = events.try_next().await? {
            match event {
                WatchEvent::Added(job) | WatchEvent::Modified(job) if job_is_complete(&job) => {
                    tracing::info!(job = %job_name, "job reported completion");
                    return Ok(true);
                }
                WatchEvent::Error(response) => return Err(kube::Error::Api(response).into()),
                _ => {}
            }
        }
        tracing::warn!(
            job = %job_name,
            timeout_seconds = self.job_watch_timeout_seconds,
            "job did not complete before the watch window closed"
        );
        Ok(false)
    }
}

/// In-cluster configuration when available, kubeconfig otherwise.
pub(crate) async fn load_cluster_config() -> Result<Config, InfraError> {
    match Config::incluster() {
        Ok(config) => Ok(config),
        Err(error) => {
            tracing::debug!(%error, "not running in a cluster, loading kubeconfig");
            Config::from_kubeconfig(&KubeConfigOptions::default())
                .await
                .map_err(|e| InfraError::ClusterConfig(e.to_string()))
        }
    }
}

/// Label selector matching the pods a job controller creates.
fn pod_selector(job_name: &str) -> String {
    format!("job-name={job_name}")
}

/// Field selector pinning a watch to one job by identity.
fn job_selector(job_name: &str) -> String {
    format!("metadata.name={job_name}")
}

fn pod_is_running(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        == Some("Running")
}

fn job_is_complete(job: &Job) -> bool {
    job.status
        .as_ref()
        .and_then(|status| status.completion_time.as_ref())
        .is_some()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
