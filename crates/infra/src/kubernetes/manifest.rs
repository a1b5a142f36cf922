// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job manifest construction: base-template validation, agent-controlled
//! field injection, and RFC 6902 customizations.
//!
//! Building is pure. The pipeline is ordered so users win: the base template
//! (theirs or the built-in default) is validated, agent fields are injected
//! on top, and the customization patch applies last and can override
//! anything the agent set.

use super::labels::{sanitize_label_key, sanitize_label_value, sanitize_name};
use super::KubernetesJob;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A Kubernetes object in its on-the-wire mapping form.
pub type Manifest = Value;

/// Name of the container the agent populates with the flow's command.
pub const JOB_CONTAINER_NAME: &str = "prefect-job";

/// Paths every base template must carry at the top level.
const REQUIRED_TOP_PATHS: [&str; 4] = ["/apiVersion", "/kind", "/metadata", "/spec"];

/// Deeper paths every base template must carry.
const REQUIRED_DEEP_PATHS: [&str; 5] = [
    "/metadata/labels",
    "/spec/template/spec/completions",
    "/spec/template/spec/containers",
    "/spec/template/spec/parallelism",
    "/spec/template/spec/restartPolicy",
];

/// Values the agent owns and a base template may not change.
const REQUIRED_VALUES: [(&str, &str); 2] = [("/apiVersion", "batch/v1"), ("/kind", "Job")];

/// One class of base-template violation.
#[derive(Debug, Error)]
pub enum BaseJobViolation {
    #[error("Job is missing required attributes at the following paths: {}", .0.join(", "))]
    MissingAttributes(Vec<String>),
    #[error("Job has incompatible values for the following attributes: {}", .0.join(", "))]
    IncompatibleValues(Vec<String>),
}

/// Aggregate validation failure for a user-supplied base template.
///
/// Missing paths and incompatible values are distinct violations; a template
/// exhibiting both carries both.
#[derive(Debug, Error)]
#[error("{}", join_violations(.violations))]
pub struct BaseJobValidationError {
    pub violations: Vec<BaseJobViolation>,
}

fn join_violations(violations: &[BaseJobViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from building a job manifest.
#[derive(Debug, Error)]
pub enum BuildJobError {
    #[error(transparent)]
    Validation(#[from] BaseJobValidationError),
    #[error("failed to apply customizations: {0}")]
    Customizations(#[from] json_patch::PatchError),
    #[error("job template is malformed at '{0}'")]
    MalformedTemplate(&'static str),
}

/// Errors loading a manifest or patch document from a file.
#[derive(Debug, Error)]
pub enum ManifestFileError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {} as YAML: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to parse {} as JSON: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported extension for {}: expected .yaml, .yml, or .json", .path.display())]
    UnsupportedExtension { path: PathBuf },
}

/// The built-in base template used when no custom `job` is supplied.
pub fn base_job_manifest() -> Manifest {
    serde_json::json!({
        "apiVersion": "batch/v1",
        "kind": "Job",
        "metadata": { "labels": {} },
        "spec": {
            "template": {
                "spec": {
                    "parallelism": 1,
                    "completions": 1,
                    "restartPolicy": "Never",
                    "containers": [
                        { "name": JOB_CONTAINER_NAME, "env": [] }
                    ]
                }
            }
        }
    })
}

/// Validate a user-supplied base template against the structural contract.
///
/// For each required path, the shallowest missing ancestor is reported, so an
/// empty template names only the four top-level paths rather than everything
/// beneath them.
pub(crate) fn validate_base_job(job: &Manifest) -> Result<(), BaseJobValidationError> {
    let mut missing = BTreeSet::new();
    for path in REQUIRED_TOP_PATHS.into_iter().chain(REQUIRED_DEEP_PATHS) {
        if let Some(shallowest) = first_missing_prefix(job, path) {
            missing.insert(shallowest);
        }
    }

    let mut incompatible = Vec::new();
    for (path, literal) in REQUIRED_VALUES {
        if let Some(value) = job.pointer(path) {
            if value != literal {
                incompatible.push(format!("{path} must have value '{literal}'"));
            }
        }
    }

    let mut violations = Vec::new();
    if !missing.is_empty() {
        violations.push(BaseJobViolation::MissingAttributes(
            missing.into_iter().collect(),
        ));
    }
    if !incompatible.is_empty() {
        violations.push(BaseJobViolation::IncompatibleValues(incompatible));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(BaseJobValidationError { violations })
    }
}

/// The shortest prefix of `path` that does not resolve in `job`, if any.
fn first_missing_prefix(job: &Manifest, path: &str) -> Option<String> {
    let mut prefix = String::with_capacity(path.len());
    for segment in path.split('/').skip(1) {
        prefix.push('/');
        prefix.push_str(segment);
        if job.pointer(&prefix).is_none() {
            return Some(prefix);
        }
    }
    None
}

impl KubernetesJob {
    /// Produce a ready-to-submit job manifest.
    ///
    /// Pure: two successive builds yield structurally equal, distinct values.
    pub fn build_job(&self) -> Result<Manifest, BuildJobError> {
        let mut manifest = match &self.job {
            Some(base) => {
                validate_base_job(base)?;
                base.clone()
            }
            None => base_job_manifest(),
        };
        self.inject_agent_fields(&mut manifest)?;
        json_patch::patch(&mut manifest, &self.customizations)?;
        Ok(manifest)
    }

    fn inject_agent_fields(&self, manifest: &mut Manifest) -> Result<(), BuildJobError> {
        let generate_name = sanitize_name(self.name.as_deref().unwrap_or(JOB_CONTAINER_NAME));

        let metadata = manifest
            .get_mut("metadata")
            .and_then(Value::as_object_mut)
            .ok_or(BuildJobError::MalformedTemplate("/metadata"))?;
        metadata.insert("generateName".to_string(), Value::String(generate_name));
        metadata.insert("namespace".to_string(), Value::String(self.namespace.clone()));

        let label_map = metadata
            .entry("labels")
            .or_insert_with(|| Value::Object(Default::default()))
            .as_object_mut()
            .ok_or(BuildJobError::MalformedTemplate("/metadata/labels"))?;
        for (key, value) in &self.labels {
            label_map.insert(
                sanitize_label_key(key),
                Value::String(sanitize_label_value(value)),
            );
        }

        let pod_spec = manifest
            .pointer_mut("/spec/template/spec")
            .and_then(Value::as_object_mut)
            .ok_or(BuildJobError::MalformedTemplate("/spec/template/spec"))?;
        if let Some(account) = &self.service_account_name {
            pod_spec.insert(
                "serviceAccountName".to_string(),
                Value::String(account.clone()),
            );
        }

        let containers = pod_spec
            .get_mut("containers")
            .and_then(Value::as_array_mut)
            .ok_or(BuildJobError::MalformedTemplate("/spec/template/spec/containers"))?;
        let index = match containers
            .iter()
            .position(|c| c.get("name").and_then(Value::as_str) == Some(JOB_CONTAINER_NAME))
        {
            Some(index) => index,
            None => {
                containers.insert(0, serde_json::json!({ "name": JOB_CONTAINER_NAME, "env": [] }));
                0
            }
        };
        let container = containers
            .get_mut(index)
            .and_then(Value::as_object_mut)
            .ok_or(BuildJobError::MalformedTemplate("/spec/template/spec/containers"))?;

        if let Some(image) = &self.image {
            container.insert("image".to_string(), Value::String(image.clone()));
        }
        if !self.command.is_empty() {
            container.insert("command".to_string(), serde_json::json!(self.command));
        }
        if let Some(policy) = self.image_pull_policy {
            container.insert("imagePullPolicy".to_string(), Value::String(policy.to_string()));
        }
        Ok(())
    }

    /// Load a base job template from a `.yaml`/`.yml`/`.json` file.
    pub fn job_from_file(path: impl AsRef<Path>) -> Result<Manifest, ManifestFileError> {
        from_file(path.as_ref())
    }

    /// Load a customization patch from a `.yaml`/`.yml`/`.json` file.
    pub fn customizations_from_file(
        path: impl AsRef<Path>,
    ) -> Result<json_patch::Patch, ManifestFileError> {
        from_file(path.as_ref())
    }
}

fn from_file<T: DeserializeOwned>(path: &Path) -> Result<T, ManifestFileError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ManifestFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match extension {
        "yaml" | "yml" => {
            serde_yaml::from_str(&contents).map_err(|source| ManifestFileError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        }
        "json" => serde_json::from_str(&contents).map_err(|source| ManifestFileError::Json {
            path: path.to_path_buf(),
            source,
        }),
        _ => Err(ManifestFileError::UnsupportedExtension {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
