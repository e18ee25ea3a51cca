//! Job domain types
//!
//! A `JobSpec` is the read-only view of one command-line step that the host
//! workflow engine wants executed remotely. Input bindings are kept as raw
//! JSON so that the task builder can walk them in document order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// One command-line step, as resolved by the workflow engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    /// Free-text documentation of the tool, used as the task description
    #[serde(default)]
    pub doc: Option<String>,
    /// Identifier of the workflow document the tool came from
    #[serde(default)]
    pub document_id: Option<String>,
    pub command_line: Vec<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub stdin: Option<String>,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    /// Fallback container image when no `DockerRequirement` names one
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    /// Input bindings keyed by logical name, in document order
    #[serde(default)]
    pub inputs: Map<String, Value>,
    /// Files that must exist in the working directory before execution
    #[serde(default)]
    pub generated_files: Vec<GeneratedFile>,
    /// Host-side directory outputs are delivered to
    pub outdir: String,
    /// Host-side scratch directory for generated files
    pub tmpdir: String,
    /// Input staging directory, removed during cleanup when present
    #[serde(default)]
    pub stagedir: Option<String>,
}

/// A declared requirement of the tool, discriminated by its `class`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum Requirement {
    ResourceRequirement(ResourceRequirement),
    DockerRequirement(DockerRequirement),
    /// Any requirement class the bridge does not act on
    #[serde(other)]
    Other,
}

/// Resource bounds, each a min/max pair where the minimum is preferred
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirement {
    /// Fractional cores are allowed
    #[serde(default)]
    pub cores_min: Option<f64>,
    #[serde(default)]
    pub cores_max: Option<f64>,
    #[serde(default)]
    pub ram_min: Option<f64>,
    #[serde(default)]
    pub ram_max: Option<f64>,
    #[serde(default)]
    pub outdir_min: Option<f64>,
    #[serde(default)]
    pub outdir_max: Option<f64>,
}

impl ResourceRequirement {
    pub fn cores(&self) -> Option<f64> {
        self.cores_min.or(self.cores_max)
    }

    pub fn ram(&self) -> Option<f64> {
        self.ram_min.or(self.ram_max)
    }

    pub fn disk(&self) -> Option<f64> {
        self.outdir_min.or(self.outdir_max)
    }
}

/// Container settings for the tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerRequirement {
    #[serde(default)]
    pub docker_pull: Option<String>,
    /// Alternate output directory inside the container
    #[serde(default)]
    pub docker_output_directory: Option<String>,
}

/// A file to materialize in the working directory before the task runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub basename: String,
    #[serde(default)]
    pub contents: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Final status reported to the host engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    Success,
    PermanentFail,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Success => write!(f, "success"),
            JobStatus::PermanentFail => write!(f, "permanentFail"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_requirements_are_discriminated_by_class() {
        let reqs: Vec<Requirement> = serde_json::from_value(json!([
            {"class": "ResourceRequirement", "coresMin": 2, "coresMax": 4, "ramMax": 1024},
            {"class": "DockerRequirement", "dockerPull": "ubuntu:22.04"},
            {"class": "InlineJavascriptRequirement"}
        ]))
        .unwrap();

        match &reqs[0] {
            Requirement::ResourceRequirement(r) => {
                assert_eq!(r.cores(), Some(2.0));
                assert_eq!(r.ram(), Some(1024.0));
                assert_eq!(r.disk(), None);
            }
            other => panic!("unexpected requirement: {:?}", other),
        }
        assert_eq!(
            reqs[1],
            Requirement::DockerRequirement(DockerRequirement {
                docker_pull: Some("ubuntu:22.04".to_string()),
                docker_output_directory: None,
            })
        );
        assert_eq!(reqs[2], Requirement::Other);
    }

    #[test]
    fn test_fractional_cores_are_accepted() {
        let reqs: Vec<Requirement> = serde_json::from_value(json!([
            {"class": "ResourceRequirement", "coresMin": 0.5, "ramMin": 1024}
        ]))
        .unwrap();

        match &reqs[0] {
            Requirement::ResourceRequirement(r) => assert_eq!(r.cores(), Some(0.5)),
            other => panic!("unexpected requirement: {:?}", other),
        }
    }

    #[test]
    fn test_job_status_wire_names() {
        assert_eq!(
            serde_json::to_value(JobStatus::PermanentFail).unwrap(),
            json!("permanentFail")
        );
        assert_eq!(JobStatus::Success.to_string(), "success");
    }

    #[test]
    fn test_job_spec_keeps_input_order() {
        let job: JobSpec = serde_json::from_value(json!({
            "name": "cat",
            "command_line": ["cat"],
            "outdir": "/out",
            "tmpdir": "/tmp/job",
            "inputs": {"zeta": 1, "alpha": 2}
        }))
        .unwrap();

        let keys: Vec<&String> = job.inputs.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert!(job.requirements.is_empty());
    }
}
