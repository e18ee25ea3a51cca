//! TES task description types
//!
//! The body sent once to `POST /v1/tasks`. Field names follow the TES wire
//! schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A complete task submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TesTask {
    pub name: String,
    pub description: String,
    pub executors: Vec<TesExecutor>,
    pub inputs: Vec<TesInput>,
    pub outputs: Vec<TesOutput>,
    pub resources: TesResources,
    /// Opaque tags used to correlate the task back to its job
    pub tags: BTreeMap<String, String>,
}

/// The single command a task runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TesExecutor {
    pub cmd: Vec<String>,
    pub image_name: String,
    pub workdir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
    pub environ: BTreeMap<String, String>,
}

/// Kind of filesystem object a parameter refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IoType {
    File,
    Directory,
}

/// Where the executor gets an input's bytes from
///
/// Serialized flat into the parameter, so a parameter carries exactly one of
/// `url` or `contents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    Url(String),
    Contents(String),
}

/// A file or directory placed into the container before execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TesInput {
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub source: InputSource,
    pub path: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub io_type: Option<IoType>,
}

/// A file or directory copied out of the container after execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TesOutput {
    pub name: String,
    pub url: String,
    pub path: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub io_type: Option<IoType>,
}

/// Resource hints; undetermined values are left out entirely
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TesResources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram_gb: Option<f64>,
    #[serde(rename = "size_gb", default, skip_serializing_if = "Option::is_none")]
    pub disk_gb: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_source_is_flattened() {
        let by_url = TesInput {
            name: "infile".to_string(),
            description: "cwl_input:infile".to_string(),
            source: InputSource::Url("file:///a".to_string()),
            path: "/work/a".to_string(),
            io_type: Some(IoType::File),
        };
        assert_eq!(
            serde_json::to_value(&by_url).unwrap(),
            json!({
                "name": "infile",
                "description": "cwl_input:infile",
                "url": "file:///a",
                "path": "/work/a",
                "type": "FILE"
            })
        );

        let inline: TesInput = serde_json::from_value(json!({
            "name": "cfg",
            "description": "cwl_input:cfg",
            "contents": "a=1",
            "path": "/work/cfg"
        }))
        .unwrap();
        assert_eq!(inline.source, InputSource::Contents("a=1".to_string()));
        assert_eq!(inline.io_type, None);
    }

    #[test]
    fn test_empty_resources_serialize_to_empty_object() {
        assert_eq!(
            serde_json::to_value(TesResources::default()).unwrap(),
            json!({})
        );

        let resources = TesResources {
            cpu_cores: Some(2),
            ram_gb: None,
            disk_gb: Some(10.0),
        };
        assert_eq!(
            serde_json::to_value(resources).unwrap(),
            json!({"cpu_cores": 2, "size_gb": 10.0})
        );
    }
}
