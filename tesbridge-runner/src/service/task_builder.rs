//! Task description builder
//!
//! Maps a `JobSpec` onto the TES task schema:
//! - Input parameters from the job's input bindings and generated files
//! - Output parameters for the working directory and redirection targets
//! - Resource hints and the container image from the job's requirements
//!
//! No network I/O happens here. Generated working-directory files are
//! written through `FsAccess`, so building is not entirely side-effect free,
//! but building twice from the same job yields the same task.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tesbridge_core::domain::job::{JobSpec, Requirement};
use tesbridge_core::domain::task::{
    InputSource, IoType, TesExecutor, TesInput, TesOutput, TesResources, TesTask,
};

use crate::error::TaskBuildError;
use crate::fs::FsAccess;

/// Working directory inside the container unless configured otherwise
pub const DEFAULT_DOCKER_WORKDIR: &str = "/var/spool/cwl";

/// Tag correlating a task with the workflow document it came from
pub const DOCUMENT_ID_TAG: &str = "CWLDocumentId";

/// Fields that mark an input binding as a file or directory
const FILE_BINDING_FIELDS: [&str; 3] = ["location", "path", "class"];

/// Builds TES task descriptions from job specifications
#[derive(Clone)]
pub struct TaskBuilder {
    fs: Arc<dyn FsAccess>,
    docker_workdir: String,
}

impl TaskBuilder {
    pub fn new(fs: Arc<dyn FsAccess>, docker_workdir: impl Into<String>) -> Self {
        Self {
            fs,
            docker_workdir: docker_workdir.into(),
        }
    }

    /// Builds the complete task description for `job`
    pub fn build(&self, job: &JobSpec) -> Result<TesTask, TaskBuildError> {
        if job.command_line.is_empty() {
            return Err(TaskBuildError::EmptyCommandLine(job.name.clone()));
        }
        let image = Self::image(job)?;

        let inputs = self.collect_input_parameters(job)?;
        let outputs = self.collect_output_parameters(job)?;

        let executor = TesExecutor {
            cmd: job.command_line.clone(),
            image_name: image,
            workdir: self.docker_workdir.clone(),
            stdout: job.stdout.as_deref().map(|p| self.container_path(p)),
            stderr: job.stderr.as_deref().map(|p| self.container_path(p)),
            stdin: job.stdin.clone(),
            environ: job.environment.clone(),
        };

        let mut tags = BTreeMap::new();
        if let Some(document_id) = &job.document_id {
            tags.insert(DOCUMENT_ID_TAG.to_string(), document_id.clone());
        }

        Ok(TesTask {
            name: job.name.clone(),
            description: job.doc.clone().unwrap_or_default(),
            executors: vec![executor],
            inputs,
            outputs,
            resources: Self::resources(job),
            tags,
        })
    }

    // =============================================================================
    // Inputs
    // =============================================================================

    /// Input parameters for every file binding, then every generated file
    pub fn collect_input_parameters(&self, job: &JobSpec) -> Result<Vec<TesInput>, TaskBuildError> {
        let mut inputs = Vec::new();
        for (name, value) in &job.inputs {
            Self::walk_binding(name, value, &mut inputs)?;
        }

        self.materialize_generated_files(job, &mut inputs)?;
        Ok(inputs)
    }

    /// Walks one input binding, emitting a parameter per file object found
    ///
    /// Maps without the location/path/class triple are descended into by
    /// key, lists by `name[i]`. Within one map or list, descent stops at the
    /// first value that is not a map: later siblings are never visited, even
    /// if they are file objects. Existing workflows rely on exactly this
    /// traversal, so it is kept as is.
    fn walk_binding(
        name: &str,
        value: &Value,
        inputs: &mut Vec<TesInput>,
    ) -> Result<(), TaskBuildError> {
        match value {
            Value::Object(fields) if Self::is_file_binding(fields) => {
                inputs.push(Self::input_parameter(name, fields)?);

                if let Some(secondary) = fields.get("secondaryFiles") {
                    let files = secondary.as_array().ok_or_else(|| TaskBuildError::InvalidField {
                        name: name.to_string(),
                        field: "secondaryFiles",
                    })?;
                    for file in files {
                        let basename = file.get("basename").and_then(Value::as_str).ok_or_else(
                            || TaskBuildError::MissingField {
                                name: name.to_string(),
                                field: "basename",
                            },
                        )?;
                        Self::walk_binding(basename, file, inputs)?;
                    }
                }
            }
            Value::Object(fields) => {
                for (key, nested) in fields {
                    if !nested.is_object() {
                        break;
                    }
                    Self::walk_binding(key, nested, inputs)?;
                }
            }
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if !item.is_object() {
                        break;
                    }
                    Self::walk_binding(&format!("{}[{}]", name, i), item, inputs)?;
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn is_file_binding(fields: &Map<String, Value>) -> bool {
        FILE_BINDING_FIELDS.iter().all(|f| fields.contains_key(*f))
    }

    /// One input parameter for a file binding; inline `contents` win over `location`
    fn input_parameter(name: &str, fields: &Map<String, Value>) -> Result<TesInput, TaskBuildError> {
        let string_field = |field: &'static str| {
            fields
                .get(field)
                .and_then(Value::as_str)
                .ok_or_else(|| TaskBuildError::InvalidField {
                    name: name.to_string(),
                    field,
                })
        };

        let source = if fields.contains_key("contents") {
            InputSource::Contents(string_field("contents")?.to_string())
        } else {
            InputSource::Url(string_field("location")?.to_string())
        };

        let class = string_field("class")?;
        let io_type = match class.to_uppercase().as_str() {
            "FILE" => IoType::File,
            "DIRECTORY" => IoType::Directory,
            _ => {
                return Err(TaskBuildError::UnsupportedClass {
                    name: name.to_string(),
                    class: class.to_string(),
                });
            }
        };

        Ok(TesInput {
            name: name.to_string(),
            description: format!("cwl_input:{}", name),
            source,
            path: string_field("path")?.to_string(),
            io_type: Some(io_type),
        })
    }

    /// Writes inline generated files to the job's tmpdir and references them
    fn materialize_generated_files(
        &self,
        job: &JobSpec,
        inputs: &mut Vec<TesInput>,
    ) -> Result<(), TaskBuildError> {
        for file in &job.generated_files {
            let location = match (&file.contents, &file.location) {
                (Some(contents), _) => {
                    let local = self.fs.join(&job.tmpdir, &file.basename);
                    self.fs
                        .write_all(&local, contents.as_bytes())
                        .map_err(|source| TaskBuildError::Materialize {
                            name: file.basename.clone(),
                            source,
                        })?;
                    local
                }
                (None, Some(location)) => location.clone(),
                (None, None) => {
                    return Err(TaskBuildError::EmptyGeneratedFile(file.basename.clone()));
                }
            };

            let url = self
                .fs
                .to_uri(&location)
                .map_err(|source| TaskBuildError::Materialize {
                    name: file.basename.clone(),
                    source,
                })?;

            inputs.push(TesInput {
                name: file.basename.clone(),
                description: format!("InitialWorkDirRequirement:cwl_input:{}", file.basename),
                source: InputSource::Url(url),
                path: self.container_path(&file.basename),
                io_type: Some(IoType::File),
            });
        }

        Ok(())
    }

    // =============================================================================
    // Outputs
    // =============================================================================

    /// stdout, stderr, the whole working directory, then any alternate
    /// container output directory
    pub fn collect_output_parameters(
        &self,
        job: &JobSpec,
    ) -> Result<Vec<TesOutput>, TaskBuildError> {
        let mut outputs = Vec::new();

        for (name, target) in [("stdout", &job.stdout), ("stderr", &job.stderr)] {
            if let Some(path) = target {
                outputs.push(TesOutput {
                    name: name.to_string(),
                    url: self.output_url(job, path)?,
                    path: self.container_path(path),
                    io_type: Some(IoType::File),
                });
            }
        }

        let outdir_url = self.output_url(job, "")?;
        outputs.push(TesOutput {
            name: "workdir".to_string(),
            url: outdir_url.clone(),
            path: self.docker_workdir.clone(),
            io_type: Some(IoType::Directory),
        });

        for requirement in &job.requirements {
            let Requirement::DockerRequirement(docker) = requirement else {
                continue;
            };
            if let Some(dir) = &docker.docker_output_directory {
                outputs.push(TesOutput {
                    name: "dockerOutputDirectory".to_string(),
                    url: outdir_url.clone(),
                    path: dir.clone(),
                    io_type: Some(IoType::Directory),
                });
            }
        }

        Ok(outputs)
    }

    /// URI of `outdir/<basename(path)>`; an empty path names `outdir/` itself
    fn output_url(&self, job: &JobSpec, path: &str) -> Result<String, TaskBuildError> {
        let basename = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let local = self.fs.join(&job.outdir, &basename);

        self.fs
            .to_uri(&local)
            .map_err(|source| TaskBuildError::Materialize {
                name: path.to_string(),
                source,
            })
    }

    fn container_path(&self, path: &str) -> String {
        self.fs.join(&self.docker_workdir, path)
    }

    // =============================================================================
    // Requirements
    // =============================================================================

    /// Resource hints from the last `ResourceRequirement`, minimum preferred
    ///
    /// TES counts whole cores, so fractional requests are rounded up.
    pub fn resources(job: &JobSpec) -> TesResources {
        let mut resources = TesResources::default();
        for requirement in &job.requirements {
            if let Requirement::ResourceRequirement(r) = requirement {
                resources = TesResources {
                    cpu_cores: r.cores().map(|c| c.ceil() as u32),
                    ram_gb: r.ram(),
                    disk_gb: r.disk(),
                };
            }
        }
        resources
    }

    /// `dockerPull` of the first `DockerRequirement` naming one, else the job's image
    fn image(job: &JobSpec) -> Result<String, TaskBuildError> {
        job.requirements
            .iter()
            .find_map(|r| match r {
                Requirement::DockerRequirement(docker) => docker.docker_pull.clone(),
                _ => None,
            })
            .or_else(|| job.image.clone())
            .ok_or_else(|| TaskBuildError::MissingImage(job.name.clone()))
    }
}
