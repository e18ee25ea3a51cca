//! Output collection
//!
//! After a task finishes, the host engine turns the job's output directory
//! into output bindings. `OutputCollector` is that hook; plain closures work
//! too.

use serde_json::{Map, Value, json};
use std::sync::Arc;

use crate::error::CollectionError;
use crate::fs::FsAccess;

/// Output bindings keyed by output name
pub type OutputMap = Map<String, Value>;

/// Collects a job's outputs from its output directory
///
/// May block; the lifecycle controller runs it off the async workers.
pub trait OutputCollector: Send + Sync {
    fn collect(&self, outdir: &str) -> Result<OutputMap, CollectionError>;
}

impl<F> OutputCollector for F
where
    F: Fn(&str) -> Result<OutputMap, CollectionError> + Send + Sync,
{
    fn collect(&self, outdir: &str) -> Result<OutputMap, CollectionError> {
        self(outdir)
    }
}

/// Reports every regular file in the output directory as a `File` binding
/// named after the file
pub struct DirectoryListingCollector {
    fs: Arc<dyn FsAccess>,
}

impl DirectoryListingCollector {
    pub fn new(fs: Arc<dyn FsAccess>) -> Self {
        Self { fs }
    }
}

impl OutputCollector for DirectoryListingCollector {
    fn collect(&self, outdir: &str) -> Result<OutputMap, CollectionError> {
        let files = self.fs.list_files(outdir).map_err(|e| {
            if e.is_not_found() {
                CollectionError::Workflow(format!("output directory {} does not exist", outdir))
            } else {
                CollectionError::Unexpected(e.into())
            }
        })?;

        let mut outputs = Map::new();
        for name in files {
            let location = self
                .fs
                .to_uri(&self.fs.join(outdir, &name))
                .map_err(|e| CollectionError::Unexpected(e.into()))?;
            outputs.insert(
                name.clone(),
                json!({
                    "class": "File",
                    "location": location,
                    "basename": name,
                }),
            );
        }

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFsAccess;
    use tempfile::TempDir;

    #[test]
    fn test_lists_output_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("result.txt"), "42").unwrap();
        std::fs::create_dir(dir.path().join("scratch")).unwrap();

        let collector = DirectoryListingCollector::new(Arc::new(LocalFsAccess::new("/")));
        let outdir = dir.path().to_string_lossy().into_owned();
        let outputs = collector.collect(&outdir).unwrap();

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs["result.txt"]["class"], "File");
        assert_eq!(outputs["result.txt"]["basename"], "result.txt");
        assert_eq!(
            outputs["result.txt"]["location"],
            format!("file://{}/result.txt", outdir)
        );
    }

    #[test]
    fn test_missing_output_directory_is_workflow_error() {
        let dir = TempDir::new().unwrap();
        let collector = DirectoryListingCollector::new(Arc::new(LocalFsAccess::new(dir.path())));

        let err = collector.collect("never-created").unwrap_err();
        assert!(matches!(err, CollectionError::Workflow(_)));
    }

    #[test]
    fn test_closures_are_collectors() {
        let collector = |outdir: &str| -> Result<OutputMap, CollectionError> {
            let mut outputs = Map::new();
            outputs.insert("dir".to_string(), Value::String(outdir.to_string()));
            Ok(outputs)
        };

        let outputs = collector.collect("/out").unwrap();
        assert_eq!(outputs["dir"], "/out");
    }
}
