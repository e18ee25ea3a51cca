//! File access abstraction
//!
//! The builder and the lifecycle controller only touch the filesystem
//! through `FsAccess`, so hosts can plug in their own storage.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot express {0} as a file URI")]
    InvalidPath(String),
}

impl FsError {
    /// Whether the underlying I/O error is "not found"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }

    fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Path and file operations used while building and cleaning up jobs
///
/// Implementations must be safe to share between concurrent workers.
pub trait FsAccess: Send + Sync {
    /// Join `name` onto `base`; an empty `name` yields `base` with a trailing separator
    fn join(&self, base: &str, name: &str) -> String;

    /// Open `path` for writing, truncating it
    fn open_write(&self, path: &str) -> Result<Box<dyn Write + Send>, FsError>;

    /// Resolve a location to a URI the remote executor can fetch
    fn to_uri(&self, location: &str) -> Result<String, FsError>;

    fn exists(&self, path: &str) -> bool;

    /// Names of the regular files directly inside `dir`, sorted
    fn list_files(&self, dir: &str) -> Result<Vec<String>, FsError>;

    /// Remove a directory tree; a missing tree is not an error
    fn remove_tree(&self, path: &str) -> Result<(), FsError>;

    /// Write `bytes` to `path` through `open_write`
    fn write_all(&self, path: &str, bytes: &[u8]) -> Result<(), FsError> {
        let mut sink = self.open_write(path)?;
        sink.write_all(bytes)
            .and_then(|_| sink.flush())
            .map_err(|e| FsError::io(path, e))
    }
}

/// `FsAccess` over the local filesystem, resolving relative paths against `basedir`
#[derive(Debug, Clone)]
pub struct LocalFsAccess {
    basedir: PathBuf,
}

impl LocalFsAccess {
    pub fn new(basedir: impl Into<PathBuf>) -> Self {
        Self {
            basedir: basedir.into(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, FsError> {
        let path = Path::new(path);
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.basedir.join(path)
        };
        std::path::absolute(&joined).map_err(|e| FsError::io(joined.to_string_lossy(), e))
    }
}

impl FsAccess for LocalFsAccess {
    fn join(&self, base: &str, name: &str) -> String {
        Path::new(base).join(name).to_string_lossy().into_owned()
    }

    fn open_write(&self, path: &str) -> Result<Box<dyn Write + Send>, FsError> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent).map_err(|e| FsError::io(path, e))?;
        }
        let file = fs::File::create(&resolved).map_err(|e| FsError::io(path, e))?;
        Ok(Box::new(file))
    }

    fn to_uri(&self, location: &str) -> Result<String, FsError> {
        if location.contains("://") {
            return Ok(location.to_string());
        }

        let resolved = self.resolve(location)?;
        let url = if location.ends_with('/') {
            Url::from_directory_path(&resolved)
        } else {
            Url::from_file_path(&resolved)
        };
        url.map(String::from)
            .map_err(|_| FsError::InvalidPath(location.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.exists()).unwrap_or(false)
    }

    fn list_files(&self, dir: &str) -> Result<Vec<String>, FsError> {
        let resolved = self.resolve(dir)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(&resolved).map_err(|e| FsError::io(dir, e))? {
            let entry = entry.map_err(|e| FsError::io(dir, e))?;
            let file_type = entry.file_type().map_err(|e| FsError::io(dir, e))?;
            if file_type.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn remove_tree(&self, path: &str) -> Result<(), FsError> {
        let resolved = self.resolve(path)?;
        match fs::remove_dir_all(&resolved) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FsError::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_join_with_empty_name_keeps_trailing_separator() {
        let fs = LocalFsAccess::new("/");
        assert_eq!(fs.join("/var/spool/cwl", "out.txt"), "/var/spool/cwl/out.txt");
        assert_eq!(fs.join("/out", ""), "/out/");
    }

    #[test]
    fn test_to_uri() {
        let fs = LocalFsAccess::new("/data");
        assert_eq!(fs.to_uri("/out/a b.txt").unwrap(), "file:///out/a%20b.txt");
        assert_eq!(fs.to_uri("/out/").unwrap(), "file:///out/");
        assert_eq!(fs.to_uri("inputs/x").unwrap(), "file:///data/inputs/x");
        assert_eq!(
            fs.to_uri("s3://bucket/key").unwrap(),
            "s3://bucket/key"
        );
    }

    #[test]
    fn test_write_all_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFsAccess::new(dir.path());

        fs.write_all("nested/deeper/file.txt", b"hello").unwrap();

        let written = std::fs::read_to_string(dir.path().join("nested/deeper/file.txt")).unwrap();
        assert_eq!(written, "hello");
        assert!(fs.exists("nested/deeper"));
    }

    #[test]
    fn test_list_files_skips_directories() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFsAccess::new(dir.path());
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        assert_eq!(fs.list_files(".").unwrap(), vec!["a.txt", "b.txt"]);
        assert!(matches!(fs.list_files("missing"), Err(FsError::Io { .. })));
    }

    #[test]
    fn test_remove_tree_ignores_missing_directory() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFsAccess::new(dir.path());

        std::fs::create_dir_all(dir.path().join("stage/sub")).unwrap();
        fs.remove_tree("stage").unwrap();
        assert!(!fs.exists("stage"));

        fs.remove_tree("stage").unwrap();
    }
}
