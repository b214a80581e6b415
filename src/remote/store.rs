//! Object storage that stages remote exports.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Errors raised by object stores.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Object store request failed for {key}: {message}")]
    Request { key: String, message: String },

    #[error("Failed to start object store runtime: {0}")]
    Runtime(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A bucket-like store addressed by string keys.
pub trait ObjectStore {
    /// Upload a local file under `key`, replacing any previous object.
    fn upload(&self, local: &Path, key: &str) -> StorageResult<()>;

    /// Delete the object under `key`. Deleting a missing object succeeds.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// URI under which the engine reads the object stored at `key`.
    fn uri(&self, key: &str) -> String;

    /// Statements the engine must run before it can read [`ObjectStore::uri`].
    fn load_prelude(&self) -> Option<&str> {
        None
    }
}

/// Object store backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of the object stored at `key`.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ObjectStore for LocalObjectStore {
    fn upload(&self, local: &Path, key: &str) -> StorageResult<()> {
        let target = self.path(key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::copy(local, &target).map_err(|source| StorageError::Io {
            path: target.clone(),
            source,
        })?;
        tracing::debug!(key, path = %target.display(), "stored object");
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let target = self.path(key);
        match fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                path: target,
                source,
            }),
        }
    }

    fn uri(&self, key: &str) -> String {
        self.path(key).display().to_string()
    }
}
