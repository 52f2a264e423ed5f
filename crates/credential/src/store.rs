//! File-backed JSON credential store.
//!
//! Every save rewrites the whole file through a sibling temp file followed by
//! a rename, so readers never observe a half-written store. There is no
//! cross-process locking: two processes sharing one file race on
//! read-modify-write and the last rename wins.

use crate::error::{CredentialError, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::{
    io::Write,
    path::{Path, PathBuf},
};

/// A single JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    /// Create a store handle. The file is not touched until load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read and decode the document. Fails if the file is missing.
    pub fn load<T: DeserializeOwned>(&self) -> Result<T> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| self.io(source))?;
        serde_json::from_str(&content).map_err(|source| CredentialError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    /// Read the document if the file exists.
    pub fn load_optional<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        if !self.exists() {
            return Ok(None);
        }
        self.load().map(Some)
    }

    /// Replace the whole document atomically.
    pub fn save<T: Serialize>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(value).map_err(|source| CredentialError::Malformed {
            path: self.path.clone(),
            source,
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|source| self.io(source))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|source| self.io(source))?;
        tmp.write_all(&json).map_err(|source| self.io(source))?;
        tmp.as_file().sync_all().map_err(|source| self.io(source))?;
        tmp.persist(&self.path).map_err(|e| self.io(e.error))?;
        tracing::trace!("saved credential store {}", self.path.display());
        Ok(())
    }

    fn io(&self, source: std::io::Error) -> CredentialError {
        CredentialError::Store {
            path: self.path.clone(),
            source,
        }
    }
}
