//! Blob stores for model artifacts

use crate::error::{ChurnError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use uuid::Uuid;

/// Keyed byte storage
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous value
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Read the bytes stored under `key`
    fn read(&self, key: &str) -> Result<Vec<u8>>;
}

/// Filesystem store; keys are paths relative to `root` (absolute keys are used as-is)
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl Default for FsBlobStore {
    fn default() -> Self {
        Self::new(".")
    }
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl BlobStore for FsBlobStore {
    /// Writes to a sibling temp file and renames it over the target, so
    /// readers see either the old or the new artifact.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());
        let tmp = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        fs::write(&tmp, bytes)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        fs::read(self.path(key)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ChurnError::ArtifactUnavailable {
                key: key.to_string(),
                reason: "not found".to_string(),
            },
            _ => ChurnError::Io(e),
        })
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.blobs.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ChurnError::ArtifactUnavailable {
                key: key.to_string(),
                reason: "not found".to_string(),
            })
    }
}
