//! services/api/src/adapters/file_store.rs
//!
//! A `SnapshotStore` that keeps one small file per key inside a per-device
//! directory. Writes go through a temporary file and a rename, so a crash never
//! leaves a half-written snapshot behind.

use gramatica_core::ports::{PortError, PortResult, SnapshotStore};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Device ids and keys become path segments, so only a safe alphabet is allowed.
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment.len() <= 64
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Opens the store of `device_id` under `root`. Nothing is created on disk
    /// until the first save.
    pub fn for_device(root: &Path, device_id: &str) -> PortResult<Self> {
        if !is_valid_segment(device_id) {
            return Err(PortError::InvalidResponse(format!(
                "Invalid device id: '{}'",
                device_id
            )));
        }
        Ok(Self {
            dir: root.join(device_id),
        })
    }

    fn path_for(&self, key: &str) -> PortResult<PathBuf> {
        if !is_valid_segment(key) {
            return Err(PortError::Unexpected(format!("Invalid storage key: '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, key: &str, blob: &str) -> PortResult<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(|e| PortError::Unexpected(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, blob).map_err(|e| PortError::Unexpected(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| PortError::Unexpected(e.to_string()))
    }

    fn load(&self, key: &str) -> PortResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }

    fn delete(&self, key: &str) -> PortResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }
}
