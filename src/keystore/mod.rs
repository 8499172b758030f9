//! Local persistence of wrapped private keys.
//!
//! Each user has exactly one [`WrappedPrivateKey`] record, stored under a
//! fixed name. Records are replaced wholesale (on registration or password
//! change) and never patched in place.

use crate::crypto::WrappedPrivateKey;
use crate::error::{Result, SealdropError};
use crate::validation::Validator;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;
use tracing::debug;

/// Fixed record name for a user's wrapped private key
pub const WRAPPED_KEY_RECORD: &str = "secure_private_key.json";

/// Storage backend for wrapped private keys
pub trait KeyStore: Send + Sync {
    /// Load the user's record, if any
    fn load(&self, user_id: &str) -> Result<Option<WrappedPrivateKey>>;

    /// Replace the user's record
    fn store(&self, user_id: &str, wrapped: &WrappedPrivateKey) -> Result<()>;

    /// Delete the user's record; missing records are not an error
    fn remove(&self, user_id: &str) -> Result<()>;

    /// Check whether a record exists
    fn contains(&self, user_id: &str) -> Result<bool> {
        Ok(self.load(user_id)?.is_some())
    }
}

/// Directory-backed store: `<root>/<user_id>/secure_private_key.json`
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    root: PathBuf,
}

impl FileKeyStore {
    /// Create a store rooted at `root`; the directory is created on first write
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, user_id: &str) -> Result<PathBuf> {
        Validator::validate_user_id(user_id)?;
        Ok(self.root.join(user_id).join(WRAPPED_KEY_RECORD))
    }
}

impl KeyStore for FileKeyStore {
    fn load(&self, user_id: &str) -> Result<Option<WrappedPrivateKey>> {
        let path = self.record_path(user_id)?;
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .map_err(|e| SealdropError::keystore(format!("Failed to read wrapped key: {}", e)))?;
        WrappedPrivateKey::from_json(&json).map(Some)
    }

    fn store(&self, user_id: &str, wrapped: &WrappedPrivateKey) -> Result<()> {
        let path = self.record_path(user_id)?;
        let dir = path
            .parent()
            .ok_or_else(|| SealdropError::keystore("Record path has no parent directory"))?;
        fs::create_dir_all(dir)
            .map_err(|e| SealdropError::keystore(format!("Failed to create key directory: {}", e)))?;

        let json = wrapped.to_json()?;
        write_atomic(&path, json.as_bytes())
            .map_err(|e| SealdropError::keystore(format!("Failed to replace wrapped key: {}", e)))?;

        debug!(user_id = user_id, path = %path.display(), "Stored wrapped private key");
        Ok(())
    }

    fn remove(&self, user_id: &str) -> Result<()> {
        let path = self.record_path(user_id)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(user_id = user_id, "Removed wrapped private key");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SealdropError::keystore(format!(
                "Failed to remove wrapped key: {}",
                e
            ))),
        }
    }
}

/// Replace `path` with `contents` so readers see the old file or the new
/// one, never a partial write.
///
/// Each call writes its own uniquely named owner-only file beside the
/// target, syncs it and renames it into place.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    records: Mutex<HashMap<String, WrappedPrivateKey>>,
}

impl MemoryKeyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, WrappedPrivateKey>> {
        // Every mutation is a single insert or remove, so a poisoned map is
        // still consistent.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self, user_id: &str) -> Result<Option<WrappedPrivateKey>> {
        Ok(self.records().get(user_id).cloned())
    }

    fn store(&self, user_id: &str, wrapped: &WrappedPrivateKey) -> Result<()> {
        Validator::validate_user_id(user_id)?;
        self.records().insert(user_id.to_string(), wrapped.clone());
        Ok(())
    }

    fn remove(&self, user_id: &str) -> Result<()> {
        self.records().remove(user_id);
        Ok(())
    }
}
