//! Public keyring of recipients.
//!
//! The keyring records the published public key of every user we may send
//! secrets to, indexed by user id. It is stored as a JSON file holding each
//! key in its published JWK form.

use crate::crypto::PublicKey;
use crate::error::{Result, SealdropError};
use crate::keystore::write_atomic;
use crate::validation::Validator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// A recipient's published key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
    /// Owner of the key
    pub user_id: String,
    /// The published public key
    pub public_key: PublicKey,
    /// When the key was added to this keyring
    pub added: DateTime<Utc>,
}

impl KeyEntry {
    /// Create an entry stamped with the current time
    pub fn new(user_id: impl Into<String>, public_key: PublicKey) -> Self {
        Self {
            user_id: user_id.into(),
            public_key,
            added: Utc::now(),
        }
    }

    /// Get the key ID
    pub fn key_id(&self) -> u64 {
        self.public_key.key_id()
    }
}

#[derive(Serialize, Deserialize)]
struct KeyringFile {
    version: u8,
    keys: Vec<KeyEntry>,
}

const KEYRING_FILE_VERSION: u8 = 1;

/// Public keyring indexed by user id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicKeyring {
    keys: BTreeMap<String, KeyEntry>,
}

impl PublicKeyring {
    /// Create a new empty public keyring
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a published JWK and add it for `user_id`
    pub fn add_published(&mut self, user_id: &str, jwk: &str) -> Result<&KeyEntry> {
        let public_key = PublicKey::from_jwk(jwk)?;
        self.add_key(KeyEntry::new(user_id, public_key))
    }

    /// Add a key entry to the keyring.
    ///
    /// Re-adding the key a user already has is a no-op; a different key for
    /// an existing user must go through [`replace_key`](Self::replace_key).
    pub fn add_key(&mut self, entry: KeyEntry) -> Result<&KeyEntry> {
        Validator::validate_user_id(&entry.user_id)?;

        if let Some(existing) = self.keys.get(&entry.user_id) {
            if existing.public_key != entry.public_key {
                return Err(SealdropError::keyring(format!(
                    "User '{}' already has a different key ({:016X})",
                    entry.user_id,
                    existing.key_id()
                )));
            }
        } else {
            debug!(
                user_id = %entry.user_id,
                key_id = format!("{:016X}", entry.key_id()),
                "Added public key"
            );
            self.keys.insert(entry.user_id.clone(), entry.clone());
        }

        self.keys
            .get(&entry.user_id)
            .ok_or_else(|| SealdropError::keyring("Key entry vanished after insert"))
    }

    /// Replace a user's key, returning the previous entry if there was one
    pub fn replace_key(&mut self, entry: KeyEntry) -> Result<Option<KeyEntry>> {
        Validator::validate_user_id(&entry.user_id)?;
        info!(
            user_id = %entry.user_id,
            key_id = format!("{:016X}", entry.key_id()),
            "Replaced public key"
        );
        Ok(self.keys.insert(entry.user_id.clone(), entry))
    }

    /// Get a user's entry
    pub fn get(&self, user_id: &str) -> Option<&KeyEntry> {
        self.keys.get(user_id)
    }

    /// Get a user's key by key ID
    pub fn get_by_key_id(&self, key_id: u64) -> Option<&KeyEntry> {
        self.keys.values().find(|entry| entry.key_id() == key_id)
    }

    /// Remove a user's key
    pub fn remove(&mut self, user_id: &str) -> Result<KeyEntry> {
        self.keys
            .remove(user_id)
            .ok_or_else(|| SealdropError::keyring(format!("No key for user '{}'", user_id)))
    }

    /// Entries whose user id contains `pattern`, ordered by user id
    pub fn search(&self, pattern: &str) -> Vec<&KeyEntry> {
        self.keys
            .values()
            .filter(|entry| entry.user_id.contains(pattern))
            .collect()
    }

    /// All entries, ordered by user id
    pub fn entries(&self) -> impl Iterator<Item = &KeyEntry> {
        self.keys.values()
    }

    /// Get the number of keys in the keyring
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if the keyring is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Write the keyring to `path`, creating parent directories as needed
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| {
                SealdropError::keyring(format!("Failed to create keyring directory: {}", e))
            })?;
        }

        let file = KeyringFile {
            version: KEYRING_FILE_VERSION,
            keys: self.keys.values().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| {
            SealdropError::serialization(format!("Failed to serialize public keyring: {}", e))
        })?;
        write_atomic(path, json.as_bytes())
            .map_err(|e| SealdropError::keyring(format!("Failed to write public keyring: {}", e)))?;

        debug!(path = %path.display(), keys = self.len(), "Saved public keyring");
        Ok(())
    }

    /// Read a keyring from `path`; a missing file yields an empty keyring
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }

        let json = fs::read_to_string(path)
            .map_err(|e| SealdropError::keyring(format!("Failed to read public keyring: {}", e)))?;
        let file: KeyringFile = serde_json::from_str(&json).map_err(|e| {
            SealdropError::serialization(format!("Failed to deserialize public keyring: {}", e))
        })?;

        if file.version != KEYRING_FILE_VERSION {
            return Err(SealdropError::keyring(format!(
                "Unsupported keyring version: {}",
                file.version
            )));
        }

        let mut keyring = Self::new();
        for entry in file.keys {
            keyring.add_key(entry)?;
        }
        Ok(keyring)
    }
}
