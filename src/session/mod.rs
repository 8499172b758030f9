//! Key custody flows and the session-scoped private key.
//!
//! [`KeyCustodian`] ties key generation, envelope wrapping and the
//! [`KeyStore`] together into the registration, login and password-change
//! flows. A successful login yields a [`Session`], the only place an
//! unwrapped private key lives. The session is an explicit handle: it is
//! created by login, cleared by [`Session::logout`] or drop, and never
//! persisted.

use crate::config::Config;
use crate::crypto::password::derive_discarding;
use crate::crypto::{
    decrypt_with_session_key, unwrap_private_key, wrap_private_key_with, EncryptedSecret,
    KdfParams, KeyPair, Password, PrivateKey, PublicKey,
};
use crate::error::{Result, SealdropError};
use crate::keystore::{FileKeyStore, KeyStore, MemoryKeyStore};
use crate::validation::Validator;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

/// An authenticated session holding the unwrapped private key in memory.
///
/// Reads may happen concurrently from any number of threads. `logout`
/// clears the key for every holder, so sharing the session through an `Arc`
/// does not extend the key's lifetime past the session boundary.
pub struct Session {
    user_id: String,
    key: RwLock<Option<PrivateKey>>,
}

impl Session {
    fn open(user_id: &str, key: PrivateKey) -> Self {
        info!(
            user_id = user_id,
            key_id = format!("{:016X}", key.key_id()),
            "Session opened"
        );
        Self {
            user_id: user_id.to_string(),
            key: RwLock::new(Some(key)),
        }
    }

    fn key(&self) -> RwLockReadGuard<'_, Option<PrivateKey>> {
        // The guarded value is only ever replaced whole, so a poisoned lock
        // still holds either the key or nothing.
        self.key.read().unwrap_or_else(|e| e.into_inner())
    }

    /// The user this session belongs to
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// False once the session has been logged out
    pub fn is_active(&self) -> bool {
        self.key().is_some()
    }

    /// Identifier of the session key, if still active
    pub fn key_id(&self) -> Option<u64> {
        self.key().as_ref().map(PrivateKey::key_id)
    }

    /// Public half of the session key
    pub fn public_key(&self) -> Result<PublicKey> {
        match self.key().as_ref() {
            Some(key) => key.public_key(),
            None => Err(SealdropError::NoActiveSession),
        }
    }

    /// Decrypt a ciphertext addressed to this session's user
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        match self.key().as_ref() {
            Some(key) => decrypt_with_session_key(ciphertext, key),
            None => Err(SealdropError::NoActiveSession),
        }
    }

    /// Decrypt a relay record addressed to this session's user
    pub fn open_secret(&self, secret: &EncryptedSecret) -> Result<String> {
        self.decrypt(&secret.encrypted_data)
    }

    /// Drop the private key. Later decrypt calls fail with `NoActiveSession`.
    pub fn logout(&self) {
        let mut guard = self.key.write().unwrap_or_else(|e| e.into_inner());
        if guard.take().is_some() {
            info!(user_id = %self.user_id, "Session closed");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.logout();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Registration, login and password-change flows over a [`KeyStore`]
#[derive(Clone)]
pub struct KeyCustodian {
    store: Arc<dyn KeyStore>,
    kdf: KdfParams,
    /// Serializes record writes per user across clones of the custodian
    write_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl KeyCustodian {
    /// Create a custodian; `kdf` is used for every newly wrapped record
    pub fn new(store: Arc<dyn KeyStore>, kdf: KdfParams) -> Result<Self> {
        kdf.validate()?;
        Ok(Self {
            store,
            kdf,
            write_locks: Arc::default(),
        })
    }

    /// Custodian backed by the configured key directory
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Self::new(Arc::new(FileKeyStore::new(config.keys_dir())), config.kdf)
    }

    /// Custodian backed by an in-process store
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryKeyStore::new()),
            kdf: KdfParams::default(),
            write_locks: Arc::default(),
        }
    }

    /// Derivation parameters used for new records
    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    fn write_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(user_id.to_string()).or_default())
    }

    /// Load and unwrap the user's key.
    ///
    /// Every rejection (empty or wrong password, tampered, unreadable or
    /// missing record) is `Ok(None)` after a key derivation.
    fn unlock(&self, user_id: &str, password: &Password) -> Result<Option<PrivateKey>> {
        if password.is_empty() {
            derive_discarding(password, &self.kdf);
            return Ok(None);
        }

        let wrapped = match self.store.load(user_id) {
            Ok(wrapped) => wrapped,
            Err(SealdropError::MalformedEncoding(_)) => {
                warn!(user_id = user_id, "Stored key record is unreadable");
                None
            }
            Err(e) => return Err(e),
        };

        match wrapped {
            Some(wrapped) => Ok(unwrap_private_key(&wrapped, password)),
            None => {
                derive_discarding(password, &self.kdf);
                Ok(None)
            }
        }
    }

    /// Check whether `user_id` has a stored key
    pub fn has_key(&self, user_id: &str) -> Result<bool> {
        self.store.contains(user_id)
    }

    /// Generate a key pair for `user_id`, persist the wrapped private key and
    /// return the public key to publish.
    pub fn register(&self, user_id: &str, password: Password) -> Result<PublicKey> {
        self.register_with_rng(user_id, password, &mut OsRng)
    }

    /// [`register`](Self::register) with an explicit random source
    pub fn register_with_rng<R: CryptoRng + RngCore>(
        &self,
        user_id: &str,
        password: Password,
        rng: &mut R,
    ) -> Result<PublicKey> {
        Validator::validate_user_id(user_id)?;
        Validator::validate_password(&password)?;

        let lock = self.write_lock(user_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        if self.store.contains(user_id)? {
            return Err(SealdropError::keystore(format!(
                "User '{}' already has a stored key",
                user_id
            )));
        }

        let (public, private) = KeyPair::generate(rng)?.into_parts();
        let wrapped = wrap_private_key_with(&private, &password, self.kdf, rng)?;
        self.store.store(user_id, &wrapped)?;

        info!(
            user_id = user_id,
            key_id = format!("{:016X}", public.key_id()),
            kdf = %self.kdf.algorithm(),
            "Registered key pair"
        );

        Ok(public)
    }

    /// Unwrap the stored key into a new session.
    ///
    /// Returns `Ok(None)` for a wrong password, a tampered or unreadable
    /// record, and a missing record alike. A missing record still pays for
    /// one key derivation so the three cases take comparable time.
    pub fn login(&self, user_id: &str, password: Password) -> Result<Option<Session>> {
        match self.unlock(user_id, &password)? {
            Some(key) => Ok(Some(Session::open(user_id, key))),
            None => {
                debug!(user_id = user_id, "Login rejected");
                Ok(None)
            }
        }
    }

    /// Re-wrap the stored key under `new_password`.
    ///
    /// The record is replaced wholesale with a fresh salt and nonce. Returns
    /// `Ok(false)` whenever `old_password` does not unlock the current record,
    /// under the same rules as [`login`](Self::login). Concurrent changes for
    /// one user are applied one after another.
    pub fn change_password(
        &self,
        user_id: &str,
        old_password: Password,
        new_password: Password,
    ) -> Result<bool> {
        Validator::validate_password(&new_password)?;

        let lock = self.write_lock(user_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let Some(key) = self.unlock(user_id, &old_password)? else {
            debug!(user_id = user_id, "Password change rejected");
            return Ok(false);
        };

        let rewrapped = wrap_private_key_with(&key, &new_password, self.kdf, &mut OsRng)?;
        self.store.store(user_id, &rewrapped)?;

        info!(user_id = user_id, "Changed key password");
        Ok(true)
    }

    /// [`register`](Self::register) on the blocking thread pool
    pub async fn register_async(&self, user_id: String, password: Password) -> Result<PublicKey> {
        let custodian = self.clone();
        tokio::task::spawn_blocking(move || custodian.register(&user_id, password))
            .await
            .map_err(|e| SealdropError::task(format!("Registration task failed: {}", e)))?
    }

    /// [`login`](Self::login) on the blocking thread pool
    pub async fn login_async(&self, user_id: String, password: Password) -> Result<Option<Session>> {
        let custodian = self.clone();
        tokio::task::spawn_blocking(move || custodian.login(&user_id, password))
            .await
            .map_err(|e| SealdropError::task(format!("Login task failed: {}", e)))?
    }

    /// [`change_password`](Self::change_password) on the blocking thread pool
    pub async fn change_password_async(
        &self,
        user_id: String,
        old_password: Password,
        new_password: Password,
    ) -> Result<bool> {
        let custodian = self.clone();
        tokio::task::spawn_blocking(move || {
            custodian.change_password(&user_id, old_password, new_password)
        })
        .await
        .map_err(|e| SealdropError::task(format!("Password change task failed: {}", e)))?
    }
}

impl fmt::Debug for KeyCustodian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCustodian").field("kdf", &self.kdf).finish()
    }
}
