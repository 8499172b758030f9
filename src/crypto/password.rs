//! Password-based private key protection using PBKDF2/Argon2id and AES-256-GCM.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use argon2::Argon2;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use crate::codec;
use crate::crypto::keys::PrivateKey;
use crate::crypto::random_array;
use crate::error::{Result, SealdropError};

/// Salt size for password derivation (128 bits)
pub const SALT_SIZE: usize = 16;

/// AES-GCM nonce size (96 bits)
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size
pub const TAG_SIZE: usize = 16;

/// Current envelope format version
pub const ENVELOPE_VERSION: u8 = 1;

/// Fewest PBKDF2 iterations accepted when wrapping or unwrapping
pub const PBKDF2_MIN_ITERATIONS: u32 = 100_000;

/// Most PBKDF2 iterations accepted; bounds the work a tampered record can demand
pub const PBKDF2_MAX_ITERATIONS: u32 = 10_000_000;

/// Argon2id memory cost floor in KiB (19 MiB)
pub const ARGON2_MIN_MEMORY_KIB: u32 = 19 * 1024;

/// Argon2id memory cost ceiling in KiB (1 GiB)
pub const ARGON2_MAX_MEMORY_KIB: u32 = 1024 * 1024;

/// Argon2id pass count floor
pub const ARGON2_MIN_ITERATIONS: u32 = 2;

/// Argon2id pass count ceiling
pub const ARGON2_MAX_ITERATIONS: u32 = 64;

/// Argon2id lane ceiling
pub const ARGON2_MAX_PARALLELISM: u32 = 16;

const DERIVED_KEY_SIZE: usize = 32;

/// Password-based key derivation parameters, stored alongside every envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum KdfParams {
    /// PBKDF2-HMAC-SHA256
    Pbkdf2Sha256 {
        /// Iteration count
        iterations: u32,
    },
    /// Argon2id (version 0x13)
    Argon2id {
        /// Memory cost in KiB
        memory_kib: u32,
        /// Number of passes
        iterations: u32,
        /// Number of lanes
        parallelism: u32,
    },
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::pbkdf2_default()
    }
}

impl KdfParams {
    /// PBKDF2-HMAC-SHA256 with the minimum accepted iteration count
    pub fn pbkdf2_default() -> Self {
        Self::Pbkdf2Sha256 {
            iterations: PBKDF2_MIN_ITERATIONS,
        }
    }

    /// Argon2id with 19 MiB memory, 2 passes and a single lane
    pub fn argon2id_default() -> Self {
        Self::Argon2id {
            memory_kib: ARGON2_MIN_MEMORY_KIB,
            iterations: ARGON2_MIN_ITERATIONS,
            parallelism: 1,
        }
    }

    /// Returns the algorithm identifier for these parameters
    pub fn algorithm(&self) -> crate::crypto::Algorithm {
        match self {
            Self::Pbkdf2Sha256 { .. } => crate::crypto::Algorithm::Pbkdf2Sha256,
            Self::Argon2id { .. } => crate::crypto::Algorithm::Argon2id,
        }
    }

    /// Check the cost parameters against the accepted range
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Pbkdf2Sha256 { iterations } => {
                if !(PBKDF2_MIN_ITERATIONS..=PBKDF2_MAX_ITERATIONS).contains(&iterations) {
                    return Err(SealdropError::config(format!(
                        "PBKDF2 iterations must be between {} and {}, got {}",
                        PBKDF2_MIN_ITERATIONS, PBKDF2_MAX_ITERATIONS, iterations
                    )));
                }
            }
            Self::Argon2id {
                memory_kib,
                iterations,
                parallelism,
            } => {
                if !(ARGON2_MIN_MEMORY_KIB..=ARGON2_MAX_MEMORY_KIB).contains(&memory_kib) {
                    return Err(SealdropError::config(format!(
                        "Argon2id memory must be between {} and {} KiB, got {}",
                        ARGON2_MIN_MEMORY_KIB, ARGON2_MAX_MEMORY_KIB, memory_kib
                    )));
                }
                if !(ARGON2_MIN_ITERATIONS..=ARGON2_MAX_ITERATIONS).contains(&iterations) {
                    return Err(SealdropError::config(format!(
                        "Argon2id iterations must be between {} and {}, got {}",
                        ARGON2_MIN_ITERATIONS, ARGON2_MAX_ITERATIONS, iterations
                    )));
                }
                if !(1..=ARGON2_MAX_PARALLELISM).contains(&parallelism) {
                    return Err(SealdropError::config(format!(
                        "Argon2id parallelism must be between 1 and {}, got {}",
                        ARGON2_MAX_PARALLELISM, parallelism
                    )));
                }
            }
        }
        Ok(())
    }

    /// Derive a 256-bit key from `password` and `salt`
    fn derive(&self, password: &Password, salt: &[u8]) -> Result<Zeroizing<[u8; DERIVED_KEY_SIZE]>> {
        self.validate()?;
        let mut out = Zeroizing::new([0u8; DERIVED_KEY_SIZE]);

        match *self {
            Self::Pbkdf2Sha256 { iterations } => {
                pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out[..]);
            }
            Self::Argon2id {
                memory_kib,
                iterations,
                parallelism,
            } => {
                let params =
                    argon2::Params::new(memory_kib, iterations, parallelism, Some(DERIVED_KEY_SIZE))
                        .map_err(|e| {
                            SealdropError::config(format!("Invalid Argon2 parameters: {}", e))
                        })?;
                Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params)
                    .hash_password_into(password.as_bytes(), salt, &mut out[..])
                    .map_err(|e| SealdropError::password(format!("Password hashing failed: {}", e)))?;
            }
        }

        Ok(out)
    }
}

/// A caller-supplied password.
///
/// Owned, never cloned implicitly, redacted in `Debug`, and zeroized when
/// dropped. Custody operations take it by value so the credential does not
/// outlive the call that consumes it.
pub struct Password(String);

impl Password {
    /// Create a new password from a string
    pub fn new(password: String) -> Self {
        Self(password)
    }

    /// Get password as bytes
    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Check if password is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Password length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Constant-time comparison with another password
    pub fn matches(&self, other: &Password) -> bool {
        crate::crypto::TimingSafe::bytes_equal(self.as_bytes(), other.as_bytes())
    }
}

impl From<&str> for Password {
    fn from(password: &str) -> Self {
        Self(password.to_string())
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

impl Drop for Password {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Persisted, password-protected private key
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EnvelopeRecord", into = "EnvelopeRecord")]
pub struct WrappedPrivateKey {
    version: u8,
    kdf: KdfParams,
    salt: [u8; SALT_SIZE],
    nonce: [u8; NONCE_SIZE],
    /// Encrypted key bytes followed by the AES-GCM tag
    ciphertext: Vec<u8>,
}

/// Storage layout with each binary field base64 encoded
#[derive(Serialize, Deserialize)]
struct EnvelopeRecord {
    version: u8,
    kdf: KdfParams,
    salt: String,
    nonce: String,
    ciphertext: String,
}

impl From<WrappedPrivateKey> for EnvelopeRecord {
    fn from(wrapped: WrappedPrivateKey) -> Self {
        Self {
            version: wrapped.version,
            kdf: wrapped.kdf,
            salt: codec::encode(&wrapped.salt),
            nonce: codec::encode(&wrapped.nonce),
            ciphertext: codec::encode(&wrapped.ciphertext),
        }
    }
}

impl TryFrom<EnvelopeRecord> for WrappedPrivateKey {
    type Error = SealdropError;

    fn try_from(record: EnvelopeRecord) -> Result<Self> {
        if record.version != ENVELOPE_VERSION {
            return Err(SealdropError::malformed_encoding(format!(
                "Unsupported envelope version {}",
                record.version
            )));
        }

        let salt: [u8; SALT_SIZE] = codec::decode(&record.salt)?
            .try_into()
            .map_err(|_| SealdropError::malformed_encoding("Salt must be 16 bytes"))?;
        let nonce: [u8; NONCE_SIZE] = codec::decode(&record.nonce)?
            .try_into()
            .map_err(|_| SealdropError::malformed_encoding("Nonce must be 12 bytes"))?;
        let ciphertext = codec::decode(&record.ciphertext)?;
        if ciphertext.len() < TAG_SIZE {
            return Err(SealdropError::malformed_encoding(
                "Ciphertext shorter than the authentication tag",
            ));
        }

        Ok(Self {
            version: record.version,
            kdf: record.kdf,
            salt,
            nonce,
            ciphertext,
        })
    }
}

impl WrappedPrivateKey {
    /// Encrypt `plaintext` under a key derived from `password`.
    ///
    /// Salt and nonce are drawn fresh on every call, so wrapping the same
    /// bytes with the same password never repeats.
    pub fn seal<R: CryptoRng + RngCore + ?Sized>(
        plaintext: &[u8],
        password: &Password,
        kdf: KdfParams,
        rng: &mut R,
    ) -> Result<Self> {
        if password.is_empty() {
            return Err(SealdropError::password("Password cannot be empty"));
        }
        kdf.validate()?;

        let salt: [u8; SALT_SIZE] = random_array(rng)?;
        let nonce: [u8; NONCE_SIZE] = random_array(rng)?;

        let derived_key = kdf.derive(password, &salt)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&derived_key[..]));

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| SealdropError::password("Failed to encrypt private key"))?;

        Ok(Self {
            version: ENVELOPE_VERSION,
            kdf,
            salt,
            nonce,
            ciphertext,
        })
    }

    /// Decrypt with `password`.
    ///
    /// Every failure (empty or wrong password, tampered fields, parameters
    /// outside the accepted range) returns `None`.
    pub fn open(&self, password: &Password) -> Option<Zeroizing<Vec<u8>>> {
        // Derive before looking at the password so an empty one costs the
        // same as a wrong one.
        let derived_key = self.kdf.derive(password, &self.salt).ok()?;
        if password.is_empty() {
            return None;
        }
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&derived_key[..]));

        cipher
            .decrypt(Nonce::from_slice(&self.nonce), self.ciphertext.as_ref())
            .ok()
            .map(Zeroizing::new)
    }

    /// Parse the stored JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SealdropError::malformed_encoding(format!("Invalid wrapped key record: {}", e)))
    }

    /// Produce the stored JSON form
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SealdropError::serialization(format!("Failed to encode wrapped key: {}", e)))
    }

    /// Envelope format version
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Key derivation parameters used for this envelope
    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    /// Derivation salt
    pub fn salt(&self) -> &[u8; SALT_SIZE] {
        &self.salt
    }

    /// AES-GCM nonce
    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// Encrypted key bytes including the tag
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Get the size of the encrypted data
    pub fn encrypted_size(&self) -> usize {
        self.ciphertext.len()
    }
}

impl fmt::Debug for WrappedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedPrivateKey")
            .field("version", &self.version)
            .field("kdf", &self.kdf)
            .field("encrypted_size", &self.ciphertext.len())
            .finish()
    }
}

/// Wrap a private key with the default derivation parameters and the OS RNG
pub fn wrap_private_key(private_key: &PrivateKey, password: &Password) -> Result<WrappedPrivateKey> {
    wrap_private_key_with(private_key, password, KdfParams::default(), &mut OsRng)
}

/// Wrap a private key with explicit derivation parameters and RNG
pub fn wrap_private_key_with<R: CryptoRng + RngCore + ?Sized>(
    private_key: &PrivateKey,
    password: &Password,
    kdf: KdfParams,
    rng: &mut R,
) -> Result<WrappedPrivateKey> {
    let der = private_key.to_pkcs8_der()?;
    let wrapped = WrappedPrivateKey::seal(&der, password, kdf, rng)?;

    debug!(
        key_id = format!("{:016X}", private_key.key_id()),
        kdf = %kdf.algorithm(),
        encrypted_size = wrapped.encrypted_size(),
        "Wrapped private key"
    );

    Ok(wrapped)
}

/// Recover a private key, or `None` when the password is wrong or the record
/// does not authenticate.
pub fn unwrap_private_key(wrapped: &WrappedPrivateKey, password: &Password) -> Option<PrivateKey> {
    let unwrapped = wrapped
        .open(password)
        .and_then(|der| PrivateKey::from_pkcs8_der(&der).ok());

    match &unwrapped {
        Some(key) => debug!(key_id = format!("{:016X}", key.key_id()), "Unwrapped private key"),
        None => debug!("Private key unwrap rejected"),
    }

    unwrapped
}

/// Spend one derivation's worth of work without a record, so that a missing
/// record costs the same as a wrong password.
pub(crate) fn derive_discarding(password: &Password, kdf: &KdfParams) {
    let dummy_salt = [0u8; SALT_SIZE];
    let _ = kdf.derive(password, &dummy_salt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::fixtures::alice;
    use crate::crypto::test_rng::{FailingRng, ZeroRng};

    #[test]
    fn test_password_encryption_decryption() {
        let password = Password::from("test_password_123!");
        let private_key_data = b"secret private key data for testing";

        let encrypted =
            WrappedPrivateKey::seal(private_key_data, &password, KdfParams::default(), &mut OsRng)
                .expect("Encryption should succeed");
        assert_eq!(encrypted.encrypted_size(), private_key_data.len() + TAG_SIZE);

        let decrypted = encrypted.open(&password).expect("Decryption should succeed");
        assert_eq!(decrypted.as_slice(), private_key_data);
    }

    #[test]
    fn test_wrong_password_returns_none() {
        let password = Password::from("correct_password");
        let wrong_password = Password::from("wrong_password");

        let encrypted =
            WrappedPrivateKey::seal(b"secret data", &password, KdfParams::default(), &mut OsRng)
                .unwrap();

        assert!(encrypted.open(&wrong_password).is_none());
        assert!(encrypted.open(&Password::from("")).is_none());
    }

    #[test]
    fn test_empty_password_fails() {
        let result =
            WrappedPrivateKey::seal(b"secret data", &Password::from(""), KdfParams::default(), &mut OsRng);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Password cannot be empty"));
    }

    #[test]
    fn test_weak_kdf_rejected() {
        let weak = KdfParams::Pbkdf2Sha256 { iterations: 1000 };
        let result = WrappedPrivateKey::seal(b"data", &Password::from("pw"), weak, &mut OsRng);
        assert!(matches!(result, Err(SealdropError::Config(_))));

        let weak_argon = KdfParams::Argon2id {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        };
        assert!(weak_argon.validate().is_err());
        assert!(KdfParams::argon2id_default().validate().is_ok());
        assert!(KdfParams::pbkdf2_default().validate().is_ok());
    }

    #[test]
    fn test_weak_randomness_aborts_wrap() {
        let password = Password::from("pw");
        for result in [
            WrappedPrivateKey::seal(b"data", &password, KdfParams::default(), &mut FailingRng),
            WrappedPrivateKey::seal(b"data", &password, KdfParams::default(), &mut ZeroRng),
        ] {
            assert!(matches!(result, Err(SealdropError::WeakRandomSource(_))));
        }
    }

    #[test]
    fn test_fresh_salt_and_nonce_per_wrap() {
        let password = Password::from("same_password");
        let key = alice().private_key();

        let first = wrap_private_key(key, &password).unwrap();
        let second = wrap_private_key(key, &password).unwrap();

        assert_ne!(first.salt(), second.salt());
        assert_ne!(first.nonce(), second.nonce());
        assert_ne!(first.ciphertext(), second.ciphertext());

        assert_eq!(unwrap_private_key(&first, &password).as_ref(), Some(key));
        assert_eq!(unwrap_private_key(&second, &password).as_ref(), Some(key));
    }

    #[test]
    fn test_argon2id_envelope() {
        let password = Password::from("argon password");
        let key = alice().private_key();

        let wrapped =
            wrap_private_key_with(key, &password, KdfParams::argon2id_default(), &mut OsRng).unwrap();
        assert_eq!(wrapped.kdf(), &KdfParams::argon2id_default());
        assert_eq!(unwrap_private_key(&wrapped, &password).as_ref(), Some(key));
        assert!(unwrap_private_key(&wrapped, &Password::from("other")).is_none());
    }

    #[test]
    fn test_json_record_layout() {
        let wrapped =
            WrappedPrivateKey::seal(b"payload", &Password::from("pw"), KdfParams::default(), &mut OsRng)
                .unwrap();
        let json = wrapped.to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["kdf"]["algorithm"], "pbkdf2-sha256");
        assert_eq!(value["kdf"]["iterations"], 100_000);
        assert_eq!(codec::decode(value["salt"].as_str().unwrap()).unwrap().len(), SALT_SIZE);
        assert_eq!(codec::decode(value["nonce"].as_str().unwrap()).unwrap().len(), NONCE_SIZE);

        let parsed = WrappedPrivateKey::from_json(&json).unwrap();
        assert_eq!(parsed, wrapped);
    }

    #[test]
    fn test_malformed_records_rejected() {
        let wrapped =
            WrappedPrivateKey::seal(b"payload", &Password::from("pw"), KdfParams::default(), &mut OsRng)
                .unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&wrapped.to_json().unwrap()).unwrap();

        let mut bad_salt = value.clone();
        bad_salt["salt"] = serde_json::Value::from(codec::encode(&[1u8; 8]));
        let mut bad_nonce = value.clone();
        bad_nonce["nonce"] = serde_json::Value::from("not base64!");
        let mut bad_version = value.clone();
        bad_version["version"] = serde_json::Value::from(9);
        value["ciphertext"] = serde_json::Value::from(codec::encode(&[0u8; 4]));

        for record in [bad_salt, bad_nonce, bad_version, value] {
            let result = WrappedPrivateKey::from_json(&record.to_string());
            assert!(matches!(result, Err(SealdropError::MalformedEncoding(_))));
        }
    }

    #[test]
    fn test_password_debug_redacted() {
        let password = Password::from("hunter2");
        assert_eq!(format!("{:?}", password), "Password(<redacted>)");
        assert_eq!(password.len(), 7);
        assert!(password.matches(&Password::from("hunter2")));
        assert!(!password.matches(&Password::from("hunter3")));
    }
}
