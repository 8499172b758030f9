//! Cryptographic primitives for sealdrop.
//!
//! - **RSA-OAEP (2048-bit, SHA-256)**: direct public-key encryption of short secrets
//! - **PBKDF2-HMAC-SHA256 / Argon2id**: password-based key derivation
//! - **AES-256-GCM**: authenticated wrapping of the private key at rest
//! - **SHA3-256**: public key fingerprints

use crate::error::{Result, SealdropError};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::fmt;

pub mod encryption;
pub mod keys;
pub mod password;
pub mod timing;

pub use encryption::{
    decrypt_with_session_key, encrypt_for_recipient, encrypt_with_public_key, max_message_len,
    EncryptedSecret, ShareSecretRequest,
};
pub use keys::{KeyPair, PrivateKey, PublicKey, PublicJwk};
pub use password::{
    unwrap_private_key, wrap_private_key, wrap_private_key_with, KdfParams, Password,
    WrappedPrivateKey,
};
pub use timing::TimingSafe;

/// RSA modulus size for generated key pairs
pub const RSA_MODULUS_BITS: usize = 2048;

/// Smallest recipient modulus accepted for encryption (112-bit security)
pub const MIN_RSA_MODULUS_BITS: usize = 2048;

/// Largest recipient modulus accepted for encryption
pub const MAX_RSA_MODULUS_BITS: usize = 4096;

/// Output size of the OAEP hash (SHA-256) in bytes
pub const OAEP_HASH_LEN: usize = 32;

/// Supported algorithm identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    /// RSA-OAEP with SHA-256 for message encryption
    RsaOaep2048Sha256,
    /// AES-256-GCM for private key wrapping
    Aes256Gcm,
    /// PBKDF2-HMAC-SHA256 password derivation
    Pbkdf2Sha256,
    /// Argon2id password derivation
    Argon2id,
}

impl Algorithm {
    /// Returns the algorithm name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::RsaOaep2048Sha256 => "RSA-OAEP-256",
            Algorithm::Aes256Gcm => "AES-256-GCM",
            Algorithm::Pbkdf2Sha256 => "PBKDF2-HMAC-SHA256",
            Algorithm::Argon2id => "Argon2id",
        }
    }

    /// Returns true if the algorithm derives keys from passwords
    pub fn is_password_kdf(&self) -> bool {
        matches!(self, Algorithm::Pbkdf2Sha256 | Algorithm::Argon2id)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// SHA3-256 digest of arbitrary data
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Fill `buf` from a cryptographically secure source.
///
/// Errors from the generator and obviously degraded output (a block of one
/// repeated byte) both map to [`SealdropError::WeakRandomSource`]. Callers
/// must abort rather than continue with weaker randomness.
pub fn fill_random<R: CryptoRng + RngCore + ?Sized>(rng: &mut R, buf: &mut [u8]) -> Result<()> {
    rng.try_fill_bytes(buf)
        .map_err(|e| SealdropError::weak_random_source(format!("Random source failed: {}", e)))?;

    if buf.len() >= 8 && buf.iter().all(|&b| b == buf[0]) {
        return Err(SealdropError::weak_random_source(
            "Random source returned constant output",
        ));
    }

    Ok(())
}

/// Draw a fixed-size array of random bytes.
pub fn random_array<const N: usize, R: CryptoRng + RngCore + ?Sized>(rng: &mut R) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    fill_random(rng, &mut out)?;
    Ok(out)
}

/// Health check run before the generator is handed to code that cannot
/// report failures itself (RSA key generation, OAEP padding).
pub fn probe_rng<R: CryptoRng + RngCore + ?Sized>(rng: &mut R) -> Result<()> {
    let _probe: [u8; 32] = random_array(rng)?;
    Ok(())
}
