//! Direct RSA-OAEP/SHA-256 encryption of short secrets.
//!
//! Each secret is encrypted whole under the recipient's public key. OAEP
//! bounds the plaintext to `modulus_bytes - 2 * 32 - 2` bytes (190 for the
//! 2048-bit keys this crate generates); longer messages are rejected with
//! [`SealdropError::MessageTooLarge`] instead of being split or truncated.

use crate::codec;
use crate::crypto::keys::{PrivateKey, PublicKey};
use crate::crypto::probe_rng;
use crate::error::{Result, SealdropError};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use rsa::traits::PublicKeyParts;
use rsa::Oaep;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

/// Largest plaintext, in bytes, accepted for `recipient`
pub fn max_message_len(recipient: &PublicKey) -> usize {
    recipient.max_plaintext_len()
}

/// Encrypt `plaintext` for the holder of the published JWK `recipient_jwk`.
///
/// The key is imported and validated first, so malformed or foreign key
/// material fails with [`SealdropError::InvalidKey`] before any encryption.
pub fn encrypt_for_recipient(plaintext: &str, recipient_jwk: &str) -> Result<String> {
    let recipient = PublicKey::from_jwk(recipient_jwk)?;
    encrypt_with_public_key(plaintext, &recipient)
}

/// Encrypt `plaintext` under an imported public key, returning base64 text
pub fn encrypt_with_public_key(plaintext: &str, recipient: &PublicKey) -> Result<String> {
    encrypt_with_rng(plaintext, recipient, &mut OsRng)
}

/// Encrypt with an explicit RNG for the OAEP seed
pub fn encrypt_with_rng<R: CryptoRng + RngCore>(
    plaintext: &str,
    recipient: &PublicKey,
    rng: &mut R,
) -> Result<String> {
    let message = plaintext.as_bytes();
    let max = recipient.max_plaintext_len();
    if message.len() > max {
        return Err(SealdropError::MessageTooLarge {
            len: message.len(),
            max,
        });
    }

    probe_rng(rng)?;

    let ciphertext = recipient
        .as_rsa()
        .encrypt(rng, Oaep::new::<Sha256>(), message)
        .map_err(|e| SealdropError::invalid_key(format!("Encryption failed: {}", e)))?;

    debug!(
        recipient_key_id = format!("{:016X}", recipient.key_id()),
        plaintext_len = message.len(),
        ciphertext_len = ciphertext.len(),
        "Encrypted message"
    );

    Ok(codec::encode(&ciphertext))
}

/// Decrypt base64 `ciphertext` with the session's private key.
///
/// Text that is not valid base64 yields [`SealdropError::MalformedEncoding`].
/// Every other failure (wrong key, wrong length, padding, non-UTF-8 result)
/// yields the same [`SealdropError::DecryptionFailed`].
pub fn decrypt_with_session_key(ciphertext: &str, private_key: &PrivateKey) -> Result<String> {
    let bytes = codec::decode(ciphertext)?;

    let rsa_key = private_key.as_rsa();
    if bytes.len() != rsa_key.size() {
        debug!("Message decryption rejected");
        return Err(SealdropError::DecryptionFailed);
    }

    let plaintext = match rsa_key.decrypt(Oaep::new::<Sha256>(), &bytes) {
        Ok(plaintext) => Zeroizing::new(plaintext),
        Err(_) => {
            debug!("Message decryption rejected");
            return Err(SealdropError::DecryptionFailed);
        }
    };

    match std::str::from_utf8(&plaintext) {
        Ok(text) => Ok(text.to_string()),
        Err(_) => {
            debug!("Message decryption rejected");
            Err(SealdropError::DecryptionFailed)
        }
    }
}

/// A secret as stored and indexed by the relay.
///
/// The relay sees ids, timestamps and the read flag; `encrypted_data` is
/// opaque to everyone but the receiver.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedSecret {
    /// Relay-assigned identifier, absent until stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Sending user
    pub sender_id: u64,
    /// Receiving user
    pub receiver_id: u64,
    /// Base64 RSA-OAEP ciphertext under the receiver's public key
    pub encrypted_data: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Whether the receiver has opened the secret
    #[serde(default)]
    pub is_read: bool,
}

/// Body posted to the relay when sharing a secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareSecretRequest {
    /// Receiving user
    pub receiver_id: u64,
    /// Base64 ciphertext
    pub encrypted_data: String,
}

impl EncryptedSecret {
    /// Encrypt `plaintext` for `receiver_id` and build the relay record
    pub fn seal(
        sender_id: u64,
        receiver_id: u64,
        plaintext: &str,
        receiver_key: &PublicKey,
    ) -> Result<Self> {
        let encrypted_data = encrypt_with_public_key(plaintext, receiver_key)?;
        Ok(Self {
            id: None,
            sender_id,
            receiver_id,
            encrypted_data,
            created_at: Utc::now(),
            is_read: false,
        })
    }

    /// Decrypt with the receiver's private key
    pub fn open(&self, private_key: &PrivateKey) -> Result<String> {
        decrypt_with_session_key(&self.encrypted_data, private_key)
    }

    /// Flag the secret as read
    pub fn mark_read(&mut self) {
        self.is_read = true;
    }

    /// Request body for the relay's share endpoint
    pub fn share_request(&self) -> ShareSecretRequest {
        ShareSecretRequest {
            receiver_id: self.receiver_id,
            encrypted_data: self.encrypted_data.clone(),
        }
    }
}

impl fmt::Debug for EncryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedSecret")
            .field("id", &self.id)
            .field("sender_id", &self.sender_id)
            .field("receiver_id", &self.receiver_id)
            .field("encrypted_size", &self.encrypted_data.len())
            .field("created_at", &self.created_at)
            .field("is_read", &self.is_read)
            .finish()
    }
}
