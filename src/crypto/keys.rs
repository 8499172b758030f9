//! RSA-OAEP key generation, publication and canonical serialization.
//!
//! Public keys are published as JSON Web Keys, the format the registration
//! endpoint stores and hands out to other organization members. Private keys
//! serialize to PKCS#8 DER and only ever leave memory inside a
//! [`WrappedPrivateKey`](crate::crypto::WrappedPrivateKey).

use crate::codec;
use crate::crypto::{
    hash_data, probe_rng, Algorithm, TimingSafe, MAX_RSA_MODULUS_BITS, MIN_RSA_MODULUS_BITS,
    OAEP_HASH_LEN, RSA_MODULUS_BITS,
};
use crate::error::{Result, SealdropError};
use rand::{CryptoRng, RngCore};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

/// JWK key type for RSA keys
pub const JWK_KTY_RSA: &str = "RSA";

/// JWK algorithm name for RSA-OAEP with SHA-256
pub const JWK_ALG_RSA_OAEP_256: &str = "RSA-OAEP-256";

/// Published form of a public key (RFC 7517 JSON Web Key)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicJwk {
    /// Key type, always `RSA`
    pub kty: String,
    /// Algorithm the key is meant for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Modulus, base64url without padding
    pub n: String,
    /// Public exponent, base64url without padding
    pub e: String,
    /// Extractable flag emitted by browser key exports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<bool>,
    /// Permitted operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<String>>,
}

/// A recipient's RSA-OAEP public key
#[derive(Clone)]
pub struct PublicKey {
    inner: RsaPublicKey,
    fingerprint: [u8; 32],
}

/// An RSA-OAEP private key.
///
/// Not serializable and redacted in `Debug`. The underlying key zeroizes its
/// secret components when dropped.
#[derive(Clone)]
pub struct PrivateKey {
    inner: RsaPrivateKey,
    key_id: u64,
}

/// A freshly generated key pair
#[derive(Clone)]
pub struct KeyPair {
    /// The public key component
    pub public: PublicKey,
    /// The private key component
    pub private: PrivateKey,
}

impl PublicKey {
    fn from_rsa(inner: RsaPublicKey) -> Result<Self> {
        let der = inner
            .to_public_key_der()
            .map_err(|e| SealdropError::invalid_key(format!("Failed to encode public key: {}", e)))?;
        let fingerprint = hash_data(der.as_bytes());
        Ok(Self { inner, fingerprint })
    }

    /// Import a published JWK string.
    ///
    /// Fails with [`SealdropError::InvalidKey`] for malformed JSON, a key of
    /// another family or algorithm, a key not usable for encryption, private
    /// key members, or a modulus outside the accepted range.
    pub fn from_jwk(jwk: &str) -> Result<Self> {
        let members: serde_json::Map<String, serde_json::Value> = serde_json::from_str(jwk)
            .map_err(|e| SealdropError::invalid_key(format!("Public key is not a JWK: {}", e)))?;

        if members.contains_key("d") {
            return Err(SealdropError::invalid_key(
                "Private key material supplied where a public key was expected",
            ));
        }

        let parsed: PublicJwk = serde_json::from_value(serde_json::Value::Object(members))
            .map_err(|e| SealdropError::invalid_key(format!("Public key is not a JWK: {}", e)))?;

        Self::from_public_jwk(&parsed)
    }

    /// Import an already parsed JWK.
    pub fn from_public_jwk(jwk: &PublicJwk) -> Result<Self> {
        if jwk.kty != JWK_KTY_RSA {
            return Err(SealdropError::invalid_key(format!(
                "Unsupported key type '{}', expected RSA",
                jwk.kty
            )));
        }

        if let Some(alg) = &jwk.alg {
            if alg != JWK_ALG_RSA_OAEP_256 {
                return Err(SealdropError::invalid_key(format!(
                    "Unsupported algorithm '{}', expected {}",
                    alg, JWK_ALG_RSA_OAEP_256
                )));
            }
        }

        if let Some(ops) = &jwk.key_ops {
            if !ops.iter().any(|op| op == "encrypt") {
                return Err(SealdropError::invalid_key(
                    "Public key is not permitted for encryption",
                ));
            }
        }

        let n = codec::decode_url(&jwk.n)
            .map_err(|e| SealdropError::invalid_key(format!("Invalid modulus: {}", e)))?;
        let e = codec::decode_url(&jwk.e)
            .map_err(|e| SealdropError::invalid_key(format!("Invalid exponent: {}", e)))?;

        let inner = RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e))
            .map_err(|e| SealdropError::invalid_key(format!("Invalid RSA public key: {}", e)))?;

        let bits = inner.n().bits();
        if !(MIN_RSA_MODULUS_BITS..=MAX_RSA_MODULUS_BITS).contains(&bits) {
            return Err(SealdropError::invalid_key(format!(
                "Modulus of {} bits is outside the accepted range {}..={}",
                bits, MIN_RSA_MODULUS_BITS, MAX_RSA_MODULUS_BITS
            )));
        }

        Self::from_rsa(inner)
    }

    /// Export as a JWK structure
    pub fn to_public_jwk(&self) -> PublicJwk {
        PublicJwk {
            kty: JWK_KTY_RSA.to_string(),
            alg: Some(JWK_ALG_RSA_OAEP_256.to_string()),
            n: codec::encode_url(&self.inner.n().to_bytes_be()),
            e: codec::encode_url(&self.inner.e().to_bytes_be()),
            ext: Some(true),
            key_ops: Some(vec!["encrypt".to_string()]),
        }
    }

    /// Export as the JWK string published to the registration endpoint
    pub fn to_jwk(&self) -> Result<String> {
        serde_json::to_string(&self.to_public_jwk())
            .map_err(|e| SealdropError::serialization(format!("Failed to encode JWK: {}", e)))
    }

    /// Returns the algorithm used by this key
    pub fn algorithm(&self) -> Algorithm {
        Algorithm::RsaOaep2048Sha256
    }

    /// Modulus size in bits
    pub fn modulus_bits(&self) -> usize {
        self.inner.n().bits()
    }

    /// Largest plaintext, in bytes, that OAEP/SHA-256 can carry under this key
    pub fn max_plaintext_len(&self) -> usize {
        self.inner.size().saturating_sub(2 * OAEP_HASH_LEN + 2)
    }

    /// SHA3-256 fingerprint of the SubjectPublicKeyInfo encoding
    pub fn fingerprint(&self) -> [u8; 32] {
        self.fingerprint
    }

    /// Short identifier taken from the last eight fingerprint bytes
    pub fn key_id(&self) -> u64 {
        let mut id = [0u8; 8];
        id.copy_from_slice(&self.fingerprint[24..32]);
        u64::from_be_bytes(id)
    }

    pub(crate) fn as_rsa(&self) -> &RsaPublicKey {
        &self.inner
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        TimingSafe::fingerprints_equal(&self.fingerprint, &other.fingerprint)
    }
}

impl Eq for PublicKey {}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_public_jwk().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let jwk = PublicJwk::deserialize(deserializer)?;
        PublicKey::from_public_jwk(&jwk).map_err(serde::de::Error::custom)
    }
}

impl PrivateKey {
    fn from_rsa(inner: RsaPrivateKey) -> Result<Self> {
        let key_id = PublicKey::from_rsa(inner.to_public_key())?.key_id();
        Ok(Self { inner, key_id })
    }

    /// Canonical PKCS#8 DER form, zeroized when dropped
    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let document = self
            .inner
            .to_pkcs8_der()
            .map_err(|e| SealdropError::invalid_key(format!("Failed to encode private key: {}", e)))?;
        Ok(Zeroizing::new(document.as_bytes().to_vec()))
    }

    /// Parse the canonical PKCS#8 DER form
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let inner = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|_| SealdropError::invalid_key("Invalid PKCS#8 private key"))?;
        inner
            .validate()
            .map_err(|_| SealdropError::invalid_key("Inconsistent RSA private key"))?;
        Self::from_rsa(inner)
    }

    /// Derive the matching public key
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_rsa(self.inner.to_public_key())
    }

    /// Identifier of the matching public key
    pub fn key_id(&self) -> u64 {
        self.key_id
    }

    /// Returns the algorithm used by this key
    pub fn algorithm(&self) -> Algorithm {
        Algorithm::RsaOaep2048Sha256
    }

    /// Modulus size in bits
    pub fn modulus_bits(&self) -> usize {
        self.inner.n().bits()
    }

    pub(crate) fn as_rsa(&self) -> &RsaPrivateKey {
        &self.inner
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for PrivateKey {}

impl KeyPair {
    /// Generate a 2048-bit RSA-OAEP key pair.
    ///
    /// The generator is probed first; a failing or degraded source yields
    /// [`SealdropError::WeakRandomSource`] and no key is produced.
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Result<Self> {
        probe_rng(rng)?;

        let inner = RsaPrivateKey::new(rng, RSA_MODULUS_BITS)
            .map_err(|e| SealdropError::invalid_key(format!("Key generation failed: {}", e)))?;
        inner
            .validate()
            .map_err(|e| SealdropError::invalid_key(format!("Generated key is invalid: {}", e)))?;

        let public = PublicKey::from_rsa(inner.to_public_key())?;
        let private = PrivateKey {
            key_id: public.key_id(),
            inner,
        };

        debug!(
            key_id = format!("{:016X}", public.key_id()),
            modulus_bits = public.modulus_bits(),
            "Generated key pair"
        );

        Ok(Self { public, private })
    }

    /// Returns the public key component
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Returns the private key component
    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    /// Split into components
    pub fn into_parts(self) -> (PublicKey, PrivateKey) {
        (self.public, self.private)
    }

    /// Returns the key's unique identifier
    pub fn key_id(&self) -> u64 {
        self.public.key_id()
    }

    /// Checks that both halves belong together
    pub fn is_valid(&self) -> bool {
        match self.private.public_key() {
            Ok(derived) => derived == self.public,
            Err(_) => false,
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("algorithm", &self.algorithm())
            .field("key_id", &format!("{:016X}", self.key_id()))
            .field("modulus_bits", &self.modulus_bits())
            .finish()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("algorithm", &self.algorithm())
            .field("key_id", &format!("{:016X}", self.key_id))
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.public.algorithm())
            .field("key_id", &format!("{:016X}", self.key_id()))
            .finish()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}, ID: {:016X})", self.algorithm(), self.key_id())
    }
}

impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({}, ID: {:016X})", self.algorithm(), self.key_id())
    }
}
