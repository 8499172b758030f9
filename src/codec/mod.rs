//! Transport-safe text encoding for binary data.
//!
//! Ciphertexts, salts and nonces travel through JSON and local storage as
//! standard padded base64. JWK members use the unpadded URL-safe alphabet
//! required by RFC 7517. Decoding is strict in both cases: characters outside
//! the alphabet, bad padding and non-canonical trailing bits are rejected
//! rather than silently dropped.

use crate::error::{Result, SealdropError};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

/// Encode bytes as standard padded base64.
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode standard padded base64.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| SealdropError::malformed_encoding(format!("Invalid base64: {}", e)))
}

/// Encode bytes as unpadded URL-safe base64 (JWK `base64url`).
pub fn encode_url(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode unpadded URL-safe base64 (JWK `base64url`).
pub fn decode_url(text: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(text)
        .map_err(|e| SealdropError::malformed_encoding(format!("Invalid base64url: {}", e)))
}
