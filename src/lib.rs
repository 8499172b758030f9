//! # sealdrop - end-to-end encrypted secret sharing
//!
//! Client-side key custody and message encryption for sharing short secrets
//! between users through an untrusted relay. The relay only ever sees
//! ciphertext and public keys.
//!
//! ## Features
//!
//! - **Direct public-key encryption** of short text secrets for a recipient
//! - **Password-protected key custody**: the private key is stored wrapped
//!   and only unwrapped into an explicit, in-memory [`session::Session`]
//! - **Uniform rejection**: a wrong password, a tampered record and a missing
//!   record are indistinguishable to the caller
//!
//! ## Cryptographic Algorithms
//!
//! - **Public-key encryption**: RSA-OAEP, 2048-bit modulus, SHA-256
//! - **Key wrapping**: AES-256-GCM under a PBKDF2-HMAC-SHA256 (default) or
//!   Argon2id derived key
//! - **Fingerprints**: SHA3-256 over the SPKI encoding
//!
//! ## Examples
//!
//! ### Register, encrypt, decrypt
//!
//! ```rust,no_run
//! use sealdrop::crypto::{encrypt_for_recipient, Password};
//! use sealdrop::session::KeyCustodian;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let custodian = KeyCustodian::in_memory();
//! let public_key = custodian.register("alice", Password::from("Tr0ub4dor&3"))?;
//!
//! // Anyone holding the published JWK can encrypt for alice
//! let jwk = public_key.to_jwk()?;
//! let ciphertext = encrypt_for_recipient("launch codes: 04-15", &jwk)?;
//!
//! let session = custodian
//!     .login("alice", Password::from("Tr0ub4dor&3"))?
//!     .expect("correct password");
//! assert_eq!(session.decrypt(&ciphertext)?, "launch codes: 04-15");
//! session.logout();
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keyring;
pub mod keystore;
pub mod session;
pub mod validation;

pub use error::{Result, SealdropError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
