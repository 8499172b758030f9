//! Error types for sealdrop operations.

use thiserror::Error;

/// Result type alias for sealdrop operations.
pub type Result<T> = std::result::Result<T, SealdropError>;

/// Main error type for sealdrop operations.
///
/// Messages never carry plaintext, passwords or key bytes. `DecryptionFailed`
/// carries nothing at all so that callers cannot tell which check rejected
/// the input.
#[derive(Error, Debug)]
pub enum SealdropError {
    /// Malformed key material or a key of the wrong algorithm family
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Transport text that is not valid for the encoding
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    /// Authentication or padding failure
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Plaintext exceeds what the recipient key can encrypt directly
    #[error("Message too large: {len} bytes exceeds maximum of {max} bytes")]
    MessageTooLarge {
        /// Length of the rejected plaintext in bytes
        len: usize,
        /// Largest plaintext the key accepts
        max: usize,
    },

    /// The random source failed or produced degraded output
    #[error("Weak random source: {0}")]
    WeakRandomSource(String),

    /// Password-related errors
    #[error("Password error: {0}")]
    Password(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Wrapped-key storage errors
    #[error("Keystore error: {0}")]
    Keystore(String),

    /// Public keyring errors
    #[error("Keyring error: {0}")]
    Keyring(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// The session was logged out
    #[error("No active session")]
    NoActiveSession,

    /// A background task failed to complete
    #[error("Task error: {0}")]
    Task(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SealdropError {
    /// Creates a new invalid key error.
    pub fn invalid_key<T: ToString>(msg: T) -> Self {
        Self::InvalidKey(msg.to_string())
    }

    /// Creates a new malformed encoding error.
    pub fn malformed_encoding<T: ToString>(msg: T) -> Self {
        Self::MalformedEncoding(msg.to_string())
    }

    /// Creates a new weak random source error.
    pub fn weak_random_source<T: ToString>(msg: T) -> Self {
        Self::WeakRandomSource(msg.to_string())
    }

    /// Creates a new password error.
    pub fn password<T: ToString>(msg: T) -> Self {
        Self::Password(msg.to_string())
    }

    /// Creates a new configuration error.
    pub fn config<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }

    /// Creates a new keystore error.
    pub fn keystore<T: ToString>(msg: T) -> Self {
        Self::Keystore(msg.to_string())
    }

    /// Creates a new keyring error.
    pub fn keyring<T: ToString>(msg: T) -> Self {
        Self::Keyring(msg.to_string())
    }

    /// Creates a new serialization error.
    pub fn serialization<T: ToString>(msg: T) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Creates a new validation error.
    pub fn validation<T: ToString>(msg: T) -> Self {
        Self::Validation(msg.to_string())
    }

    /// Creates a new task error.
    pub fn task<T: ToString>(msg: T) -> Self {
        Self::Task(msg.to_string())
    }

    /// Returns true for errors that must abort the whole flow.
    ///
    /// Only a broken random source qualifies; everything else can be retried
    /// or reported to the user.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::WeakRandomSource(_))
    }
}
