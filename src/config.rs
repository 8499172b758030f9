//! Runtime configuration.
//!
//! Values come from the environment with sensible defaults:
//!
//! | Variable                      | Default            |
//! |-------------------------------|--------------------|
//! | `SEALDROP_HOME`               | `$HOME/.sealdrop`  |
//! | `SEALDROP_KDF`                | `pbkdf2`           |
//! | `SEALDROP_PBKDF2_ITERATIONS`  | `100000`           |

use crate::crypto::KdfParams;
use crate::error::{Result, SealdropError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Overrides the storage directory
pub const ENV_HOME: &str = "SEALDROP_HOME";

/// Selects the password KDF (`pbkdf2` or `argon2id`)
pub const ENV_KDF: &str = "SEALDROP_KDF";

/// Overrides the PBKDF2 iteration count
pub const ENV_PBKDF2_ITERATIONS: &str = "SEALDROP_PBKDF2_ITERATIONS";

/// Sub-directory holding wrapped private keys
const KEYS_DIR: &str = "keys";

/// Public keyring file name
const PUBRING_FILE: &str = "pubring.json";

/// Configuration for key custody and local storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base directory for local state
    pub home: PathBuf,
    /// Derivation parameters for newly wrapped keys
    pub kdf: KdfParams,
}

impl Config {
    /// Configuration rooted at `home` with default derivation parameters
    pub fn with_home<P: AsRef<Path>>(home: P) -> Self {
        Self {
            home: home.as_ref().to_path_buf(),
            kdf: KdfParams::default(),
        }
    }

    /// Read configuration from the environment
    pub fn from_env() -> Result<Self> {
        let home = match env::var_os(ENV_HOME) {
            Some(dir) => PathBuf::from(dir),
            None => {
                let user_home = env::var_os("HOME")
                    .ok_or_else(|| SealdropError::config("HOME environment variable not set"))?;
                Path::new(&user_home).join(".sealdrop")
            }
        };

        let kdf = Self::kdf_from_values(
            env::var(ENV_KDF).ok().as_deref(),
            env::var(ENV_PBKDF2_ITERATIONS).ok().as_deref(),
        )?;

        let config = Self { home, kdf };
        config.validate()?;
        Ok(config)
    }

    fn kdf_from_values(kdf: Option<&str>, iterations: Option<&str>) -> Result<KdfParams> {
        match kdf.map(str::to_ascii_lowercase).as_deref() {
            None | Some("pbkdf2") => {
                let iterations = match iterations {
                    Some(value) => value.parse::<u32>().map_err(|_| {
                        SealdropError::config(format!(
                            "{} must be a positive integer, got '{}'",
                            ENV_PBKDF2_ITERATIONS, value
                        ))
                    })?,
                    None => crate::crypto::password::PBKDF2_MIN_ITERATIONS,
                };
                Ok(KdfParams::Pbkdf2Sha256 { iterations })
            }
            Some("argon2id") => Ok(KdfParams::argon2id_default()),
            Some(other) => Err(SealdropError::config(format!(
                "Unknown {} '{}', expected pbkdf2 or argon2id",
                ENV_KDF, other
            ))),
        }
    }

    /// Check derivation parameters against the accepted minimums
    pub fn validate(&self) -> Result<()> {
        self.kdf.validate()
    }

    /// Directory for wrapped private keys
    pub fn keys_dir(&self) -> PathBuf {
        self.home.join(KEYS_DIR)
    }

    /// Path of the public keyring file
    pub fn pubring_path(&self) -> PathBuf {
        self.home.join(PUBRING_FILE)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_home(".sealdrop")
    }
}
