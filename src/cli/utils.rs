//! Utility functions for CLI operations.

use crate::config::Config;
use crate::crypto::Password;
use crate::error::{Result, SealdropError};
use crate::keyring::PublicKeyring;
use chrono::{DateTime, Utc};
use rpassword::prompt_password;
use std::fs;
use std::path::Path;

/// Load the public keyring named by the configuration
pub fn load_keyring(config: &Config) -> Result<PublicKeyring> {
    PublicKeyring::load(config.pubring_path())
}

/// Read a text file
pub fn read_text_file(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

/// Write a text file
pub fn write_text_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)?;
    Ok(())
}

/// Format a timestamp for listings
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Prompt for a password securely (no echo to terminal)
pub fn prompt_for_password(prompt: &str) -> Result<Password> {
    let input = prompt_password(format!("{}: ", prompt))
        .map_err(|e| SealdropError::password(format!("Failed to read password: {}", e)))?;
    password_from_input(input)
}

/// Take ownership of typed input; it is wiped on every path out
fn password_from_input(input: String) -> Result<Password> {
    let password = Password::new(input);
    if password.is_empty() {
        return Err(SealdropError::password("Password cannot be empty"));
    }
    Ok(password)
}

/// Prompt for a new password twice and require both entries to match
pub fn prompt_for_new_password(prompt: &str) -> Result<Password> {
    let password = prompt_for_password(prompt)?;
    let confirmation = prompt_for_password("Confirm password")?;

    if !password.matches(&confirmation) {
        return Err(SealdropError::password("Passwords do not match"));
    }

    Ok(password)
}
