//! Command implementations for the sealdrop CLI.
//!
//! Commands take their passwords as arguments; prompting happens in
//! [`crate::cli::run`].

use crate::{
    cli::utils::{format_timestamp, load_keyring, read_text_file, write_text_file},
    config::Config,
    crypto::{encrypt_with_public_key, Password, PublicKey},
    error::SealdropError,
    keyring::KeyEntry,
    session::KeyCustodian,
    Result,
};
use std::path::Path;
use tracing::info;

/// Execute generate-key command.
///
/// Registers the key pair, adds the public key to the local keyring and
/// returns its JWK. The JWK is also written to `public_key_file` when given.
pub fn generate_key(
    config: &Config,
    user_id: &str,
    password: Password,
    public_key_file: Option<&Path>,
) -> Result<String> {
    let custodian = KeyCustodian::from_config(config)?;

    info!(user_id = user_id, kdf = %config.kdf.algorithm(), "Generating key pair");
    let public_key = custodian.register(user_id, password)?;

    let mut keyring = load_keyring(config)?;
    keyring.replace_key(KeyEntry::new(user_id, public_key.clone()))?;
    keyring.save(config.pubring_path())?;

    let jwk = public_key.to_jwk()?;
    if let Some(path) = public_key_file {
        write_text_file(path, &jwk)?;
        info!(file = %path.display(), "Public key written to file");
    }

    info!(
        user_id = user_id,
        key_id = format!("{:016X}", public_key.key_id()),
        modulus_bits = public_key.modulus_bits(),
        "✅ Generated key pair successfully"
    );

    Ok(jwk)
}

/// Execute import-key command
pub fn import_key(config: &Config, user_id: &str, jwk_file: &Path) -> Result<PublicKey> {
    info!(user_id = user_id, file = %jwk_file.display(), "Importing public key");

    let jwk = read_text_file(jwk_file)?;
    let mut keyring = load_keyring(config)?;
    let public_key = keyring.add_published(user_id, jwk.trim())?.public_key.clone();
    keyring.save(config.pubring_path())?;

    info!(
        user_id = user_id,
        key_id = format!("{:016X}", public_key.key_id()),
        "✅ Public key imported"
    );

    Ok(public_key)
}

/// Execute list-keys command; returns one display line per key
pub fn list_keys(config: &Config) -> Result<Vec<String>> {
    let keyring = load_keyring(config)?;

    if keyring.is_empty() {
        info!("No keys found in keyring");
        return Ok(Vec::new());
    }

    Ok(keyring
        .entries()
        .map(|entry| {
            format!(
                "{:016X}  {}  {}  added {}",
                entry.key_id(),
                entry.public_key.algorithm(),
                entry.user_id,
                format_timestamp(&entry.added)
            )
        })
        .collect())
}

/// Execute encrypt command; returns the base64 ciphertext
pub fn encrypt(config: &Config, recipient: &str, message: &str) -> Result<String> {
    let keyring = load_keyring(config)?;
    let entry = keyring.get(recipient).ok_or_else(|| {
        SealdropError::keyring(format!("No public key found for recipient '{}'", recipient))
    })?;

    info!(
        recipient = recipient,
        key_id = format!("{:016X}", entry.key_id()),
        "Encrypting message"
    );

    encrypt_with_public_key(message, &entry.public_key)
}

/// Execute decrypt command; returns the plaintext
pub fn decrypt(config: &Config, user_id: &str, password: Password, ciphertext: &str) -> Result<String> {
    let custodian = KeyCustodian::from_config(config)?;
    let session = custodian
        .login(user_id, password)?
        .ok_or_else(|| SealdropError::password("Incorrect password or no stored key"))?;

    let plaintext = session.decrypt(ciphertext.trim());
    session.logout();
    plaintext
}

/// Execute change-password command
pub fn change_password(
    config: &Config,
    user_id: &str,
    old_password: Password,
    new_password: Password,
) -> Result<()> {
    let custodian = KeyCustodian::from_config(config)?;

    if !custodian.change_password(user_id, old_password, new_password)? {
        return Err(SealdropError::password("Incorrect password or no stored key"));
    }

    info!(user_id = user_id, "✅ Password changed");
    Ok(())
}
