//! Integration tests for sealdrop
//!
//! These tests verify end-to-end functionality across modules: key
//! generation, wrapping, custody flows, the public keyring and relay records.

mod common;

use common::{user_a, user_b};
use sealdrop::{
    codec,
    config::Config,
    crypto::{
        decrypt_with_session_key, encrypt_for_recipient, encrypt_with_public_key, max_message_len,
        unwrap_private_key, wrap_private_key, EncryptedSecret, KeyPair, Password, PublicKey,
    },
    keyring::PublicKeyring,
    keystore::{FileKeyStore, KeyStore},
    session::KeyCustodian,
    SealdropError,
};
use std::sync::Arc;
use tempfile::TempDir;

/// Two users, a wrapped key, and a secret that only its recipient can read
#[test]
fn test_launch_codes_scenario() {
    let a = user_a();
    let b = user_b();

    let wrapped = wrap_private_key(a.private_key(), &Password::from("Tr0ub4dor&3"))
        .expect("Failed to wrap A's private key");

    let unwrapped = unwrap_private_key(&wrapped, &Password::from("Tr0ub4dor&3"))
        .expect("Correct password must unwrap");
    assert_eq!(&unwrapped, a.private_key());
    assert!(unwrap_private_key(&wrapped, &Password::from("wrong-password")).is_none());

    let ciphertext = encrypt_with_public_key("launch codes: 04-15", b.public_key())
        .expect("Failed to encrypt for B");
    let plaintext = decrypt_with_session_key(&ciphertext, b.private_key())
        .expect("B must decrypt");
    assert_eq!(plaintext, "launch codes: 04-15");

    assert!(matches!(
        decrypt_with_session_key(&ciphertext, a.private_key()),
        Err(SealdropError::DecryptionFailed)
    ));
}

/// The sender only ever sees the recipient's published JWK
#[test]
fn test_encrypt_from_published_jwk() {
    let b = user_b();
    let jwk = b.public_key().to_jwk().unwrap();

    let ciphertext = encrypt_for_recipient("meet at noon", &jwk).unwrap();
    assert_eq!(
        decrypt_with_session_key(&ciphertext, b.private_key()).unwrap(),
        "meet at noon"
    );

    // The ciphertext is one RSA block in standard base64
    let raw = codec::decode(&ciphertext).unwrap();
    assert_eq!(raw.len(), 256);
}

#[test]
fn test_key_pair_roundtrip_through_pkcs8() {
    let a = user_a();
    assert!(a.is_valid());

    let der = a.private_key().to_pkcs8_der().unwrap();
    let restored = sealdrop::crypto::PrivateKey::from_pkcs8_der(&der).unwrap();
    assert_eq!(&restored.public_key().unwrap(), a.public_key());
    assert_eq!(restored.key_id(), a.key_id());
}

#[test]
fn test_message_bound_matches_modulus() {
    let b = user_b();
    assert_eq!(max_message_len(b.public_key()), 190);

    let at_limit = "x".repeat(190);
    let ciphertext = encrypt_with_public_key(&at_limit, b.public_key()).unwrap();
    assert_eq!(
        decrypt_with_session_key(&ciphertext, b.private_key()).unwrap(),
        at_limit
    );

    let over_limit = "x".repeat(191);
    assert!(matches!(
        encrypt_with_public_key(&over_limit, b.public_key()),
        Err(SealdropError::MessageTooLarge { len: 191, max: 190 })
    ));
}

/// Registration, persistence across custodian instances, and login
#[test]
fn test_file_backed_custody() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::with_home(temp_dir.path());

    let public_key = {
        let custodian = KeyCustodian::from_config(&config).unwrap();
        custodian
            .register("alice@example.com", Password::from("Tr0ub4dor&3"))
            .unwrap()
    };

    // A fresh custodian sees the persisted record
    let custodian = KeyCustodian::from_config(&config).unwrap();
    assert!(custodian.has_key("alice@example.com").unwrap());
    assert!(config
        .keys_dir()
        .join("alice@example.com")
        .join("secure_private_key.json")
        .exists());

    let session = custodian
        .login("alice@example.com", Password::from("Tr0ub4dor&3"))
        .unwrap()
        .expect("login must succeed");
    let ciphertext = encrypt_with_public_key("persisted", &public_key).unwrap();
    assert_eq!(session.decrypt(&ciphertext).unwrap(), "persisted");
}

/// Password change replaces the record and keeps the key pair
#[test]
fn test_password_change_overwrites_record() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileKeyStore::new(temp_dir.path()));
    let custodian = KeyCustodian::new(store.clone(), Default::default()).unwrap();

    let public_key = custodian.register("bob", Password::from("first")).unwrap();
    let before = store.load("bob").unwrap().unwrap();

    assert!(custodian
        .change_password("bob", Password::from("first"), Password::from("second"))
        .unwrap());
    let after = store.load("bob").unwrap().unwrap();

    assert_ne!(before.salt(), after.salt());
    assert_ne!(before.nonce(), after.nonce());
    assert_ne!(before.ciphertext(), after.ciphertext());

    assert!(custodian.login("bob", Password::from("first")).unwrap().is_none());
    let session = custodian
        .login("bob", Password::from("second"))
        .unwrap()
        .unwrap();
    assert_eq!(session.public_key().unwrap(), public_key);
}

/// Sender keyring, relay record, receiver session
#[test]
fn test_relay_round_trip() {
    let receiver_dir = TempDir::new().unwrap();
    let receiver_config = Config::with_home(receiver_dir.path());
    let custodian = KeyCustodian::from_config(&receiver_config).unwrap();
    let published = custodian
        .register("bob", Password::from("bob's password"))
        .unwrap()
        .to_jwk()
        .unwrap();

    let sender_dir = TempDir::new().unwrap();
    let pubring_path = sender_dir.path().join("pubring.json");
    let mut keyring = PublicKeyring::new();
    keyring.add_published("bob", &published).unwrap();
    keyring.save(&pubring_path).unwrap();

    let keyring = PublicKeyring::load(&pubring_path).unwrap();
    let recipient = &keyring.get("bob").unwrap().public_key;
    let secret = EncryptedSecret::seal(1, 2, "the vault code is 7291", recipient).unwrap();

    // Over the wire and back
    let body = serde_json::to_string(&secret.share_request()).unwrap();
    assert!(body.contains("\"receiverId\":2"));
    assert!(!body.contains("7291"));
    let stored: EncryptedSecret = serde_json::from_str(&serde_json::to_string(&secret).unwrap()).unwrap();

    let session = custodian
        .login("bob", Password::from("bob's password"))
        .unwrap()
        .unwrap();
    assert_eq!(session.open_secret(&stored).unwrap(), "the vault code is 7291");

    session.logout();
    assert!(matches!(
        session.open_secret(&stored),
        Err(SealdropError::NoActiveSession)
    ));
}

#[test]
fn test_fresh_keys_are_distinct() {
    let mut rng = rand::rngs::OsRng;
    let fresh = KeyPair::generate(&mut rng).unwrap();
    assert_ne!(fresh.public_key(), user_a().public_key());
    assert_ne!(fresh.key_id(), user_a().key_id());

    let from_jwk = PublicKey::from_jwk(&fresh.public_key().to_jwk().unwrap()).unwrap();
    assert_eq!(&from_jwk, fresh.public_key());
}

#[tokio::test]
async fn test_async_custody() {
    let custodian = KeyCustodian::in_memory();
    let public_key = custodian
        .register_async("dave".to_string(), Password::from("async"))
        .await
        .unwrap();

    let session = custodian
        .login_async("dave".to_string(), Password::from("async"))
        .await
        .unwrap()
        .expect("login must succeed");
    let ciphertext = encrypt_with_public_key("from the runtime", &public_key).unwrap();
    assert_eq!(session.decrypt(&ciphertext).unwrap(), "from the runtime");

    assert!(custodian
        .login_async("dave".to_string(), Password::from("wrong"))
        .await
        .unwrap()
        .is_none());
}
