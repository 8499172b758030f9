//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use rand::rngs::OsRng;
use sealdrop::crypto::KeyPair;
use std::sync::OnceLock;

/// Key pair for "user A"; generated once per test binary
pub fn user_a() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate(&mut OsRng).expect("key generation"))
}

/// Key pair for "user B"; generated once per test binary
pub fn user_b() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate(&mut OsRng).expect("key generation"))
}
