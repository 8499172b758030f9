//! Property-based tests driven by random inputs
//!
//! These tests check that round-trip and rejection properties hold across
//! many randomly generated inputs.

mod common;

use common::{user_a, user_b};
use rand::distributions::{Alphanumeric, DistString};
use rand::{rngs::OsRng, Rng};
use sealdrop::{
    codec,
    crypto::{
        decrypt_with_session_key, encrypt_with_public_key, password::WrappedPrivateKey, KdfParams,
        Password,
    },
    validation::Validator,
    SealdropError,
};

/// Property: decode(encode(b)) == b for arbitrary bytes, in both alphabets
#[test]
fn property_codec_roundtrip() {
    let mut rng = OsRng;

    for _ in 0..500 {
        let len = rng.gen_range(0..512);
        let mut data = vec![0u8; len];
        rng.fill(&mut data[..]);

        assert_eq!(codec::decode(&codec::encode(&data)).unwrap(), data);
        assert_eq!(codec::decode_url(&codec::encode_url(&data)).unwrap(), data);
    }
}

/// Property: every text within the bound decrypts to itself
#[test]
fn property_encryption_decryption_roundtrip() {
    let mut rng = OsRng;
    let recipient = user_b();

    for _ in 0..30 {
        let len = rng.gen_range(0..=190);
        let message = Alphanumeric.sample_string(&mut rng, len);

        let ciphertext = encrypt_with_public_key(&message, recipient.public_key()).unwrap();
        let decrypted = decrypt_with_session_key(&ciphertext, recipient.private_key()).unwrap();
        assert_eq!(decrypted, message, "Roundtrip property violated");
    }
}

/// Property: OAEP is randomized, so equal plaintexts give distinct ciphertexts
#[test]
fn property_ciphertexts_never_repeat() {
    let recipient = user_b();
    let mut seen = std::collections::HashSet::new();

    for _ in 0..20 {
        let ciphertext = encrypt_with_public_key("same every time", recipient.public_key()).unwrap();
        assert!(seen.insert(ciphertext), "Ciphertext repeated");
    }
}

/// Property: any text over the bound is rejected before encryption
#[test]
fn property_oversized_messages_rejected() {
    let mut rng = OsRng;
    let recipient = user_a();

    for _ in 0..50 {
        let len = rng.gen_range(191..2048);
        let message = Alphanumeric.sample_string(&mut rng, len);

        match encrypt_with_public_key(&message, recipient.public_key()) {
            Err(SealdropError::MessageTooLarge { len: got, max }) => {
                assert_eq!(got, len);
                assert_eq!(max, 190);
            }
            other => panic!("Expected MessageTooLarge, got {:?}", other.map(|_| ())),
        }
    }
}

/// Property: an envelope opens only with the password that sealed it
#[test]
fn property_envelope_correctness() {
    let mut rng = OsRng;

    for _ in 0..5 {
        let len = rng.gen_range(1..2048);
        let mut payload = vec![0u8; len];
        rng.fill(&mut payload[..]);
        let password = Alphanumeric.sample_string(&mut rng, 16);

        let wrapped = WrappedPrivateKey::seal(
            &payload,
            &Password::new(password.clone()),
            KdfParams::default(),
            &mut rng,
        )
        .unwrap();

        let opened = wrapped.open(&Password::new(password.clone())).unwrap();
        assert_eq!(&opened[..], &payload[..]);

        let wrong = format!("{}!", password);
        assert!(wrapped.open(&Password::new(wrong)).is_none());
    }
}

/// Property: random text never decrypts and never panics
#[test]
fn property_random_ciphertext_rejected() {
    let mut rng = OsRng;
    let recipient = user_a();

    for _ in 0..100 {
        let len = rng.gen_range(0..400);
        let mut junk = vec![0u8; len];
        rng.fill(&mut junk[..]);

        let result = decrypt_with_session_key(&codec::encode(&junk), recipient.private_key());
        assert!(matches!(result, Err(SealdropError::DecryptionFailed)));
    }
}

/// Property: user ids are either accepted or rejected, never a panic
#[test]
fn property_user_id_validation_total() {
    let mut rng = OsRng;

    for _ in 0..500 {
        let len = rng.gen_range(0..200);
        let candidate: String = (0..len).map(|_| rng.gen::<char>()).collect();

        let result = std::panic::catch_unwind(|| Validator::validate_user_id(&candidate));
        let accepted = result.expect("validation must not panic").is_ok();
        if accepted {
            assert!(!candidate.contains('/'));
            assert!(candidate.len() <= 128);
        }
    }
}
