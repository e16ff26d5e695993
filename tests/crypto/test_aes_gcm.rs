// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Tests for payload encryption (AES-256-GCM, 12-byte IV, tag appended)

use ecommerce_privacy_node::crypto::{
    decrypt, encrypt, CryptoError, EncryptedEnvelope, PayloadEncoding, SessionKey, IV_LEN,
    TAG_LEN,
};

const ORDER: &[u8] = br#"{"address":"1 Main St","phone":"555-0100"}"#;

#[test]
fn test_encrypt_decrypt_roundtrip() {
    let key = SessionKey::generate();
    let envelope = encrypt(ORDER, &key).unwrap();

    assert_eq!(envelope.ciphertext.len(), ORDER.len() + TAG_LEN);
    assert_ne!(&envelope.ciphertext[..ORDER.len()], ORDER);
    assert_eq!(decrypt(&envelope, &key).unwrap(), ORDER);
}

#[test]
fn test_every_ciphertext_and_tag_bit_flip_rejected() {
    let key = SessionKey::generate();
    let envelope = encrypt(ORDER, &key).unwrap();

    for i in 0..envelope.ciphertext.len() {
        for bit in [0x01u8, 0x80] {
            let mut tampered = envelope.clone();
            tampered.ciphertext[i] ^= bit;
            assert!(
                matches!(decrypt(&tampered, &key), Err(CryptoError::IntegrityFailed { .. })),
                "flip of bit {:#04x} in byte {} was accepted",
                bit,
                i
            );
        }
    }
}

#[test]
fn test_every_iv_bit_flip_rejected() {
    let key = SessionKey::generate();
    let envelope = encrypt(ORDER, &key).unwrap();

    for i in 0..IV_LEN {
        let mut tampered = envelope.clone();
        tampered.iv[i] ^= 0x01;
        assert!(
            decrypt(&tampered, &key).is_err(),
            "IV byte {} flip was accepted",
            i
        );
    }
}

#[test]
fn test_wrong_key_rejected() {
    let envelope = encrypt(ORDER, &SessionKey::generate()).unwrap();
    let result = decrypt(&envelope, &SessionKey::generate());
    assert!(matches!(result, Err(CryptoError::IntegrityFailed { .. })));
}

#[test]
fn test_ivs_are_fresh_per_call() {
    let key = SessionKey::generate();
    let a = encrypt(ORDER, &key).unwrap();
    let b = encrypt(ORDER, &key).unwrap();

    assert_ne!(a.iv, b.iv);
    assert_ne!(a.ciphertext, b.ciphertext);
}

#[test]
fn test_wire_encodings_decode_to_same_envelope() {
    let key = SessionKey::generate();
    let envelope = encrypt(ORDER, &key).unwrap();

    let from_hex = EncryptedEnvelope::from_wire(
        &format!("0x{}", envelope.iv_hex()),
        &envelope.data_string(PayloadEncoding::Hex),
        PayloadEncoding::Hex,
    )
    .unwrap();
    let from_base64 = EncryptedEnvelope::from_wire(
        &envelope.iv_hex(),
        &envelope.data_string(PayloadEncoding::Base64),
        PayloadEncoding::Base64,
    )
    .unwrap();

    assert_eq!(from_hex, envelope);
    assert_eq!(from_base64, envelope);
    assert_eq!(decrypt(&from_base64, &key).unwrap(), ORDER);
}

#[test]
fn test_wire_format_errors_name_the_field() {
    let err = EncryptedEnvelope::from_wire("zz", "00", PayloadEncoding::Hex).unwrap_err();
    assert!(matches!(err, CryptoError::MalformedEncoding { ref field, .. } if field == "iv"));

    let err = EncryptedEnvelope::from_wire(&"00".repeat(IV_LEN), "abc!", PayloadEncoding::Base64)
        .unwrap_err();
    assert!(
        matches!(err, CryptoError::MalformedEncoding { ref field, .. } if field == "encryptedData")
    );

    // 12-byte IV is required, the 16-byte CBC form is not accepted
    let err = EncryptedEnvelope::from_wire(&"00".repeat(16), &"00".repeat(32), PayloadEncoding::Hex)
        .unwrap_err();
    assert!(matches!(err, CryptoError::MalformedEncoding { .. }));
}

#[test]
fn test_short_ciphertext_rejected_before_decryption() {
    let err = EncryptedEnvelope::from_wire(&"00".repeat(IV_LEN), &"00".repeat(TAG_LEN - 1), PayloadEncoding::Hex)
        .unwrap_err();
    assert!(err.to_string().contains("too short"));
}
