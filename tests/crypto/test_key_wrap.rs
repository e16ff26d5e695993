// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Tests for session key wrapping (secp256k1 ECIES, eccrypto layout)

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use ecommerce_privacy_node::crypto::{unwrap, wrap, CryptoError, ServiceKey, SessionKey, WrappedKey};
use hmac::{Hmac, Mac};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{ecdh::diffie_hellman, SecretKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256, Sha512};

/// Wrap with the primitives directly, laid out as
/// ephemeralPub(65) || iv(16) || mac(32) || ciphertext
fn reference_wrap(session_key: &[u8; 32], recipient: &ServiceKey) -> Vec<u8> {
    let ephemeral = SecretKey::random(&mut OsRng);
    let ephemeral_pub = ephemeral.public_key().to_encoded_point(false);
    let shared = diffie_hellman(ephemeral.to_nonzero_scalar(), recipient.public_key().as_affine());

    let hash = Sha512::digest(shared.raw_secret_bytes());
    let (enc_key, mac_key) = hash.split_at(32);
    let iv = [7u8; 16];

    let ciphertext = cbc::Encryptor::<Aes256>::new_from_slices(enc_key, &iv)
        .unwrap()
        .encrypt_padded_vec_mut::<Pkcs7>(session_key);

    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(mac_key).unwrap();
    mac.update(&iv);
    mac.update(ephemeral_pub.as_bytes());
    mac.update(&ciphertext);
    let tag = mac.finalize().into_bytes();

    let mut out = Vec::new();
    out.extend_from_slice(ephemeral_pub.as_bytes());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&tag);
    out.extend_from_slice(&ciphertext);
    out
}

#[test]
fn test_wrap_unwrap_roundtrip() {
    let service = ServiceKey::generate();
    let session = SessionKey::generate();

    let wrapped = wrap(&session, &service.public_key_uncompressed()).unwrap();
    let parsed = WrappedKey::from_hex(&wrapped.to_hex()).unwrap();
    let recovered = unwrap(&parsed, &service).unwrap();

    assert_eq!(recovered.expose_secret(), session.expose_secret());
    // 65 + 16 + 32 + one padded 48-byte ciphertext
    assert_eq!(wrapped.to_bytes().len(), 65 + 16 + 32 + 48);
}

#[test]
fn test_unwraps_reference_layout() {
    let service = ServiceKey::generate();
    let session_key = [0x42u8; 32];

    let bytes = reference_wrap(&session_key, &service);
    let recovered = unwrap(&WrappedKey::from_bytes(&bytes).unwrap(), &service).unwrap();

    assert_eq!(recovered.expose_secret(), &session_key);
}

#[test]
fn test_wrong_service_key_fails() {
    let session = SessionKey::generate();
    let wrapped = wrap(&session, &ServiceKey::generate().public_key_uncompressed()).unwrap();

    let result = unwrap(&wrapped, &ServiceKey::generate());
    assert!(matches!(result, Err(CryptoError::UnwrapFailed { .. })));
}

#[test]
fn test_any_byte_flip_fails_unwrap() {
    let service = ServiceKey::generate();
    let session = SessionKey::generate();
    let bytes = wrap(&session, &service.public_key_uncompressed())
        .unwrap()
        .to_bytes();

    for i in 0..bytes.len() {
        let mut tampered = bytes.clone();
        tampered[i] ^= 0x01;

        let outcome = WrappedKey::from_bytes(&tampered).and_then(|w| unwrap(&w, &service));
        assert!(
            matches!(outcome, Err(CryptoError::UnwrapFailed { .. })),
            "flip in byte {} was not rejected as an unwrap failure",
            i
        );
    }
}

#[test]
fn test_truncated_wrapped_key_rejected() {
    let service = ServiceKey::generate();
    let bytes = wrap(&SessionKey::generate(), &service.public_key_uncompressed())
        .unwrap()
        .to_bytes();

    assert!(WrappedKey::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    assert!(WrappedKey::from_bytes(&bytes[..100]).is_err());
}

#[test]
fn test_wrap_rejects_compressed_recipient_key() {
    let service = ServiceKey::generate();
    let compressed = service.public_key().to_encoded_point(true);

    let result = wrap(&SessionKey::generate(), compressed.as_bytes());
    assert!(matches!(result, Err(CryptoError::MalformedPublicKey { .. })));
}
