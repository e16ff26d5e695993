// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session Key Wrapping (ECIES over secp256k1)
//!
//! Wraps a session key to the service's public key so only the holder of the
//! matching private key can recover it. Wire-compatible with the `eccrypto`
//! library used by browser clients.
//!
//! ## Protocol
//!
//! 1. Generate an ephemeral key pair
//! 2. `shared = x(ECDH(ephemeral_secret, recipient_public))`
//! 3. `k = SHA-512(shared)`: `k[..32]` is the AES-256-CBC key, `k[32..]` the HMAC key
//! 4. `ciphertext = AES-256-CBC(iv, session_key)` with PKCS#7 padding
//! 5. `mac = HMAC-SHA256(iv || ephemeral_public || ciphertext)`
//!
//! ## Wire Format
//!
//! ```text
//! [ephemeral_public_key (65)][iv (16)][mac (32)][ciphertext (n * 16)]
//! ```
//!
//! The field order is part of the wire contract.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use k256::SecretKey;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

use super::ecdh::{
    encode_uncompressed, parse_uncompressed_public_key, shared_secret_x, UNCOMPRESSED_POINT_LEN,
    UNCOMPRESSED_POINT_PREFIX,
};
use super::error::{decode_hex_field, CryptoError};
use super::private_key::ServiceKey;
use super::session_keys::{SessionKey, SESSION_KEY_LEN};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

pub const WRAP_IV_LEN: usize = 16;
pub const MAC_LEN: usize = 32;
const BLOCK_LEN: usize = 16;
const HEADER_LEN: usize = UNCOMPRESSED_POINT_LEN + WRAP_IV_LEN + MAC_LEN;

/// A session key encrypted to a recipient public key
#[derive(Clone, PartialEq, Eq)]
pub struct WrappedKey {
    pub ephemeral_public_key: [u8; UNCOMPRESSED_POINT_LEN],
    pub iv: [u8; WRAP_IV_LEN],
    pub mac: [u8; MAC_LEN],
    pub ciphertext: Vec<u8>,
}

impl WrappedKey {
    /// Concatenate in wire order
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.ephemeral_public_key);
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.mac);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Split wire bytes into their fields
    ///
    /// Structural checks only; the MAC is verified by [`unwrap`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < HEADER_LEN + BLOCK_LEN {
            return Err(CryptoError::unwrap_failed(format!(
                "wrapped key too short: {} bytes, need at least {}",
                bytes.len(),
                HEADER_LEN + BLOCK_LEN
            )));
        }

        let (ephemeral, rest) = bytes.split_at(UNCOMPRESSED_POINT_LEN);
        let (iv, rest) = rest.split_at(WRAP_IV_LEN);
        let (mac, ciphertext) = rest.split_at(MAC_LEN);

        if ephemeral[0] != UNCOMPRESSED_POINT_PREFIX {
            return Err(CryptoError::unwrap_failed(format!(
                "ephemeral key prefix 0x{:02x}, expected 0x04",
                ephemeral[0]
            )));
        }
        if ciphertext.len() % BLOCK_LEN != 0 {
            return Err(CryptoError::unwrap_failed(
                "ciphertext is not a whole number of blocks",
            ));
        }

        let mut wrapped = WrappedKey {
            ephemeral_public_key: [0u8; UNCOMPRESSED_POINT_LEN],
            iv: [0u8; WRAP_IV_LEN],
            mac: [0u8; MAC_LEN],
            ciphertext: ciphertext.to_vec(),
        };
        wrapped.ephemeral_public_key.copy_from_slice(ephemeral);
        wrapped.iv.copy_from_slice(iv);
        wrapped.mac.copy_from_slice(mac);
        Ok(wrapped)
    }

    /// Parse the `encryptedKey` wire field (hex, optional `0x`)
    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        let bytes = decode_hex_field("encryptedKey", value)?;
        Self::from_bytes(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl fmt::Debug for WrappedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedKey")
            .field("ephemeral_public_key", &hex::encode(self.ephemeral_public_key))
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

/// Derive (encryption key, MAC key) from the ECDH shared x-coordinate
fn derive_keys(shared_x: &[u8; 32]) -> (Zeroizing<[u8; 32]>, Zeroizing<[u8; 32]>) {
    let digest = Sha512::digest(shared_x);
    let mut enc_key = Zeroizing::new([0u8; 32]);
    let mut mac_key = Zeroizing::new([0u8; 32]);
    enc_key.copy_from_slice(&digest[..32]);
    mac_key.copy_from_slice(&digest[32..]);
    (enc_key, mac_key)
}

fn mac_input(iv: &[u8], ephemeral: &[u8], ciphertext: &[u8], mac_key: &[u8]) -> Result<HmacSha256, CryptoError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key).map_err(|e| CryptoError::InvalidKey {
        key_type: "mac_key".to_string(),
        reason: e.to_string(),
    })?;
    mac.update(iv);
    mac.update(ephemeral);
    mac.update(ciphertext);
    Ok(mac)
}

/// Wrap a session key to a recipient's uncompressed public key
///
/// # Errors
///
/// - `CryptoError::MalformedPublicKey` if the recipient key is not a valid
///   65-byte uncompressed point
pub fn wrap(session_key: &SessionKey, recipient_public_key: &[u8]) -> Result<WrappedKey, CryptoError> {
    let recipient = parse_uncompressed_public_key(recipient_public_key)?;

    let ephemeral = SecretKey::random(&mut OsRng);
    let ephemeral_public_key = encode_uncompressed(&ephemeral.public_key());
    let shared = shared_secret_x(&ephemeral, &recipient);
    let (enc_key, mac_key) = derive_keys(&shared);

    let mut iv = [0u8; WRAP_IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let ciphertext = Aes256CbcEnc::new_from_slices(enc_key.as_slice(), &iv)
        .map_err(|e| CryptoError::EncryptionFailed {
            reason: format!("cbc init: {}", e),
        })?
        .encrypt_padded_vec_mut::<Pkcs7>(session_key.expose_secret());

    let tag = mac_input(&iv, &ephemeral_public_key, &ciphertext, mac_key.as_slice())?
        .finalize()
        .into_bytes();
    let mut mac = [0u8; MAC_LEN];
    mac.copy_from_slice(&tag);

    Ok(WrappedKey {
        ephemeral_public_key,
        iv,
        mac,
        ciphertext,
    })
}

/// Recover a session key with the service private key
///
/// The MAC is checked in constant time before any decryption.
///
/// # Errors
///
/// `CryptoError::UnwrapFailed` for an invalid ephemeral key, MAC mismatch,
/// bad padding, or a plaintext that is not a 32-byte key
pub fn unwrap(wrapped: &WrappedKey, service_key: &ServiceKey) -> Result<SessionKey, CryptoError> {
    let ephemeral = parse_uncompressed_public_key(&wrapped.ephemeral_public_key)
        .map_err(|e| CryptoError::unwrap_failed(format!("ephemeral key: {}", e)))?;

    let shared = shared_secret_x(service_key.secret(), &ephemeral);
    let (enc_key, mac_key) = derive_keys(&shared);

    mac_input(
        &wrapped.iv,
        &wrapped.ephemeral_public_key,
        &wrapped.ciphertext,
        mac_key.as_slice(),
    )?
    .verify_slice(&wrapped.mac)
    .map_err(|_| CryptoError::unwrap_failed("MAC mismatch"))?;

    let plaintext = Zeroizing::new(
        Aes256CbcDec::new_from_slices(enc_key.as_slice(), &wrapped.iv)
            .map_err(|e| CryptoError::unwrap_failed(format!("cbc init: {}", e)))?
            .decrypt_padded_vec_mut::<Pkcs7>(&wrapped.ciphertext)
            .map_err(|_| CryptoError::unwrap_failed("invalid padding"))?,
    );

    if plaintext.len() != SESSION_KEY_LEN {
        return Err(CryptoError::unwrap_failed(format!(
            "unwrapped key is {} bytes, expected {}",
            plaintext.len(),
            SESSION_KEY_LEN
        )));
    }

    debug!("Session key unwrapped");
    SessionKey::from_slice(&plaintext).map_err(|e| CryptoError::unwrap_failed(e.to_string()))
}
