// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! AES-GCM Payload Encryption
//!
//! Encrypts request payloads under a single-use session key, in the same
//! format the browser client produces with Node's `aes-256-gcm` cipher.
//!
//! **Envelope Format**:
//! ```text
//! iv:         12 bytes (96 bits), fresh from the OS RNG on every call
//! ciphertext: encrypted payload || 16-byte authentication tag
//! ```
//!
//! - Algorithm: AES-256-GCM
//! - No Additional Authenticated Data (AAD)
//! - Decryption failures are integrity failures and are never retried

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use super::error::{decode_hex_field, CryptoError};
use super::session_keys::SessionKey;

/// AES-GCM IV size (96 bits)
pub const IV_LEN: usize = 12;

/// AES-GCM authentication tag size
pub const TAG_LEN: usize = 16;

/// Wire encoding of the ciphertext field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    #[default]
    Hex,
    Base64,
}

/// Ciphertext and IV produced by one encryption call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    pub iv: [u8; IV_LEN],
    /// Encrypted payload with the authentication tag appended
    pub ciphertext: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Parse the envelope from its wire strings
    ///
    /// `iv` is hex (optional `0x`), `data` is hex or base64 per `encoding`.
    pub fn from_wire(
        iv: &str,
        data: &str,
        encoding: PayloadEncoding,
    ) -> Result<Self, CryptoError> {
        let iv_bytes = decode_hex_field("iv", iv)?;
        if iv_bytes.len() != IV_LEN {
            return Err(CryptoError::encoding(
                "iv",
                format!("expected {} bytes, got {}", IV_LEN, iv_bytes.len()),
            ));
        }

        let ciphertext = match encoding {
            PayloadEncoding::Hex => decode_hex_field("encryptedData", data)?,
            PayloadEncoding::Base64 => BASE64
                .decode(data.trim())
                .map_err(|e| CryptoError::encoding("encryptedData", format!("invalid base64: {}", e)))?,
        };

        if ciphertext.len() < TAG_LEN {
            return Err(CryptoError::encoding(
                "encryptedData",
                format!(
                    "ciphertext too short: expected at least {} bytes for the tag, got {}",
                    TAG_LEN,
                    ciphertext.len()
                ),
            ));
        }

        let mut iv_array = [0u8; IV_LEN];
        iv_array.copy_from_slice(&iv_bytes);

        Ok(Self {
            iv: iv_array,
            ciphertext,
        })
    }

    /// IV as lowercase hex without prefix (the form the client signs over)
    pub fn iv_hex(&self) -> String {
        hex::encode(self.iv)
    }

    /// Ciphertext in the requested wire encoding
    pub fn data_string(&self, encoding: PayloadEncoding) -> String {
        match encoding {
            PayloadEncoding::Hex => hex::encode(&self.ciphertext),
            PayloadEncoding::Base64 => BASE64.encode(&self.ciphertext),
        }
    }
}

/// Encrypt a payload under a session key
///
/// A new random IV is drawn for every call; IVs are never derived from a
/// counter, so no two envelopes share an IV even under a reused key.
///
/// # Example
///
/// ```rust,ignore
/// let key = SessionKey::generate();
/// let envelope = encrypt(br#"{"address":"1 Main St"}"#, &key)?;
/// ```
pub fn encrypt(plaintext: &[u8], key: &SessionKey) -> Result<EncryptedEnvelope, CryptoError> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    debug_assert!(iv.iter().any(|b| *b != 0), "IV must come from the RNG");

    let cipher = Aes256Gcm::new_from_slice(key.expose_secret()).map_err(|e| {
        CryptoError::InvalidKey {
            key_type: "session_key".to_string(),
            reason: e.to_string(),
        }
    })?;

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: plaintext,
                aad: b"",
            },
        )
        .map_err(|e| CryptoError::EncryptionFailed {
            reason: format!("AES-GCM encryption failed: {}", e),
        })?;

    Ok(EncryptedEnvelope { iv, ciphertext })
}

/// Decrypt and authenticate an envelope
///
/// # Errors
///
/// Returns `CryptoError::IntegrityFailed` if the tag does not verify (wrong
/// key, tampered ciphertext, tampered IV) or the ciphertext is shorter than
/// a tag.
pub fn decrypt(envelope: &EncryptedEnvelope, key: &SessionKey) -> Result<Vec<u8>, CryptoError> {
    if envelope.ciphertext.len() < TAG_LEN {
        return Err(CryptoError::IntegrityFailed {
            reason: format!(
                "ciphertext shorter than the {}-byte tag",
                TAG_LEN
            ),
        });
    }

    let cipher = Aes256Gcm::new_from_slice(key.expose_secret()).map_err(|e| {
        CryptoError::InvalidKey {
            key_type: "session_key".to_string(),
            reason: e.to_string(),
        }
    })?;

    cipher
        .decrypt(
            Nonce::from_slice(&envelope.iv),
            Payload {
                msg: &envelope.ciphertext,
                aad: b"",
            },
        )
        .map_err(|_| CryptoError::IntegrityFailed {
            reason: "authentication tag mismatch (wrong key or tampered data)".to_string(),
        })
}
