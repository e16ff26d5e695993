// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session Keys
//!
//! A session key is a single-use 256-bit AES key that encrypts exactly one
//! request payload. It is created by the client, delivered wrapped to the
//! service key, and dropped when the request completes.
//!
//! **Security**: Session keys are never stored, cloned, serialized or
//! logged. The bytes are zeroed on drop.

use rand::{rngs::OsRng, RngCore};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::error::CryptoError;

/// Session key size in bytes (AES-256)
pub const SESSION_KEY_LEN: usize = 32;

/// Single-use symmetric key for one request's payload
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKey {
    bytes: [u8; SESSION_KEY_LEN],
}

impl SessionKey {
    /// Generate a fresh random session key from the OS RNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Build a session key from raw bytes
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKey` if the slice is not exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SESSION_KEY_LEN {
            return Err(CryptoError::InvalidKey {
                key_type: "session_key".to_string(),
                reason: format!(
                    "expected {} bytes, got {}",
                    SESSION_KEY_LEN,
                    bytes.len()
                ),
            });
        }

        let mut key = [0u8; SESSION_KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(Self { bytes: key })
    }

    /// Raw key bytes, for handing to a cipher
    pub fn expose_secret(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}
