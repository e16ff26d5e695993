// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service Private Key
//!
//! The service holds one long-lived secp256k1 key. Clients wrap session keys
//! to its public half; the private half unwraps them and signs ledger
//! transactions.
//!
//! ## Security Considerations
//!
//! - Loaded once at startup from the `PRIVATE_KEY` environment variable
//! - Must be a 32-byte hex string with "0x" prefix
//! - Shared read-only behind an `Arc` across all requests, never copied into
//!   per-request structures
//! - Key is NEVER logged; `Debug` is redacted and the scalar is zeroed on drop
//!
//! ## Usage
//!
//! ```no_run
//! use ecommerce_privacy_node::crypto::ServiceKey;
//!
//! let key = ServiceKey::from_env("PRIVATE_KEY")?;
//! println!("Service public key: {}", key.public_key_hex());
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use ethers::signers::LocalWallet;
use k256::{ecdsa::SigningKey, PublicKey, SecretKey};
use rand::rngs::OsRng;
use std::{env, fmt};
use tracing::info;
use zeroize::Zeroizing;

use super::ecdh::{encode_uncompressed, UNCOMPRESSED_POINT_LEN};
use super::error::CryptoError;
use super::identity::Identity;

/// Process-scoped handle to the service's long-lived private key
pub struct ServiceKey {
    secret: SecretKey,
}

impl ServiceKey {
    /// Generate a random service key (tests and local development)
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::random(&mut OsRng),
        }
    }

    /// Parse a `0x`-prefixed 64-character hex private key
    ///
    /// # Errors
    ///
    /// - Key doesn't start with "0x" prefix
    /// - Key is not exactly 64 hex characters
    /// - Key is not a valid secp256k1 scalar (zero or >= curve order)
    pub fn from_hex(key_str: &str) -> Result<Self, CryptoError> {
        let key_str = key_str.trim();

        let hex_str = key_str.strip_prefix("0x").ok_or_else(|| CryptoError::InvalidKey {
            key_type: "service_private_key".to_string(),
            reason: "must start with '0x' prefix (Ethereum format)".to_string(),
        })?;

        if hex_str.len() != 64 {
            return Err(CryptoError::InvalidKey {
                key_type: "service_private_key".to_string(),
                reason: format!(
                    "must be exactly 64 hex characters (32 bytes), got {} characters",
                    hex_str.len()
                ),
            });
        }

        let key_bytes = Zeroizing::new(hex::decode(hex_str).map_err(|e| {
            CryptoError::InvalidKey {
                key_type: "service_private_key".to_string(),
                reason: format!("contains invalid hex characters: {}", e),
            }
        })?);

        let secret = SecretKey::from_slice(&key_bytes).map_err(|_| CryptoError::InvalidKey {
            key_type: "service_private_key".to_string(),
            reason: "not a valid secp256k1 scalar".to_string(),
        })?;

        Ok(Self { secret })
    }

    /// Load the service key from an environment variable
    pub fn from_env(var: &str) -> Result<Self> {
        let key_str = env::var(var).map_err(|_| anyhow!("{} environment variable not set", var))?;

        if key_str.trim().is_empty() {
            return Err(anyhow!("{} is empty", var));
        }

        let key = Self::from_hex(&key_str).map_err(|e| anyhow!("{}: {}", var, e))?;

        // Log success WITHOUT logging the actual key
        info!(
            "✅ Service private key loaded (address {})",
            key.identity()
        );

        Ok(key)
    }

    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    /// Uncompressed 65-byte public key (0x04 || x || y)
    pub fn public_key_uncompressed(&self) -> [u8; UNCOMPRESSED_POINT_LEN] {
        encode_uncompressed(&self.public_key())
    }

    /// `0x04…` hex form served to clients for key wrapping
    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.public_key_uncompressed()))
    }

    /// Ethereum address of the service key
    pub fn identity(&self) -> Identity {
        Identity::from_public_key(&self.public_key())
    }

    pub(crate) fn secret(&self) -> &SecretKey {
        &self.secret
    }

    /// ECDSA signing key for this service key
    pub fn signing_key(&self) -> Result<SigningKey, CryptoError> {
        SigningKey::from_bytes(&self.secret.to_bytes()).map_err(|e| CryptoError::InvalidKey {
            key_type: "service_private_key".to_string(),
            reason: e.to_string(),
        })
    }

    /// Ethers wallet for submitting ledger transactions
    pub fn to_wallet(&self) -> Result<LocalWallet> {
        let mut raw = Zeroizing::new([0u8; 32]);
        raw.copy_from_slice(&self.secret.to_bytes());
        LocalWallet::from_bytes(raw.as_slice())
            .map_err(|e| anyhow!("Failed to build wallet from service key: {}", e))
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceKey")
            .field("address", &self.identity().to_string())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
