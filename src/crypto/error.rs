// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Error Types
//!
//! Error types for every primitive used by the request protocol, with
//! enough context to tell which field or key failed.
//!
//! ## Error Variants
//!
//! - **MalformedEncoding**: A wire field is not valid hex/base64 or has the wrong size
//! - **MalformedPublicKey**: A public key is not a 65-byte uncompressed secp256k1 point
//! - **InvalidKey**: A private or session key has the wrong size or is out of range
//! - **InvalidSignature**: Signature encoding is malformed or not recoverable
//! - **IdentityMismatch**: Signature recovers to someone other than the claimed signer
//! - **IntegrityFailed**: AES-GCM authentication tag did not verify
//! - **UnwrapFailed**: Wrapped session key is malformed or its MAC does not verify
//! - **EncryptionFailed**: The cipher refused to encrypt (should not happen with valid keys)
//!
//! None of the variants carry key material or plaintext.

use thiserror::Error;

/// Error type for all cryptographic operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// A wire-encoded field could not be decoded
    #[error("Malformed encoding for '{field}': {reason}")]
    MalformedEncoding {
        /// Which field failed validation
        field: String,
        /// Specific failure reason
        reason: String,
    },

    /// Public key failed format validation before any curve arithmetic
    #[error("Malformed public key: {reason}")]
    MalformedPublicKey { reason: String },

    /// Invalid private or symmetric key
    #[error("Invalid key ({key_type}): {reason}")]
    InvalidKey {
        /// Type of key that failed (e.g., "session_key", "service_private_key")
        key_type: String,
        /// Specific failure reason
        reason: String,
    },

    /// ECDSA signature parsing or recovery failed
    #[error("Invalid signature: {reason}")]
    InvalidSignature { reason: String },

    /// Signature recovered to an address other than the claimed one
    #[error("Signer {recovered} does not match claimed identity {claimed}")]
    IdentityMismatch { claimed: String, recovered: String },

    /// Payload decryption failed authentication
    #[error("Payload integrity check failed: {reason}")]
    IntegrityFailed { reason: String },

    /// Session key unwrap failed (structure or MAC)
    #[error("Session key unwrap failed: {reason}")]
    UnwrapFailed { reason: String },

    #[error("Encryption failed: {reason}")]
    EncryptionFailed { reason: String },
}

impl CryptoError {
    pub(crate) fn encoding(field: &str, reason: impl Into<String>) -> Self {
        CryptoError::MalformedEncoding {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unwrap_failed(reason: impl Into<String>) -> Self {
        CryptoError::UnwrapFailed {
            reason: reason.into(),
        }
    }
}

// Conversion from hex decode errors
impl From<hex::FromHexError> for CryptoError {
    fn from(err: hex::FromHexError) -> Self {
        CryptoError::MalformedEncoding {
            field: "hex_field".to_string(),
            reason: format!("hex decode error: {}", err),
        }
    }
}

// Conversion from k256 errors (elliptic curve operations)
impl From<k256::elliptic_curve::Error> for CryptoError {
    fn from(err: k256::elliptic_curve::Error) -> Self {
        CryptoError::InvalidKey {
            key_type: "unknown".to_string(),
            reason: format!("k256 error: {}", err),
        }
    }
}

/// Decode a hex field, accepting an optional `0x` prefix
pub(crate) fn decode_hex_field(field: &str, value: &str) -> Result<Vec<u8>, CryptoError> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(CryptoError::encoding(field, "empty hex string"));
    }

    hex::decode(digits).map_err(|e| CryptoError::encoding(field, format!("invalid hex: {}", e)))
}
