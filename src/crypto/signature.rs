// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDSA Signature Recovery
//!
//! Recovers Ethereum addresses from 65-byte recoverable ECDSA signatures and
//! produces such signatures over 32-byte digests. Both the EIP-712 and the
//! EIP-191 message modes reduce to these two operations.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use tiny_keccak::{Hasher, Keccak};
use tracing::debug;

use super::error::CryptoError;
use super::identity::Identity;

/// Signature size: r (32) + s (32) + v (1)
pub const SIGNATURE_LEN: usize = 65;

/// Hash data with keccak256
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut hash = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut hash);
    hash
}

/// Recover the signer's address from a signature over a 32-byte digest
///
/// # Arguments
///
/// * `signature` - 65-byte compact signature (r + s + v)
///   - Bytes 0-31: r component (big-endian)
///   - Bytes 32-63: s component (big-endian)
///   - Byte 64: recovery ID (v), 0/1 or Ethereum-style 27/28
/// * `digest` - 32-byte hash that was signed
///
/// # Errors
///
/// Returns `CryptoError::InvalidSignature` if:
/// - Signature is not exactly 65 bytes
/// - Recovery ID is invalid
/// - r/s do not form a recoverable signature for this digest
pub fn recover_address(signature: &[u8], digest: &[u8; 32]) -> Result<Identity, CryptoError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(CryptoError::InvalidSignature {
            reason: format!(
                "expected {} bytes, got {}",
                SIGNATURE_LEN,
                signature.len()
            ),
        });
    }

    // Handle Ethereum-style recovery IDs (27/28) by normalizing to 0/1
    let mut v = signature[64];
    if v >= 27 {
        v -= 27;
    }
    if v > 1 {
        return Err(CryptoError::InvalidSignature {
            reason: format!("invalid recovery ID: {}", signature[64]),
        });
    }

    let recovery_id = RecoveryId::try_from(v).map_err(|e| CryptoError::InvalidSignature {
        reason: format!("failed to create recovery ID: {}", e),
    })?;

    let parsed = Signature::try_from(&signature[..64]).map_err(|e| {
        CryptoError::InvalidSignature {
            reason: format!("failed to parse r/s: {}", e),
        }
    })?;

    let verifying_key = VerifyingKey::recover_from_prehash(digest, &parsed, recovery_id)
        .map_err(|e| CryptoError::InvalidSignature {
            reason: format!("failed to recover public key: {}", e),
        })?;

    Ok(Identity::from_verifying_key(&verifying_key))
}

/// Sign a 32-byte digest, returning r || s || v with v = 27 or 28
pub fn sign_digest(signing_key: &SigningKey, digest: &[u8; 32]) -> Result<[u8; SIGNATURE_LEN], CryptoError> {
    let (signature, recovery_id) = signing_key
        .sign_prehash_recoverable(digest)
        .map_err(|e| CryptoError::InvalidSignature {
            reason: format!("signing failed: {}", e),
        })?;

    let mut sig_bytes = [0u8; SIGNATURE_LEN];
    sig_bytes[..64].copy_from_slice(&signature.to_bytes());
    sig_bytes[64] = recovery_id.to_byte() + 27;

    debug!("Generated 65-byte signature, v={}", sig_bytes[64]);

    Ok(sig_bytes)
}
