// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDH Key Exchange Implementation
//!
//! Elliptic Curve Diffie-Hellman over secp256k1 (the curve used by Ethereum
//! wallets). The key wrapper performs ECDH between an ephemeral key and the
//! service's static key to derive the session-key wrapping secrets.

use k256::{elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey};
use zeroize::Zeroizing;

use super::error::CryptoError;

/// Length of an uncompressed SEC1 point (0x04 || x || y)
pub const UNCOMPRESSED_POINT_LEN: usize = 65;

/// Prefix byte of an uncompressed SEC1 point
pub const UNCOMPRESSED_POINT_PREFIX: u8 = 0x04;

/// Parse and validate an uncompressed secp256k1 public key
///
/// The format is checked before the bytes reach curve arithmetic:
/// - exactly 65 bytes
/// - first byte `0x04`
/// - point lies on the curve
///
/// # Errors
///
/// Returns `CryptoError::MalformedPublicKey` for any violation.
pub fn parse_uncompressed_public_key(bytes: &[u8]) -> Result<PublicKey, CryptoError> {
    if bytes.len() != UNCOMPRESSED_POINT_LEN {
        return Err(CryptoError::MalformedPublicKey {
            reason: format!(
                "expected {} bytes, got {}",
                UNCOMPRESSED_POINT_LEN,
                bytes.len()
            ),
        });
    }

    if bytes[0] != UNCOMPRESSED_POINT_PREFIX {
        return Err(CryptoError::MalformedPublicKey {
            reason: format!(
                "expected uncompressed prefix 0x04, got 0x{:02x}",
                bytes[0]
            ),
        });
    }

    PublicKey::from_sec1_bytes(bytes).map_err(|_| CryptoError::MalformedPublicKey {
        reason: "point is not on secp256k1".to_string(),
    })
}

/// Encode a public key as an uncompressed 65-byte point
pub fn encode_uncompressed(public_key: &PublicKey) -> [u8; UNCOMPRESSED_POINT_LEN] {
    let encoded = public_key.to_encoded_point(false);
    let mut out = [0u8; UNCOMPRESSED_POINT_LEN];
    out.copy_from_slice(encoded.as_bytes());
    out
}

/// Compute the ECDH shared secret (x-coordinate of the shared point)
///
/// # Example
///
/// ```ignore
/// let shared_x = shared_secret_x(&ephemeral_secret, &recipient_public)?;
/// // Feed shared_x into the KDF
/// ```
pub fn shared_secret_x(secret: &SecretKey, public: &PublicKey) -> Zeroizing<[u8; 32]> {
    // shared_point = public * secret
    let shared = k256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());

    let mut x = Zeroizing::new([0u8; 32]);
    x.copy_from_slice(shared.raw_secret_bytes().as_slice());
    x
}
