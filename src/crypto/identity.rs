// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Identity Binding
//!
//! Binds a request to the wallet that signed it. A request is signed over a
//! [`CanonicalMessage`], which is either an EIP-712 typed record scoped to a
//! domain (preferred) or an EIP-191 personal message over canonical JSON.
//! The recovered address must equal the claimed `publicAddress`.

use ethers::types::Address;
use k256::{
    ecdsa::{SigningKey, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
    PublicKey,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

use super::canonical::personal_message_hash;
use super::error::{decode_hex_field, CryptoError};
use super::signature::{keccak256, recover_address, sign_digest, SIGNATURE_LEN};
use super::typed_data::TypedMessage;

/// Ethereum address derived from a secp256k1 public key
///
/// Equality is byte equality, so identities parsed from differently-cased
/// hex (including EIP-55 checksummed strings) compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity(Address);

impl Identity {
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        // keccak256 of the 64-byte x || y, last 20 bytes
        let encoded = public_key.to_encoded_point(false);
        let hash = keccak256(&encoded.as_bytes()[1..]);
        Identity(Address::from_slice(&hash[12..]))
    }

    pub fn from_verifying_key(verifying_key: &VerifyingKey) -> Self {
        Self::from_public_key(&PublicKey::from(verifying_key))
    }

    pub fn address(&self) -> Address {
        self.0
    }
}

impl From<Address> for Identity {
    fn from(address: Address) -> Self {
        Identity(address)
    }
}

impl FromStr for Identity {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex_field("publicAddress", s)?;
        if bytes.len() != 20 {
            return Err(CryptoError::encoding(
                "publicAddress",
                format!("expected 20 bytes, got {}", bytes.len()),
            ));
        }
        Ok(Identity(Address::from_slice(&bytes)))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self)
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Message canonicalization mode, fixed per request kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningScheme {
    /// EIP-712 typed record under a domain separator
    #[default]
    Typed,
    /// EIP-191 personal message over sorted-key compact JSON
    CanonicalJson,
}

impl FromStr for SigningScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "typed" | "eip712" => Ok(SigningScheme::Typed),
            "json" | "canonical_json" => Ok(SigningScheme::CanonicalJson),
            other => Err(format!("unknown signing scheme '{}'", other)),
        }
    }
}

/// The exact value a client signs
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalMessage {
    Typed(TypedMessage),
    Json(String),
}

impl CanonicalMessage {
    pub fn scheme(&self) -> SigningScheme {
        match self {
            CanonicalMessage::Typed(_) => SigningScheme::Typed,
            CanonicalMessage::Json(_) => SigningScheme::CanonicalJson,
        }
    }

    /// 32-byte digest that the signature covers
    pub fn digest(&self) -> [u8; 32] {
        match self {
            CanonicalMessage::Typed(message) => message.digest(),
            CanonicalMessage::Json(text) => personal_message_hash(text.as_bytes()),
        }
    }
}

/// Sign a canonical message (client side)
pub fn sign(message: &CanonicalMessage, signing_key: &SigningKey) -> Result<[u8; SIGNATURE_LEN], CryptoError> {
    sign_digest(signing_key, &message.digest())
}

/// Recover the identity that signed `message`
pub fn recover_identity(message: &CanonicalMessage, signature: &[u8]) -> Result<Identity, CryptoError> {
    recover_address(signature, &message.digest())
}

/// Recover the signer and require it to equal the claimed identity
///
/// # Errors
///
/// - `CryptoError::InvalidSignature` if the signature cannot be recovered
/// - `CryptoError::IdentityMismatch` if it recovers to a different address
pub fn verify_claim(
    message: &CanonicalMessage,
    signature: &[u8],
    claimed: &Identity,
) -> Result<Identity, CryptoError> {
    let recovered = recover_identity(message, signature)?;
    if &recovered != claimed {
        return Err(CryptoError::IdentityMismatch {
            claimed: claimed.to_string(),
            recovered: recovered.to_string(),
        });
    }
    Ok(recovered)
}
