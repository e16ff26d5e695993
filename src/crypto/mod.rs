// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request Protection Primitives
//!
//! This module implements the cryptographic primitives of the request
//! protocol between untrusted clients and the service:
//!
//! - **AES-GCM**: Payload encryption under a single-use session key
//! - **ECIES**: Wrapping the session key to the service's public key
//! - **Identity**: Signing canonical messages and recovering the signer
//! - **Typed Data / Canonical JSON**: The two message canonicalization modes
//!
//! ## Security Considerations
//!
//! - Session keys live for one request only, are zeroed on drop and never logged
//! - A fresh IV is drawn for every encryption
//! - The service key is a process-scoped handle shared read-only
//! - Public keys are format-checked before any curve arithmetic
//!
//! ## Protocol Flow
//!
//! 1. Client generates a random session key and encrypts the payload (AES-256-GCM)
//! 2. Client wraps the session key to the service public key (ECIES)
//! 3. Client computes `dataHash` and signs the typed record with its wallet
//! 4. Service recovers the signer and compares it with the claimed address
//! 5. Service checks freshness, unwraps the session key and decrypts

pub mod aes_gcm;
pub mod canonical;
pub mod ecdh;
pub mod ecies;
pub mod error;
pub mod identity;
pub mod private_key;
pub mod session_keys;
pub mod signature;
pub mod typed_data;

pub use self::aes_gcm::{decrypt, encrypt, EncryptedEnvelope, PayloadEncoding, IV_LEN, TAG_LEN};
pub use canonical::{canonical_json, personal_message_hash};
pub use ecdh::{parse_uncompressed_public_key, UNCOMPRESSED_POINT_LEN};
pub use ecies::{unwrap, wrap, WrappedKey};
pub use error::CryptoError;
pub use identity::{sign, recover_identity, verify_claim, CanonicalMessage, Identity, SigningScheme};
pub use private_key::ServiceKey;
pub use session_keys::{SessionKey, SESSION_KEY_LEN};
pub use signature::{keccak256, SIGNATURE_LEN};
pub use typed_data::{
    payload_data_hash, AddProductRecord, Eip712Domain, PlaceOrderRecord, TypedMessage, TypedRecord,
};
