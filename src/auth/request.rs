// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Inbound request schemas
//!
//! Each route has a fixed set of required fields. A body is checked against
//! that set and its wire encodings before any cryptography runs.

use ethers::types::U256;
use ethers::utils::parse_ether;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::AuthError;
use super::replay_guard::FreshnessToken;
use crate::crypto::error::decode_hex_field;
use crate::crypto::{
    canonical_json, payload_data_hash, AddProductRecord, CanonicalMessage, Eip712Domain,
    EncryptedEnvelope, Identity, PayloadEncoding, PlaceOrderRecord, SigningScheme, TypedMessage,
    TypedRecord,
};

/// Fields left out of the canonical JSON message
pub const UNSIGNED_FIELDS: &[&str] = &["signature", "publicAddress"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestKind {
    PlaceOrder,
    AddProduct,
}

impl RequestKind {
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            RequestKind::PlaceOrder => &[
                "productId",
                "encryptedData",
                "iv",
                "encryptedKey",
                "signature",
                "publicAddress",
                "timestamp",
                "nonce",
            ],
            RequestKind::AddProduct => &[
                "name",
                "price",
                "encryptedDetails",
                "iv",
                "encryptedKey",
                "signature",
                "publicAddress",
                "timestamp",
                "nonce",
            ],
        }
    }

    /// Name of the field that carries the AES-GCM ciphertext
    pub fn payload_field(self) -> &'static str {
        match self {
            RequestKind::PlaceOrder => "encryptedData",
            RequestKind::AddProduct => "encryptedDetails",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::PlaceOrder => "placeOrder",
            RequestKind::AddProduct => "addProduct",
        }
    }
}

/// Cleartext domain fields of the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestDetails {
    Order { product_id: U256 },
    Product { name: String, price: U256 },
}

/// A request that passed schema and encoding checks, not yet authenticated
#[derive(Debug, Clone)]
pub struct ProtectedRequest {
    pub kind: RequestKind,
    pub details: RequestDetails,
    /// Ciphertext exactly as sent, needed for `dataHash`
    pub encrypted_data: String,
    /// IV exactly as sent, needed for `dataHash`
    pub iv: String,
    pub envelope: EncryptedEnvelope,
    pub encoding: PayloadEncoding,
    /// Raw wrapped-key bytes; structure is checked at unwrap time
    pub encrypted_key: Vec<u8>,
    pub signature: Vec<u8>,
    pub claimed_identity: Identity,
    pub timestamp: u64,
    pub nonce: U256,
    body: Value,
}

impl ProtectedRequest {
    /// Validate a JSON body for `kind`
    ///
    /// # Errors
    ///
    /// - `AuthError::MissingParameter` for the first absent, null or empty field
    /// - `AuthError::MalformedEncoding` for a field with the wrong shape
    pub fn from_json(kind: RequestKind, body: &Value) -> Result<Self, AuthError> {
        let map = body
            .as_object()
            .ok_or_else(|| AuthError::malformed("body", "expected a JSON object"))?;

        for field in kind.required_fields() {
            require(map, field)?;
        }

        let encoding = match map.get("encoding") {
            None | Some(Value::Null) => PayloadEncoding::default(),
            Some(value) => serde_json::from_value(value.clone()).map_err(|_| {
                AuthError::malformed("encoding", "expected \"hex\" or \"base64\"")
            })?,
        };

        let details = match kind {
            RequestKind::PlaceOrder => RequestDetails::Order {
                product_id: uint_field(map, "productId")?,
            },
            RequestKind::AddProduct => RequestDetails::Product {
                name: string_field(map, "name")?.to_string(),
                price: price_field(map, "price")?,
            },
        };

        let encrypted_data = string_field(map, kind.payload_field())?.to_string();
        let iv = string_field(map, "iv")?.to_string();
        let envelope = EncryptedEnvelope::from_wire(&iv, &encrypted_data, encoding)
            .map_err(|e| rename_field(e.into(), "encryptedData", kind.payload_field()))?;

        let encrypted_key = decode_hex_field("encryptedKey", string_field(map, "encryptedKey")?)?;
        let signature = decode_hex_field("signature", string_field(map, "signature")?)?;
        let claimed_identity: Identity = string_field(map, "publicAddress")?.parse()?;

        let timestamp = uint_field(map, "timestamp")?;
        if timestamp > U256::from(u64::MAX) {
            return Err(AuthError::malformed("timestamp", "out of range"));
        }

        Ok(Self {
            kind,
            details,
            encrypted_data,
            iv,
            envelope,
            encoding,
            encrypted_key,
            signature,
            claimed_identity,
            timestamp: timestamp.as_u64(),
            nonce: uint_field(map, "nonce")?,
            body: body.clone(),
        })
    }

    /// keccak256 commitment to the ciphertext and IV wire strings
    pub fn data_hash(&self) -> [u8; 32] {
        payload_data_hash(&self.encrypted_data, &self.iv)
    }

    pub fn typed_record(&self) -> TypedRecord {
        let data_hash = self.data_hash();
        match &self.details {
            RequestDetails::Order { product_id } => TypedRecord::PlaceOrder(PlaceOrderRecord {
                product_id: *product_id,
                data_hash,
                timestamp: self.timestamp,
                nonce: self.nonce,
            }),
            RequestDetails::Product { name, price } => TypedRecord::AddProduct(AddProductRecord {
                name: name.clone(),
                price: *price,
                data_hash,
                timestamp: self.timestamp,
                nonce: self.nonce,
            }),
        }
    }

    /// The value the client must have signed under `scheme`
    pub fn canonical_message(&self, scheme: SigningScheme, domain: &Eip712Domain) -> CanonicalMessage {
        match scheme {
            SigningScheme::Typed => CanonicalMessage::Typed(TypedMessage {
                domain: domain.clone(),
                record: self.typed_record(),
            }),
            SigningScheme::CanonicalJson => {
                CanonicalMessage::Json(canonical_json(&self.body, UNSIGNED_FIELDS))
            }
        }
    }

    pub fn freshness_token(&self) -> FreshnessToken {
        FreshnessToken {
            timestamp: self.timestamp,
            nonce: self.nonce,
            identity: self.claimed_identity,
        }
    }
}

fn require<'a>(map: &'a Map<String, Value>, field: &str) -> Result<&'a Value, AuthError> {
    match map.get(field) {
        None | Some(Value::Null) => Err(AuthError::missing(field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(AuthError::missing(field)),
        Some(value) => Ok(value),
    }
}

fn string_field<'a>(map: &'a Map<String, Value>, field: &str) -> Result<&'a str, AuthError> {
    require(map, field)?
        .as_str()
        .ok_or_else(|| AuthError::malformed(field, "expected a string"))
}

/// Unsigned integer given as a JSON number, a decimal string or `0x` hex
fn uint_field(map: &Map<String, Value>, field: &str) -> Result<U256, AuthError> {
    match require(map, field)? {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| AuthError::malformed(field, "expected a non-negative integer")),
        Value::String(s) => {
            let s = s.trim();
            let parsed = match s.strip_prefix("0x") {
                Some(digits) if !digits.is_empty() => U256::from_str_radix(digits, 16).ok(),
                Some(_) => None,
                None if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                    U256::from_dec_str(s).ok()
                }
                None => None,
            };
            parsed.ok_or_else(|| AuthError::malformed(field, "expected a non-negative integer"))
        }
        _ => Err(AuthError::malformed(field, "expected a non-negative integer")),
    }
}

/// Ether decimal to wei
fn price_field(map: &Map<String, Value>, field: &str) -> Result<U256, AuthError> {
    let text = match require(map, field)? {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(AuthError::malformed(field, "expected an ether amount")),
    };
    if text.starts_with('-') {
        return Err(AuthError::malformed(field, "must not be negative"));
    }
    parse_ether(&text).map_err(|e| AuthError::malformed(field, format!("invalid ether amount: {}", e)))
}

fn rename_field(err: AuthError, from: &str, to: &str) -> AuthError {
    match err {
        AuthError::MalformedEncoding { field, reason } if field == from => {
            AuthError::MalformedEncoding {
                field: to.to_string(),
                reason,
            }
        }
        other => other,
    }
}
