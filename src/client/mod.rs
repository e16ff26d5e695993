// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client-side request sealing
//!
//! Produces request bodies the service accepts: the payload is encrypted
//! under a fresh session key, the key is wrapped to the service public key,
//! and the typed record (or canonical JSON) is signed with the client wallet.
//! Used by `privacy-cli` and the integration tests.

use ethers::types::U256;
use ethers::utils::parse_ether;
use k256::ecdsa::SigningKey;
use serde_json::{json, Value};

use crate::auth::UNSIGNED_FIELDS;
use crate::crypto::{
    canonical_json, encrypt, parse_uncompressed_public_key, payload_data_hash, sign, wrap,
    AddProductRecord, CanonicalMessage, CryptoError, Eip712Domain, Identity, PayloadEncoding,
    PlaceOrderRecord, SessionKey, SigningScheme, TypedMessage, TypedRecord,
};

pub struct RequestSealer {
    signing_key: SigningKey,
    service_public_key: Vec<u8>,
    domain: Eip712Domain,
    encoding: PayloadEncoding,
    product_scheme: SigningScheme,
}

impl RequestSealer {
    pub fn new(signing_key: SigningKey, service_public_key: Vec<u8>, domain: Eip712Domain) -> Self {
        Self {
            signing_key,
            service_public_key,
            domain,
            encoding: PayloadEncoding::Hex,
            product_scheme: SigningScheme::Typed,
        }
    }

    pub fn with_encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_product_scheme(mut self, scheme: SigningScheme) -> Self {
        self.product_scheme = scheme;
        self
    }

    pub fn identity(&self) -> Identity {
        Identity::from_verifying_key(self.signing_key.verifying_key())
    }

    /// Sealed `placeOrder` body
    pub fn seal_order(
        &self,
        product_id: U256,
        payload: &[u8],
        timestamp: u64,
        nonce: U256,
    ) -> Result<Value, CryptoError> {
        let sealed = self.seal_payload(payload)?;
        let record = TypedRecord::PlaceOrder(PlaceOrderRecord {
            product_id,
            data_hash: payload_data_hash(&sealed.data, &sealed.iv),
            timestamp,
            nonce,
        });
        let signature = self.sign_typed(record)?;

        let mut body = json!({
            "productId": product_id.to_string(),
            "encryptedData": sealed.data,
            "iv": sealed.iv,
            "encryptedKey": sealed.encrypted_key,
            "timestamp": timestamp,
            "nonce": nonce.to_string(),
        });
        self.finish(&mut body, signature);
        Ok(body)
    }

    /// Sealed `addProduct` body; `price` is an ether decimal
    pub fn seal_product(
        &self,
        name: &str,
        price: &str,
        details: &[u8],
        timestamp: u64,
        nonce: U256,
    ) -> Result<Value, CryptoError> {
        let price_wei = parse_ether(price)
            .map_err(|e| CryptoError::encoding("price", format!("invalid ether amount: {}", e)))?;
        let sealed = self.seal_payload(details)?;

        let mut body = json!({
            "name": name,
            "price": price,
            "encryptedDetails": sealed.data,
            "iv": sealed.iv,
            "encryptedKey": sealed.encrypted_key,
            "timestamp": timestamp,
            "nonce": nonce.to_string(),
        });
        if self.encoding != PayloadEncoding::Hex {
            body["encoding"] = json!(self.encoding);
        }

        let signature = match self.product_scheme {
            SigningScheme::Typed => self.sign_typed(TypedRecord::AddProduct(AddProductRecord {
                name: name.to_string(),
                price: price_wei,
                data_hash: payload_data_hash(&sealed.data, &sealed.iv),
                timestamp,
                nonce,
            }))?,
            SigningScheme::CanonicalJson => {
                let text = canonical_json(&body, UNSIGNED_FIELDS);
                sign(&CanonicalMessage::Json(text), &self.signing_key)?
            }
        };

        self.finish(&mut body, signature);
        Ok(body)
    }

    fn seal_payload(&self, payload: &[u8]) -> Result<SealedPayload, CryptoError> {
        parse_uncompressed_public_key(&self.service_public_key)?;

        let session_key = SessionKey::generate();
        let envelope = encrypt(payload, &session_key)?;
        let wrapped = wrap(&session_key, &self.service_public_key)?;

        Ok(SealedPayload {
            data: envelope.data_string(self.encoding),
            iv: envelope.iv_hex(),
            encrypted_key: format!("0x{}", wrapped.to_hex()),
        })
    }

    fn sign_typed(&self, record: TypedRecord) -> Result<[u8; 65], CryptoError> {
        let message = CanonicalMessage::Typed(TypedMessage {
            domain: self.domain.clone(),
            record,
        });
        sign(&message, &self.signing_key)
    }

    fn finish(&self, body: &mut Value, signature: [u8; 65]) {
        if self.encoding != PayloadEncoding::Hex {
            body["encoding"] = json!(self.encoding);
        }
        body["signature"] = json!(format!("0x{}", hex::encode(signature)));
        body["publicAddress"] = json!(self.identity().to_string());
    }
}

struct SealedPayload {
    data: String,
    iv: String,
    encrypted_key: String,
}
