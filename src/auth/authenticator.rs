// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request Authentication
//!
//! Drives a [`ProtectedRequest`] through the fixed stage sequence
//!
//! ```text
//! Received -> SignatureVerified -> Fresh -> KeyUnwrapped -> Authorized
//! ```
//!
//! stopping at the first rejection. Nothing is written anywhere before the
//! request is authorized, and the unwrapped session key only lives inside the
//! resulting [`AuthorizedRequest`].

use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::error::AuthError;
use super::replay_guard::ReplayGuard;
use super::request::{ProtectedRequest, RequestKind};
use crate::contracts::{ClaimStatement, LedgerSubmission, SealedPayload, SignatureClaim};
use crate::crypto::{
    decrypt, unwrap, verify_claim, CanonicalMessage, Eip712Domain, Identity, ServiceKey,
    SessionKey, SigningScheme, WrappedKey,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Received,
    SignatureVerified,
    Fresh,
    KeyUnwrapped,
    Authorized,
}

impl fmt::Display for AuthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthStage::Received => "received",
            AuthStage::SignatureVerified => "signature_verified",
            AuthStage::Fresh => "fresh",
            AuthStage::KeyUnwrapped => "key_unwrapped",
            AuthStage::Authorized => "authorized",
        };
        f.write_str(name)
    }
}

/// Signing scheme expected for each request kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemeSelection {
    pub place_order: SigningScheme,
    pub add_product: SigningScheme,
}

impl Default for SchemeSelection {
    fn default() -> Self {
        Self {
            place_order: SigningScheme::Typed,
            add_product: SigningScheme::Typed,
        }
    }
}

impl SchemeSelection {
    pub fn for_kind(&self, kind: RequestKind) -> SigningScheme {
        match kind {
            RequestKind::PlaceOrder => self.place_order,
            RequestKind::AddProduct => self.add_product,
        }
    }
}

pub struct RequestAuthenticator {
    service_key: Arc<ServiceKey>,
    replay_guard: ReplayGuard,
    domain: Eip712Domain,
    schemes: SchemeSelection,
}

impl RequestAuthenticator {
    pub fn new(
        service_key: Arc<ServiceKey>,
        replay_guard: ReplayGuard,
        domain: Eip712Domain,
        schemes: SchemeSelection,
    ) -> Self {
        Self {
            service_key,
            replay_guard,
            domain,
            schemes,
        }
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    /// Run the stage sequence; fail fast on the first rejection
    ///
    /// # Errors
    ///
    /// `InvalidSignature`, `IdentityMismatch`, `Expired`, `NonceReplay`,
    /// `UnwrapError`, or `LedgerUnavailable` when the nonce read fails.
    #[instrument(
        skip_all,
        fields(
            kind = request.kind.as_str(),
            identity = %request.claimed_identity,
            nonce = %request.nonce,
        )
    )]
    pub async fn authenticate(&self, request: ProtectedRequest) -> Result<AuthorizedRequest, AuthError> {
        debug!(stage = %AuthStage::Received);

        let scheme = self.schemes.for_kind(request.kind);
        let message = request.canonical_message(scheme, &self.domain);
        let identity = verify_claim(&message, &request.signature, &request.claimed_identity)?;
        debug!(stage = %AuthStage::SignatureVerified);

        self.replay_guard
            .check_fresh(&request.freshness_token())
            .await?;
        debug!(stage = %AuthStage::Fresh);

        let wrapped = WrappedKey::from_bytes(&request.encrypted_key)?;
        let session_key = unwrap(&wrapped, &self.service_key)?;
        debug!(stage = %AuthStage::KeyUnwrapped);

        debug!(stage = %AuthStage::Authorized);
        Ok(AuthorizedRequest {
            request,
            identity,
            message,
            session_key,
        })
    }
}

/// A request that passed every authentication stage
///
/// Owns the session key for the rest of the request; it is zeroed when this
/// value is dropped.
#[derive(Debug)]
pub struct AuthorizedRequest {
    request: ProtectedRequest,
    identity: Identity,
    message: CanonicalMessage,
    session_key: SessionKey,
}

impl AuthorizedRequest {
    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn request(&self) -> &ProtectedRequest {
        &self.request
    }

    pub fn kind(&self) -> RequestKind {
        self.request.kind
    }

    pub fn scheme(&self) -> SigningScheme {
        self.message.scheme()
    }

    /// Local verdict on the signature, recomputed from the signed message
    pub fn verify_locally(&self) -> bool {
        verify_claim(&self.message, &self.request.signature, &self.identity).is_ok()
    }

    /// Decrypt the payload. The plaintext is zeroed on drop.
    pub fn open_payload(&self) -> Result<Zeroizing<Vec<u8>>, AuthError> {
        Ok(Zeroizing::new(decrypt(&self.request.envelope, &self.session_key)?))
    }

    /// Check the decrypted payload's contents
    ///
    /// Orders must be a JSON object with non-empty `address` and `phone`; an
    /// optional `userId` must be the authenticated identity. Product details
    /// must be UTF-8 text.
    pub fn verify_payload(&self) -> Result<(), AuthError> {
        let plaintext = self.open_payload()?;

        match self.request.kind {
            RequestKind::PlaceOrder => {
                let order: OrderPayload = serde_json::from_slice(&plaintext)
                    .map_err(|_| AuthError::malformed("payload", "order details must be a JSON object"))?;

                if order.address.trim().is_empty() {
                    return Err(AuthError::malformed("payload", "address is required"));
                }
                if order.phone.trim().is_empty() {
                    return Err(AuthError::malformed("payload", "phone is required"));
                }
                if let Some(user_id) = order.user_id.as_deref() {
                    let owner: Identity = user_id
                        .parse()
                        .map_err(|_| AuthError::malformed("payload", "userId is not an address"))?;
                    if owner != self.identity {
                        return Err(AuthError::IdentityMismatch {
                            claimed: owner.to_string(),
                            recovered: self.identity.to_string(),
                        });
                    }
                }
            }
            RequestKind::AddProduct => {
                std::str::from_utf8(&plaintext)
                    .map_err(|_| AuthError::malformed("payload", "product details must be UTF-8"))?;
            }
        }
        Ok(())
    }

    /// The same signature, restated for the ledger to verify
    pub fn signature_claim(&self) -> SignatureClaim {
        let statement = match &self.message {
            CanonicalMessage::Typed(typed) => ClaimStatement::Typed(typed.record.clone()),
            CanonicalMessage::Json(_) => ClaimStatement::Message(self.message.digest()),
        };
        SignatureClaim {
            identity: self.identity,
            statement,
            signature: self.request.signature.clone(),
        }
    }

    pub fn ledger_submission(&self) -> LedgerSubmission {
        let claim = self.signature_claim();
        LedgerSubmission {
            identity: claim.identity,
            record: self.request.typed_record(),
            statement: claim.statement,
            signature: claim.signature,
            payload: SealedPayload {
                encrypted_data: self.request.encrypted_data.clone(),
                iv: self.request.iv.clone(),
                encrypted_key: self.request.encrypted_key.clone(),
            },
        }
    }
}

#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
struct OrderPayload {
    #[serde(default)]
    address: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    user_id: Option<String>,
}
