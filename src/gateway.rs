// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Privacy gateway
//!
//! Ties the pieces together for one inbound request: schema checks,
//! authentication, payload checks, then the dual-verified ledger mutation.

use ethers::types::U256;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{
    AuthError, Clock, ProtectedRequest, ReplayGuard, RequestAuthenticator, RequestKind,
    SchemeSelection,
};
use crate::contracts::{
    BridgeConfig, DualVerificationBridge, Ledger, LedgerEvent, LedgerOutcome, NonceResolution,
};
use crate::crypto::{Eip712Domain, Identity, ServiceKey};

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub domain: Eip712Domain,
    pub request_window: Duration,
    pub schemes: SchemeSelection,
    pub bridge: BridgeConfig,
}

pub struct PrivacyGateway {
    service_key: Arc<ServiceKey>,
    authenticator: RequestAuthenticator,
    bridge: DualVerificationBridge,
}

impl PrivacyGateway {
    pub fn new(
        service_key: Arc<ServiceKey>,
        ledger: Arc<dyn Ledger>,
        clock: Arc<dyn Clock>,
        settings: GatewaySettings,
    ) -> Self {
        let replay_guard = ReplayGuard::new(
            clock,
            ledger.clone(),
            settings.request_window,
            settings.bridge.call_timeout,
        );
        let authenticator = RequestAuthenticator::new(
            service_key.clone(),
            replay_guard,
            settings.domain,
            settings.schemes,
        );
        let bridge = DualVerificationBridge::new(ledger, settings.bridge);

        Self {
            service_key,
            authenticator,
            bridge,
        }
    }

    pub fn domain(&self) -> &Eip712Domain {
        self.authenticator.domain()
    }

    /// `0x04…` uncompressed service public key
    pub fn public_key_hex(&self) -> String {
        self.service_key.public_key_hex()
    }

    pub fn service_identity(&self) -> Identity {
        self.service_key.identity()
    }

    /// Authenticate `body` as a `kind` request and relay it to the ledger
    #[instrument(skip_all, fields(request_id = %request_id, kind = kind.as_str()))]
    pub async fn handle(
        &self,
        kind: RequestKind,
        body: &Value,
        request_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<LedgerOutcome, AuthError> {
        let request = ProtectedRequest::from_json(kind, body)?;
        let authorized = self.authenticator.authenticate(request).await?;
        authorized.verify_payload()?;

        let outcome = self.bridge.submit(&authorized, cancel).await?;
        match outcome.event {
            Some(LedgerEvent::OrderPlaced { order_id }) => {
                info!("Order placed: {} (tx {:?})", order_id, outcome.tx_hash)
            }
            Some(LedgerEvent::ProductAdded { product_id }) => {
                info!("Product added: {} (tx {:?})", product_id, outcome.tx_hash)
            }
            None => info!("Transaction confirmed without event: {:?}", outcome.tx_hash),
        }
        Ok(outcome)
    }

    pub async fn next_nonce(&self, identity: Identity) -> Result<U256, AuthError> {
        self.bridge.next_nonce(identity).await
    }

    /// See [`DualVerificationBridge::resolve_indeterminate`]
    pub async fn resolve(&self, identity: Identity, nonce: U256) -> Result<NonceResolution, AuthError> {
        self.bridge.resolve_indeterminate(identity, nonce).await
    }
}
