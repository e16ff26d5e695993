// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Stage ordering: signature, then freshness, then key unwrap

use async_trait::async_trait;
use ecommerce_privacy_node::auth::{
    AuthError, FixedClock, ProtectedRequest, ReplayGuard, RequestAuthenticator, RequestKind,
    SchemeSelection,
};
use ecommerce_privacy_node::client::RequestSealer;
use ecommerce_privacy_node::contracts::{
    Ledger, LedgerError, LedgerReceipt, LedgerSubmission, RecordedOrder, SignatureClaim,
};
use ecommerce_privacy_node::crypto::{Eip712Domain, Identity, ServiceKey};
use ethers::types::{Address, H256, U256};
use k256::ecdsa::SigningKey;
use mockall::mock;
use rand::rngs::OsRng;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Chain {}

    #[async_trait]
    impl Ledger for Chain {
        async fn next_nonce(&self, identity: Identity) -> Result<U256, LedgerError>;
        async fn verify_signature(&self, claim: &SignatureClaim) -> Result<bool, LedgerError>;
        async fn submit(&self, submission: &LedgerSubmission) -> Result<H256, LedgerError>;
        async fn wait_for_receipt(
            &self,
            tx_hash: H256,
            confirmations: usize,
        ) -> Result<LedgerReceipt, LedgerError>;
        async fn recorded_order(&self, order_id: U256) -> Result<Option<RecordedOrder>, LedgerError>;
    }
}

const NOW: u64 = 1_700_000_000;

struct Fixture {
    authenticator: RequestAuthenticator,
    sealer: RequestSealer,
}

fn fixture(chain: MockChain) -> Fixture {
    let domain = Eip712Domain::new(31337, Address::repeat_byte(0x5f));
    let service_key = Arc::new(ServiceKey::generate());
    let guard = ReplayGuard::new(
        Arc::new(FixedClock(NOW)),
        Arc::new(chain),
        Duration::from_secs(300),
        Duration::from_millis(200),
    );
    Fixture {
        authenticator: RequestAuthenticator::new(
            service_key.clone(),
            guard,
            domain.clone(),
            SchemeSelection::default(),
        ),
        sealer: RequestSealer::new(
            SigningKey::random(&mut OsRng),
            service_key.public_key_uncompressed().to_vec(),
            domain,
        ),
    }
}

fn order(fixture: &Fixture, timestamp: u64) -> Value {
    fixture
        .sealer
        .seal_order(U256::one(), br#"{"address":"a","phone":"b"}"#, timestamp, U256::zero())
        .unwrap()
}

async fn authenticate(fixture: &Fixture, body: &Value) -> Result<(), AuthError> {
    let request = ProtectedRequest::from_json(RequestKind::PlaceOrder, body)?;
    fixture.authenticator.authenticate(request).await.map(|_| ())
}

#[tokio::test]
async fn test_bad_signature_never_reads_nonce() {
    let mut chain = MockChain::new();
    chain.expect_next_nonce().never();
    let fixture = fixture(chain);

    let mut body = order(&fixture, NOW);
    body["productId"] = json!("2");

    assert!(matches!(
        authenticate(&fixture, &body).await,
        Err(AuthError::IdentityMismatch { .. })
    ));
}

#[tokio::test]
async fn test_expired_request_never_reads_nonce() {
    let mut chain = MockChain::new();
    chain.expect_next_nonce().never();
    let fixture = fixture(chain);

    let body = order(&fixture, NOW - 301);
    assert!(matches!(
        authenticate(&fixture, &body).await,
        Err(AuthError::Expired { .. })
    ));
}

#[tokio::test]
async fn test_replay_detected_before_unwrap() {
    let mut chain = MockChain::new();
    chain
        .expect_next_nonce()
        .times(1)
        .returning(|_| Ok(U256::from(4u64)));
    let fixture = fixture(chain);

    // Garbage wrapped key: the replay is reported, not the unwrap failure
    let mut body = order(&fixture, NOW);
    body["encryptedKey"] = json!(format!("0x{}", "ab".repeat(40)));

    assert!(matches!(
        authenticate(&fixture, &body).await,
        Err(AuthError::NonceReplay { .. })
    ));
}

#[tokio::test]
async fn test_corrupt_wrapped_key_is_unwrap_error() {
    let mut chain = MockChain::new();
    chain.expect_next_nonce().returning(|_| Ok(U256::zero()));
    let fixture = fixture(chain);

    let mut body = order(&fixture, NOW);
    body["encryptedKey"] = json!(format!("0x{}", "ab".repeat(40)));

    assert!(matches!(
        authenticate(&fixture, &body).await,
        Err(AuthError::UnwrapError { .. })
    ));
}

#[tokio::test]
async fn test_nonce_read_failure_is_ledger_unavailable() {
    let mut chain = MockChain::new();
    chain
        .expect_next_nonce()
        .returning(|_| Err(LedgerError::Unavailable("connection refused".into())));
    let fixture = fixture(chain);

    let err = authenticate(&fixture, &order(&fixture, NOW)).await.unwrap_err();
    assert!(matches!(err, AuthError::LedgerUnavailable { .. }));
    assert_eq!(err.status_code(), 503);
}
