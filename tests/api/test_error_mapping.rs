// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Failure kinds and their HTTP status codes

use super::support::{bridge_config, domain, MockChain, TestNode, NOW, ORDER};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use ecommerce_privacy_node::config::Posture;
use ecommerce_privacy_node::contracts::{
    InMemoryLedger, Ledger, LedgerError, LedgerEvent, LedgerReceipt, LedgerSubmission,
    RecordedOrder, SealedPayload, SignatureClaim,
};
use ecommerce_privacy_node::crypto::Identity;
use ethers::types::{H256, U256};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Commits every submission, then stalls before answering
struct StallingLedger {
    inner: InMemoryLedger,
    stall: Duration,
}

#[async_trait]
impl Ledger for StallingLedger {
    async fn next_nonce(&self, identity: Identity) -> Result<U256, LedgerError> {
        self.inner.next_nonce(identity).await
    }

    async fn verify_signature(&self, claim: &SignatureClaim) -> Result<bool, LedgerError> {
        self.inner.verify_signature(claim).await
    }

    async fn submit(&self, submission: &LedgerSubmission) -> Result<H256, LedgerError> {
        let tx_hash = self.inner.submit(submission).await?;
        tokio::time::sleep(self.stall).await;
        Ok(tx_hash)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: H256,
        confirmations: usize,
    ) -> Result<LedgerReceipt, LedgerError> {
        self.inner.wait_for_receipt(tx_hash, confirmations).await
    }

    async fn recorded_order(&self, order_id: U256) -> Result<Option<RecordedOrder>, LedgerError> {
        self.inner.recorded_order(order_id).await
    }
}

#[tokio::test]
async fn test_missing_field_is_400() {
    let node = TestNode::new(Arc::new(InMemoryLedger::new(domain())));
    let mut body = node
        .sealer()
        .seal_order(U256::one(), ORDER, NOW, U256::zero())
        .unwrap();
    body.as_object_mut().unwrap().remove("signature");

    let (status, response) = node.post("/placeOrder", &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["errorType"], "missing_parameter");
    assert_eq!(response["error"], "Missing required parameter: signature");
    assert!(response["requestId"].is_string());
    assert!(response.get("debug").is_none());
}

#[tokio::test]
async fn test_invalid_json_is_400() {
    let node = TestNode::new(Arc::new(InMemoryLedger::new(domain())));
    let (status, response) = node
        .send(
            Request::builder()
                .method("POST")
                .uri("/placeOrder")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["errorType"], "invalid_request");
}

#[tokio::test]
async fn test_identity_mismatch_is_401() {
    let node = TestNode::new(Arc::new(InMemoryLedger::new(domain())));
    let mut body = node
        .sealer()
        .seal_order(U256::one(), ORDER, NOW, U256::zero())
        .unwrap();
    body["publicAddress"] = json!("0x742d35cc6634c0532925a3b844bc9e7595f0beb0");

    let (status, response) = node.post("/placeOrder", &body).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response["errorType"], "identity_mismatch");
    assert_eq!(response["error"], "Signature does not match publicAddress");
}

#[tokio::test]
async fn test_expired_is_408() {
    let node = TestNode::new(Arc::new(InMemoryLedger::new(domain())));
    let body = node
        .sealer()
        .seal_order(U256::one(), ORDER, NOW - 301, U256::zero())
        .unwrap();

    let (status, response) = node.post("/placeOrder", &body).await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(response["errorType"], "expired");
}

#[tokio::test]
async fn test_ledger_divergence_is_502_and_not_submitted() {
    let mut chain = MockChain::new();
    chain.expect_next_nonce().returning(|_| Ok(U256::zero()));
    chain.expect_verify_signature().times(1).returning(|_| Ok(false));
    chain.expect_submit().never();
    let node = TestNode::new(Arc::new(chain));

    let body = node
        .sealer()
        .seal_order(U256::one(), ORDER, NOW, U256::zero())
        .unwrap();
    let (status, response) = node.post("/placeOrder", &body).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(response["errorType"], "on_chain_verification_divergence");
}

#[tokio::test]
async fn test_ledger_down_is_503() {
    let mut chain = MockChain::new();
    chain
        .expect_next_nonce()
        .returning(|_| Err(LedgerError::Unavailable("connection refused".into())));
    let node = TestNode::new(Arc::new(chain));

    let body = node
        .sealer()
        .seal_order(U256::one(), ORDER, NOW, U256::zero())
        .unwrap();
    let (status, response) = node.post("/placeOrder", &body).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response["errorType"], "ledger_unavailable");
}

#[tokio::test]
async fn test_revert_is_500() {
    let mut chain = MockChain::new();
    chain.expect_next_nonce().returning(|_| Ok(U256::zero()));
    chain.expect_verify_signature().returning(|_| Ok(true));
    chain
        .expect_submit()
        .returning(|_| Err(LedgerError::Rejected("execution reverted: Invalid nonce".into())));
    let node = TestNode::new(Arc::new(chain));

    let body = node
        .sealer()
        .seal_order(U256::one(), ORDER, NOW, U256::zero())
        .unwrap();
    let (status, response) = node.post("/placeOrder", &body).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response["errorType"], "ledger_rejected");
}

#[tokio::test]
async fn test_confirmation_timeout_is_504_and_resolvable() {
    let ledger = Arc::new(InMemoryLedger::new(domain()));
    ledger.hold_receipts();

    let mut bridge = bridge_config();
    bridge.confirmation_timeout = Duration::from_millis(100);
    let node = TestNode::with(ledger.clone(), bridge, Posture::Production);
    let sealer = node.sealer();

    let body = sealer.seal_order(U256::one(), ORDER, NOW, U256::zero()).unwrap();
    let (status, response) = node.post("/placeOrder", &body).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(response["errorType"], "confirmation_timeout");
    assert_eq!(response["publicAddress"], sealer.identity().to_string());
    assert_eq!(response["nonce"], "0");
    assert!(response["txHash"].as_str().unwrap().starts_with("0x"));

    // The submission landed even though the wait gave up
    let (status, resolution) = node
        .get(&format!("/nonce/{}?pending=0", sealer.identity()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolution["status"], "consumed");
    assert_eq!(resolution["nonce"], "1");
    ledger.release_receipts();
}

#[tokio::test]
async fn test_send_timeout_is_indeterminate() {
    let ledger = Arc::new(StallingLedger {
        inner: InMemoryLedger::new(domain()),
        stall: Duration::from_millis(500),
    });
    let mut bridge = bridge_config();
    bridge.call_timeout = Duration::from_millis(100);
    let node = TestNode::with(ledger.clone(), bridge, Posture::Production);
    let sealer = node.sealer();

    let body = sealer.seal_order(U256::one(), ORDER, NOW, U256::zero()).unwrap();
    let (status, response) = node.post("/placeOrder", &body).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(response["errorType"], "submission_indeterminate");
    assert_eq!(response["publicAddress"], sealer.identity().to_string());
    assert_eq!(response["nonce"], "0");
    assert_eq!(ledger.inner.submissions(), 1);

    let (status, resolution) = node
        .get(&format!("/nonce/{}?pending=0", sealer.identity()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolution["status"], "consumed");
}

#[tokio::test]
async fn test_lost_connection_during_send_is_504() {
    let mut chain = MockChain::new();
    chain.expect_next_nonce().returning(|_| Ok(U256::zero()));
    chain.expect_verify_signature().returning(|_| Ok(true));
    chain
        .expect_submit()
        .times(1)
        .returning(|_| Err(LedgerError::Unavailable("connection reset".into())));
    chain.expect_wait_for_receipt().never();
    let node = TestNode::new(Arc::new(chain));

    let body = node
        .sealer()
        .seal_order(U256::one(), ORDER, NOW, U256::zero())
        .unwrap();
    let (status, response) = node.post("/placeOrder", &body).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(response["errorType"], "submission_indeterminate");
    assert_eq!(response["nonce"], "0");
    assert!(response.get("txHash").is_none());
}

#[tokio::test]
async fn test_shutdown_cancels_confirmation_wait() {
    let ledger = Arc::new(InMemoryLedger::new(domain()));
    ledger.hold_receipts();

    let mut bridge = bridge_config();
    bridge.confirmation_timeout = Duration::from_secs(60);
    let node = TestNode::with(ledger, bridge, Posture::Production);
    let body = node
        .sealer()
        .seal_order(U256::one(), ORDER, NOW, U256::zero())
        .unwrap();

    let shutdown = node.state.shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();
    });

    let (status, response) = tokio::time::timeout(
        Duration::from_secs(5),
        node.post("/placeOrder", &body),
    )
    .await
    .expect("cancellation should end the wait");

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(response["errorType"], "confirmation_timeout");
}

#[tokio::test]
async fn test_tampered_order_record_is_rejected() {
    let mut chain = MockChain::new();
    chain.expect_next_nonce().returning(|_| Ok(U256::zero()));
    chain.expect_verify_signature().returning(|_| Ok(true));
    chain.expect_submit().returning(|_| Ok(H256::repeat_byte(3)));
    chain.expect_wait_for_receipt().returning(|tx_hash, _| {
        Ok(LedgerReceipt {
            tx_hash,
            block_number: Some(1),
            success: true,
            event: Some(LedgerEvent::OrderPlaced {
                order_id: U256::zero(),
            }),
        })
    });
    chain.expect_recorded_order().returning(|_| {
        Ok(Some(RecordedOrder {
            buyer: Identity::from(ethers::types::Address::repeat_byte(1)),
            product_id: U256::one(),
            data_hash: [0u8; 32],
            payload: SealedPayload {
                encrypted_data: String::new(),
                iv: String::new(),
                encrypted_key: Vec::new(),
            },
        }))
    });
    let node = TestNode::new(Arc::new(chain));

    let body = node
        .sealer()
        .seal_order(U256::one(), ORDER, NOW, U256::zero())
        .unwrap();
    let (status, response) = node.post("/placeOrder", &body).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response["errorType"], "ledger_rejected");
}

#[tokio::test]
async fn test_development_posture_adds_debug() {
    let node = TestNode::with(
        Arc::new(InMemoryLedger::new(domain())),
        bridge_config(),
        Posture::Development,
    );
    let (status, response) = node.post("/placeOrder", &json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Missing required parameter: productId");
    assert_eq!(response["debug"]["status"], 400);
}
