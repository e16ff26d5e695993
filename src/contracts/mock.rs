// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory ledger for tests and `--dev-ledger` runs
//!
//! Behaves like the contract: it verifies signatures under its own domain
//! and checks-and-increments nonces atomically under one lock.

use async_trait::async_trait;
use ethers::types::{H256, U256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

use super::ledger::{
    ClaimStatement, Ledger, LedgerError, LedgerEvent, LedgerReceipt, LedgerSubmission,
    RecordedOrder, SealedPayload, SignatureClaim,
};
use crate::crypto::signature::recover_address;
use crate::crypto::{
    keccak256, recover_identity, CanonicalMessage, Eip712Domain, Identity, TypedMessage,
    TypedRecord,
};

#[derive(Default)]
struct LedgerState {
    nonces: HashMap<Identity, U256>,
    orders: HashMap<U256, RecordedOrder>,
    products: HashMap<U256, SealedPayload>,
    receipts: HashMap<H256, LedgerReceipt>,
}

pub struct InMemoryLedger {
    domain: Eip712Domain,
    state: Mutex<LedgerState>,
    block_number: AtomicU64,
    submissions: AtomicU64,
    hold_receipts: AtomicBool,
    released: Notify,
}

impl InMemoryLedger {
    pub fn new(domain: Eip712Domain) -> Self {
        Self {
            domain,
            state: Mutex::new(LedgerState::default()),
            block_number: AtomicU64::new(1),
            submissions: AtomicU64::new(0),
            hold_receipts: AtomicBool::new(false),
            released: Notify::new(),
        }
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    /// Number of state-mutating calls accepted so far
    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Keep receipts pending until [`release_receipts`](Self::release_receipts)
    pub fn hold_receipts(&self) {
        self.hold_receipts.store(true, Ordering::SeqCst);
    }

    pub fn release_receipts(&self) {
        self.hold_receipts.store(false, Ordering::SeqCst);
        self.released.notify_waiters();
    }

    /// Encrypted details stored for a product
    pub fn product_payload(&self, product_id: U256) -> Option<SealedPayload> {
        self.state.lock().ok()?.products.get(&product_id).cloned()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LedgerState>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Unavailable("ledger state poisoned".to_string()))
    }

    fn recover(&self, claim: &SignatureClaim) -> Option<Identity> {
        let message = match &claim.statement {
            ClaimStatement::Typed(record) => CanonicalMessage::Typed(TypedMessage {
                domain: self.domain.clone(),
                record: record.clone(),
            }),
            ClaimStatement::Message(digest) => {
                return recover_address(&claim.signature, digest).ok()
            }
        };
        recover_identity(&message, &claim.signature).ok()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn next_nonce(&self, identity: Identity) -> Result<U256, LedgerError> {
        Ok(self
            .lock()?
            .nonces
            .get(&identity)
            .copied()
            .unwrap_or_default())
    }

    async fn verify_signature(&self, claim: &SignatureClaim) -> Result<bool, LedgerError> {
        Ok(self.recover(claim) == Some(claim.identity))
    }

    async fn submit(&self, submission: &LedgerSubmission) -> Result<H256, LedgerError> {
        let claim = SignatureClaim {
            identity: submission.identity,
            statement: submission.statement.clone(),
            signature: submission.signature.clone(),
        };
        let signature_ok = self.recover(&claim) == Some(submission.identity);
        if matches!(
            (&submission.record, &submission.statement),
            (TypedRecord::PlaceOrder(_), ClaimStatement::Message(_))
        ) {
            return Err(LedgerError::Rejected(
                "placeOrder requires a typed signature".to_string(),
            ));
        }

        let mut state = self.lock()?;
        let expected = state
            .nonces
            .get(&submission.identity)
            .copied()
            .unwrap_or_default();

        if submission.nonce() != expected {
            return Err(LedgerError::Rejected(format!(
                "invalid nonce: expected {}, got {}",
                expected,
                submission.nonce()
            )));
        }
        if !signature_ok {
            return Err(LedgerError::Rejected("invalid signature".to_string()));
        }

        state
            .nonces
            .insert(submission.identity, expected + U256::one());

        let event = match &submission.record {
            TypedRecord::PlaceOrder(r) => {
                let order_id = U256::from(state.orders.len());
                state.orders.insert(
                    order_id,
                    RecordedOrder {
                        buyer: submission.identity,
                        product_id: r.product_id,
                        data_hash: r.data_hash,
                        payload: submission.payload.clone(),
                    },
                );
                LedgerEvent::OrderPlaced { order_id }
            }
            TypedRecord::AddProduct(_) => {
                let product_id = U256::from(state.products.len());
                state.products.insert(product_id, submission.payload.clone());
                LedgerEvent::ProductAdded { product_id }
            }
        };

        let count = self.submissions.fetch_add(1, Ordering::SeqCst);
        let mut preimage = submission.identity.address().as_bytes().to_vec();
        preimage.extend_from_slice(&count.to_be_bytes());
        let tx_hash = H256::from(keccak256(&preimage));

        let block_number = self.block_number.fetch_add(1, Ordering::SeqCst);
        state.receipts.insert(
            tx_hash,
            LedgerReceipt {
                tx_hash,
                block_number: Some(block_number),
                success: true,
                event: Some(event),
            },
        );

        Ok(tx_hash)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: H256,
        _confirmations: usize,
    ) -> Result<LedgerReceipt, LedgerError> {
        loop {
            let released = self.released.notified();
            if !self.hold_receipts.load(Ordering::SeqCst) {
                break;
            }
            released.await;
        }

        self.lock()?
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| LedgerError::Rejected(format!("unknown transaction {:?}", tx_hash)))
    }

    async fn recorded_order(&self, order_id: U256) -> Result<Option<RecordedOrder>, LedgerError> {
        Ok(self.lock()?.orders.get(&order_id).cloned())
    }
}
