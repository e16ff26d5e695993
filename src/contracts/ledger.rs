// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ledger Collaborator
//!
//! The ledger is the sole authority for per-identity nonces and the final
//! judge of signatures. This module defines the operations the request
//! protocol needs from it; [`super::EthersLedger`] talks to the deployed
//! contract and [`super::InMemoryLedger`] backs tests and local development.

use async_trait::async_trait;
use ethers::types::{H256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{Identity, TypedRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    #[error("Ledger call timed out after {0}s")]
    Timeout(u64),

    #[error("Ledger rejected the call: {0}")]
    Rejected(String),
}

/// What the signer committed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimStatement {
    /// EIP-712 record, verified under the contract's own domain
    Typed(TypedRecord),
    /// EIP-191 personal message hash of canonical JSON
    Message([u8; 32]),
}

/// A signature the ledger is asked to re-verify
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureClaim {
    pub identity: Identity,
    pub statement: ClaimStatement,
    pub signature: Vec<u8>,
}

/// Encrypted payload stored on the ledger alongside the record
///
/// The strings are kept exactly as the client sent them so that
/// `dataHash` can be recomputed from what the ledger holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPayload {
    pub encrypted_data: String,
    pub iv: String,
    /// ECIES-wrapped session key, readable only by the service
    pub encrypted_key: Vec<u8>,
}

/// A state-mutating call relayed on behalf of `identity`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSubmission {
    pub identity: Identity,
    pub record: TypedRecord,
    /// What `signature` covers; differs from `record` for canonical JSON
    pub statement: ClaimStatement,
    pub signature: Vec<u8>,
    pub payload: SealedPayload,
}

impl LedgerSubmission {
    pub fn nonce(&self) -> U256 {
        match &self.record {
            TypedRecord::PlaceOrder(r) => r.nonce,
            TypedRecord::AddProduct(r) => r.nonce,
        }
    }
}

/// Id assigned by the contract, taken from its event log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LedgerEvent {
    OrderPlaced { order_id: U256 },
    ProductAdded { product_id: U256 },
}

/// An order as the ledger stores it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedOrder {
    pub buyer: Identity,
    pub product_id: U256,
    pub data_hash: [u8; 32],
    pub payload: SealedPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
    pub success: bool,
    pub event: Option<LedgerEvent>,
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Next nonce the ledger will accept from `identity`
    async fn next_nonce(&self, identity: Identity) -> Result<U256, LedgerError>;

    /// The ledger's own verdict on a signature
    async fn verify_signature(&self, claim: &SignatureClaim) -> Result<bool, LedgerError>;

    /// Send the state-mutating call; returns the transaction hash
    ///
    /// The ledger checks and consumes the nonce atomically.
    async fn submit(&self, submission: &LedgerSubmission) -> Result<H256, LedgerError>;

    /// Resolve once the transaction has `confirmations` blocks on top
    async fn wait_for_receipt(
        &self,
        tx_hash: H256,
        confirmations: usize,
    ) -> Result<LedgerReceipt, LedgerError>;

    /// The stored order, if it exists
    async fn recorded_order(&self, order_id: U256) -> Result<Option<RecordedOrder>, LedgerError>;
}
