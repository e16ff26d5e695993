// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::contracts::{LedgerEvent, LedgerOutcome, NonceResolution};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub success: bool,
    pub tx_hash: String,
    pub block_number: Option<u64>,
    /// Id from the `OrderPlaced` event, decimal
    pub order_id: Option<String>,
}

impl From<LedgerOutcome> for PlaceOrderResponse {
    fn from(outcome: LedgerOutcome) -> Self {
        let order_id = match outcome.event {
            Some(LedgerEvent::OrderPlaced { order_id }) => Some(order_id.to_string()),
            _ => None,
        };
        Self {
            success: true,
            tx_hash: format!("{:?}", outcome.tx_hash),
            block_number: outcome.block_number,
            order_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProductResponse {
    pub success: bool,
    pub tx_hash: String,
    pub block_number: Option<u64>,
    /// Id from the `ProductAdded` event, decimal
    pub product_id: Option<String>,
}

impl From<LedgerOutcome> for AddProductResponse {
    fn from(outcome: LedgerOutcome) -> Self {
        let product_id = match outcome.event {
            Some(LedgerEvent::ProductAdded { product_id }) => Some(product_id.to_string()),
            _ => None,
        };
        Self {
            success: true,
            tx_hash: format!("{:?}", outcome.tx_hash),
            block_number: outcome.block_number,
            product_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    /// Uncompressed secp256k1 point, `0x04…`
    pub public_key: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NonceQuery {
    /// Nonce of a submission whose outcome is unknown
    pub pending: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceResponse {
    pub address: String,
    pub nonce: String,
    /// `consumed` or `pending`, only when `?pending=` was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl NonceResponse {
    pub fn resolved(address: String, resolution: NonceResolution) -> Self {
        let (status, next_nonce) = match resolution {
            NonceResolution::Consumed { next_nonce } => ("consumed", next_nonce),
            NonceResolution::Pending { next_nonce } => ("pending", next_nonce),
        };
        Self {
            address,
            nonce: next_nonce.to_string(),
            status: Some(status.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub chain_id: u64,
    pub chain_name: String,
    pub contract: String,
}
