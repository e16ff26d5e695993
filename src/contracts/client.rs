// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::abi::RawLog;
use ethers::contract::EthLogDecode;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::ledger::{
    ClaimStatement, Ledger, LedgerError, LedgerEvent, LedgerReceipt, LedgerSubmission,
    RecordedOrder, SealedPayload, SignatureClaim,
};
use super::types::{EcommercePrivacy, EcommercePrivacyEvents};
use crate::crypto::{Identity, ServiceKey, TypedRecord};

type RelayClient = SignerMiddleware<Arc<Provider<Http>>, LocalWallet>;

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_address: Address,
    pub polling_interval: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 11155111,
            contract_address: Address::zero(),
            polling_interval: Duration::from_millis(500),
        }
    }
}

/// Ledger backed by the deployed EcommercePrivacy contract
///
/// Transactions are signed by the service wallet; the buyer or seller is
/// passed to the contract explicitly.
pub struct EthersLedger {
    provider: Arc<Provider<Http>>,
    contract: EcommercePrivacy<RelayClient>,
    config: LedgerConfig,
}

impl EthersLedger {
    pub async fn new(config: LedgerConfig, service_key: &ServiceKey) -> Result<Self> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| anyhow!("Failed to create provider: {}", e))?
            .interval(config.polling_interval);

        // Verify connection
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| anyhow!("Failed to connect to RPC: {}", e))?;

        if chain_id.as_u64() != config.chain_id {
            return Err(anyhow!(
                "Chain ID mismatch: expected {}, got {}",
                config.chain_id,
                chain_id
            ));
        }

        let provider = Arc::new(provider);
        let wallet = service_key.to_wallet()?.with_chain_id(config.chain_id);
        let signer = Arc::new(SignerMiddleware::new(provider.clone(), wallet));
        let contract = EcommercePrivacy::new(config.contract_address, signer);

        info!(
            "Connected to EcommercePrivacy at {:?} on chain {}",
            config.contract_address, config.chain_id
        );

        Ok(Self {
            provider,
            contract,
            config,
        })
    }

    pub fn contract_address(&self) -> Address {
        self.config.contract_address
    }

    fn decode_event(receipt: &TransactionReceipt) -> Option<LedgerEvent> {
        receipt.logs.iter().find_map(|log| {
            let raw = RawLog {
                topics: log.topics.clone(),
                data: log.data.to_vec(),
            };
            match EcommercePrivacyEvents::decode_log(&raw).ok()? {
                EcommercePrivacyEvents::OrderPlacedFilter(e) => Some(LedgerEvent::OrderPlaced {
                    order_id: e.order_id,
                }),
                EcommercePrivacyEvents::ProductAddedFilter(e) => Some(LedgerEvent::ProductAdded {
                    product_id: e.product_id,
                }),
            }
        })
    }
}

fn contract_error(err: ContractError<RelayClient>) -> LedgerError {
    if err.is_revert() {
        LedgerError::Rejected(err.to_string())
    } else {
        LedgerError::Unavailable(err.to_string())
    }
}

#[async_trait]
impl Ledger for EthersLedger {
    async fn next_nonce(&self, identity: Identity) -> Result<U256, LedgerError> {
        self.contract
            .nonces(identity.address())
            .call()
            .await
            .map_err(contract_error)
    }

    async fn verify_signature(&self, claim: &SignatureClaim) -> Result<bool, LedgerError> {
        let signature = Bytes::from(claim.signature.clone());
        let signer = claim.identity.address();

        let verdict = match &claim.statement {
            ClaimStatement::Typed(TypedRecord::PlaceOrder(r)) => {
                self.contract
                    .verify_signature(
                        signer,
                        r.product_id,
                        r.data_hash,
                        U256::from(r.timestamp),
                        r.nonce,
                        signature,
                    )
                    .call()
                    .await
            }
            ClaimStatement::Typed(TypedRecord::AddProduct(r)) => {
                self.contract
                    .verify_product_signature(
                        signer,
                        r.name.clone(),
                        r.price,
                        r.data_hash,
                        U256::from(r.timestamp),
                        r.nonce,
                        signature,
                    )
                    .call()
                    .await
            }
            ClaimStatement::Message(digest) => {
                self.contract
                    .verify_message_signature(signer, *digest, signature)
                    .call()
                    .await
            }
        };

        verdict.map_err(contract_error)
    }

    async fn submit(&self, submission: &LedgerSubmission) -> Result<H256, LedgerError> {
        let signature = Bytes::from(submission.signature.clone());
        let account = submission.identity.address();
        let payload = &submission.payload;
        let encrypted_key = Bytes::from(payload.encrypted_key.clone());

        let call = match (&submission.record, &submission.statement) {
            (TypedRecord::PlaceOrder(r), ClaimStatement::Typed(_)) => self.contract.place_order(
                account,
                r.product_id,
                payload.encrypted_data.clone(),
                payload.iv.clone(),
                encrypted_key,
                r.data_hash,
                U256::from(r.timestamp),
                r.nonce,
                signature,
            ),
            (TypedRecord::AddProduct(r), ClaimStatement::Typed(_)) => self.contract.add_product(
                account,
                r.name.clone(),
                r.price,
                payload.encrypted_data.clone(),
                payload.iv.clone(),
                encrypted_key,
                r.data_hash,
                U256::from(r.timestamp),
                r.nonce,
                signature,
            ),
            // The contract cannot rebuild canonical JSON, so it checks the signature
            // against the message hash and binds the nonce itself
            (TypedRecord::AddProduct(r), ClaimStatement::Message(digest)) => {
                self.contract.add_product_with_message(
                    account,
                    r.name.clone(),
                    r.price,
                    payload.encrypted_data.clone(),
                    payload.iv.clone(),
                    encrypted_key,
                    r.data_hash,
                    r.nonce,
                    *digest,
                    signature,
                )
            }
            (TypedRecord::PlaceOrder(_), ClaimStatement::Message(_)) => {
                return Err(LedgerError::Rejected(
                    "placeOrder requires a typed signature".to_string(),
                ))
            }
        };

        let pending = call.send().await.map_err(contract_error)?;
        let tx_hash = pending.tx_hash();
        info!(
            "Transaction sent for {} - tx_hash: {:?}",
            submission.identity, tx_hash
        );
        Ok(tx_hash)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: H256,
        confirmations: usize,
    ) -> Result<LedgerReceipt, LedgerError> {
        debug!("Waiting for {} confirmations of {:?}", confirmations, tx_hash);

        let receipt = PendingTransaction::new(tx_hash, self.provider.as_ref())
            .interval(self.config.polling_interval)
            .confirmations(confirmations)
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?
            .ok_or_else(|| LedgerError::Rejected(format!("transaction {:?} dropped", tx_hash)))?;

        let success = receipt.status == Some(U64::from(1));
        if !success {
            warn!("Transaction {:?} reverted, status {:?}", tx_hash, receipt.status);
        }

        Ok(LedgerReceipt {
            tx_hash,
            block_number: receipt.block_number.map(|n| n.as_u64()),
            success,
            event: Self::decode_event(&receipt),
        })
    }

    async fn recorded_order(&self, order_id: U256) -> Result<Option<RecordedOrder>, LedgerError> {
        let (buyer, product_id, encrypted_data, iv, encrypted_key, data_hash, _timestamp) = self
            .contract
            .orders(order_id)
            .call()
            .await
            .map_err(contract_error)?;

        if buyer.is_zero() {
            return Ok(None);
        }
        Ok(Some(RecordedOrder {
            buyer: Identity::from(buyer),
            product_id,
            data_hash,
            payload: SealedPayload {
                encrypted_data,
                iv,
                encrypted_key: encrypted_key.to_vec(),
            },
        }))
    }
}
