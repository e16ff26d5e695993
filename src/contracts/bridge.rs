// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Dual Verification Bridge
//!
//! Gate between local authentication and any state-mutating ledger call.
//! The ledger re-verifies the same signature with its own logic; only when
//! both verdicts are true is the mutation sent. The finality wait that
//! follows is bounded and cancellable, and a wait that does not finish is
//! reported as indeterminate, never as success or failure.

use ethers::types::{H256, U256};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::ledger::{
    Ledger, LedgerError, LedgerEvent, LedgerReceipt, LedgerSubmission, SignatureClaim,
};
use crate::auth::{AuthError, AuthorizedRequest};
use crate::crypto::{Identity, TypedRecord};

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Bound on every single ledger read or send
    pub call_timeout: Duration,
    /// Bound on the whole finality wait
    pub confirmation_timeout: Duration,
    pub confirmations: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(15),
            confirmation_timeout: Duration::from_secs(180),
            confirmations: 2,
        }
    }
}

/// A confirmed, successful ledger mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerOutcome {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
    pub event: Option<LedgerEvent>,
}

/// State of a nonce whose submission outcome was unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum NonceResolution {
    /// The ledger has moved past the nonce; the submission landed
    Consumed { next_nonce: U256 },
    /// The nonce is still the next expected one
    Pending { next_nonce: U256 },
}

pub struct DualVerificationBridge {
    ledger: Arc<dyn Ledger>,
    config: BridgeConfig,
}

impl DualVerificationBridge {
    pub fn new(ledger: Arc<dyn Ledger>, config: BridgeConfig) -> Self {
        Self { ledger, config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    async fn call<T, F>(&self, fut: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, LedgerError>>,
    {
        tokio::time::timeout(self.config.call_timeout, fut)
            .await
            .map_err(|_| LedgerError::Timeout(self.config.call_timeout.as_secs()))?
            .map_err(AuthError::from)
    }

    /// The ledger's verdict on `claim`
    pub async fn confirm_on_chain(&self, claim: &SignatureClaim) -> Result<bool, AuthError> {
        self.call(self.ledger.verify_signature(claim)).await
    }

    /// `Ok` only when the local and ledger verdicts are both true
    pub async fn require_agreement(&self, local: bool, claim: &SignatureClaim) -> Result<(), AuthError> {
        let ledger = self.confirm_on_chain(claim).await?;
        if !(local && ledger) {
            warn!(
                identity = %claim.identity,
                local, ledger, "signature verdicts disagree"
            );
            return Err(AuthError::OnChainVerificationDivergence { local, ledger });
        }
        Ok(())
    }

    pub async fn next_nonce(&self, identity: Identity) -> Result<U256, AuthError> {
        self.call(self.ledger.next_nonce(identity)).await
    }

    /// Agreement gate, mutation, then the finality wait
    ///
    /// # Errors
    ///
    /// - `OnChainVerificationDivergence` if the two verdicts disagree
    /// - `LedgerRejected` for a revert, a failed receipt, or an order whose
    ///   stored record differs from the request's
    /// - `SubmissionIndeterminate` when the send itself times out or loses
    ///   its connection; it may still have been broadcast
    /// - `ConfirmationTimeout` when finality is not observed in time or the
    ///   wait is cancelled; the outcome is then unknown
    #[instrument(
        skip_all,
        fields(identity = %request.identity(), nonce = %request.request().nonce)
    )]
    pub async fn submit(
        &self,
        request: &AuthorizedRequest,
        cancel: &CancellationToken,
    ) -> Result<LedgerOutcome, AuthError> {
        self.require_agreement(request.verify_locally(), &request.signature_claim())
            .await?;

        let submission = request.ledger_submission();
        let tx_hash = self.send(&submission).await?;
        info!("Transaction sent - tx_hash: {:?}", tx_hash);

        let receipt = self
            .await_finality(tx_hash, submission.identity, submission.nonce(), cancel)
            .await?;

        if !receipt.success {
            error!("Transaction {:?} failed on the ledger", tx_hash);
            return Err(AuthError::LedgerRejected {
                reason: format!("transaction {:?} reverted", tx_hash),
            });
        }

        if let (TypedRecord::PlaceOrder(record), Some(LedgerEvent::OrderPlaced { order_id })) =
            (&submission.record, receipt.event)
        {
            let recorded = self.call(self.ledger.recorded_order(order_id)).await?;
            let matches = recorded.as_ref().is_some_and(|order| {
                order.data_hash == record.data_hash && order.payload == submission.payload
            });
            if !matches {
                error!("Order {} stored with a different record", order_id);
                return Err(AuthError::LedgerRejected {
                    reason: format!("order {} record does not match the request", order_id),
                });
            }
        }

        Ok(LedgerOutcome {
            tx_hash,
            block_number: receipt.block_number,
            event: receipt.event,
        })
    }

    /// Send the mutation; only an explicit rejection is a definite failure
    async fn send(&self, submission: &LedgerSubmission) -> Result<H256, AuthError> {
        let indeterminate = |reason: String| AuthError::SubmissionIndeterminate {
            identity: submission.identity,
            nonce: submission.nonce(),
            reason,
        };

        match tokio::time::timeout(self.config.call_timeout, self.ledger.submit(submission)).await {
            Ok(Ok(tx_hash)) => Ok(tx_hash),
            Ok(Err(LedgerError::Rejected(reason))) => Err(AuthError::LedgerRejected { reason }),
            Ok(Err(e)) => {
                warn!("Send for nonce {} lost: {}", submission.nonce(), e);
                Err(indeterminate(e.to_string()))
            }
            Err(_) => {
                warn!(
                    "TIMEOUT sending transaction after {}s - nonce: {}",
                    self.config.call_timeout.as_secs(),
                    submission.nonce()
                );
                Err(indeterminate(format!(
                    "send timed out after {}s",
                    self.config.call_timeout.as_secs()
                )))
            }
        }
    }

    async fn await_finality(
        &self,
        tx_hash: H256,
        identity: Identity,
        nonce: U256,
        cancel: &CancellationToken,
    ) -> Result<LedgerReceipt, AuthError> {
        let indeterminate = AuthError::ConfirmationTimeout {
            tx_hash,
            identity,
            nonce,
        };
        let started = Instant::now();

        let waited = tokio::select! {
            _ = cancel.cancelled() => {
                warn!("Confirmation wait for {:?} cancelled", tx_hash);
                return Err(indeterminate);
            }
            waited = tokio::time::timeout(
                self.config.confirmation_timeout,
                self.ledger.wait_for_receipt(tx_hash, self.config.confirmations),
            ) => waited,
        };

        match waited {
            Ok(Ok(receipt)) => {
                info!(
                    "✅ Transaction confirmed after {:.1}s",
                    started.elapsed().as_secs_f32()
                );
                Ok(receipt)
            }
            Ok(Err(LedgerError::Rejected(reason))) => Err(AuthError::LedgerRejected { reason }),
            Ok(Err(e)) => {
                warn!(
                    "Lost track of {:?} while waiting for confirmation: {}",
                    tx_hash, e
                );
                Err(indeterminate)
            }
            Err(_) => {
                warn!(
                    "TIMEOUT waiting for confirmation after {}s - tx_hash: {:?}",
                    self.config.confirmation_timeout.as_secs(),
                    tx_hash
                );
                Err(indeterminate)
            }
        }
    }

    /// Settle an indeterminate outcome by reading the ledger nonce
    pub async fn resolve_indeterminate(
        &self,
        identity: Identity,
        nonce: U256,
    ) -> Result<NonceResolution, AuthError> {
        let next_nonce = self.next_nonce(identity).await?;
        if next_nonce > nonce {
            Ok(NonceResolution::Consumed { next_nonce })
        } else {
            Ok(NonceResolution::Pending { next_nonce })
        }
    }
}
