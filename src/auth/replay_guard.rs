// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Freshness checks
//!
//! A request is fresh when its timestamp lies within the acceptance window
//! around now and its nonce equals the next nonce the ledger expects from
//! the claimed identity. The ledger is read on every check; nonces are never
//! cached or serialized locally.

use ethers::types::U256;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::error::AuthError;
use crate::contracts::{Ledger, LedgerError};
use crate::crypto::Identity;

/// Source of the current unix time in seconds
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// Clock pinned to a fixed instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_secs(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessToken {
    /// Unix seconds
    pub timestamp: u64,
    pub nonce: U256,
    pub identity: Identity,
}

pub struct ReplayGuard {
    clock: Arc<dyn Clock>,
    ledger: Arc<dyn Ledger>,
    window: Duration,
    call_timeout: Duration,
}

impl ReplayGuard {
    pub fn new(
        clock: Arc<dyn Clock>,
        ledger: Arc<dyn Ledger>,
        window: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self {
            clock,
            ledger,
            window,
            call_timeout,
        }
    }

    /// Accept iff `|now - timestamp| <= window`
    pub fn check_timestamp(&self, timestamp: u64) -> Result<(), AuthError> {
        let now = self.clock.now_secs();
        let window_secs = self.window.as_secs();
        if now.abs_diff(timestamp) > window_secs {
            return Err(AuthError::Expired {
                timestamp,
                now,
                window_secs,
            });
        }
        Ok(())
    }

    /// Read the ledger's next nonce for `identity`, bounded by the call timeout
    pub async fn expected_nonce(&self, identity: Identity) -> Result<U256, AuthError> {
        let nonce = tokio::time::timeout(self.call_timeout, self.ledger.next_nonce(identity))
            .await
            .map_err(|_| LedgerError::Timeout(self.call_timeout.as_secs()))??;
        Ok(nonce)
    }

    /// Timestamp first, then the ledger nonce
    ///
    /// # Errors
    ///
    /// - `AuthError::Expired` outside the window (no ledger read happens)
    /// - `AuthError::NonceReplay` when the nonce is not the next expected one
    /// - `AuthError::LedgerUnavailable` if the nonce read fails or times out
    pub async fn check_fresh(&self, token: &FreshnessToken) -> Result<(), AuthError> {
        self.check_timestamp(token.timestamp)?;

        let expected = self.expected_nonce(token.identity).await?;
        if token.nonce != expected {
            return Err(AuthError::NonceReplay {
                expected,
                received: token.nonce,
            });
        }

        debug!(identity = %token.identity, nonce = %token.nonce, "request is fresh");
        Ok(())
    }
}
