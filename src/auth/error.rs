// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request rejection taxonomy
//!
//! Every variant is terminal for the request; nothing here is retried.
//! The two 504 variants mean the ledger may or may not have applied the
//! mutation; clients settle them by re-reading the nonce.

use ethers::types::{H256, U256};
use thiserror::Error;

use crate::contracts::LedgerError;
use crate::crypto::{CryptoError, Identity};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing required parameter: {field}")]
    MissingParameter { field: String },

    #[error("Malformed {field}: {reason}")]
    MalformedEncoding { field: String, reason: String },

    #[error("Invalid signature: {reason}")]
    InvalidSignature { reason: String },

    #[error("Signature does not match publicAddress")]
    IdentityMismatch { claimed: String, recovered: String },

    #[error("Request expired: timestamp {timestamp} is outside the {window_secs}s window")]
    Expired { timestamp: u64, now: u64, window_secs: u64 },

    #[error("Invalid nonce: expected {expected}, got {received}")]
    NonceReplay { expected: U256, received: U256 },

    #[error("Failed to unwrap session key: {reason}")]
    UnwrapError { reason: String },

    #[error("Payload integrity check failed: {reason}")]
    IntegrityError { reason: String },

    #[error("Ledger disagrees with local signature verification (local={local}, ledger={ledger})")]
    OnChainVerificationDivergence { local: bool, ledger: bool },

    #[error("Transaction {tx_hash:?} not confirmed in time; outcome unknown")]
    ConfirmationTimeout {
        tx_hash: H256,
        identity: Identity,
        nonce: U256,
    },

    #[error("Submission for nonce {nonce} has an unknown outcome: {reason}")]
    SubmissionIndeterminate {
        identity: Identity,
        nonce: U256,
        reason: String,
    },

    #[error("Ledger unavailable: {reason}")]
    LedgerUnavailable { reason: String },

    #[error("Ledger rejected the request: {reason}")]
    LedgerRejected { reason: String },
}

impl AuthError {
    pub fn missing(field: &str) -> Self {
        AuthError::MissingParameter {
            field: field.to_string(),
        }
    }

    pub fn malformed(field: &str, reason: impl Into<String>) -> Self {
        AuthError::MalformedEncoding {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::MissingParameter { .. } | AuthError::MalformedEncoding { .. } => 400,
            AuthError::InvalidSignature { .. } | AuthError::IdentityMismatch { .. } => 401,
            AuthError::Expired { .. } | AuthError::NonceReplay { .. } => 408,
            AuthError::UnwrapError { .. }
            | AuthError::IntegrityError { .. }
            | AuthError::LedgerRejected { .. } => 500,
            AuthError::OnChainVerificationDivergence { .. } => 502,
            AuthError::LedgerUnavailable { .. } => 503,
            AuthError::ConfirmationTimeout { .. } | AuthError::SubmissionIndeterminate { .. } => 504,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            AuthError::MissingParameter { .. } => "missing_parameter",
            AuthError::MalformedEncoding { .. } => "malformed_encoding",
            AuthError::InvalidSignature { .. } => "invalid_signature",
            AuthError::IdentityMismatch { .. } => "identity_mismatch",
            AuthError::Expired { .. } => "expired",
            AuthError::NonceReplay { .. } => "nonce_replay",
            AuthError::UnwrapError { .. } => "unwrap_error",
            AuthError::IntegrityError { .. } => "integrity_error",
            AuthError::OnChainVerificationDivergence { .. } => "on_chain_verification_divergence",
            AuthError::ConfirmationTimeout { .. } => "confirmation_timeout",
            AuthError::SubmissionIndeterminate { .. } => "submission_indeterminate",
            AuthError::LedgerUnavailable { .. } => "ledger_unavailable",
            AuthError::LedgerRejected { .. } => "ledger_rejected",
        }
    }
}

impl From<CryptoError> for AuthError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::MalformedEncoding { field, reason } => {
                AuthError::MalformedEncoding { field, reason }
            }
            CryptoError::MalformedPublicKey { reason } => AuthError::MalformedEncoding {
                field: "publicKey".to_string(),
                reason,
            },
            CryptoError::InvalidSignature { reason } => AuthError::InvalidSignature { reason },
            CryptoError::IdentityMismatch { claimed, recovered } => {
                AuthError::IdentityMismatch { claimed, recovered }
            }
            CryptoError::IntegrityFailed { reason } | CryptoError::EncryptionFailed { reason } => {
                AuthError::IntegrityError { reason }
            }
            CryptoError::UnwrapFailed { reason } => AuthError::UnwrapError { reason },
            CryptoError::InvalidKey { key_type, reason } => AuthError::UnwrapError {
                reason: format!("{}: {}", key_type, reason),
            },
        }
    }
}

impl From<LedgerError> for AuthError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Unavailable(reason) => AuthError::LedgerUnavailable { reason },
            LedgerError::Timeout(secs) => AuthError::LedgerUnavailable {
                reason: format!("ledger call timed out after {}s", secs),
            },
            LedgerError::Rejected(reason) => AuthError::LedgerRejected { reason },
        }
    }
}
