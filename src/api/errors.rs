// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use ethers::types::{H256, U256};

use crate::auth::AuthError;
use crate::config::Posture;
use crate::crypto::Identity;

/// Failure body shared by every route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
    /// Only populated in development posture
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    Auth(AuthError),
    InvalidRequest(String),
    NotFound(String),
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self, request_id: Option<String>, posture: Posture) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::Auth(err) => {
                let details = match err {
                    AuthError::ConfirmationTimeout {
                        tx_hash,
                        identity,
                        nonce,
                    } => Some(requery_details(Some(tx_hash), identity, nonce)),
                    AuthError::SubmissionIndeterminate {
                        identity, nonce, ..
                    } => Some(requery_details(None, identity, nonce)),
                    _ => None,
                };
                (err.error_type(), err.to_string(), details)
            }
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::NotFound(msg) => ("not_found", msg.clone(), None),
            ApiError::InternalError(msg) => ("internal_error", msg.clone(), None),
        };

        let debug = posture.is_development().then(|| {
            serde_json::json!({
                "status": self.status_code(),
                "detail": format!("{:?}", self),
            })
        });

        ErrorResponse {
            error: message,
            error_type: error_type.to_string(),
            request_id,
            details,
            debug,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Auth(err) => err.status_code(),
            ApiError::InvalidRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::InternalError(_) => 500,
        }
    }
}

/// Fields a client needs to settle an unknown outcome via `/nonce/:address`
fn requery_details(
    tx_hash: Option<&H256>,
    identity: &Identity,
    nonce: &U256,
) -> HashMap<String, serde_json::Value> {
    let mut details = HashMap::new();
    if let Some(tx_hash) = tx_hash {
        details.insert(
            "txHash".to_string(),
            serde_json::Value::String(format!("{:?}", tx_hash)),
        );
    }
    details.insert(
        "publicAddress".to_string(),
        serde_json::Value::String(identity.to_string()),
    );
    details.insert(
        "nonce".to_string(),
        serde_json::Value::String(nonce.to_string()),
    );
    details
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Auth(err) => write!(f, "{}", err),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}
