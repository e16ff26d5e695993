// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod contracts;
pub mod crypto;
pub mod gateway;
pub mod version;

// Re-export main types
pub use auth::{AuthError, AuthorizedRequest, ProtectedRequest, RequestAuthenticator, RequestKind};
pub use client::RequestSealer;
pub use config::{NodeArgs, NodeConfig, Posture};
pub use contracts::{DualVerificationBridge, EthersLedger, InMemoryLedger, Ledger};
pub use crypto::{Identity, ServiceKey, SessionKey};
pub use gateway::{GatewaySettings, PrivacyGateway};
