// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod bridge;
pub mod client;
pub mod ledger;
pub mod mock;
pub mod types;

pub use bridge::{BridgeConfig, DualVerificationBridge, LedgerOutcome, NonceResolution};
pub use client::{EthersLedger, LedgerConfig};
pub use ledger::{
    ClaimStatement, Ledger, LedgerError, LedgerEvent, LedgerReceipt, LedgerSubmission,
    RecordedOrder, SealedPayload, SignatureClaim,
};
pub use mock::InMemoryLedger;
