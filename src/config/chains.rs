// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Names of the chains the contract is deployed to

/// Ethereum Sepolia, the default deployment
pub const SEPOLIA_CHAIN_ID: u64 = 11155111;

pub const MAINNET_CHAIN_ID: u64 = 1;

/// Local Hardhat / Anvil node
pub const LOCAL_CHAIN_ID: u64 = 31337;

/// Human-readable chain name for logs and `/health`
pub fn chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        MAINNET_CHAIN_ID => "Ethereum Mainnet",
        SEPOLIA_CHAIN_ID => "Sepolia",
        LOCAL_CHAIN_ID => "Hardhat Local",
        _ => "Unknown Chain",
    }
}
