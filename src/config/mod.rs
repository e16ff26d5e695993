// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration
//!
//! Every setting is a command-line flag with an environment fallback, so a
//! `.env` file (loaded before parsing) configures the node as in deployment.

pub mod chains;

use anyhow::{anyhow, Result};
use clap::Parser;
use ethers::types::Address;
use std::convert::Infallible;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::auth::SchemeSelection;
use crate::contracts::{BridgeConfig, LedgerConfig};
use crate::crypto::{Eip712Domain, ServiceKey, SigningScheme};
use crate::gateway::GatewaySettings;

pub use chains::chain_name;

/// Error detail policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Posture {
    /// Error bodies carry a separate `debug` field
    Development,
    #[default]
    Production,
}

impl Posture {
    pub fn is_development(self) -> bool {
        self == Posture::Development
    }
}

impl FromStr for Posture {
    type Err = Infallible;

    // Anything other than "development" runs in production posture
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Posture::Development),
            _ => Ok(Posture::Production),
        }
    }
}

impl fmt::Display for Posture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Posture::Development => f.write_str("development"),
            Posture::Production => f.write_str("production"),
        }
    }
}

/// EcommercePrivacy node
#[derive(Parser, Debug, Clone)]
#[command(name = "ecommerce-privacy-node")]
#[command(about = "Authenticated, encrypted order and product relay", long_about = None)]
pub struct NodeArgs {
    /// JSON-RPC endpoint of the chain
    #[arg(long, env = "BLOCKCHAIN_RPC_URL", default_value = "http://localhost:8545")]
    pub rpc_url: String,

    /// Service private key, 0x-prefixed 32-byte hex
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// EcommercePrivacy contract address
    #[arg(long, env = "CONTRACT_ADDRESS")]
    pub contract_address: Option<String>,

    #[arg(long, env = "CHAIN_ID", default_value_t = 11155111)]
    pub chain_id: u64,

    /// Accepted clock skew for request timestamps, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 300)]
    pub request_timeout: u64,

    /// Blocks to wait on top of a transaction
    #[arg(long, env = "CONFIRMATIONS", default_value_t = 2)]
    pub confirmations: usize,

    /// Bound on the finality wait, in seconds
    #[arg(long, env = "CONFIRMATION_TIMEOUT", default_value_t = 180)]
    pub confirmation_timeout: u64,

    /// Bound on each ledger read or send, in seconds
    #[arg(long, env = "LEDGER_CALL_TIMEOUT", default_value_t = 15)]
    pub ledger_call_timeout: u64,

    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// "development" adds debug details to error bodies
    #[arg(long = "node-env", env = "NODE_ENV", default_value = "production")]
    pub posture: Posture,

    /// Signing scheme for addProduct: typed (EIP-712) or json (EIP-191)
    #[arg(long, env = "ADD_PRODUCT_SIGNING", default_value = "typed")]
    pub add_product_signing: SigningScheme,

    /// Use an in-process ledger instead of the contract
    #[arg(long, env = "DEV_LEDGER")]
    pub dev_ledger: bool,
}

/// Validated node settings
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_address: Address,
    pub request_window: Duration,
    pub confirmations: usize,
    pub confirmation_timeout: Duration,
    pub ledger_call_timeout: Duration,
    pub listen_addr: SocketAddr,
    pub posture: Posture,
    pub schemes: SchemeSelection,
    pub dev_ledger: bool,
}

impl NodeConfig {
    pub fn from_args(args: &NodeArgs) -> Result<Self> {
        let contract_address = match args.contract_address.as_deref() {
            Some(addr) => Address::from_str(addr.trim())
                .map_err(|e| anyhow!("CONTRACT_ADDRESS '{}' is not an address: {}", addr, e))?,
            None if args.dev_ledger => Address::zero(),
            None => return Err(anyhow!("CONTRACT_ADDRESS environment variable not set")),
        };

        let ip: IpAddr = args
            .bind_address
            .parse()
            .map_err(|e| anyhow!("BIND_ADDRESS '{}' is invalid: {}", args.bind_address, e))?;

        let config = Self {
            rpc_url: args.rpc_url.clone(),
            chain_id: args.chain_id,
            contract_address,
            request_window: Duration::from_secs(args.request_timeout),
            confirmations: args.confirmations,
            confirmation_timeout: Duration::from_secs(args.confirmation_timeout),
            ledger_call_timeout: Duration::from_secs(args.ledger_call_timeout),
            listen_addr: SocketAddr::new(ip, args.port),
            posture: args.posture,
            schemes: SchemeSelection {
                place_order: SigningScheme::Typed,
                add_product: args.add_product_signing,
            },
            dev_ledger: args.dev_ledger,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_window.is_zero() {
            return Err(anyhow!("REQUEST_TIMEOUT must be greater than zero"));
        }
        if self.confirmation_timeout.is_zero() {
            return Err(anyhow!("CONFIRMATION_TIMEOUT must be greater than zero"));
        }
        if self.ledger_call_timeout.is_zero() {
            return Err(anyhow!("LEDGER_CALL_TIMEOUT must be greater than zero"));
        }
        if !self.dev_ledger && self.contract_address.is_zero() {
            return Err(anyhow!("CONTRACT_ADDRESS must not be the zero address"));
        }
        if self.confirmations == 0 {
            warn!("CONFIRMATIONS=0, responses will not wait for inclusion");
        }
        Ok(())
    }

    pub fn domain(&self) -> Eip712Domain {
        Eip712Domain::new(self.chain_id, self.contract_address)
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            rpc_url: self.rpc_url.clone(),
            chain_id: self.chain_id,
            contract_address: self.contract_address,
            ..LedgerConfig::default()
        }
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            call_timeout: self.ledger_call_timeout,
            confirmation_timeout: self.confirmation_timeout,
            confirmations: self.confirmations,
        }
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            domain: self.domain(),
            request_window: self.request_window,
            schemes: self.schemes,
            bridge: self.bridge_config(),
        }
    }
}

impl NodeArgs {
    /// Parse the configured service key, or generate one for dev-ledger runs
    pub fn service_key(&self) -> Result<ServiceKey> {
        match self.private_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {
                ServiceKey::from_hex(key).map_err(|e| anyhow!("PRIVATE_KEY: {}", e))
            }
            _ if self.dev_ledger => {
                warn!("PRIVATE_KEY not set, using an ephemeral service key for the dev ledger");
                Ok(ServiceKey::generate())
            }
            _ => Err(anyhow!("PRIVATE_KEY environment variable not set")),
        }
    }
}
