// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use ethers::types::{Address, U256};
use k256::ecdsa::SigningKey;
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::info;
use zeroize::Zeroizing;

use crate::client::RequestSealer;
use crate::config::chains::SEPOLIA_CHAIN_ID;
use crate::crypto::{Eip712Domain, PayloadEncoding, ServiceKey, SigningScheme};

/// Arguments for public-key command
#[derive(Args, Debug)]
pub struct PublicKeyArgs {
    /// Private key (can also be set via PRIVATE_KEY env var)
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,
}

/// Settings shared by both sealing commands
#[derive(Args, Debug)]
pub struct SealingArgs {
    /// Client wallet key that signs the request
    #[arg(long, env = "WALLET_PRIVATE_KEY", hide_env_values = true)]
    pub wallet_key: String,

    /// Service public key from GET /public-key (0x04…)
    #[arg(long, env = "SERVICE_PUBLIC_KEY")]
    pub service_public_key: String,

    #[arg(long, env = "CHAIN_ID", default_value_t = SEPOLIA_CHAIN_ID)]
    pub chain_id: u64,

    #[arg(long, env = "CONTRACT_ADDRESS")]
    pub contract_address: String,

    /// Ledger nonce for the wallet, from GET /nonce/:address
    #[arg(long, default_value = "0")]
    pub nonce: String,

    /// Unix seconds; defaults to now
    #[arg(long)]
    pub timestamp: Option<u64>,

    /// Encode the ciphertext as base64 instead of hex
    #[arg(long)]
    pub base64: bool,
}

/// Arguments for seal-order command
#[derive(Args, Debug)]
pub struct SealOrderArgs {
    #[command(flatten)]
    pub sealing: SealingArgs,

    #[arg(long)]
    pub product_id: String,

    /// Shipping address
    #[arg(long)]
    pub address: String,

    #[arg(long)]
    pub phone: String,
}

/// Arguments for seal-product command
#[derive(Args, Debug)]
pub struct SealProductArgs {
    #[command(flatten)]
    pub sealing: SealingArgs,

    #[arg(long)]
    pub name: String,

    /// Price in ether, e.g. 0.25
    #[arg(long)]
    pub price: String,

    /// Product details, encrypted before sending
    #[arg(long)]
    pub details: String,

    /// Sign the canonical JSON body (EIP-191) instead of the typed record
    #[arg(long)]
    pub json_signing: bool,
}

pub fn keygen() -> Value {
    let key = ServiceKey::generate();
    let secret = Zeroizing::new(hex::encode(key.secret().to_bytes()));
    json!({
        "privateKey": format!("0x{}", secret.as_str()),
        "publicKey": key.public_key_hex(),
        "address": key.identity().to_string(),
    })
}

pub fn public_key(args: PublicKeyArgs) -> Result<Value> {
    let key = ServiceKey::from_hex(&args.private_key)?;
    Ok(json!({
        "publicKey": key.public_key_hex(),
        "address": key.identity().to_string(),
    }))
}

pub fn seal_order(args: SealOrderArgs) -> Result<Value> {
    let (sealer, timestamp, nonce) = build_sealer(&args.sealing)?;
    let product_id = parse_uint("product-id", &args.product_id)?;

    let payload = Zeroizing::new(serde_json::to_vec(&json!({
        "address": args.address,
        "phone": args.phone,
        "userId": sealer.identity().to_string(),
    }))?);

    info!("Sealing order for product {} as {}", product_id, sealer.identity());
    Ok(sealer.seal_order(product_id, &payload, timestamp, nonce)?)
}

pub fn seal_product(args: SealProductArgs) -> Result<Value> {
    let (sealer, timestamp, nonce) = build_sealer(&args.sealing)?;
    let sealer = if args.json_signing {
        sealer.with_product_scheme(SigningScheme::CanonicalJson)
    } else {
        sealer
    };

    info!("Sealing product '{}' as {}", args.name, sealer.identity());
    Ok(sealer.seal_product(&args.name, &args.price, args.details.as_bytes(), timestamp, nonce)?)
}

fn build_sealer(args: &SealingArgs) -> Result<(RequestSealer, u64, U256)> {
    let wallet: SigningKey = ServiceKey::from_hex(&args.wallet_key)?.signing_key()?;

    let service_public_key = hex::decode(args.service_public_key.trim().trim_start_matches("0x"))
        .map_err(|e| anyhow!("service public key is not hex: {}", e))?;
    let contract = Address::from_str(args.contract_address.trim())
        .map_err(|e| anyhow!("contract address is invalid: {}", e))?;

    let encoding = if args.base64 {
        PayloadEncoding::Base64
    } else {
        PayloadEncoding::Hex
    };
    let sealer = RequestSealer::new(
        wallet,
        service_public_key,
        Eip712Domain::new(args.chain_id, contract),
    )
    .with_encoding(encoding);

    let timestamp = args
        .timestamp
        .unwrap_or_else(|| chrono::Utc::now().timestamp().max(0) as u64);
    let nonce = parse_uint("nonce", &args.nonce)?;

    Ok((sealer, timestamp, nonce))
}

fn parse_uint(name: &str, value: &str) -> Result<U256> {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x") {
        Some(hex_digits) if !hex_digits.is_empty() => U256::from_str_radix(hex_digits, 16).ok(),
        Some(_) => None,
        None if !value.is_empty() => U256::from_dec_str(value).ok(),
        None => None,
    };
    parsed.ok_or_else(|| anyhow!("{} '{}' is not an unsigned integer", name, value))
}
