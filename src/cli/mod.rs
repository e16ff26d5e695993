// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod sealing;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// EcommercePrivacy CLI
#[derive(Parser, Debug)]
#[command(name = "privacy-cli")]
#[command(version)]
#[command(about = "Key management and request sealing for the EcommercePrivacy node", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a new secp256k1 key pair
    Keygen,

    /// Print the public key and address for a private key
    PublicKey(sealing::PublicKeyArgs),

    /// Produce a sealed placeOrder request body
    SealOrder(sealing::SealOrderArgs),

    /// Produce a sealed addProduct request body
    SealProduct(sealing::SealProductArgs),
}

/// Execute CLI command
pub fn execute(cli: Cli) -> Result<()> {
    let output = match cli.command {
        Commands::Keygen => sealing::keygen(),
        Commands::PublicKey(args) => sealing::public_key(args)?,
        Commands::SealOrder(args) => sealing::seal_order(args)?,
        Commands::SealProduct(args) => sealing::seal_product(args)?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
