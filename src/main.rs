// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use ecommerce_privacy_node::{
    api::{start_server, AppState},
    auth::SystemClock,
    config::{chain_name, NodeArgs, NodeConfig},
    contracts::{EthersLedger, InMemoryLedger, Ledger},
    gateway::PrivacyGateway,
    version,
};
use std::{env, sync::Arc};
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Starting EcommercePrivacy Node...\n");
    println!("BUILD VERSION: {}", version::VERSION);
    println!("Build Date: {}", version::BUILD_DATE);
    println!();

    tracing::info!("{}", version::get_version_string());

    let args = NodeArgs::parse();
    let config = NodeConfig::from_args(&args)?;
    let service_key = Arc::new(args.service_key()?);

    let ledger: Arc<dyn Ledger> = if config.dev_ledger {
        tracing::warn!("DEV_LEDGER set, nonces and orders live in process memory only");
        Arc::new(InMemoryLedger::new(config.domain()))
    } else {
        println!("Connecting to {} ...", config.rpc_url);
        Arc::new(EthersLedger::new(config.ledger_config(), &service_key).await?)
    };

    let gateway = Arc::new(PrivacyGateway::new(
        service_key.clone(),
        ledger,
        Arc::new(SystemClock),
        config.gateway_settings(),
    ));
    let state = Arc::new(AppState::new(gateway, config.posture));
    let shutdown = state.shutdown.clone();

    let separator = "=".repeat(60);
    println!("\n{}", separator);
    println!("EcommercePrivacy Node is running");
    println!("{}", separator);
    println!("Port:           {}", config.listen_addr.port());
    println!("RPC URL:        {}", config.rpc_url);
    println!("Contract:       {:?}", config.contract_address);
    println!("Chain:          {} ({})", chain_name(config.chain_id), config.chain_id);
    println!("Environment:    {}", config.posture);
    println!("Service key:    {}", service_key.identity());
    println!("Request window: {}s", config.request_window.as_secs());
    println!("Confirmations:  {}", config.confirmations);
    println!("\nAPI Endpoints:");
    println!("  Health:       http://localhost:{}/health", config.listen_addr.port());
    println!("  Version:      http://localhost:{}/version", config.listen_addr.port());
    println!("  Public key:   http://localhost:{}/public-key", config.listen_addr.port());
    println!("  Nonce:        http://localhost:{}/nonce/:address", config.listen_addr.port());
    println!("  Place order:  POST http://localhost:{}/placeOrder", config.listen_addr.port());
    println!("  Add product:  POST http://localhost:{}/addProduct", config.listen_addr.port());
    println!("\nPress Ctrl+C to shutdown...");
    println!("{}\n", separator);

    let mut server = tokio::spawn(start_server(state, config.listen_addr));

    // Wait for shutdown signal
    tokio::select! {
        result = signal::ctrl_c() => {
            result?;
            println!("\nShutting down...");
            shutdown.cancel();
            server.await??;
        }
        result = &mut server => result??,
    }

    println!("Goodbye!");
    Ok(())
}
