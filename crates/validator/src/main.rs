//! Validator process entry point (spec §5 concurrency model, §6
//! configuration).
//!
//! Wires the source chain client, proof builders, batch collector,
//! attestation engine, external-chain strategies, and the lifecycle
//! orchestrator into one supervised set of tasks: a CPU-sized proof-build
//! worker pool, a per-batch-type cadence ticker, and the `/healthz` +
//! `/metrics` HTTP surface.

mod config;
mod http;
mod telemetry;
mod workers;

use certen_anchor::{ChainPlatform, EthereumStrategy, ExternalChainStrategy, StubStrategy};
use certen_attestation::{ValidatorEntry, ValidatorSetSnapshot};
use certen_chain_client::{ChainClient, RpcChainClient};
use certen_orchestrator::{run_migrations, LifecycleOrchestrator, OrchestratorStore};
use certen_types::VotePower;
use clap::Parser;
use ethers::prelude::*;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "certen-validator")]
#[command(about = "Independent Accumulate attestation validator")]
#[command(version)]
struct Cli {
    /// Path to the validator's TOML configuration file.
    #[arg(long, default_value = "validator.toml")]
    config: String,
}

fn load_validator_set(path: &str) -> anyhow::Result<ValidatorSetSnapshot> {
    let raw = std::fs::read_to_string(path)?;

    #[derive(serde::Deserialize)]
    struct RawEntry {
        validator_id: uuid::Uuid,
        public_key_hex: String,
        key_type: String,
        weight: u64,
    }

    let raw_entries: Vec<RawEntry> = serde_json::from_str(&raw)?;
    let entries = raw_entries
        .into_iter()
        .map(|e| {
            let bytes = hex::decode(&e.public_key_hex)?;
            let public_key = match e.key_type.as_str() {
                "ed25519" => {
                    let arr: [u8; 32] = bytes
                        .try_into()
                        .map_err(|_| anyhow::anyhow!("ed25519 public key must be 32 bytes"))?;
                    certen_types::PublicKey::Ed25519(arr)
                }
                "bls12381" => certen_types::PublicKey::Bls12381(bytes),
                other => anyhow::bail!("unknown key_type {other:?}"),
            };
            Ok(ValidatorEntry {
                validator_id: certen_types::ValidatorId::from_uuid(e.validator_id),
                public_key,
                weight: VotePower::new(e.weight),
                index: 0,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(ValidatorSetSnapshot::new(entries)?)
}

async fn build_ethereum_strategy(
    config: &config::EthereumConfig,
    required_confirmations: u64,
) -> anyhow::Result<EthereumStrategy> {
    let provider = Provider::<Http>::try_from(config.rpc_url.as_str())?;
    let wallet: LocalWallet = config.signer_key.parse()?;
    let contract_address: ethers::types::Address = config.contract_address.parse()?;
    Ok(EthereumStrategy::new(
        provider,
        wallet,
        contract_address,
        config.chain_id.clone(),
        required_confirmations,
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let cli = Cli::parse();
    let config = config::ValidatorConfig::load(&cli.config)?;
    tracing::info!(source = %config.source_rpc_endpoint, strict_mode = config.strict_mode, "loaded validator configuration");

    let pool = config.pool_config().connect().await?;
    run_migrations(&pool).await?;
    tracing::info!("applied orchestrator migrations");

    let store = OrchestratorStore::new(pool);
    let orchestrator = Arc::new(LifecycleOrchestrator::new(store.clone()));

    let chain_client: Arc<dyn ChainClient> = Arc::new(RpcChainClient::new(
        config.source_rpc_endpoint.clone(),
        Duration::from_secs(30),
    )?);

    let mut strategies: Vec<Arc<dyn ExternalChainStrategy>> = Vec::new();
    if let Some(eth_config) = &config.ethereum {
        let depth = config.finality_depth(ChainPlatform::Ethereum);
        let strategy = build_ethereum_strategy(eth_config, depth).await?;
        tracing::info!(chain_id = %eth_config.chain_id, "ethereum anchoring strategy active");
        strategies.push(Arc::new(strategy));
    } else {
        strategies.push(Arc::new(StubStrategy::new(ChainPlatform::Ethereum)));
    }
    strategies.push(Arc::new(StubStrategy::new(ChainPlatform::Solana)));
    strategies.push(Arc::new(StubStrategy::new(ChainPlatform::Cosmos)));

    let own_bls_key = config.bls_keypair()?;
    let own_ed25519_key = config.ed25519_keypair()?;
    let validator_set = Arc::new(load_validator_set(&config.validator_set_path)?);
    tracing::info!(members = validator_set.len(), total_weight = validator_set.total_weight(), "loaded validator set snapshot");

    let (intent_tx, intent_rx) = tokio::sync::mpsc::channel(1024);

    let worker_count = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    let worker_handles = workers::spawn_proof_builders(
        worker_count,
        intent_rx,
        chain_client.clone(),
        orchestrator.clone(),
        config.strict_mode,
    );

    let cadence_handle = workers::spawn_cadence_ticker(
        orchestrator.clone(),
        config.cadence_window_s,
        config.cadence_max_batch_size,
    );

    let attestation_handle = workers::spawn_attestation_collector(
        orchestrator.clone(),
        validator_set.clone(),
        own_bls_key,
        own_ed25519_key,
        config.consensus_endpoints.clone(),
    );

    let observer_handle = workers::spawn_execution_observers(orchestrator.clone(), strategies);

    let metrics = Arc::new(http::Metrics::new());
    let app_state = http::AppState {
        store: store.clone(),
        metrics,
    };
    let router = http::router(app_state);
    let listener =
        tokio::net::TcpListener::bind(("0.0.0.0", config.healthz_port)).await?;
    tracing::info!(port = config.healthz_port, "healthz/metrics listening");

    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    drop(intent_tx);

    tokio::select! {
        _ = server => {}
        _ = shutdown_signal() => {}
    }

    tracing::info!("shutting down, draining workers");
    for handle in worker_handles {
        handle.abort();
    }
    cadence_handle.abort();
    attestation_handle.abort();
    observer_handle.abort();
    store.pool().close().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
