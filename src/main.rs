use batch_coordinator::{
    api::Server,
    config::Config,
    crypto::{PrivateKey, PublicKey},
    ledger::Ledger,
    state::GenesisBuilder,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Entry point of the sandbox engine.
///
/// Loads the configuration (path from the first argument, or
/// `config/default.toml`), commits the genesis block, starts the MST expiry
/// loop in the background and serves the JSON-RPC API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/default.toml".to_string());
    let config = Config::load(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log.filter))
        .init();
    info!("Sandbox engine starting with config: {:?}", config);

    // Step 1: resolve the genesis admin key
    let admin_key = if config.genesis.admin_public_key.is_empty() {
        let generated = PrivateKey::generate();
        warn!(
            "No genesis admin key configured, generated one with public key {}",
            generated.public_key().to_hex()
        );
        generated.public_key()
    } else {
        PublicKey::from_hex(&config.genesis.admin_public_key)?
    };

    // Step 2: commit genesis
    let ledger = Arc::new(Ledger::from_config(&config));
    let genesis = GenesisBuilder::new(&config.genesis).build(&admin_key);
    ledger
        .apply_genesis(genesis)
        .await
        .map_err(|e| anyhow::anyhow!("genesis failed: {}", e))?;

    // Step 3: background expiry of abandoned multi-signature transactions
    ledger.clone().spawn_expiry();

    let server = Server::new(config.api.clone(), ledger);
    server.start().await?;

    Ok(())
}
