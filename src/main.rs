//! Faucet relay entry point.

use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use veilcore::{
    api::faucet_api::{self, FaucetApiState},
    config::Config,
    infrastructure::logging,
    service::faucet_service::FaucetService,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())?;

    logging::init_logging(&config.logging)?;
    config.validate()?;

    tracing::info!(
        chain_id = config.chain.chain_id,
        rpc_url = %config.chain.rpc_url,
        "Starting faucet relay"
    );

    let faucet = if config.faucet.private_key.is_some() {
        match FaucetService::new(config.faucet.clone(), &config.chain) {
            Ok(service) => Some(Arc::new(service)),
            Err(err) => {
                tracing::warn!(error = ?err, "Faucet disabled");
                None
            }
        }
    } else {
        tracing::warn!("FAUCET_PRIVATE_KEY not set, faucet disabled");
        None
    };

    let router = faucet_api::router(FaucetApiState { faucet })
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    tracing::info!(bind_addr = %config.server.bind_addr, "Faucet relay listening");
    axum::serve(listener, router).await?;

    Ok(())
}
