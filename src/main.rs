//! FlareInsure - Decentralized Rainfall Insurance Marketplace Backend
//!
//! Mirrors the on-chain policy registry, classifies policies for display,
//! serves the ordered listing over HTTP, and dispatches purchase/claim
//! write-intents back to the contract. The contract is authoritative for
//! every state transition; this process never owns policy state.

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flareinsure_backend::{
    api::{create_router, AppState},
    models::Config,
    registry::{spawn_policy_poller, PolicyDispatcher, PolicyMirror, RpcRegistryClient},
    weather::{spawn_weather_poller, WeatherFeed},
};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let config = Config::from_env()?;
    info!(
        rpc_url = %config.rpc_url,
        contract = %config.contract_address,
        poll_interval_secs = config.poll_interval_secs,
        scan_cap = config.scan_cap,
        "FlareInsure backend starting"
    );

    let transport = Arc::new(
        RpcRegistryClient::new(
            config.rpc_url.clone(),
            config.contract_address.clone(),
            config.sender_address.clone(),
            Duration::from_secs(config.rpc_timeout_secs),
        )
        .context("Failed to build registry client")?,
    );

    let mirror = Arc::new(PolicyMirror::new(transport.clone(), config.scan_cap));
    tokio::spawn(spawn_policy_poller(
        mirror.clone(),
        Duration::from_secs(config.poll_interval_secs),
    ));

    let dispatcher = match &config.sender_address {
        Some(sender) => {
            info!(sender = %sender, "write-intents enabled");
            Some(Arc::new(PolicyDispatcher::new(transport.clone())))
        }
        None => {
            // Not an error: the marketplace stays browsable, actions greyed out.
            warn!("no SENDER_ADDRESS configured, purchase/claim disabled");
            None
        }
    };

    let weather = match &config.weather_api_url {
        Some(url) => {
            let feed = Arc::new(WeatherFeed::new(url.clone())?);
            tokio::spawn(spawn_weather_poller(
                feed.clone(),
                Duration::from_secs(config.weather_poll_secs),
            ));
            Some(feed)
        }
        None => None,
    };

    let app = create_router(AppState {
        mirror: mirror.clone(),
        dispatcher,
        weather,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    info!("API server listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await.context("Server error")?;

    // Server stopped: halt the poller; an in-flight cycle finishes and its
    // result is discarded.
    mirror.stop();
    Ok(())
}

fn load_env() {
    // Standard dotenv search (cwd + parents), plus the crate directory so
    // running from elsewhere still picks up the local .env.
    let _ = dotenv();
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flareinsure_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
