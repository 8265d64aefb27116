use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{Level, info, warn};
use tracing_subscriber::fmt::format::FmtSpan;

use pvc_oracle::{
    AppState, AttestationSigner, OracleConfig, RegistryClient, ScoreStore, SecurityMiddlewareConfig,
    SecurityState, config::sanitize_for_logging, secured_router,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first - this validates all settings
    let config = OracleConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {:#}", e);
        eprintln!("Please check the PVC_* environment variables.");
        e
    })?;

    init_secure_logging(&config)?;

    info!("Starting PVC Reputation Oracle");
    for warning in config.startup_warnings() {
        warn!("{}", warning);
    }
    info!(
        host = %config.server.host,
        port = config.server.port,
        chain_id = config.chain.chain_id,
        registry = %sanitize_for_logging(config.chain.registry_address.as_str()),
        "Configuration loaded"
    );

    // Signer: a missing key is not fatal, sign requests fail with 500 instead
    let signer = AttestationSigner::new(config.signer.private_key.as_deref(), config.to_domain())
        .context("Invalid PVC_ORACLE_PRIVATE_KEY")?;
    match signer.signer_address() {
        Some(address) => info!(
            signer = %sanitize_for_logging(&address.to_checksum()),
            "Oracle signing key loaded"
        ),
        None => warn!("No oracle signing key configured; POST /sign will fail"),
    }

    let registry = RegistryClient::new(&config.chain.rpc_url, &config.chain.registry_address)?;
    check_oracle_address(&registry, &signer).await;

    let store = Arc::new(ScoreStore::new());
    let security_state = SecurityState::new(SecurityMiddlewareConfig::from(&config));

    // Reclaim idle rate-limit windows
    let limiter = security_state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            let removed = limiter.cleanup();
            if removed > 0 {
                tracing::debug!(removed, "Rate limiter cleanup");
            }
        }
    });

    let state = AppState::new(store, Arc::new(signer), Arc::new(registry))
        .with_nonce_timeout(config.rpc_timeout())
        .with_app_url(config.server.base_url.clone());

    let app = Router::new()
        .merge(secured_router(state, security_state))
        .layer(TraceLayer::new_for_http());

    // Start the server on configured host/port
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind_addr, e))?;

    info!("PVC Oracle server listening on {}", bind_addr);
    info!(
        "Security middleware: Rate limit={}/min, Max body={}KB, chain_id={}",
        config.security.rate_limit_per_minute,
        config.security.max_request_size / 1024,
        config.chain.chain_id
    );

    // Serve with connect info for client IP extraction
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Warn when the registry will reject our signatures. Never fatal.
async fn check_oracle_address(registry: &RegistryClient, signer: &AttestationSigner) {
    if registry.registry().is_zero() {
        warn!("Registry address is zero; skipping oracle self-check");
        return;
    }
    let Some(expected) = signer.signer_address() else {
        return;
    };

    match registry.oracle_address().await {
        Ok(onchain) if onchain == expected => {
            info!(oracle = %sanitize_for_logging(onchain.as_str()), "Registry oracle matches signing key");
        }
        Ok(onchain) => warn!(
            registry_oracle = %onchain.to_checksum(),
            signer = %expected.to_checksum(),
            "Registry oracle differs from signing key; attestations will be rejected on-chain"
        ),
        Err(e) => warn!(error = %e, "Could not read registry oracle address"),
    }
}

/// Initialize secure logging with sanitization
fn init_secure_logging(config: &OracleConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(if config.logging.log_requests {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    if config.logging.sanitize_logs {
        info!("Secure logging initialized with data sanitization enabled");
    }

    Ok(())
}
