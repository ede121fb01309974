// ============================================================================
// Edge Gateway Service
// ============================================================================
//
// Verifies capability URLs minted by the origin and streams objects from the
// object store. Two listeners:
// - GATEWAY_PORT: public, every path is an object key
// - GATEWAY_HEALTH_PORT: /health, /health/live, /health/ready, /metrics
//
// ============================================================================

use anyhow::{Context, Result};
use delivery_config::Config;
use gateway_service::rate_limiter::build_rate_limiter;
use gateway_service::{create_health_router, create_router, GatewayState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.rust_log.clone()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("=== Edge Gateway Starting ===");
    info!("Port: {}", config.gateway.port);
    info!("Health port: {}", config.gateway.health_port);
    info!("Upstream: {}", config.gateway.upstream_url);
    info!("Strict IP binding: {}", config.gateway.strict_ip_binding);

    let rate_limiter = build_rate_limiter(&config.rate_limit)
        .await
        .context("Failed to initialize rate limiter")?;

    let state = Arc::new(
        GatewayState::new(config.gateway.clone(), config.hmac_secret.clone(), rate_limiter)
            .context("Failed to initialize gateway state")?,
    );

    // Health and metrics listener
    let health_addr: SocketAddr = format!("0.0.0.0:{}", config.gateway.health_port)
        .parse()
        .context("Failed to parse health bind address")?;
    let health_listener = tokio::net::TcpListener::bind(&health_addr)
        .await
        .context("Failed to bind health address")?;
    info!("Health endpoints listening on {}", health_addr);

    let health_app = create_health_router(state.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(health_listener, health_app).await {
            error!("Health server error: {}", e);
        }
    });

    // Public listener
    let addr: SocketAddr = format!("0.0.0.0:{}", config.gateway.port)
        .parse()
        .context("Failed to parse bind address")?;

    info!("Edge gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, create_router(state))
        .await
        .context("Failed to start server")?;

    Ok(())
}
