//! Memcache demo daemon
//!
//! Runs a cache configured from the environment, seeds a few tagged items
//! and reports audit statistics through tracing until interrupted.

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memcache::{Cache, CacheConfig, TracingAuditor};

/// Tag carried by seeded session items
const TAG_SESSION: u16 = 1;
/// Tag carried by seeded settings items
const TAG_SETTINGS: u16 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting memcache demo");

    let config = CacheConfig::from_env()?;
    info!(
        "Configuration loaded: capacity={}, default_lifetime={:?}, audit_interval={:?}, sweep_interval={:?}",
        config.capacity, config.default_lifetime, config.audit_interval, config.sweep_interval
    );

    let cache: Cache<String> = Cache::new(config, TracingAuditor)?;

    cache.put("session:alice", "alice".to_string(), &[TAG_SESSION])?;
    cache.put("session:bob", "bob".to_string(), &[TAG_SESSION])?;
    cache.put("settings:theme", "dark".to_string(), &[TAG_SETTINGS])?;
    cache.immortalize("settings:theme")?;

    let sessions = cache.filter(|item| item.has_tag(TAG_SESSION)).len();
    info!(items = cache.len(), sessions, "cache seeded");

    shutdown_signal().await;

    cache.close().await;
    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
