//! Guise Probe Client - Entry Point
//!
//! Loads the proxy pool, then issues the configured number of probes
//! sequentially with a pause between them.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

mod config;
mod error;
mod models;
mod probe;

use config::Config;
use probe::fingerprint::FingerprintProfile;
use probe::{Prober, ProxyPool};

#[tokio::main]
async fn main() -> error::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("guise={}", config.log.level))
    });
    if config.log.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!("Starting Guise probe client");

    let target = Url::parse(&config.run.target_url)?;
    let profile = FingerprintProfile::from_str(&config.run.profile);

    // Load the proxy pool; an empty pool aborts the run before any probe.
    let pool = ProxyPool::load(&config.run.proxy_file).await.map_err(|e| {
        error!("Could not load proxies from {}: {}", config.run.proxy_file, e);
        e
    })?;
    if pool.is_empty() {
        error!(
            "Proxy file {} is empty; at least one proxy is required",
            config.run.proxy_file
        );
        return Err(error::GuiseError::EmptyPool);
    }
    info!("Loaded {} proxies", pool.len());

    let prober = Prober::new(Arc::new(pool), config.probe.clone());
    let pause = Duration::from_millis(config.run.pause_ms);

    for attempt in 1..=config.run.requests {
        info!("Starting probe {} of {}", attempt, config.run.requests);

        tokio::select! {
            result = prober.probe(&target, profile) => match result {
                Ok(result) => {
                    info!(
                        result = %serde_json::to_string(&result).unwrap_or_default(),
                        "Probe succeeded with status {}", result.status
                    );
                    if result.contains_challenge_markers() {
                        warn!("Potential challenge detected in response body");
                    } else {
                        info!("No obvious challenge detected");
                    }
                }
                Err(e) if e.is_fatal() => {
                    error!("Aborting run: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Probe failed: {}", e);
                }
            },
            _ = signal::ctrl_c() => {
                info!("Interrupted; stopping");
                break;
            }
        }

        if attempt < config.run.requests {
            tokio::time::sleep(pause).await;
        }
    }

    info!("Guise probe client finished");
    Ok(())
}
