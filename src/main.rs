//! Load Cache demo
//!
//! Runs the canonical scenario: a capacity-3 cache with an upper-casing
//! loader is asked for four distinct keys, so the first one is evicted.
//!
//! `CACHE_CAPACITY` and `EVICTION_ORDER` override the defaults.

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loadcache::cache::{CacheBuilder, RemovalNotification};
use loadcache::{BoxError, CacheConfig};

const DEMO_KEYS: [&str; 4] = ["first", "second", "third", "last"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loadcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env_or(CacheConfig {
        capacity: 3,
        ..CacheConfig::default()
    });
    info!(
        "Configuration loaded: capacity={}, eviction_order={}",
        config.capacity, config.eviction_order
    );

    let cache = CacheBuilder::from_config(&config)
        .removal_listener(|n: RemovalNotification<String, String>| {
            if n.was_evicted() {
                info!("Removed {}={} cause={}", n.key, n.value, n.cause);
            }
        })
        .listener_error_handler(|e| warn!("Listener error: {}", e))
        .build_with(|key: &String| Ok::<_, BoxError>(key.to_uppercase()))?;

    for key in DEMO_KEYS {
        let value = cache.get_or_load(key.to_string()).await?;
        info!("Loaded {} => {}", key, value);
    }

    let entries: Vec<String> = cache
        .as_map()
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    println!("{{{}}}", entries.join(", "));
    println!("size = {}", cache.size());
    println!("{}", serde_json::to_string_pretty(&cache.stats())?);

    Ok(())
}
