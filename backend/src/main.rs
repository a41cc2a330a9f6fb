use std::sync::Arc;
use backend::{
    config::{Config, StoreConfig},
    routes::{self, AppState},
    store::{MemoryStore, PgStore, VoterStore},
};
use tracing::{info, error};
use tracing_subscriber::EnvFilter;

async fn open_store(config: &StoreConfig) -> Result<Arc<dyn VoterStore>, Box<dyn std::error::Error>> {
    match config {
        StoreConfig::Memory => {
            info!("🗳️ Using in-memory voter store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreConfig::Postgres { database_url, max_connections } => {
            info!("🐘 Connecting to PostgreSQL voter store");
            let store = PgStore::connect(database_url, *max_connections).await?;
            Ok(Arc::new(store))
        }
    }
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().inspect_err(|e| error!("Invalid configuration: {}", e))?;
    let store = open_store(&config.store)
        .await
        .inspect_err(|e| error!("Failed to open voter store: {}", e))?;

    info!("🚀 Starting voter API on {}", config.listen_addr);
    let rocket = routes::stage(rocket::custom(config.figment()), AppState::new(store));
    rocket.launch()
        .await
        .inspect_err(|e| error!("Voter API stopped: {}", e))?;
    Ok(())
}
