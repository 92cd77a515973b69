use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use montcervin_backend::config::{AppConfig, StorageBackend};
use montcervin_backend::mailer::{Mailer, OutboxMailer, ResendMailer};
use montcervin_backend::media::{BucketStore, ImageStore, LocalImageStore};
use montcervin_backend::store::{MemoryStore, PgStore, RestCatalog};
use montcervin_backend::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    info!("Loaded config: storage={:?} port={}", config.storage, config.port);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid listen address")?;

    let mailer: Arc<dyn Mailer> = match &config.mail.api_key {
        Some(key) => Arc::new(ResendMailer::new(&config.mail.api_url, key, &config.mail.sender)?),
        None => {
            info!("No mail API key configured, messages go to the outbox");
            Arc::new(OutboxMailer::new())
        }
    };

    let images: Arc<dyn ImageStore> = match &config.media.bucket {
        Some(bucket) => Arc::new(BucketStore::new(&bucket.url, &bucket.key, &bucket.name)?),
        None => Arc::new(LocalImageStore::new(
            &config.media.local_dir,
            &config.media.public_path,
        )),
    };

    let rest_catalog = match (&config.catalog.rest_url, &config.catalog.rest_key) {
        (Some(url), Some(key)) => {
            info!("Public catalog reads from {}", url);
            Some(Arc::new(RestCatalog::new(url, key)?))
        }
        _ => None,
    };

    let mut state = match config.storage {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .clone()
                .context("DATABASE_URL must be set")?;
            let store = PgStore::connect(&url, config.database_pool_size)
                .context("failed to connect to database")?;
            AppState::new(config, Arc::new(store), mailer, images)
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on restart");
            AppState::new(config, Arc::new(MemoryStore::new()), mailer, images)
        }
    };
    if let Some(catalog) = rest_catalog {
        state = state.with_catalog(catalog);
    }

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state).into_make_service()).await?;

    Ok(())
}
