use std::sync::Arc;

use crate::auth::SessionRegistry;
use crate::config::AppConfig;
use crate::mailer::Mailer;
use crate::media::ImageStore;
use crate::store::{CatalogSource, LeadStore, ListingStore};

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Public catalog reads. Same store as `listings` unless a read replica
    /// is configured.
    pub catalog: Arc<dyn CatalogSource>,
    pub listings: Arc<dyn ListingStore>,
    pub leads: Arc<dyn LeadStore>,
    pub mailer: Arc<dyn Mailer>,
    pub images: Arc<dyn ImageStore>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new<S>(
        config: AppConfig,
        store: Arc<S>,
        mailer: Arc<dyn Mailer>,
        images: Arc<dyn ImageStore>,
    ) -> Self
    where
        S: ListingStore + LeadStore + 'static,
    {
        Self {
            config: Arc::new(config),
            catalog: store.clone(),
            listings: store.clone(),
            leads: store,
            mailer,
            images,
            sessions: Arc::new(SessionRegistry::new()),
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogSource>) -> Self {
        self.catalog = catalog;
        self
    }
}
