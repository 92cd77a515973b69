//! Access to the tabular store that owns every record.
//!
//! Reads used by the public catalog go through [`CatalogSource`], which is the
//! narrow query surface the page fetcher needs (filtered count, filtered
//! newest-first slice, lookup by id). Writes are split between listings and
//! leads so that a read-only source such as [`rest::RestCatalog`] only has to
//! implement the first trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::catalog::Predicate;
use crate::models::{
    Inquiry, InquiryPatch, InquiryQuery, InquiryStatus, NewEmailLog, NewInquiry, NewSubscription,
    NewViewingRequest, Property, PropertyDraft, SubscribeOutcome, ViewingRequest,
};

pub mod memory;
pub mod postgres;
pub mod rest;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use rest::RestCatalog;

/// PostgREST code for a `Range` that starts past the last matching row.
pub const RANGE_NOT_SATISFIABLE: &str = "PGRST103";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{message}")]
    Remote { code: Option<String>, message: String },
    #[error("{0} not found")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Remote {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Machine-readable code reported by the store, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            StoreError::Remote { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_range_not_satisfiable(&self) -> bool {
        self.code() == Some(RANGE_NOT_SATISFIABLE)
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => StoreError::NotFound("record".to_string()),
            diesel::result::Error::DatabaseError(kind, info) => StoreError::Remote {
                code: Some(format!("{:?}", kind)),
                message: info.message().to_string(),
            },
            other => StoreError::Remote {
                code: None,
                message: other.to_string(),
            },
        }
    }
}

impl From<diesel::r2d2::PoolError> for StoreError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Filtered, newest-first reads of property listings.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Exact number of listings matching `predicate`.
    async fn count(&self, predicate: &Predicate) -> Result<u64, StoreError>;

    /// Listings matching `predicate`, ordered by `created_at` descending,
    /// skipping `offset` rows and returning at most `limit`.
    async fn select(
        &self,
        predicate: &Predicate,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Property>, StoreError>;

    async fn property(&self, id: Uuid) -> Result<Option<Property>, StoreError>;
}

#[async_trait]
pub trait ListingStore: CatalogSource {
    async fn insert_property(&self, draft: PropertyDraft) -> Result<Property, StoreError>;

    async fn update_property(&self, id: Uuid, draft: PropertyDraft) -> Result<Property, StoreError>;

    async fn delete_property(&self, id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn create_inquiry(&self, inquiry: NewInquiry) -> Result<Inquiry, StoreError>;

    async fn inquiry(&self, id: Uuid) -> Result<Option<Inquiry>, StoreError>;

    /// Newest first.
    async fn list_inquiries(&self, query: &InquiryQuery) -> Result<Vec<Inquiry>, StoreError>;

    /// `(status, created_at)` of every inquiry, for dashboard statistics.
    async fn inquiry_activity(&self) -> Result<Vec<(InquiryStatus, DateTime<Utc>)>, StoreError>;

    async fn update_inquiry(&self, id: Uuid, patch: InquiryPatch) -> Result<Inquiry, StoreError>;

    async fn delete_inquiry(&self, id: Uuid) -> Result<(), StoreError>;

    async fn log_email(&self, entry: NewEmailLog) -> Result<(), StoreError>;

    async fn create_viewing(&self, request: NewViewingRequest) -> Result<ViewingRequest, StoreError>;

    /// Newest first.
    async fn list_viewings(&self) -> Result<Vec<ViewingRequest>, StoreError>;

    async fn delete_viewing(&self, id: Uuid) -> Result<(), StoreError>;

    /// Inserts unless the address is already on the list; never duplicates.
    async fn subscribe(&self, subscription: NewSubscription) -> Result<SubscribeOutcome, StoreError>;
}
