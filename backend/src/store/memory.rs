use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::{CatalogSource, LeadStore, ListingStore, StoreError, RANGE_NOT_SATISFIABLE};
use crate::catalog::Predicate;
use crate::models::{
    Inquiry, InquiryPatch, InquiryQuery, InquiryStatus, NewEmailLog, NewInquiry, NewSubscription,
    NewViewingRequest, Property, PropertyDraft, SubscribeOutcome, Subscription, ViewingRequest,
};

#[derive(Default)]
struct Tables {
    properties: Vec<Property>,
    inquiries: Vec<Inquiry>,
    viewings: Vec<ViewingRequest>,
    subscriptions: Vec<Subscription>,
    email_log: Vec<NewEmailLog>,
}

/// In-process tables, used for local development without a database and in
/// tests. Rows are kept in insertion order; reads sort newest first.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    strict_ranges: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers out-of-range selects with `PGRST103`, the way PostgREST does.
    pub fn with_strict_ranges(mut self) -> Self {
        self.strict_ranges = true;
        self
    }

    /// Inserts a fully formed listing, keeping its id and timestamps.
    pub async fn seed_property(&self, property: Property) {
        self.tables.write().await.properties.push(property);
    }

    pub async fn email_log(&self) -> Vec<NewEmailLog> {
        self.tables.read().await.email_log.clone()
    }

    pub async fn subscription_count(&self) -> usize {
        self.tables.read().await.subscriptions.len()
    }
}

/// Newest first; rows with equal timestamps keep most-recent-insert first.
fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().cloned().collect();
    out.sort_by_key(|row| Reverse(created_at(row)));
    out
}

#[async_trait]
impl CatalogSource for MemoryStore {
    async fn count(&self, predicate: &Predicate) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.properties.iter().filter(|p| predicate.matches(p)).count() as u64)
    }

    async fn select(
        &self,
        predicate: &Predicate,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Property>, StoreError> {
        let tables = self.tables.read().await;
        let matching: Vec<Property> = tables
            .properties
            .iter()
            .filter(|p| predicate.matches(p))
            .cloned()
            .collect();

        if self.strict_ranges && offset > 0 && offset >= matching.len() as u64 {
            return Err(StoreError::remote(
                RANGE_NOT_SATISFIABLE,
                format!(
                    "Requested range not satisfiable: offset {} of {} rows",
                    offset,
                    matching.len()
                ),
            ));
        }

        Ok(newest_first(&matching, |p| p.created_at)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn property(&self, id: Uuid) -> Result<Option<Property>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.properties.iter().find(|p| p.id == id).cloned())
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn insert_property(&self, draft: PropertyDraft) -> Result<Property, StoreError> {
        let property = Property::from_draft(Uuid::new_v4(), draft, Utc::now());
        self.tables.write().await.properties.push(property.clone());
        Ok(property)
    }

    async fn update_property(&self, id: Uuid, draft: PropertyDraft) -> Result<Property, StoreError> {
        let mut tables = self.tables.write().await;
        let property = tables
            .properties
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("property {}", id)))?;
        property.apply_draft(draft, Utc::now());
        Ok(property.clone())
    }

    async fn delete_property(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.properties.len();
        tables.properties.retain(|p| p.id != id);
        if tables.properties.len() == before {
            return Err(StoreError::NotFound(format!("property {}", id)));
        }
        tables.viewings.retain(|v| v.property_id != id);
        Ok(())
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn create_inquiry(&self, inquiry: NewInquiry) -> Result<Inquiry, StoreError> {
        let inquiry = Inquiry::from(inquiry);
        self.tables.write().await.inquiries.push(inquiry.clone());
        Ok(inquiry)
    }

    async fn inquiry(&self, id: Uuid) -> Result<Option<Inquiry>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.inquiries.iter().find(|i| i.id == id).cloned())
    }

    async fn list_inquiries(&self, query: &InquiryQuery) -> Result<Vec<Inquiry>, StoreError> {
        let tables = self.tables.read().await;
        let matching: Vec<Inquiry> = tables
            .inquiries
            .iter()
            .filter(|i| query.matches(i))
            .cloned()
            .collect();
        Ok(newest_first(&matching, |i| i.created_at))
    }

    async fn inquiry_activity(&self) -> Result<Vec<(InquiryStatus, DateTime<Utc>)>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .inquiries
            .iter()
            .map(|i| (i.status, i.created_at))
            .collect())
    }

    async fn update_inquiry(&self, id: Uuid, patch: InquiryPatch) -> Result<Inquiry, StoreError> {
        let mut tables = self.tables.write().await;
        let inquiry = tables
            .inquiries
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("inquiry {}", id)))?;
        inquiry.apply(patch, Utc::now());
        Ok(inquiry.clone())
    }

    async fn delete_inquiry(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.inquiries.len();
        tables.inquiries.retain(|i| i.id != id);
        if tables.inquiries.len() == before {
            return Err(StoreError::NotFound(format!("inquiry {}", id)));
        }
        tables.email_log.retain(|e| e.inquiry_id != id);
        Ok(())
    }

    async fn log_email(&self, entry: NewEmailLog) -> Result<(), StoreError> {
        self.tables.write().await.email_log.push(entry);
        Ok(())
    }

    async fn create_viewing(&self, request: NewViewingRequest) -> Result<ViewingRequest, StoreError> {
        let request = ViewingRequest::from(request);
        self.tables.write().await.viewings.push(request.clone());
        Ok(request)
    }

    async fn list_viewings(&self) -> Result<Vec<ViewingRequest>, StoreError> {
        let tables = self.tables.read().await;
        Ok(newest_first(&tables.viewings, |v| v.created_at))
    }

    async fn delete_viewing(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.viewings.len();
        tables.viewings.retain(|v| v.id != id);
        if tables.viewings.len() == before {
            return Err(StoreError::NotFound(format!("viewing request {}", id)));
        }
        Ok(())
    }

    async fn subscribe(&self, subscription: NewSubscription) -> Result<SubscribeOutcome, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .subscriptions
            .iter()
            .find(|s| s.email == subscription.email)
        {
            return Ok(SubscribeOutcome::AlreadySubscribed(existing.clone()));
        }
        let created = Subscription::from(subscription);
        info!("new newsletter subscription from {}", created.source);
        tables.subscriptions.push(created.clone());
        Ok(SubscribeOutcome::Subscribed(created))
    }
}
