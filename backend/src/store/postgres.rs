use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use tracing::{debug, info};
use uuid::Uuid;

use super::{CatalogSource, LeadStore, ListingStore, StoreError};
use crate::catalog::{contains_pattern, Constraint, Predicate};
use crate::db::{self, DbPool};
use crate::models::{
    Inquiry, InquiryPatch, InquiryQuery, InquiryStatus, NewEmailLog, NewInquiry, NewSubscription,
    NewViewingRequest, Property, PropertyDraft, SubscribeOutcome, Subscription, ViewingRequest,
};
use crate::schema::{email_logs, inquiries, newsletter_subscriptions, properties, viewing_requests};

/// Narrows a boxed `properties` query by every constraint of a predicate.
macro_rules! filtered {
    ($query:expr, $predicate:expr) => {{
        let mut query = $query;
        for constraint in $predicate.constraints() {
            query = match constraint {
                Constraint::LocationContains(needle) => {
                    query.filter(properties::location.ilike(contains_pattern(needle)))
                }
                Constraint::TypeIs(t) => query.filter(properties::property_type.eq(*t)),
                Constraint::PriceAtLeast(v) => query.filter(properties::price.ge(*v)),
                Constraint::PriceAtMost(v) => query.filter(properties::price.le(*v)),
                Constraint::BedroomsAtLeast(v) => query.filter(properties::bedrooms.ge(*v)),
                Constraint::BedroomsAtMost(v) => query.filter(properties::bedrooms.le(*v)),
                Constraint::Featured(f) => query.filter(properties::featured.eq(*f)),
                Constraint::StatusIs(s) => query.filter(properties::status.eq(*s)),
            };
        }
        query
    }};
}

/// Postgres-backed store. Diesel is synchronous, so every query runs on the
/// blocking pool with a connection checked out for its duration.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn connect(database_url: &str, pool_size: u32) -> Result<Self, StoreError> {
        Ok(Self::new(db::establish_pool(database_url, pool_size)?))
    }

    async fn run<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<T, StoreError> {
            let mut conn = pool.get()?;
            query(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }
}

#[async_trait]
impl CatalogSource for PgStore {
    async fn count(&self, predicate: &Predicate) -> Result<u64, StoreError> {
        let predicate = predicate.clone();
        self.run(move |conn| {
            let query = filtered!(properties::table.select(count_star()).into_boxed(), predicate);
            let total: i64 = query.get_result(conn)?;
            Ok(total.max(0) as u64)
        })
        .await
    }

    async fn select(
        &self,
        predicate: &Predicate,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Property>, StoreError> {
        let predicate = predicate.clone();
        self.run(move |conn| {
            let query = filtered!(
                properties::table.select(Property::as_select()).into_boxed(),
                predicate
            );
            let rows = query
                .order(properties::created_at.desc())
                .then_order_by(properties::id.desc())
                .offset(offset as i64)
                .limit(limit as i64)
                .load(conn)?;
            debug!("selected {} listings at offset {}", rows.len(), offset);
            Ok(rows)
        })
        .await
    }

    async fn property(&self, id: Uuid) -> Result<Option<Property>, StoreError> {
        self.run(move |conn| {
            Ok(properties::table
                .find(id)
                .select(Property::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }
}

#[async_trait]
impl ListingStore for PgStore {
    async fn insert_property(&self, draft: PropertyDraft) -> Result<Property, StoreError> {
        self.run(move |conn| {
            let property = diesel::insert_into(properties::table)
                .values(&draft)
                .returning(Property::as_returning())
                .get_result(conn)?;
            Ok(property)
        })
        .await
    }

    async fn update_property(&self, id: Uuid, draft: PropertyDraft) -> Result<Property, StoreError> {
        self.run(move |conn| {
            diesel::update(properties::table.find(id))
                .set((&draft, properties::updated_at.eq(Utc::now())))
                .returning(Property::as_returning())
                .get_result(conn)
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("property {}", id)))
        })
        .await
    }

    async fn delete_property(&self, id: Uuid) -> Result<(), StoreError> {
        self.run(move |conn| {
            match diesel::delete(properties::table.find(id)).execute(conn)? {
                0 => Err(StoreError::NotFound(format!("property {}", id))),
                _ => Ok(()),
            }
        })
        .await
    }
}

#[async_trait]
impl LeadStore for PgStore {
    async fn create_inquiry(&self, inquiry: NewInquiry) -> Result<Inquiry, StoreError> {
        self.run(move |conn| {
            Ok(diesel::insert_into(inquiries::table)
                .values(&inquiry)
                .returning(Inquiry::as_returning())
                .get_result(conn)?)
        })
        .await
    }

    async fn inquiry(&self, id: Uuid) -> Result<Option<Inquiry>, StoreError> {
        self.run(move |conn| {
            Ok(inquiries::table
                .find(id)
                .select(Inquiry::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    async fn list_inquiries(&self, query: &InquiryQuery) -> Result<Vec<Inquiry>, StoreError> {
        let query = query.clone();
        self.run(move |conn| {
            let mut q = inquiries::table
                .select(Inquiry::as_select())
                .order(inquiries::created_at.desc())
                .then_order_by(inquiries::id.desc())
                .into_boxed();
            if let Some(status) = query.status {
                q = q.filter(inquiries::status.eq(status));
            }
            if let Some(priority) = query.priority {
                q = q.filter(inquiries::priority.eq(priority));
            }
            if let Some(term) = query.search_term() {
                let pattern = contains_pattern(term);
                q = q.filter(
                    inquiries::first_name
                        .ilike(pattern.clone())
                        .or(inquiries::last_name.ilike(pattern.clone()))
                        .or(inquiries::email.ilike(pattern.clone()))
                        .or(inquiries::preferred_location.ilike(pattern)),
                );
            }
            Ok(q.load(conn)?)
        })
        .await
    }

    async fn inquiry_activity(&self) -> Result<Vec<(InquiryStatus, DateTime<Utc>)>, StoreError> {
        self.run(|conn| {
            Ok(inquiries::table
                .select((inquiries::status, inquiries::created_at))
                .load(conn)?)
        })
        .await
    }

    async fn update_inquiry(&self, id: Uuid, patch: InquiryPatch) -> Result<Inquiry, StoreError> {
        self.run(move |conn| {
            diesel::update(inquiries::table.find(id))
                .set((&patch, inquiries::updated_at.eq(Utc::now())))
                .returning(Inquiry::as_returning())
                .get_result(conn)
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("inquiry {}", id)))
        })
        .await
    }

    async fn delete_inquiry(&self, id: Uuid) -> Result<(), StoreError> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                diesel::delete(email_logs::table.filter(email_logs::inquiry_id.eq(id)))
                    .execute(conn)?;
                match diesel::delete(inquiries::table.find(id)).execute(conn)? {
                    0 => Err(StoreError::NotFound(format!("inquiry {}", id))),
                    _ => Ok(()),
                }
            })
        })
        .await
    }

    async fn log_email(&self, entry: NewEmailLog) -> Result<(), StoreError> {
        self.run(move |conn| {
            diesel::insert_into(email_logs::table)
                .values(&entry)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn create_viewing(&self, request: NewViewingRequest) -> Result<ViewingRequest, StoreError> {
        self.run(move |conn| {
            Ok(diesel::insert_into(viewing_requests::table)
                .values(&request)
                .returning(ViewingRequest::as_returning())
                .get_result(conn)?)
        })
        .await
    }

    async fn list_viewings(&self) -> Result<Vec<ViewingRequest>, StoreError> {
        self.run(|conn| {
            Ok(viewing_requests::table
                .select(ViewingRequest::as_select())
                .order(viewing_requests::created_at.desc())
                .then_order_by(viewing_requests::id.desc())
                .load(conn)?)
        })
        .await
    }

    async fn delete_viewing(&self, id: Uuid) -> Result<(), StoreError> {
        self.run(move |conn| {
            match diesel::delete(viewing_requests::table.find(id)).execute(conn)? {
                0 => Err(StoreError::NotFound(format!("viewing request {}", id))),
                _ => Ok(()),
            }
        })
        .await
    }

    async fn subscribe(&self, subscription: NewSubscription) -> Result<SubscribeOutcome, StoreError> {
        self.run(move |conn| {
            let inserted = diesel::insert_into(newsletter_subscriptions::table)
                .values(&subscription)
                .on_conflict(newsletter_subscriptions::email)
                .do_nothing()
                .returning(Subscription::as_returning())
                .get_result(conn)
                .optional()?;

            match inserted {
                Some(created) => {
                    info!("new newsletter subscription from {}", created.source);
                    Ok(SubscribeOutcome::Subscribed(created))
                }
                None => {
                    let existing = newsletter_subscriptions::table
                        .filter(newsletter_subscriptions::email.eq(&subscription.email))
                        .select(Subscription::as_select())
                        .first(conn)?;
                    Ok(SubscribeOutcome::AlreadySubscribed(existing))
                }
            }
        })
        .await
    }
}
