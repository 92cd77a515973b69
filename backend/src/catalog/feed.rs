use std::sync::Arc;

use tracing::{debug, warn};

use super::accumulator::{Accumulator, FilterStamp, MergeOutcome};
use super::filter::{Predicate, PropertyFilter};
use super::page::{fetch_page, PageBatch, PageRequest, RetrievalError};
use super::refine::{refine, SortKey};
use crate::models::Property;
use crate::store::CatalogSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingState {
    Idle,
    Fetching,
    Exhausted,
}

/// A page fetch issued for one filter set. The stamp travels with the request
/// so a response for a superseded filter can be recognised and dropped.
#[derive(Debug, Clone)]
pub struct PageTicket {
    pub stamp: FilterStamp,
    pub page: PageRequest,
    pub predicate: Predicate,
    pub known_total: Option<u64>,
}

impl PageTicket {
    pub async fn fetch<S>(&self, source: &S) -> Result<PageBatch, RetrievalError>
    where
        S: CatalogSource + ?Sized,
    {
        fetch_page(source, &self.predicate, self.page, self.known_total).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Merged(MergeOutcome),
    /// The batch was merged and no further pages remain.
    Exhausted(MergeOutcome),
    /// Response belonged to a filter set that has since been replaced.
    Stale,
    Failed(RetrievalError),
}

/// Infinite-scroll state for the public catalog: the current filter, the
/// listings fetched for it, and whether another page may be requested.
///
/// Page N+1 is only requested after page N has been merged, because
/// [`CatalogFeed::on_sentinel_visible`] refuses to issue a ticket while one is
/// outstanding. There is no cancellation; instead every ticket carries the
/// filter stamp it was issued under and [`CatalogFeed::complete`] discards
/// responses whose stamp is no longer current.
pub struct CatalogFeed<S: ?Sized> {
    source: Arc<S>,
    filter: PropertyFilter,
    predicate: Predicate,
    stamp: FilterStamp,
    accumulator: Accumulator,
    state: PagingState,
    next_page: PageRequest,
    last_error: Option<RetrievalError>,
}

impl<S> CatalogFeed<S>
where
    S: CatalogSource + ?Sized,
{
    pub fn new(source: Arc<S>, filter: PropertyFilter, page_size: usize) -> Self {
        let predicate = filter.predicate();
        Self {
            source,
            filter,
            predicate,
            stamp: FilterStamp::default(),
            accumulator: Accumulator::new(page_size),
            state: PagingState::Idle,
            next_page: PageRequest::first(page_size),
            last_error: None,
        }
    }

    pub fn filter(&self) -> &PropertyFilter {
        &self.filter
    }

    pub fn stamp(&self) -> FilterStamp {
        self.stamp
    }

    pub fn state(&self) -> PagingState {
        self.state
    }

    pub fn records(&self) -> &[Property] {
        self.accumulator.records()
    }

    pub fn total(&self) -> Option<u64> {
        self.accumulator.total()
    }

    pub fn has_more(&self) -> bool {
        self.state != PagingState::Exhausted
    }

    pub fn last_error(&self) -> Option<&RetrievalError> {
        self.last_error.as_ref()
    }

    /// Switches to a new filter set. Returns `false` when nothing changed.
    pub fn set_filter(&mut self, filter: PropertyFilter) -> bool {
        if filter == self.filter {
            return false;
        }
        self.predicate = filter.predicate();
        self.filter = filter;
        self.stamp = self.stamp.next();
        self.accumulator.clear();
        self.state = PagingState::Idle;
        self.next_page = PageRequest::first(self.accumulator.page_size());
        self.last_error = None;
        debug!("catalog filter changed, stamp {}", self.stamp.0);
        true
    }

    /// The scroll sentinel came into view. Issues the next ticket if idle.
    pub fn on_sentinel_visible(&mut self) -> Option<PageTicket> {
        if self.state != PagingState::Idle {
            return None;
        }
        self.state = PagingState::Fetching;
        self.last_error = None;
        Some(PageTicket {
            stamp: self.stamp,
            page: self.next_page,
            predicate: self.predicate.clone(),
            known_total: self.accumulator.total(),
        })
    }

    pub fn complete(
        &mut self,
        ticket: PageTicket,
        result: Result<PageBatch, RetrievalError>,
    ) -> FeedEvent {
        if ticket.stamp != self.stamp {
            debug!(
                "dropping page {} for stamp {} (current {})",
                ticket.page.index, ticket.stamp.0, self.stamp.0
            );
            return FeedEvent::Stale;
        }

        match result {
            Ok(batch) => {
                let outcome = self.accumulator.merge(ticket.stamp, batch);
                self.next_page = ticket.page.next();
                if self.accumulator.has_more() {
                    self.state = PagingState::Idle;
                    FeedEvent::Merged(outcome)
                } else {
                    self.state = PagingState::Exhausted;
                    FeedEvent::Exhausted(outcome)
                }
            }
            Err(err) => {
                warn!("catalog page {} failed: {}", ticket.page.index, err);
                // Back to idle so the next sentinel signal acts as a retry.
                self.state = PagingState::Idle;
                self.last_error = Some(err.clone());
                FeedEvent::Failed(err)
            }
        }
    }

    /// Issues, fetches and merges the next page. `None` when not idle.
    pub async fn load_more(&mut self) -> Option<FeedEvent> {
        let ticket = self.on_sentinel_visible()?;
        let source = Arc::clone(&self.source);
        let result = ticket.fetch(source.as_ref()).await;
        Some(self.complete(ticket, result))
    }

    pub fn display(&self, query: &str, sort: SortKey) -> Vec<&Property> {
        refine(self.accumulator.records(), query, sort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, PropertyDraft, PropertyStatus};
    use crate::store::{ListingStore, MemoryStore};

    async fn store_with(available: usize, in_lakes: usize) -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        for i in 0..available {
            let location = if i < in_lakes {
                Some(Location::LakeDistrict)
            } else {
                Some(Location::NewForest)
            };
            store
                .insert_property(PropertyDraft {
                    title: format!("Listing {}", i),
                    location,
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn pages_until_exhausted() {
        let store = store_with(15, 0).await;
        let filter = PropertyFilter::with_status(PropertyStatus::Available);
        let mut feed = CatalogFeed::new(store, filter, 12);

        assert!(matches!(feed.load_more().await, Some(FeedEvent::Merged(_))));
        assert_eq!(feed.records().len(), 12);
        assert_eq!(feed.total(), Some(15));
        assert!(feed.has_more());

        assert!(matches!(feed.load_more().await, Some(FeedEvent::Exhausted(_))));
        assert_eq!(feed.records().len(), 15);
        assert_eq!(feed.state(), PagingState::Exhausted);
        assert!(feed.load_more().await.is_none());
    }

    #[tokio::test]
    async fn no_second_ticket_while_fetching() {
        let store = store_with(30, 0).await;
        let mut feed = CatalogFeed::new(store, PropertyFilter::default(), 12);
        let ticket = feed.on_sentinel_visible().unwrap();
        assert!(feed.on_sentinel_visible().is_none());
        assert_eq!(feed.state(), PagingState::Fetching);
        assert_eq!(ticket.page.index, 0);
    }

    #[tokio::test]
    async fn stale_response_is_discarded() {
        let store = store_with(20, 5).await;
        let mut feed = CatalogFeed::new(store.clone(), PropertyFilter::default(), 12);

        let old_ticket = feed.on_sentinel_visible().unwrap();
        let old_result = old_ticket.fetch(store.as_ref()).await;

        feed.set_filter(PropertyFilter {
            location: Some("lake".into()),
            ..Default::default()
        });
        assert_eq!(feed.state(), PagingState::Idle);

        let new_ticket = feed.on_sentinel_visible().unwrap();
        let new_result = new_ticket.fetch(store.as_ref()).await;

        // The superseded response lands after the new request was issued.
        assert_eq!(feed.complete(old_ticket, old_result), FeedEvent::Stale);
        assert_eq!(feed.state(), PagingState::Fetching);
        assert!(feed.records().is_empty());

        assert!(matches!(feed.complete(new_ticket, new_result), FeedEvent::Exhausted(_)));
        assert_eq!(feed.records().len(), 5);
        assert!(feed
            .records()
            .iter()
            .all(|p| p.location == Some(Location::LakeDistrict)));
    }

    #[tokio::test]
    async fn failure_returns_to_idle_for_retry() {
        let store = store_with(15, 0).await;
        let mut feed = CatalogFeed::new(store.clone(), PropertyFilter::default(), 12);
        let ticket = feed.on_sentinel_visible().unwrap();
        let event = feed.complete(
            ticket,
            Err(RetrievalError::new("connection reset")),
        );
        assert!(matches!(event, FeedEvent::Failed(_)));
        assert_eq!(feed.state(), PagingState::Idle);
        assert_eq!(feed.last_error().unwrap().message, "connection reset");

        assert!(matches!(feed.load_more().await, Some(FeedEvent::Merged(_))));
        assert!(feed.last_error().is_none());
        assert_eq!(feed.records().len(), 12);
    }

    #[tokio::test]
    async fn filter_change_clears_exhausted() {
        let store = store_with(3, 3).await;
        let mut feed = CatalogFeed::new(store, PropertyFilter::default(), 12);
        feed.load_more().await;
        assert_eq!(feed.state(), PagingState::Exhausted);

        assert!(!feed.set_filter(PropertyFilter::default()));
        assert_eq!(feed.state(), PagingState::Exhausted);

        assert!(feed.set_filter(PropertyFilter::featured()));
        assert_eq!(feed.state(), PagingState::Idle);
        assert!(feed.records().is_empty());
        assert!(matches!(feed.load_more().await, Some(FeedEvent::Exhausted(_))));
        assert!(feed.records().is_empty());
    }

    #[tokio::test]
    async fn display_refines_accumulated_list() {
        let store = store_with(4, 2).await;
        let mut feed = CatalogFeed::new(store, PropertyFilter::default(), 12);
        feed.load_more().await;
        assert_eq!(feed.display("lake district", SortKey::Newest).len(), 2);
        assert_eq!(feed.display("", SortKey::PriceHigh).len(), 4);
    }
}
