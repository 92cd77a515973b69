use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Predicate;
use crate::models::Property;
use crate::store::{CatalogSource, StoreError};

pub const DEFAULT_PAGE_SIZE: usize = 12;

/// Whether the store answered with an error or could not be reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetrievalKind {
    #[default]
    Rejected,
    Unavailable,
}

/// Failure of a count or data request, carrying the store's message as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RetrievalError {
    pub message: String,
    pub kind: RetrievalKind,
}

impl RetrievalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: RetrievalKind::Rejected,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.kind == RetrievalKind::Unavailable
    }
}

impl From<StoreError> for RetrievalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Remote { message, .. } => RetrievalError::new(message),
            StoreError::Unavailable(message) => RetrievalError {
                message,
                kind: RetrievalKind::Unavailable,
            },
            not_found @ StoreError::NotFound(_) => RetrievalError::new(not_found.to_string()),
        }
    }
}

/// Zero-based page of a fixed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub index: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn new(index: usize, size: usize) -> Self {
        Self { index, size }
    }

    pub fn first(size: usize) -> Self {
        Self::new(0, size)
    }

    pub fn next(self) -> Self {
        Self::new(self.index.saturating_add(1), self.size)
    }

    /// Rows before this page. Saturates, so an absurd index reads as past the end.
    pub fn offset(&self) -> u64 {
        (self.index as u64).saturating_mul(self.size as u64)
    }
}

/// One slice of listings plus the total count known at the time it was fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct PageBatch {
    pub page: PageRequest,
    pub records: Vec<Property>,
    pub total: Option<u64>,
}

impl PageBatch {
    pub fn empty(page: PageRequest, total: Option<u64>) -> Self {
        Self {
            page,
            records: Vec::new(),
            total,
        }
    }

    pub fn is_full(&self) -> bool {
        self.records.len() == self.page.size
    }
}

/// Fetches one page of listings, newest first.
///
/// When `known_total` is `None` the exact match count is requested first.
/// An offset at or past the total, or a store that answers with
/// range-not-satisfiable, yields an empty batch rather than an error.
pub async fn fetch_page<S>(
    source: &S,
    predicate: &Predicate,
    page: PageRequest,
    known_total: Option<u64>,
) -> Result<PageBatch, RetrievalError>
where
    S: CatalogSource + ?Sized,
{
    let total = match known_total {
        Some(total) => total,
        None => source.count(predicate).await?,
    };

    let offset = page.offset();
    if offset >= total {
        debug!("page {} starts at {} of {}, nothing to fetch", page.index, offset, total);
        return Ok(PageBatch::empty(page, Some(total)));
    }

    match source.select(predicate, offset, page.size as u64).await {
        Ok(records) => Ok(PageBatch {
            page,
            records,
            total: Some(total),
        }),
        Err(err) if err.is_range_not_satisfiable() => {
            debug!("range not satisfiable for page {}: {}", page.index, err);
            Ok(PageBatch::empty(page, Some(total)))
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PropertyFilter;
    use crate::models::{PropertyDraft, PropertyStatus};
    use crate::store::{MemoryStore, ListingStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    async fn seeded(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..n {
            store
                .insert_property(PropertyDraft {
                    title: format!("Listing {}", i),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn first_page_carries_exact_count() {
        let store = seeded(15).await;
        let predicate = PropertyFilter::with_status(PropertyStatus::Available).predicate();

        let first = fetch_page(&store, &predicate, PageRequest::first(12), None).await.unwrap();
        assert_eq!(first.records.len(), 12);
        assert_eq!(first.total, Some(15));

        let second = fetch_page(&store, &predicate, first.page.next(), first.total).await.unwrap();
        assert_eq!(second.records.len(), 3);
        assert!(!second.is_full());
    }

    #[tokio::test]
    async fn offset_past_total_is_empty_not_error() {
        let store = seeded(15).await;
        let predicate = PropertyFilter::default().predicate();
        let batch = fetch_page(&store, &predicate, PageRequest::new(5, 3), Some(15)).await.unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(batch.total, Some(15));
    }

    struct Flaky {
        count: u64,
        error: fn() -> StoreError,
        selects: AtomicUsize,
    }

    #[async_trait]
    impl CatalogSource for Flaky {
        async fn count(&self, _: &Predicate) -> Result<u64, StoreError> {
            Ok(self.count)
        }

        async fn select(&self, _: &Predicate, _: u64, _: u64) -> Result<Vec<Property>, StoreError> {
            self.selects.fetch_add(1, Ordering::SeqCst);
            Err((self.error)())
        }

        async fn property(&self, _: Uuid) -> Result<Option<Property>, StoreError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn range_not_satisfiable_means_no_more_pages() {
        let source = Flaky {
            count: 30,
            error: || StoreError::remote("PGRST103", "Requested range not satisfiable"),
            selects: AtomicUsize::new(0),
        };
        let predicate = PropertyFilter::default().predicate();
        let batch = fetch_page(&source, &predicate, PageRequest::new(1, 12), None).await.unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(source.selects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn other_failures_surface_message_verbatim() {
        let source = Flaky {
            count: 30,
            error: || StoreError::remote("57014", "canceling statement due to statement timeout"),
            selects: AtomicUsize::new(0),
        };
        let predicate = PropertyFilter::default().predicate();
        let err = fetch_page(&source, &predicate, PageRequest::first(12), None).await.unwrap_err();
        assert_eq!(err.message, "canceling statement due to statement timeout");
        assert!(!err.is_unavailable());
    }

    #[tokio::test]
    async fn unreachable_store_keeps_message_and_kind() {
        let source = Flaky {
            count: 30,
            error: || StoreError::Unavailable("connection refused".into()),
            selects: AtomicUsize::new(0),
        };
        let predicate = PropertyFilter::default().predicate();
        let err = fetch_page(&source, &predicate, PageRequest::first(12), None).await.unwrap_err();
        assert_eq!(err.message, "connection refused");
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn huge_page_index_is_past_the_end() {
        let page = PageRequest::new(usize::MAX, 12);
        assert_eq!(page.offset(), u64::MAX);
        assert_eq!(page.next().index, usize::MAX);

        let store = seeded(3).await;
        let predicate = PropertyFilter::default().predicate();
        let batch = fetch_page(&store, &predicate, page, None).await.unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(batch.total, Some(3));
    }
}
