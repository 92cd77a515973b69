//! Filtered, paginated retrieval of property listings.
//!
//! A [`PropertyFilter`] builds a [`Predicate`]; [`fetch_page`] retrieves one
//! newest-first slice (and the exact count on first use); an [`Accumulator`]
//! merges slices into one de-duplicated list; [`refine`] applies free-text
//! search and sorting for display. [`CatalogFeed`] wires these together as the
//! infinite-scroll state machine.

pub mod accumulator;
pub mod feed;
pub mod filter;
pub mod page;
pub mod refine;

pub use accumulator::{Accumulator, FilterStamp, MergeOutcome};
pub use feed::{CatalogFeed, FeedEvent, PageTicket, PagingState};
pub use filter::{contains_pattern, escape_like, Constraint, Predicate, PropertyFilter};
pub use page::{fetch_page, PageBatch, PageRequest, RetrievalError, RetrievalKind, DEFAULT_PAGE_SIZE};
pub use refine::{refine, SortKey};
