//! HTTP handlers, one module per resource.

use serde::{Deserialize, Serialize};

use crate::catalog::{PageBatch, PageRequest};
use crate::models::Property;

pub mod admin;
pub mod inquiry;
pub mod newsletter;
pub mod property;
pub mod viewing;

/// Largest page a client may ask for.
pub const MAX_PAGE_SIZE: usize = 100;

/// `page` (zero-based) and `page_size` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct Paging {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl Paging {
    pub fn request(&self, default_size: usize) -> PageRequest {
        let size = self.page_size.unwrap_or(default_size).clamp(1, MAX_PAGE_SIZE);
        PageRequest::new(self.page.unwrap_or(0), size)
    }
}

#[derive(Debug, Serialize)]
pub struct CatalogPage {
    pub data: Vec<Property>,
    pub count: u64,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
}

impl From<PageBatch> for CatalogPage {
    fn from(batch: PageBatch) -> Self {
        let count = batch.total.unwrap_or(batch.records.len() as u64);
        let seen = batch.page.offset().saturating_add(batch.records.len() as u64);
        Self {
            has_more: !batch.records.is_empty() && seen < count,
            count,
            page: batch.page.index,
            page_size: batch.page.size,
            data: batch.records,
        }
    }
}
