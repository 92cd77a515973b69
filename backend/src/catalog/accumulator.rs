use std::collections::HashSet;

use uuid::Uuid;

use super::page::PageBatch;
use crate::models::Property;

/// Identifies one filter set; bumped every time the filter changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FilterStamp(pub u64);

impl FilterStamp {
    pub fn next(self) -> Self {
        FilterStamp(self.0 + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The sequence was discarded and replaced by this batch.
    Replaced { kept: usize },
    /// The batch was appended; `skipped` records were already present or past the total.
    Appended { added: usize, skipped: usize },
}

/// Ordered, de-duplicated listings fetched so far for one filter set.
#[derive(Debug, Clone)]
pub struct Accumulator {
    page_size: usize,
    stamp: Option<FilterStamp>,
    records: Vec<Property>,
    ids: HashSet<Uuid>,
    total: Option<u64>,
    has_more: bool,
}

impl Accumulator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            stamp: None,
            records: Vec::new(),
            ids: HashSet::new(),
            total: None,
            has_more: true,
        }
    }

    pub fn records(&self) -> &[Property] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn clear(&mut self) {
        self.stamp = None;
        self.records.clear();
        self.ids.clear();
        self.total = None;
        self.has_more = true;
    }

    /// Merges a batch fetched under `stamp`.
    ///
    /// The first page, or any page from a different filter set, replaces the
    /// sequence, so a page-0 replay whose head moved is a fresh list too.
    /// Later pages are appended minus records whose id is already held; once
    /// the total is known the sequence never grows past it.
    pub fn merge(&mut self, stamp: FilterStamp, batch: PageBatch) -> MergeOutcome {
        let received = batch.records.len();
        let replace = self.stamp != Some(stamp) || batch.page.index == 0;

        if replace || batch.total.is_some() {
            self.total = batch.total;
        }

        let outcome = if replace {
            self.records.clear();
            self.ids.clear();
            self.stamp = Some(stamp);
            let added = self.extend(batch.records);
            MergeOutcome::Replaced { kept: added }
        } else {
            let added = self.extend(batch.records);
            MergeOutcome::Appended {
                added,
                skipped: received - added,
            }
        };

        self.has_more = received == self.page_size
            && self.total.map_or(true, |total| (self.records.len() as u64) < total);

        outcome
    }

    fn extend(&mut self, incoming: Vec<Property>) -> usize {
        let mut added = 0;
        for record in incoming {
            if self
                .total
                .is_some_and(|total| self.records.len() as u64 >= total)
            {
                break;
            }
            if self.ids.insert(record.id) {
                self.records.push(record);
                added += 1;
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::page::PageRequest;
    use crate::models::PropertyDraft;
    use chrono::Utc;

    fn listings(n: usize) -> Vec<Property> {
        (0..n)
            .map(|i| {
                Property::from_draft(
                    Uuid::new_v4(),
                    PropertyDraft {
                        title: format!("Listing {}", i),
                        ..Default::default()
                    },
                    Utc::now(),
                )
            })
            .collect()
    }

    fn batch(index: usize, records: &[Property], total: Option<u64>) -> PageBatch {
        PageBatch {
            page: PageRequest::new(index, 12),
            records: records.to_vec(),
            total,
        }
    }

    #[test]
    fn fifteen_records_over_two_pages() {
        let all = listings(15);
        let stamp = FilterStamp(1);
        let mut acc = Accumulator::new(12);

        acc.merge(stamp, batch(0, &all[..12], Some(15)));
        assert_eq!(acc.len(), 12);
        assert!(acc.has_more());

        acc.merge(stamp, batch(1, &all[12..], Some(15)));
        assert_eq!(acc.len(), 15);
        assert!(!acc.has_more());
    }

    #[test]
    fn overlapping_pages_never_duplicate() {
        let all = listings(24);
        let stamp = FilterStamp(1);
        let mut acc = Accumulator::new(12);
        acc.merge(stamp, batch(0, &all[..12], Some(24)));

        // A row inserted upstream shifts page two back by one.
        let outcome = acc.merge(stamp, batch(1, &all[11..23], Some(24)));
        assert_eq!(outcome, MergeOutcome::Appended { added: 11, skipped: 1 });

        let ids: HashSet<_> = acc.records().iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), acc.len());
        assert!(acc.has_more());
    }

    #[test]
    fn never_grows_past_known_total() {
        let all = listings(24);
        let stamp = FilterStamp(1);
        let mut acc = Accumulator::new(12);
        acc.merge(stamp, batch(0, &all[..12], Some(20)));
        acc.merge(stamp, batch(1, &all[12..24], Some(20)));
        assert_eq!(acc.len(), 20);
        assert!(!acc.has_more());
    }

    #[test]
    fn short_batch_without_total_ends_paging() {
        let all = listings(5);
        let mut acc = Accumulator::new(12);
        acc.merge(FilterStamp(1), batch(0, &all, None));
        assert!(!acc.has_more());

        let mut acc = Accumulator::new(5);
        acc.merge(FilterStamp(1), batch(0, &all, None));
        assert!(acc.has_more());
    }

    #[test]
    fn new_stamp_replaces_previous_sequence() {
        let old = listings(12);
        let fresh = listings(3);
        let mut acc = Accumulator::new(12);
        acc.merge(FilterStamp(1), batch(0, &old, Some(30)));

        let outcome = acc.merge(FilterStamp(2), batch(0, &fresh, Some(3)));
        assert_eq!(outcome, MergeOutcome::Replaced { kept: 3 });
        assert_eq!(acc.records(), &fresh[..]);
        assert_eq!(acc.total(), Some(3));
    }

    #[test]
    fn empty_batch_at_end_stops_paging() {
        let all = listings(12);
        let stamp = FilterStamp(1);
        let mut acc = Accumulator::new(12);
        acc.merge(stamp, batch(0, &all, None));
        assert!(acc.has_more());
        acc.merge(stamp, batch(1, &[], Some(12)));
        assert_eq!(acc.len(), 12);
        assert!(!acc.has_more());
    }
}
