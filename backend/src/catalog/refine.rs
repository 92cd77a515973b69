use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::models::Property;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Fetch order, which is already newest first.
    #[default]
    Newest,
    PriceLow,
    PriceHigh,
    BedroomsLow,
    BedroomsHigh,
}

/// Free-text search and sort over already fetched listings.
///
/// Pure and stable: equal keys keep their relative order, so applying it twice
/// to the same input gives the same list. Missing prices and bedroom counts
/// sort as zero.
pub fn refine<'a>(records: &'a [Property], query: &str, sort: SortKey) -> Vec<&'a Property> {
    let needle = query.trim().to_lowercase();
    let mut out: Vec<&Property> = if needle.is_empty() {
        records.iter().collect()
    } else {
        records.iter().filter(|p| mentions(p, &needle)).collect()
    };

    let price = |p: &&Property| p.price.unwrap_or(0);
    let bedrooms = |p: &&Property| p.bedrooms.unwrap_or(0);
    match sort {
        SortKey::Newest => {}
        SortKey::PriceLow => out.sort_by_key(price),
        SortKey::PriceHigh => out.sort_by_key(|p| Reverse(price(p))),
        SortKey::BedroomsLow => out.sort_by_key(bedrooms),
        SortKey::BedroomsHigh => out.sort_by_key(|p| Reverse(bedrooms(p))),
    }
    out
}

fn mentions(p: &Property, needle: &str) -> bool {
    let contains = |text: &str| text.to_lowercase().contains(needle);
    contains(&p.title)
        || p.location.is_some_and(|l| contains(l.as_str()))
        || p.description.as_deref().is_some_and(contains)
        || p.property_type.is_some_and(|t| contains(t.as_str()))
}
