use axum::extract::{Path, Query, State};
use axum::Json;
use tracing::info;
use uuid::Uuid;

use super::{CatalogPage, Paging};
use crate::catalog::{fetch_page, PropertyFilter};
use crate::error::ApiError;
use crate::models::{Property, PropertyStatus};
use crate::state::AppState;

/// Listings shown in the home page strips.
pub const SHOWCASE_SIZE: u64 = 6;

/// One page of the public catalog, newest first.
pub async fn list_properties(
    State(state): State<AppState>,
    Query(filter): Query<PropertyFilter>,
    Query(paging): Query<Paging>,
) -> Result<Json<CatalogPage>, ApiError> {
    let page = paging.request(state.config.catalog.page_size);
    info!("Fetching catalog page {} ({:?})", page.index, filter);

    let batch = fetch_page(state.catalog.as_ref(), &filter.predicate(), page, None).await?;
    info!(
        "Fetched {} of {} properties",
        batch.records.len(),
        batch.total.unwrap_or(0)
    );
    Ok(Json(batch.into()))
}

pub async fn featured_properties(
    State(state): State<AppState>,
) -> Result<Json<Vec<Property>>, ApiError> {
    let predicate = PropertyFilter::featured().predicate();
    Ok(Json(state.catalog.select(&predicate, 0, SHOWCASE_SIZE).await?))
}

pub async fn sold_properties(State(state): State<AppState>) -> Result<Json<Vec<Property>>, ApiError> {
    let predicate = PropertyFilter::with_status(PropertyStatus::Sold).predicate();
    Ok(Json(state.catalog.select(&predicate, 0, SHOWCASE_SIZE).await?))
}

pub async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Property>, ApiError> {
    info!("Fetching property with ID: {}", id);
    state
        .catalog
        .property(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Property".into()))
}
