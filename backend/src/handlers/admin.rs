use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use tracing::info;
use uuid::Uuid;

use super::{CatalogPage, Paging};
use crate::auth::AdminSession;
use crate::catalog::{fetch_page, PropertyFilter};
use crate::error::ApiError;
use crate::media::{upload_all, UploadFile};
use crate::models::{Property, PropertyDraft};
use crate::state::AppState;

/// Dashboard listing table: every status unless `status` is given.
pub async fn list_properties(
    State(state): State<AppState>,
    Query(filter): Query<PropertyFilter>,
    Query(paging): Query<Paging>,
) -> Result<Json<CatalogPage>, ApiError> {
    let page = paging.request(state.config.catalog.page_size);
    let predicate = filter.predicate_any_status();
    let batch = fetch_page(state.listings.as_ref(), &predicate, page, None).await?;
    Ok(Json(batch.into()))
}

pub async fn create_property(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
    Json(draft): Json<PropertyDraft>,
) -> Result<(StatusCode, Json<Property>), ApiError> {
    let draft = draft.validate()?;
    let property = state.listings.insert_property(draft).await?;
    info!("property {} listed by {}", property.id, session.email);
    Ok((StatusCode::CREATED, Json(property)))
}

/// Full replacement of the editable fields.
pub async fn update_property(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
    Path(id): Path<Uuid>,
    Json(draft): Json<PropertyDraft>,
) -> Result<Json<Property>, ApiError> {
    let draft = draft.validate()?;
    let property = state.listings.update_property(id, draft).await?;
    info!("property {} updated by {}", id, session.email);
    Ok(Json(property))
}

pub async fn delete_property(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.listings.delete_property(id).await?;
    info!("property {} deleted by {}", id, session.email);
    Ok(StatusCode::NO_CONTENT)
}

/// Stores every file part of the form and appends the resulting URLs to the
/// listing's images. Nothing is appended if any upload fails.
pub async fn upload_images(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Property>, ApiError> {
    let property = state
        .listings
        .property(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Property".into()))?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        files.push(UploadFile {
            file_name,
            content_type,
            bytes,
        });
    }
    if files.is_empty() {
        return Err(ApiError::BadRequest("No image files in request".into()));
    }

    let urls = upload_all(state.images.as_ref(), files).await?;
    info!("stored {} images for property {}", urls.len(), id);

    let mut draft = PropertyDraft::from(&property);
    draft.images.extend(urls);
    Ok(Json(state.listings.update_property(id, draft).await?))
}
