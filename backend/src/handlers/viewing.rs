use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::newsletter::SOURCE_VIEWING_REQUEST;
use crate::models::{NewSubscription, ViewingForm, ViewingRequest};
use crate::state::AppState;
use crate::validation::ValidationErrors;

pub async fn request_viewing(
    State(state): State<AppState>,
    Json(form): Json<ViewingForm>,
) -> Result<(StatusCode, Json<ViewingRequest>), ApiError> {
    let now = Utc::now();
    let request = form.validate(now)?;
    if state.listings.property(request.property_id).await?.is_none() {
        return Err(ValidationErrors::single("property_id", "This property is no longer listed").into());
    }

    let email = request.email.clone();
    let wants_newsletter = request.subscribe_newsletter;
    let created = state.leads.create_viewing(request).await?;
    info!("viewing requested for property {}", created.property_id);

    // The viewing is already stored; a failed opt-in must not undo it.
    if wants_newsletter {
        match NewSubscription::new(&email, SOURCE_VIEWING_REQUEST, now) {
            Ok(subscription) => {
                if let Err(e) = state.leads.subscribe(subscription).await {
                    warn!("newsletter opt-in for viewing {} failed: {}", created.id, e);
                }
            }
            Err(e) => warn!("newsletter opt-in skipped: {}", e),
        }
    }

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_viewings(State(state): State<AppState>) -> Result<Json<Vec<ViewingRequest>>, ApiError> {
    Ok(Json(state.leads.list_viewings().await?))
}

pub async fn delete_viewing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.leads.delete_viewing(id).await?;
    info!("viewing request {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}
