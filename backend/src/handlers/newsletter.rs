use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::newsletter::SOURCE_WEBSITE_FORM;
use crate::models::{NewSubscription, SubscribeOutcome};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SubscribedAddress {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub message: &'static str,
    pub already_subscribed: bool,
    pub data: SubscribedAddress,
}

impl From<SubscribeOutcome> for SubscribeResponse {
    fn from(outcome: SubscribeOutcome) -> Self {
        let already_subscribed = !outcome.is_new();
        let subscription = outcome.subscription();
        Self {
            success: true,
            message: if already_subscribed {
                "You're already subscribed to the newsletter."
            } else {
                "Successfully subscribed to newsletter!"
            },
            already_subscribed,
            data: SubscribedAddress {
                id: subscription.id,
                email: subscription.email.clone(),
            },
        }
    }
}

pub async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>, ApiError> {
    let subscription = NewSubscription::new(&body.email, SOURCE_WEBSITE_FORM, Utc::now())?;
    let outcome = state.leads.subscribe(subscription).await?;
    Ok(Json(outcome.into()))
}
