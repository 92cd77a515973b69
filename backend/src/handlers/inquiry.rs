use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AdminSession;
use crate::error::ApiError;
use crate::mailer::OutgoingEmail;
use crate::models::{
    EmailForm, Inquiry, InquiryForm, InquiryPatch, InquiryQuery, InquiryStats, InquiryStatus,
    NewEmailLog,
};
use crate::state::AppState;
use crate::store::LeadStore;

/// Public contact form.
pub async fn create_inquiry(
    State(state): State<AppState>,
    Json(form): Json<InquiryForm>,
) -> Result<(StatusCode, Json<Inquiry>), ApiError> {
    let inquiry = form.validate(Utc::now())?;
    let created = state.leads.create_inquiry(inquiry).await?;
    info!("new inquiry {} from {}", created.id, created.email);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_inquiries(
    State(state): State<AppState>,
    Query(query): Query<InquiryQuery>,
) -> Result<Json<Vec<Inquiry>>, ApiError> {
    Ok(Json(state.leads.list_inquiries(&query).await?))
}

pub async fn inquiry_stats(State(state): State<AppState>) -> Result<Json<InquiryStats>, ApiError> {
    let activity = state.leads.inquiry_activity().await?;
    Ok(Json(InquiryStats::tally(activity, Utc::now())))
}

/// Persists the edit and returns the stored row. Callers show nothing new
/// until this succeeds.
pub async fn attempt_update<L>(leads: &L, id: Uuid, patch: InquiryPatch) -> Result<Inquiry, ApiError>
where
    L: LeadStore + ?Sized,
{
    let patch = patch.validate()?;
    Ok(leads.update_inquiry(id, patch).await?)
}

pub async fn update_inquiry(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
    Path(id): Path<Uuid>,
    Json(patch): Json<InquiryPatch>,
) -> Result<Json<Inquiry>, ApiError> {
    let updated = attempt_update(state.leads.as_ref(), id, patch).await?;
    info!("inquiry {} updated by {}", id, session.email);
    Ok(Json(updated))
}

pub async fn delete_inquiry(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.leads.delete_inquiry(id).await?;
    info!("inquiry {} deleted by {}", id, session.email);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct EmailSent {
    pub message: &'static str,
    pub inquiry: Inquiry,
}

/// Replies to an inquiry. Only a delivered message marks the inquiry as
/// contacted and lands in the email log.
pub async fn email_inquiry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<EmailForm>,
) -> Result<Json<EmailSent>, ApiError> {
    let form = form.validate()?;
    let inquiry = state
        .leads
        .inquiry(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Inquiry".into()))?;

    let email = OutgoingEmail {
        to: inquiry.email.clone(),
        subject: form.subject.trim().to_string(),
        text: form.message.clone(),
    };
    if let Err(e) = state.mailer.send(&email).await {
        warn!("email to inquiry {} failed: {}", id, e);
        return Err(e.into());
    }

    let updated = state
        .leads
        .update_inquiry(id, InquiryPatch::status(InquiryStatus::Contacted))
        .await?;
    state
        .leads
        .log_email(NewEmailLog {
            id: Uuid::new_v4(),
            inquiry_id: id,
            subject: email.subject,
            message: email.text,
            sent_at: Utc::now(),
        })
        .await?;

    Ok(Json(EmailSent {
        message: "Email sent successfully",
        inquiry: updated,
    }))
}
