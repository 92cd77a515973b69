use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::auth::AuthError;
use crate::catalog::RetrievalError;
use crate::mailer::MailError;
use crate::media::UploadError;
use crate::store::StoreError;
use crate::validation::ValidationErrors;

/// Every failure a handler can return, rendered as `{"error": ..}` JSON.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Please correct the highlighted fields")]
    Validation(#[from] ValidationErrors),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0}")]
    BadRequest(String),
    #[error("Failed to send email")]
    Mail(#[from] MailError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            other => ApiError::Store(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(AuthError::Signing(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Retrieval(e) if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Mail(_) | ApiError::Upload(_) | ApiError::Retrieval(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store(StoreError::Remote { .. }) => StatusCode::BAD_GATEWAY,
            ApiError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self {
                ApiError::Mail(e) => error!("mail delivery failed: {}", e),
                ApiError::Upload(e) => error!("{}: {}", e, e.source),
                other => error!("request failed: {}", other),
            }
        }

        let body = match &self {
            ApiError::Validation(fields) => json!({
                "error": self.to_string(),
                "fields": fields,
            }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            ApiError::from(StoreError::NotFound("inquiry 1".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StoreError::remote("PGRST000", "down")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(ValidationErrors::single("email", "bad")).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Mail(MailError::Rejected {
                status: 500,
                body: String::new()
            })
            .to_string(),
            "Failed to send email"
        );
    }

    #[test]
    fn unreachable_catalog_is_503() {
        let err = ApiError::from(RetrievalError::from(StoreError::Unavailable("pool timed out".into())));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "pool timed out");
        let rejected = ApiError::from(RetrievalError::new("column does not exist"));
        assert_eq!(rejected.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn token_signing_failure_is_a_server_fault() {
        let signing = jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidKeyFormat);
        assert_eq!(
            ApiError::from(AuthError::Signing(signing)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::from(AuthError::SessionClosed).status(), StatusCode::UNAUTHORIZED);
    }
}
