use std::collections::HashMap;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use axum::{Extension, Json};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Invalid Authorization header format")]
    MalformedHeader,
    #[error("Invalid or expired token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("Session has ended")]
    SessionClosed,
    #[error("Invalid email or password")]
    BadCredentials,
    #[error("Could not issue a session token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    /// Session id in the registry.
    pub jti: String,
}

pub fn create_token(session: &AdminSession, jwt_secret: &str) -> Result<String, AuthError> {
    let claims = Claims {
        sub: session.email.clone(),
        exp: session.expires_at.timestamp().max(0) as usize,
        jti: session.id.to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(AuthError::Signing)
}

pub fn validate_token(token: &str, jwt_secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// The signed-in administrator, handed to admin handlers as a request
/// extension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminSession {
    pub id: Uuid,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Owns every live admin session. Login opens one, logout closes it, and a
/// lookup past `expires_at` drops it. Opening a session also drops every
/// expired one.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, AdminSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn open(&self, email: &str, ttl: Duration) -> AdminSession {
        let now = Utc::now();
        let session = AdminSession {
            id: Uuid::new_v4(),
            email: email.to_string(),
            expires_at: now + ttl,
        };
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(session.id, session.clone());
        session
    }

    pub async fn lookup(&self, id: Uuid, now: DateTime<Utc>) -> Option<AdminSession> {
        let session = self.sessions.read().await.get(&id).cloned()?;
        if session.expires_at <= now {
            self.sessions.write().await.remove(&id);
            return None;
        }
        Some(session)
    }

    /// Returns whether a session was open.
    pub async fn close(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn bearer(request: &Request) -> Result<&str, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?;
    header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MalformedHeader)
}

/// Guards `/api/admin/*`: the bearer token must verify and name an open session.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = validate_token(bearer(&request)?, &state.config.jwt_secret)?;
    let id = Uuid::parse_str(&claims.jti).map_err(|_| AuthError::SessionClosed)?;
    let session = state
        .sessions
        .lookup(id, Utc::now())
        .await
        .ok_or(AuthError::SessionClosed)?;

    info!("Authenticated admin: {} for {}", session.email, request.uri().path());
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let admin = &state.config.admin;
    let known = !admin.email.is_empty()
        && !admin.password.is_empty()
        && credentials.email.trim().eq_ignore_ascii_case(&admin.email)
        && credentials.password == admin.password;
    if !known {
        warn!("rejected admin login for {}", credentials.email.trim());
        return Err(AuthError::BadCredentials.into());
    }

    let ttl = Duration::hours(state.config.session_ttl_hours);
    let session = state.sessions.open(&admin.email, ttl).await;
    let token = match create_token(&session, &state.config.jwt_secret) {
        Ok(token) => token,
        Err(e) => {
            state.sessions.close(session.id).await;
            return Err(e.into());
        }
    };
    info!("admin {} signed in", session.email);
    Ok(Json(LoginResponse {
        token,
        email: session.email,
        expires_at: session.expires_at,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
) -> StatusCode {
    state.sessions.close(session.id).await;
    info!("admin {} signed out", session.email);
    StatusCode::NO_CONTENT
}

pub async fn current_session(Extension(session): Extension<AdminSession>) -> Json<AdminSession> {
    Json(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_round_trip_names_the_session() {
        let registry = SessionRegistry::new();
        let session = registry.open("agent@montcervin.co.uk", Duration::hours(1)).await;
        let token = create_token(&session, "secret").unwrap();

        let claims = validate_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "agent@montcervin.co.uk");
        assert_eq!(claims.jti, session.id.to_string());
        assert!(matches!(
            validate_token(&token, "other"),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn closed_and_expired_sessions_are_gone() {
        let registry = SessionRegistry::new();
        let session = registry.open("a@b.co", Duration::minutes(5)).await;
        assert!(registry.lookup(session.id, Utc::now()).await.is_some());

        let later = Utc::now() + Duration::minutes(10);
        assert!(registry.lookup(session.id, later).await.is_none());
        assert_eq!(registry.len().await, 0);

        let session = registry.open("a@b.co", Duration::minutes(5)).await;
        assert!(registry.close(session.id).await);
        assert!(!registry.close(session.id).await);
        assert!(registry.lookup(session.id, Utc::now()).await.is_none());
    }

    #[tokio::test]
    async fn logins_without_logout_do_not_pile_up() {
        let registry = SessionRegistry::new();
        for _ in 0..5 {
            registry.open("a@b.co", Duration::seconds(-1)).await;
        }
        assert_eq!(registry.len().await, 1);

        let live = registry.open("a@b.co", Duration::hours(1)).await;
        assert_eq!(registry.len().await, 1);
        assert!(registry.lookup(live.id, Utc::now()).await.is_some());
    }
}
