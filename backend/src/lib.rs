//! Montcervin backend: public property catalog, lead capture and the admin
//! dashboard API.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, patch, post, put};
use axum::{middleware, Router};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod media;
pub mod models;
pub mod schema;
pub mod state;
pub mod store;
pub mod validation;

pub use error::ApiError;
pub use state::AppState;

use handlers::{admin, inquiry, newsletter, property, viewing};

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::current_session))
        .route(
            "/properties",
            get(admin::list_properties).post(admin::create_property),
        )
        .route(
            "/properties/:id",
            put(admin::update_property).delete(admin::delete_property),
        )
        .route(
            "/properties/:id/images",
            post(admin::upload_images).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/inquiries", get(inquiry::list_inquiries))
        .route("/inquiries/stats", get(inquiry::inquiry_stats))
        .route(
            "/inquiries/:id",
            patch(inquiry::update_inquiry).delete(inquiry::delete_inquiry),
        )
        .route("/inquiries/:id/email", post(inquiry::email_inquiry))
        .route("/viewings", get(viewing::list_viewings))
        .route("/viewings/:id", delete(viewing::delete_viewing))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::authenticate));

    let media = ServeDir::new(&state.config.media.local_dir);
    let media_path = state.config.media.public_path.clone();

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/properties", get(property::list_properties))
        .route("/api/properties/featured", get(property::featured_properties))
        .route("/api/properties/sold", get(property::sold_properties))
        .route("/api/properties/:id", get(property::get_property))
        .route("/api/inquiries", post(inquiry::create_inquiry))
        .route("/api/viewings", post(viewing::request_viewing))
        .route("/api/newsletter/subscribe", post(newsletter::subscribe))
        .route("/api/admin/login", post(auth::login))
        .nest("/api/admin", protected_routes)
        .nest_service(&media_path, media)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
