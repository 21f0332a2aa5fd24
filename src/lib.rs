//! Zikroullah backend
//!
//! A REST backend for group tallies with SQLite persistence, plus a client
//! library that drives the same API.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use db::Repository;
use models::ServiceInfo;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    let api_routes = Router::new()
        // Users
        .route("/users/register", post(api::register))
        .route("/users/login", post(api::login))
        // Groups
        .route("/groups/create", post(api::create_group))
        .route("/groups/join", post(api::join_group))
        .route("/groups/user/{user_id}", get(api::list_user_groups))
        .route(
            "/groups/{group_id}",
            get(api::get_group).delete(api::delete_group),
        )
        .route("/groups/{group_id}/leave", post(api::leave_group))
        .route(
            "/groups/{group_id}/members/{user_id}",
            delete(api::remove_member),
        )
        .route("/groups/{group_id}/invite", post(api::invite_member))
        // Invitations
        .route("/groups/invitations/{id}", get(api::list_invitations))
        .route(
            "/groups/invitations/{id}/accept",
            post(api::accept_invitation),
        )
        .route(
            "/groups/invitations/{id}/decline",
            post(api::decline_invitation),
        )
        // Tallies
        .route("/zikr/save", post(api::save_tally))
        .route("/zikr/history/{group_id}", get(api::group_history))
        .route("/zikr/stats/{group_id}", get(api::group_stats))
        .route("/zikr/record/{record_id}", get(api::get_tally))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Service banner and health check (no auth required)
    let public_routes = Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(public_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Service banner.
async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Zikroullah API online".to_string(),
        status: "active".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
