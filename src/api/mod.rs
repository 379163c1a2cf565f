mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;
use crate::dispatch::ProximityDispatcher;
use crate::recovery::RecoveryService;

pub use middleware::SecurityConfig;

/// Shared handler state: the directory database plus the two components
/// built on top of it.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub dispatcher: Arc<ProximityDispatcher>,
    pub recovery: Arc<RecoveryService>,
}

pub fn create_router(state: AppState, security: SecurityConfig) -> Router {
    let api = Router::new()
        // Recovery / login callable surface
        .route("/auth/verify-user", post(handlers::verify_user_for_reset))
        .route("/auth/send-otp", post(handlers::send_otp))
        .route("/auth/verify-otp", post(handlers::verify_otp_and_update_password))
        .route("/auth/login", post(handlers::verify_resident_login))
        // Document-change event feed
        .route(
            "/events/collector-location",
            post(handlers::collector_location_written),
        )
        // Directory seeding (the app's registration flow)
        .route("/users/{user_type}", post(handlers::create_user))
        // In-app notification history
        .route(
            "/residents/{id}/notifications",
            get(handlers::list_notifications),
        )
        .route("/notifications/{id}/read", post(handlers::mark_notification_read))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(axum::middleware::from_fn_with_state(
            security,
            middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
