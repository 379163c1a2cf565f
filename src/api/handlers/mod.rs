use axum::{
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::AppState;
use crate::dispatch::DispatchSummary;
use crate::models::*;
use crate::recovery::RecoveryError;

// ============================================================
// Error Handling
// ============================================================

/// Map a recovery failure to an HTTP response with a machine-readable
/// error code. Internal errors are logged server-side and sanitized;
/// clients only see a generic message.
impl IntoResponse for RecoveryError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            RecoveryError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
            RecoveryError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            RecoveryError::MissingContact => (StatusCode::UNPROCESSABLE_ENTITY, "missing_contact"),
            RecoveryError::InvalidCode => (StatusCode::BAD_REQUEST, "invalid_code"),
            RecoveryError::Expired => (StatusCode::GONE, "expired"),
            RecoveryError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            RecoveryError::Delivery(_) => (StatusCode::BAD_GATEWAY, "delivery_failure"),
            RecoveryError::Internal(err) => {
                tracing::error!("Internal error: {err:#}");
                let body = serde_json::json!({
                    "error": "internal",
                    "message": "Internal server error",
                });
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
        };

        let body = serde_json::json!({
            "error": code,
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Json body extractor whose rejection matches the API's error shape:
/// a malformed or incomplete body surfaces as `invalid_argument`
/// instead of axum's plain-text rejection, before any directory access.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                let body = serde_json::json!({
                    "error": "invalid_argument",
                    "message": rejection.body_text(),
                });
                Err((StatusCode::BAD_REQUEST, Json(body)).into_response())
            }
        }
    }
}

/// Log an internal error and return a sanitized response to the client.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Recovery / login
// ============================================================

#[derive(Debug, Deserialize)]
pub struct ResetLookupRequest {
    pub username: String,
    pub user_type: UserType,
}

pub async fn verify_user_for_reset(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetLookupRequest>,
) -> Result<Json<serde_json::Value>, RecoveryError> {
    state
        .recovery
        .verify_user_for_reset(&req.username, req.user_type)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn send_otp(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetLookupRequest>,
) -> Result<Json<serde_json::Value>, RecoveryError> {
    state.recovery.send_otp(&req.username, req.user_type).await?;
    Ok(Json(serde_json::json!({ "success": true, "sent": true })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub username: String,
    pub user_type: UserType,
    pub otp: String,
    pub new_password: String,
}

pub async fn verify_otp_and_update_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyOtpRequest>,
) -> Result<Json<serde_json::Value>, RecoveryError> {
    state.recovery.verify_otp_and_update_password(
        &req.username,
        req.user_type,
        &req.otp,
        &req.new_password,
    )?;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn verify_resident_login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<ResidentProfile>, RecoveryError> {
    let profile = state
        .recovery
        .verify_resident_login(&req.username, &req.password)?;
    Ok(Json(profile))
}

// ============================================================
// Collector location events
// ============================================================

pub async fn collector_location_written(
    State(state): State<AppState>,
    ApiJson(event): ApiJson<CollectorLocationEvent>,
) -> Result<Json<DispatchSummary>, (StatusCode, String)> {
    state
        .dispatcher
        .handle_location_write(event)
        .await
        .map(Json)
        .map_err(internal_error)
}

// ============================================================
// Directory seeding
// ============================================================

pub async fn create_user(
    State(state): State<AppState>,
    Path(user_type): Path<UserType>,
    ApiJson(input): ApiJson<CreateUserInput>,
) -> Result<(StatusCode, Json<User>), RecoveryError> {
    if input.username.is_empty() {
        return Err(RecoveryError::InvalidArgument("username is required"));
    }
    if input.password.is_empty() {
        return Err(RecoveryError::InvalidArgument("password is required"));
    }

    let user = state
        .db
        .create_user(user_type, input)
        .map_err(RecoveryError::Internal)?;
    Ok((StatusCode::CREATED, Json(user)))
}

// ============================================================
// Notification history
// ============================================================

pub async fn list_notifications(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<NotificationRecord>>, (StatusCode, String)> {
    state
        .db
        .notifications_for_resident(id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.db.mark_notification_read(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Notification not found".to_string()))
    }
}
