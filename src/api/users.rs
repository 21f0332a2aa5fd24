//! Identity endpoints: registration and login.

use axum::{extract::State, http::StatusCode, Json};

use super::{ApiResult, ValidatedJson};
use crate::auth;
use crate::errors::AppError;
use crate::models::{LoginRequest, RegisterRequest, UserResponse};
use crate::AppState;

/// POST /api/users/register - Create an account.
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let pin_hash = auth::hash_pin(&request.pin)?;
    let user = state.repo.create_user(&request, &pin_hash).await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "Registration successful".to_string(),
            user,
        }),
    ))
}

/// POST /api/users/login - Check phone and PIN.
///
/// No session token is issued; the client keeps the returned user.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<UserResponse>> {
    let record = state
        .repo
        .find_user_by_phone(&request.phone)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !auth::verify_pin(&request.pin, &record.pin_hash) {
        tracing::warn!(user_id = %record.user.id, "Login rejected: wrong PIN");
        return Err(AppError::Auth("Incorrect PIN".to_string()));
    }

    tracing::info!(user_id = %record.user.id, "User logged in");

    Ok(Json(UserResponse {
        message: "Login successful".to_string(),
        user: record.user,
    }))
}
