//! Authentication API Endpoints
//! Mission: Provide registration, login and current-user endpoints

use crate::auth::{
    middleware::AuthUser,
    models::{AuthResponse, LoginRequest, RegisterRequest, UserResponse},
    service::AuthService,
};
use crate::error::{ApiResponse, AppResult, JsonBody};
use axum::{extract::State, Json};
use tracing::info;

/// POST /auth/register
pub async fn register(
    State(auth): State<AuthService>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    info!("📝 Registration attempt");
    let response = auth.register(payload).await?;
    Ok(ApiResponse::success(response))
}

/// POST /auth/login
pub async fn login(
    State(auth): State<AuthService>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    info!("🔐 Login attempt");
    let response = auth.login(payload).await?;
    Ok(ApiResponse::success(response))
}

/// GET /auth/me
pub async fn get_current_user(
    State(auth): State<AuthService>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let profile = auth.get_profile(&user.id).await?;
    Ok(ApiResponse::success(profile))
}
