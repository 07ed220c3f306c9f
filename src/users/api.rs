//! Profile endpoints

use crate::auth::{
    middleware::AuthUser,
    models::{UpdateProfileRequest, UserResponse},
};
use crate::error::{ApiResponse, AppResult, JsonBody};
use crate::users::service::UserService;
use axum::{extract::State, Json};

/// GET /users/profile
pub async fn get_profile(
    State(users): State<UserService>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    Ok(ApiResponse::success(users.get_profile(&user.id).await?))
}

/// PUT /users/profile
pub async fn update_profile(
    State(users): State<UserService>,
    user: AuthUser,
    JsonBody(payload): JsonBody<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    Ok(ApiResponse::success(users.update_profile(&user.id, payload).await?))
}
