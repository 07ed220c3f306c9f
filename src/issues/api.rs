//! Issue endpoints

use crate::auth::middleware::AuthUser;
use crate::error::{ApiResponse, AppResult, JsonBody, QueryParams};
use crate::issues::models::{CreateIssueRequest, Issue, IssueListQuery, UpdateIssueRequest};
use crate::issues::service::IssueService;
use axum::{
    extract::{Path, State},
    Json,
};

/// GET /issues?type=T
pub async fn list_issues(
    State(issues): State<IssueService>,
    user: AuthUser,
    QueryParams(pairs): QueryParams<Vec<(String, String)>>,
) -> AppResult<Json<ApiResponse<Vec<Issue>>>> {
    let query = IssueListQuery::from_pairs(pairs);
    Ok(ApiResponse::success(issues.list(&user.id, query.filter()).await?))
}

/// POST /issues
pub async fn create_issue(
    State(issues): State<IssueService>,
    user: AuthUser,
    JsonBody(payload): JsonBody<CreateIssueRequest>,
) -> AppResult<Json<ApiResponse<Issue>>> {
    Ok(ApiResponse::success(issues.create(&user.id, payload).await?))
}

/// GET /issues/{id}
pub async fn get_issue(
    State(issues): State<IssueService>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Issue>>> {
    Ok(ApiResponse::success(issues.get_by_id(&user.id, &id).await?))
}

/// PUT /issues/{id}
pub async fn update_issue(
    State(issues): State<IssueService>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateIssueRequest>,
) -> AppResult<Json<ApiResponse<Issue>>> {
    Ok(ApiResponse::success(issues.update(&user.id, &id, payload).await?))
}

/// DELETE /issues/{id}
pub async fn delete_issue(
    State(issues): State<IssueService>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Issue>>> {
    Ok(ApiResponse::success(issues.delete(&user.id, &id).await?))
}
