//! HTTP application: shared services and the router

use crate::auth::{api as auth_api, require_auth, AuthGuard, AuthService, JwtHandler, UserStore};
use crate::config::AppConfig;
use crate::db::Database;
use crate::issues::{api as issues_api, IssueService, IssueStore};
use crate::middleware::{request_logging, RateLimitConfig, RateLimiter};
use crate::notify::Notifier;
use crate::users::{api as users_api, UserService};
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Services shared by every request
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub users: UserService,
    pub issues: IssueService,
    pub guard: AuthGuard,
}

impl AppState {
    pub fn new(config: &AppConfig, db: Database, notifier: Notifier) -> Self {
        let jwt = Arc::new(JwtHandler::with_ttls(
            config.jwt_secret.clone(),
            config.refresh_secret.clone(),
            config.access_token_ttl(),
            config.refresh_token_ttl(),
        ));
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: config.rate_limit_max,
            window: config.rate_limit_window(),
            max_clients: config.rate_limit_max_clients,
        });
        let user_store = UserStore::new(db.clone());

        Self {
            auth: AuthService::new(user_store.clone(), jwt.clone(), notifier.clone())
                .with_hash_cost(config.bcrypt_cost),
            users: UserService::new(user_store.clone()),
            issues: IssueService::new(IssueStore::new(db), user_store, notifier),
            guard: AuthGuard::new(limiter, jwt),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    // Public auth routes
    let auth_router = Router::new()
        .route("/auth/register", post(auth_api::register))
        .route("/auth/login", post(auth_api::login))
        .with_state(state.auth.clone());

    let me_route = Router::new()
        .route("/auth/me", get(auth_api::get_current_user))
        .route_layer(middleware::from_fn_with_state(
            state.guard.clone(),
            require_auth,
        ))
        .with_state(state.auth.clone());

    let issue_routes = Router::new()
        .route(
            "/issues",
            get(issues_api::list_issues).post(issues_api::create_issue),
        )
        .route(
            "/issues/:id",
            get(issues_api::get_issue)
                .put(issues_api::update_issue)
                .delete(issues_api::delete_issue),
        )
        .route_layer(middleware::from_fn_with_state(
            state.guard.clone(),
            require_auth,
        ))
        .with_state(state.issues.clone());

    let user_routes = Router::new()
        .route(
            "/users/profile",
            get(users_api::get_profile).put(users_api::update_profile),
        )
        .route_layer(middleware::from_fn_with_state(
            state.guard.clone(),
            require_auth,
        ))
        .with_state(state.users.clone());

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_router)
        .merge(me_route)
        .merge(issue_routes)
        .merge(user_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
