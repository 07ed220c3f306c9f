//! Authentication Middleware
//! Mission: Protect API endpoints with rate limiting and JWT validation

use crate::auth::jwt::JwtHandler;
use crate::error::{AppError, AppResult};
use crate::middleware::rate_limit::{
    apply_quota_headers, apply_retry_after, client_identifier, RateLimiter,
};
use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

pub const RATE_LIMITED: &str = "Rate limit exceeded";
pub const NOT_AUTHENTICATED: &str = "User not authenticated";
pub const INVALID_TOKEN: &str = "Invalid token";

/// Identity of the caller, attached to the request by [`require_auth`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or_else(|| AppError::unauthorized(NOT_AUTHENTICATED))
    }
}

/// Rate limit check followed by bearer token validation
#[derive(Clone)]
pub struct AuthGuard {
    limiter: RateLimiter,
    jwt: Arc<JwtHandler>,
}

impl AuthGuard {
    pub fn new(limiter: RateLimiter, jwt: Arc<JwtHandler>) -> Self {
        Self { limiter, jwt }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Resolve the caller from the `Authorization: Bearer <token>` header.
    pub fn authenticate(&self, headers: &HeaderMap) -> AppResult<AuthUser> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::unauthorized(NOT_AUTHENTICATED))?;

        let id = self
            .jwt
            .verify(token.trim())
            .map_err(|_| AppError::unauthorized(INVALID_TOKEN))?;

        Ok(AuthUser { id })
    }
}

/// Guard middleware: 429 before 401, so unauthenticated floods are still counted.
pub async fn require_auth(State(guard): State<AuthGuard>, mut req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_identifier(req.headers(), peer);

    let decision = guard.limiter.check(&client);
    if !decision.allowed {
        warn!(client = %client, path = %req.uri().path(), "⚠️ Rate limit exceeded");
        let mut response = AppError::TooManyRequests(RATE_LIMITED.to_string()).into_response();
        apply_retry_after(response.headers_mut(), &decision);
        apply_quota_headers(response.headers_mut(), guard.limiter.limit(), &decision);
        return response;
    }

    let user = match guard.authenticate(req.headers()) {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };
    req.extensions_mut().insert(user);

    let mut response = next.run(req).await;
    apply_quota_headers(response.headers_mut(), guard.limiter.limit(), &decision);
    response
}
