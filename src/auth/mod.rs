//! Authentication Module
//! Mission: Secure API access with hashed credentials, JWT tokens and rate limiting

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod service;
pub mod user_store;

pub use jwt::JwtHandler;
pub use middleware::{require_auth, AuthGuard, AuthUser};
pub use service::AuthService;
pub use user_store::UserStore;
