//! ApniSec Backend Library
//!
//! Security issue tracker API: account registration and login, JWT-guarded
//! issue CRUD scoped to the owning user, and per-client rate limiting.
//! The binary in `main.rs` only wires configuration to [`app::create_router`].

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod issues;
pub mod middleware;
pub mod notify;
pub mod users;
pub mod validation;

pub use app::{create_router, AppState};
pub use config::AppConfig;
pub use error::{ApiResponse, AppError, AppResult};
