//! Middleware for request logging and rate limiting.

pub mod logging;
pub mod rate_limit;

pub use logging::request_logging;
pub use rate_limit::{client_identifier, RateLimitConfig, RateLimitDecision, RateLimiter};
