//! User profile module

pub mod api;
pub mod service;

pub use service::UserService;
