//! Security issue tracking

pub mod api;
pub mod models;
pub mod service;
pub mod store;

pub use service::IssueService;
pub use store::IssueStore;
