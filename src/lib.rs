//! Groupdesk - multi-tenant manager for Facebook advertising groups
//!
//! Tenants keep their own companies, group records and posts, and share a
//! global catalog of groups they can adopt from or contribute to.

pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod quality;
pub mod routes;
pub mod service;
pub mod state;

// Re-export commonly used types
pub use config::Config;
pub use state::AppState;
