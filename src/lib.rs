/// Wiki CMS
///
/// A documentation wiki service: accounts, markdown documents with comments,
/// ranked search with highlighted snippets, an admin audit trail, and a cache
/// in front of the slower queries. Runs on SQLite or PostgreSQL.
pub mod account;
pub mod admin;
pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod content;
pub mod context;
pub mod db;
pub mod error;
pub mod metrics;
pub mod rate_limit;
pub mod search;
pub mod server;
pub mod validation;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{WikiError, WikiResult};
