//! Token-gated HTTP API
//!
//! This module provides:
//! - `AppState` shared by all handlers
//! - `api_routes` building the router
//! - `ValidToken`, the extractor every guild-scoped route goes through

pub mod auth;
pub mod routes;

pub use auth::{TOKEN_HEADER, ValidToken};
pub use routes::{ApiErrorResponse, AppState, api_routes};
