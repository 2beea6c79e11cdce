//! Token issuance, validation and expiry
//!
//! This module provides:
//! - `TokenStore` for issuing and validating scope-bound access tokens
//! - `spawn_sweeper` for the periodic expiry sweep
//! - `Clock` for injectable wall-clock time

pub mod store;
pub mod sweeper;

pub use store::{AuthError, Clock, IssuedToken, SystemClock, TokenScope, TokenStore};
pub use sweeper::spawn_sweeper;
