//! Voiceroulette Server Library
//!
//! This module exports the server components for use in integration tests
//! and external tooling.

pub mod api;
pub mod config;
pub mod gateway;
pub mod roster;
pub mod roulette;
pub mod token;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use api::{AppState, api_routes};
pub use roster::{Member, RosterProvider};
pub use roulette::{MemoryHistory, SpinChoreographer, WheelState, select};
pub use token::{TokenScope, TokenStore};
