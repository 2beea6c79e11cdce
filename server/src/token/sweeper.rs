//! Periodic expiry sweep
//!
//! Background task that drops expired tokens on a fixed cadence. The cadence
//! comes from configuration (60 seconds by default); the sweep logic itself
//! lives on [`TokenStore`] so tests drive it with an injected clock instead
//! of real sleeps.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::store::TokenStore;

/// Spawn the expiry sweeper. Abort the returned handle to cancel it.
pub fn spawn_sweeper(store: Arc<TokenStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let removed = store.sweep_expired().await;
            if removed > 0 {
                debug!(removed, "token sweep");
            }
        }
    })
}
