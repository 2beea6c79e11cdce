//! Roulette result history
//!
//! A finished run is emitted as a single immutable record; the sink owns
//! size-capping and clearing. The in-memory implementation mirrors the rest
//! of the process-lifetime state: newest first, capped, gone on restart.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::roster::Member;

/// Immutable record of one finished roulette run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouletteRecord {
    pub id: Uuid,
    pub guild_id: String,
    pub channel_id: String,
    pub roster_size: usize,
    pub requested_count: usize,
    pub winners: Vec<Member>,
    pub recorded_at: u64,
}

impl RouletteRecord {
    /// Winners as numbered lines, ready for the clipboard.
    pub fn copy_text(&self) -> String {
        self.winners
            .iter()
            .enumerate()
            .map(|(i, member)| format!("{}. {}", i + 1, member.display_name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Receives finished roulette runs.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn record(&self, record: RouletteRecord);

    /// Records for one guild, newest first.
    async fn list(&self, guild_id: &str) -> Vec<RouletteRecord>;

    /// Drop one guild's records; returns how many were removed.
    async fn clear(&self, guild_id: &str) -> usize;
}

/// In-memory history, newest first, capped at `max_records`.
pub struct MemoryHistory {
    records: RwLock<VecDeque<RouletteRecord>>,
    max_records: usize,
}

impl MemoryHistory {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            max_records,
        }
    }
}

#[async_trait]
impl ResultSink for MemoryHistory {
    async fn record(&self, record: RouletteRecord) {
        let mut records = self.records.write().await;
        records.push_front(record);
        records.truncate(self.max_records);
    }

    async fn list(&self, guild_id: &str) -> Vec<RouletteRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|r| r.guild_id == guild_id)
            .cloned()
            .collect()
    }

    async fn clear(&self, guild_id: &str) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.guild_id != guild_id);
        before - records.len()
    }
}
