//! Test Utilities Module
//!
//! Shared fixtures and mocks for unit tests. Only compiled for tests;
//! integration tests under `tests/` carry their own copies in
//! `tests/common/mod.rs`.

#![cfg(test)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::roster::{
    GatewayStatus, GuildInfo, Member, RosterError, RosterProvider, VoiceChannelInfo,
};
use crate::token::Clock;

/// Manually advanced clock for expiry tests.
pub struct TestClock {
    now: AtomicU64,
}

impl TestClock {
    pub fn new(start: u64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicU64::new(start),
        })
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Build a member with predictable ids: `member(3)` has id "3".
pub fn member(n: usize) -> Member {
    Member {
        id: n.to_string(),
        username: format!("user{n}"),
        display_name: format!("User {n}"),
        avatar_url: None,
    }
}

pub fn named_member(id: &str, display_name: &str) -> Member {
    Member {
        id: id.to_string(),
        username: display_name.to_lowercase().replace(' ', ""),
        display_name: display_name.to_string(),
        avatar_url: None,
    }
}

pub fn roster_of(size: usize) -> Vec<Member> {
    (0..size).map(member).collect()
}

/// In-memory roster provider: one guild, one voice channel per entry.
pub struct MockRoster {
    guilds: HashMap<String, GuildInfo>,
    channels: HashMap<String, Vec<VoiceChannelInfo>>,
    members: HashMap<(String, String), Vec<Member>>,
}

impl MockRoster {
    pub fn new() -> Self {
        Self {
            guilds: HashMap::new(),
            channels: HashMap::new(),
            members: HashMap::new(),
        }
    }

    pub fn with_guild(mut self, guild_id: &str, name: &str) -> Self {
        self.guilds.insert(
            guild_id.to_string(),
            GuildInfo {
                id: guild_id.to_string(),
                name: name.to_string(),
                icon_url: None,
            },
        );
        self.channels.entry(guild_id.to_string()).or_default();
        self
    }

    pub fn with_voice_channel(
        mut self,
        guild_id: &str,
        channel_id: &str,
        name: &str,
        members: Vec<Member>,
    ) -> Self {
        let list = self.channels.entry(guild_id.to_string()).or_default();
        list.push(VoiceChannelInfo {
            id: channel_id.to_string(),
            name: name.to_string(),
            position: list.len() as u16,
        });
        self.members
            .insert((guild_id.to_string(), channel_id.to_string()), members);
        self
    }
}

#[async_trait]
impl RosterProvider for MockRoster {
    async fn guild_info(&self, guild_id: &str) -> Result<GuildInfo, RosterError> {
        self.guilds
            .get(guild_id)
            .cloned()
            .ok_or_else(|| RosterError::GuildNotFound(guild_id.to_string()))
    }

    async fn voice_channels(&self, guild_id: &str) -> Result<Vec<VoiceChannelInfo>, RosterError> {
        self.channels
            .get(guild_id)
            .cloned()
            .ok_or_else(|| RosterError::GuildNotFound(guild_id.to_string()))
    }

    async fn voice_members(
        &self,
        guild_id: &str,
        channel_id: &str,
    ) -> Result<Vec<Member>, RosterError> {
        if !self.guilds.contains_key(guild_id) {
            return Err(RosterError::GuildNotFound(guild_id.to_string()));
        }
        self.members
            .get(&(guild_id.to_string(), channel_id.to_string()))
            .cloned()
            .ok_or_else(|| RosterError::ChannelNotFound(channel_id.to_string()))
    }

    async fn status(&self) -> GatewayStatus {
        GatewayStatus {
            connected: true,
            guild_count: self.guilds.len(),
            bot_tag: Some("testbot#0000".to_string()),
        }
    }
}
