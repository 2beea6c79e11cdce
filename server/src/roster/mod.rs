//! Voice roster provider boundary
//!
//! The core never talks to the Discord gateway directly; it consumes
//! snapshots through the `RosterProvider` trait. The live implementation
//! sits in `crate::gateway`, tests substitute an in-memory one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by a roster provider
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("guild not found: {0}")]
    GuildNotFound(String),

    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("channel is not a voice channel: {0}")]
    NotVoiceChannel(String),

    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// One occupant of a voice channel, as captured in a roster snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Opaque id, unique within a snapshot
    pub id: String,
    pub username: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Guild summary for the token's bound guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildInfo {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Voice channel summary; `position` is the guild's display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceChannelInfo {
    pub id: String,
    pub name: String,
    pub position: u16,
}

/// Gateway connection summary, reported by the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayStatus {
    pub connected: bool,
    pub guild_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_tag: Option<String>,
}

/// Supplies live voice-channel occupancy for one guild at a time.
///
/// Implementations return the exact current occupants; a roulette run
/// operates on a single returned snapshot and never re-fetches mid-run.
#[async_trait]
pub trait RosterProvider: Send + Sync {
    async fn guild_info(&self, guild_id: &str) -> Result<GuildInfo, RosterError>;

    async fn voice_channels(&self, guild_id: &str) -> Result<Vec<VoiceChannelInfo>, RosterError>;

    async fn voice_members(
        &self,
        guild_id: &str,
        channel_id: &str,
    ) -> Result<Vec<Member>, RosterError>;

    async fn status(&self) -> GatewayStatus;
}
