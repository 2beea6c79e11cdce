//! Discord gateway integration
//!
//! Two collaborators live here: the `/roulette` slash command that issues
//! access tokens, and `CacheRosterProvider`, which answers roster queries
//! from the gateway cache. Everything else in the crate only sees the
//! `RosterProvider` trait.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serenity::builder::{
    CreateCommand, CreateInteractionResponse, CreateInteractionResponseMessage,
};
use serenity::cache::Cache;
use serenity::client::{Client, Context, EventHandler};
use serenity::model::application::{Command, Interaction};
use serenity::model::channel::ChannelType;
use serenity::model::gateway::{GatewayIntents, Ready};
use serenity::model::id::{ChannelId, GuildId};
use tracing::{error, info};

use crate::config::Config;
use crate::roster::{
    GatewayStatus, GuildInfo, Member, RosterError, RosterProvider, VoiceChannelInfo,
};
use crate::token::{TokenScope, TokenStore};

pub const ROULETTE_COMMAND: &str = "roulette";

/// Connection state shared between the event handler and the provider.
#[derive(Default)]
pub struct ConnectionState {
    connected: AtomicBool,
    bot_tag: std::sync::RwLock<Option<String>>,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn bot_tag(&self) -> Option<String> {
        self.bot_tag.read().ok().and_then(|tag| tag.clone())
    }

    fn mark_ready(&self, tag: String) {
        self.connected.store(true, Ordering::SeqCst);
        if let Ok(mut slot) = self.bot_tag.write() {
            *slot = Some(tag);
        }
    }
}

/// Gateway event handler: registers and serves the `/roulette` command.
pub struct Handler {
    token_store: Arc<TokenStore>,
    conn: Arc<ConnectionState>,
    frontend_url: String,
    backend_url: String,
}

impl Handler {
    pub fn new(
        token_store: Arc<TokenStore>,
        conn: Arc<ConnectionState>,
        frontend_url: String,
        backend_url: String,
    ) -> Self {
        Self {
            token_store,
            conn,
            frontend_url,
            backend_url,
        }
    }

    /// Link-shareable URL the browser page opens.
    fn roulette_url(&self, token: &str) -> String {
        format!(
            "{}?token={}&api_url={}",
            self.frontend_url, token, self.backend_url
        )
    }

    async fn issue_reply(&self, guild_id: Option<GuildId>, user_id: &str) -> String {
        let Some(guild_id) = guild_id else {
            return "This command can only be used inside a server.".to_string();
        };

        let issued = self
            .token_store
            .issue(TokenScope {
                guild_id: guild_id.to_string(),
                issuing_user_id: user_id.to_string(),
            })
            .await;

        let ttl_minutes = self.token_store.ttl().as_secs() / 60;
        format!(
            "Voice roulette link:\n{}\n\nThe link is valid for {} minutes.",
            self.roulette_url(&issued.value),
            ttl_minutes
        )
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(bot = %ready.user.tag(), guilds = ready.guilds.len(), "gateway connected");
        self.conn.mark_ready(ready.user.tag());

        let command =
            CreateCommand::new(ROULETTE_COMMAND).description("Generate a voice roulette link");
        if let Err(e) = Command::create_global_command(&ctx.http, command).await {
            error!("Failed to register slash command: {}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };
        if command.data.name != ROULETTE_COMMAND {
            return;
        }

        let content = self
            .issue_reply(command.guild_id, &command.user.id.to_string())
            .await;

        let message = CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true);
        if let Err(e) = command
            .create_response(&ctx.http, CreateInteractionResponse::Message(message))
            .await
        {
            error!("Failed to reply to /{}: {}", ROULETTE_COMMAND, e);
        }
    }
}

/// Roster provider backed by the live gateway cache.
pub struct CacheRosterProvider {
    cache: Arc<Cache>,
    conn: Arc<ConnectionState>,
}

impl CacheRosterProvider {
    pub fn new(cache: Arc<Cache>, conn: Arc<ConnectionState>) -> Self {
        Self { cache, conn }
    }

    fn parse_guild_id(guild_id: &str) -> Result<GuildId, RosterError> {
        guild_id
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .map(GuildId::new)
            .ok_or_else(|| RosterError::GuildNotFound(guild_id.to_string()))
    }

    fn parse_channel_id(channel_id: &str) -> Result<ChannelId, RosterError> {
        channel_id
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .map(ChannelId::new)
            .ok_or_else(|| RosterError::ChannelNotFound(channel_id.to_string()))
    }

    fn ensure_connected(&self) -> Result<(), RosterError> {
        if self.conn.is_connected() {
            Ok(())
        } else {
            Err(RosterError::Unavailable(
                "gateway connection not established".to_string(),
            ))
        }
    }
}

#[async_trait]
impl RosterProvider for CacheRosterProvider {
    async fn guild_info(&self, guild_id: &str) -> Result<GuildInfo, RosterError> {
        self.ensure_connected()?;
        let id = Self::parse_guild_id(guild_id)?;

        let guild = self
            .cache
            .guild(id)
            .ok_or_else(|| RosterError::GuildNotFound(guild_id.to_string()))?;

        Ok(GuildInfo {
            id: guild.id.to_string(),
            name: guild.name.clone(),
            icon_url: guild.icon_url(),
        })
    }

    async fn voice_channels(&self, guild_id: &str) -> Result<Vec<VoiceChannelInfo>, RosterError> {
        self.ensure_connected()?;
        let id = Self::parse_guild_id(guild_id)?;

        let guild = self
            .cache
            .guild(id)
            .ok_or_else(|| RosterError::GuildNotFound(guild_id.to_string()))?;

        let mut channels: Vec<VoiceChannelInfo> = guild
            .channels
            .values()
            .filter(|channel| channel.kind == ChannelType::Voice)
            .map(|channel| VoiceChannelInfo {
                id: channel.id.to_string(),
                name: channel.name.clone(),
                position: channel.position,
            })
            .collect();

        channels.sort_by_key(|c| c.position);
        Ok(channels)
    }

    async fn voice_members(
        &self,
        guild_id: &str,
        channel_id: &str,
    ) -> Result<Vec<Member>, RosterError> {
        self.ensure_connected()?;
        let gid = Self::parse_guild_id(guild_id)?;
        let cid = Self::parse_channel_id(channel_id)?;

        let guild = self
            .cache
            .guild(gid)
            .ok_or_else(|| RosterError::GuildNotFound(guild_id.to_string()))?;

        let channel = guild
            .channels
            .get(&cid)
            .ok_or_else(|| RosterError::ChannelNotFound(channel_id.to_string()))?;

        if channel.kind != ChannelType::Voice {
            return Err(RosterError::NotVoiceChannel(channel_id.to_string()));
        }

        let members = guild
            .voice_states
            .iter()
            .filter(|(_, voice)| voice.channel_id == Some(cid))
            .filter_map(|(user_id, _)| guild.members.get(user_id))
            .map(|member| Member {
                id: member.user.id.to_string(),
                username: member.user.name.clone(),
                display_name: member.display_name().to_string(),
                avatar_url: Some(member.face()),
            })
            .collect();

        Ok(members)
    }

    async fn status(&self) -> GatewayStatus {
        GatewayStatus {
            connected: self.conn.is_connected(),
            guild_count: self.cache.guilds().len(),
            bot_tag: self.conn.bot_tag(),
        }
    }
}

/// Build the serenity client. The caller spawns `client.start()`.
pub async fn build_client(
    config: &Config,
    token_store: Arc<TokenStore>,
    conn: Arc<ConnectionState>,
) -> anyhow::Result<Client> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_VOICE_STATES;

    let handler = Handler::new(
        token_store,
        conn,
        config.frontend_url.clone(),
        config.backend_url(),
    );

    let client = Client::builder(&config.discord.bot_token, intents)
        .event_handler(handler)
        .await?;

    Ok(client)
}
