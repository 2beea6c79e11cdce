//! Common Test Utilities for Integration Tests
//!
//! Shared helpers used across integration test modules.

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tower::util::ServiceExt;

use voiceroulette_server::api::{AppState, api_routes};
use voiceroulette_server::config::SpinConfig;
use voiceroulette_server::roster::{
    GatewayStatus, GuildInfo, Member, RosterError, RosterProvider, VoiceChannelInfo,
};
use voiceroulette_server::roulette::MemoryHistory;
use voiceroulette_server::token::{Clock, TokenScope, TokenStore};

/// Manually advanced clock so token expiry needs no real sleeping.
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

pub fn named_member(id: &str, display_name: &str) -> Member {
    Member {
        id: id.to_string(),
        username: display_name.to_lowercase().replace(' ', ""),
        display_name: display_name.to_string(),
        avatar_url: None,
    }
}

/// The four-member roster used by the end-to-end scenario.
pub fn named_roster() -> Vec<Member> {
    vec![
        named_member("101", "Alice"),
        named_member("102", "Bob"),
        named_member("103", "Carol"),
        named_member("104", "Dave"),
    ]
}

/// In-memory roster provider: one guild, one voice channel per entry.
pub struct MockRoster {
    guilds: HashMap<String, GuildInfo>,
    channels: HashMap<String, Vec<VoiceChannelInfo>>,
    members: HashMap<(String, String), Vec<Member>>,
    unavailable: bool,
}

impl MockRoster {
    pub fn new() -> Self {
        Self {
            guilds: HashMap::new(),
            channels: HashMap::new(),
            members: HashMap::new(),
            unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        let mut mock = Self::new();
        mock.unavailable = true;
        mock
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

    fn ensure_available(&self) -> Result<(), RosterError> {
        if self.unavailable {
            Err(RosterError::Unavailable("gateway offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RosterProvider for MockRoster {
    async fn guild_info(&self, guild_id: &str) -> Result<GuildInfo, RosterError> {
        self.ensure_available()?;
        self.guilds
            .get(guild_id)
            .cloned()
            .ok_or_else(|| RosterError::GuildNotFound(guild_id.to_string()))
    }

    async fn voice_channels(&self, guild_id: &str) -> Result<Vec<VoiceChannelInfo>, RosterError> {
        self.ensure_available()?;
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
        self.ensure_available()?;
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
            connected: !self.unavailable,
            guild_count: self.guilds.len(),
            bot_tag: Some("testbot#0000".to_string()),
        }
    }
}

/// A router wired to mocks, plus handles to the pieces tests manipulate.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<TestClock>,
}

pub fn test_app(roster: MockRoster) -> TestApp {
    test_app_with_ttl(roster, Duration::from_secs(3600))
}

pub fn test_app_with_ttl(roster: MockRoster, ttl: Duration) -> TestApp {
    let clock = TestClock::new(1_000_000);
    let token_store = Arc::new(TokenStore::with_clock(ttl, clock.clone()));

    let state = AppState {
        token_store,
        roster: Arc::new(roster),
        history: Arc::new(MemoryHistory::new(50)),
        clock: clock.clone(),
        spin: SpinConfig::default(),
        started_at: Instant::now(),
    };

    TestApp {
        router: api_routes(state.clone()),
        state,
        clock,
    }
}

impl TestApp {
    /// Issue a token the way the slash command does.
    pub async fn issue_token(&self, guild_id: &str, user_id: &str) -> String {
        self.state
            .token_store
            .issue(TokenScope {
                guild_id: guild_id.to_string(),
                issuing_user_id: user_id.to_string(),
            })
            .await
            .value
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.request("GET", uri, None).await
    }

    pub async fn get_with_header(
        &self,
        uri: &str,
        header: &str,
        value: &str,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header(header, value)
            .body(Body::empty())
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

        (status, json)
    }

    pub async fn post(
        &self,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        self.request("POST", uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.request("DELETE", uri, None).await
    }
}
