//! Server configuration
//!
//! Configuration is loaded from environment variables.

use std::env;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Public base URL for link generation (optional)
    pub public_base_url: Option<String>,
    /// Browser page the roulette URL points at
    pub frontend_url: String,

    /// Discord configuration
    pub discord: DiscordConfig,

    /// Token configuration
    pub token: TokenConfig,

    /// History configuration
    pub history: HistoryConfig,

    /// Spin animation configuration
    pub spin: SpinConfig,
}

/// Discord gateway configuration
#[derive(Debug, Clone, Default)]
pub struct DiscordConfig {
    /// Bot token for the gateway connection
    pub bot_token: String,
}

/// Token-related configuration
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Token lifetime from issuance
    pub ttl: Duration,
    /// Expiry sweep cadence
    pub sweep_interval: Duration,
}

/// History-related configuration
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum retained roulette records
    pub max_records: usize,
}

/// Spin animation configuration
#[derive(Debug, Clone)]
pub struct SpinConfig {
    /// Fixed animation duration per spin
    pub duration: Duration,
    /// Extra full turns before landing, lower bound (inclusive)
    pub min_extra_turns: f64,
    /// Extra full turns before landing, upper bound (exclusive)
    pub max_extra_turns: f64,
    /// Frame pacing for the interval frame clock
    pub frame_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            public_base_url: None,
            frontend_url: "http://127.0.0.1:5500".to_string(),
            discord: DiscordConfig::default(),
            token: TokenConfig::default(),
            history: HistoryConfig::default(),
            spin: SpinConfig::default(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60), // 1 hour
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_records: 50 }
    }
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(4),
            min_extra_turns: 3.0,
            max_extra_turns: 5.0,
            frame_interval: Duration::from_millis(16),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Server config
        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }
        if let Ok(port) = env::var("PORT")
            && let Ok(p) = port.parse()
        {
            config.port = p;
        }
        if let Ok(url) = env::var("PUBLIC_BASE_URL")
            && !url.is_empty()
        {
            config.public_base_url = Some(url);
        }
        if let Ok(url) = env::var("FRONTEND_URL")
            && !url.is_empty()
        {
            config.frontend_url = url;
        }

        // Discord config
        if let Ok(token) = env::var("DISCORD_BOT_TOKEN") {
            config.discord.bot_token = token;
        }

        // Token config
        if let Ok(val) = env::var("TOKEN_TTL_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.token.ttl = Duration::from_secs(secs);
        }
        if let Ok(val) = env::var("TOKEN_SWEEP_INTERVAL_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.token.sweep_interval = Duration::from_secs(secs);
        }

        // History config
        if let Ok(val) = env::var("HISTORY_MAX_RECORDS")
            && let Ok(v) = val.parse()
        {
            config.history.max_records = v;
        }

        // Spin config
        if let Ok(val) = env::var("SPIN_DURATION_MS")
            && let Ok(ms) = val.parse::<u64>()
        {
            config.spin.duration = Duration::from_millis(ms);
        }

        config
    }

    /// Base URL the browser page should call back into.
    pub fn backend_url(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }
}
