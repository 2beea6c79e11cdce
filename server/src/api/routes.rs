//! HTTP route handlers for the token-gated roulette API
//!
//! Every `/api` route resolves its access token through [`ValidToken`] and
//! reads only the guild bound to that token; no request parameter can point
//! a token at another guild's data.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::SpinConfig;
use crate::roster::{GuildInfo, Member, RosterError, RosterProvider, VoiceChannelInfo};
use crate::roulette::engine::{SelectionError, select};
use crate::roulette::history::{ResultSink, RouletteRecord};
use crate::roulette::wheel::{SpinPlan, WheelError, WheelState, plan_run};
use crate::token::{AuthError, Clock, TokenStore};

use super::auth::ValidToken;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub token_store: Arc<TokenStore>,
    pub roster: Arc<dyn RosterProvider>,
    pub history: Arc<dyn ResultSink>,
    pub clock: Arc<dyn Clock>,
    pub spin: SpinConfig,
    pub started_at: Instant,
}

/// Error response for the API
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiErrorResponse {
    fn internal(message: &str) -> Self {
        Self {
            error: message.to_string(),
            code: "internal".to_string(),
        }
    }
}

impl From<AuthError> for ApiErrorResponse {
    fn from(e: AuthError) -> Self {
        Self {
            error: e.to_string(),
            code: e.code().to_string(),
        }
    }
}

impl From<RosterError> for ApiErrorResponse {
    fn from(e: RosterError) -> Self {
        let code = match &e {
            RosterError::GuildNotFound(_) | RosterError::ChannelNotFound(_) => "not_found",
            RosterError::NotVoiceChannel(_) => "not_voice_channel",
            RosterError::Unavailable(_) => "upstream_unavailable",
        };
        Self {
            error: e.to_string(),
            code: code.to_string(),
        }
    }
}

impl From<SelectionError> for ApiErrorResponse {
    fn from(e: SelectionError) -> Self {
        let code = match &e {
            SelectionError::InvalidCount { .. } => "invalid_count",
            SelectionError::EmptyRoster => "empty_roster",
        };
        Self {
            error: e.to_string(),
            code: code.to_string(),
        }
    }
}

impl From<WheelError> for ApiErrorResponse {
    fn from(e: WheelError) -> Self {
        Self::internal(&e.to_string())
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.code.as_str() {
            "missing" | "invalid" | "expired" => StatusCode::UNAUTHORIZED,
            "not_found" => StatusCode::NOT_FOUND,
            "invalid_count" | "empty_roster" | "not_voice_channel" => StatusCode::BAD_REQUEST,
            "upstream_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub gateway: &'static str,
    pub guilds: usize,
    pub uptime_seconds: u64,
}

/// GET /health - Service and gateway health
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let gateway = state.roster.status().await;

    let (status, gateway_status, http_status) = if gateway.connected {
        ("healthy", "connected", StatusCode::OK)
    } else {
        ("degraded", "disconnected", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        http_status,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            gateway: gateway_status,
            guilds: gateway.guild_count,
            uptime_seconds: state.started_at.elapsed().as_secs(),
        }),
    )
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateTokenResponse {
    pub valid: bool,
    pub guild_id: String,
}

/// GET /api/validate-token - Confirm a token and reveal its bound guild
pub async fn validate_token(ValidToken(scope): ValidToken) -> Json<ValidateTokenResponse> {
    Json(ValidateTokenResponse {
        valid: true,
        guild_id: scope.guild_id,
    })
}

/// GET /api/guild - Info for the token's bound guild
pub async fn get_guild(
    State(state): State<AppState>,
    ValidToken(scope): ValidToken,
) -> Result<Json<GuildInfo>, ApiErrorResponse> {
    let info = state
        .roster
        .guild_info(&scope.guild_id)
        .await
        .map_err(|e| {
            tracing::warn!("Failed to fetch guild {}: {}", scope.guild_id, e);
            ApiErrorResponse::from(e)
        })?;

    Ok(Json(info))
}

/// GET /api/guild/channels - Voice channels of the bound guild
pub async fn list_voice_channels(
    State(state): State<AppState>,
    ValidToken(scope): ValidToken,
) -> Result<Json<Vec<VoiceChannelInfo>>, ApiErrorResponse> {
    let mut channels = state
        .roster
        .voice_channels(&scope.guild_id)
        .await
        .map_err(|e| {
            tracing::warn!("Failed to fetch channels for {}: {}", scope.guild_id, e);
            ApiErrorResponse::from(e)
        })?;

    channels.sort_by_key(|c| c.position);
    Ok(Json(channels))
}

/// GET /api/guild/channels/:channel_id/members - Current voice occupants
pub async fn list_voice_members(
    State(state): State<AppState>,
    ValidToken(scope): ValidToken,
    Path(channel_id): Path<String>,
) -> Result<Json<Vec<Member>>, ApiErrorResponse> {
    let members = state
        .roster
        .voice_members(&scope.guild_id, &channel_id)
        .await
        .map_err(|e| {
            tracing::warn!("Failed to fetch members of {}: {}", channel_id, e);
            ApiErrorResponse::from(e)
        })?;

    Ok(Json(members))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouletteRequest {
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouletteResponse {
    pub winners: Vec<Member>,
    pub spins: Vec<SpinPlan>,
    pub roster_size: usize,
    pub requested_count: usize,
    pub copy_text: String,
}

/// POST /api/guild/channels/:channel_id/roulette - Run a roulette
///
/// Takes one roster snapshot, draws the winners, plans one spin per winner
/// in draw order and records the outcome.
pub async fn run_roulette(
    State(state): State<AppState>,
    ValidToken(scope): ValidToken,
    Path(channel_id): Path<String>,
    Json(request): Json<RouletteRequest>,
) -> Result<Json<RouletteResponse>, ApiErrorResponse> {
    let roster = state
        .roster
        .voice_members(&scope.guild_id, &channel_id)
        .await
        .map_err(ApiErrorResponse::from)?;

    // ThreadRng is not Send; keep it out of scope across awaits.
    let (winners, spins) = {
        let mut rng = rand::rng();

        let winners = select(&roster, request.count, &mut rng).map_err(|e| {
            tracing::debug!("Rejected roulette request: {}", e);
            ApiErrorResponse::from(e)
        })?;

        let targets: Vec<usize> = winners
            .iter()
            .map(|winner| roster.iter().position(|m| m.id == winner.id))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ApiErrorResponse::internal("winner missing from roster snapshot"))?;

        let mut wheel = WheelState::new(roster.len()).map_err(ApiErrorResponse::from)?;
        let spins = plan_run(&mut wheel, &targets, &state.spin, &mut rng)
            .map_err(ApiErrorResponse::from)?;

        (winners, spins)
    };

    let record = RouletteRecord {
        id: Uuid::new_v4(),
        guild_id: scope.guild_id.clone(),
        channel_id: channel_id.clone(),
        roster_size: roster.len(),
        requested_count: request.count,
        winners: winners.clone(),
        recorded_at: state.clock.now_millis(),
    };
    let copy_text = record.copy_text();
    state.history.record(record).await;

    counter!("voiceroulette_runs_total").increment(1);
    tracing::info!(
        guild_id = %scope.guild_id,
        channel_id = %channel_id,
        roster_size = roster.len(),
        winners = winners.len(),
        "roulette run complete"
    );

    Ok(Json(RouletteResponse {
        winners,
        spins,
        roster_size: roster.len(),
        requested_count: request.count,
        copy_text,
    }))
}

/// GET /api/history - This guild's roulette records, newest first
pub async fn get_history(
    State(state): State<AppState>,
    ValidToken(scope): ValidToken,
) -> Json<Vec<RouletteRecord>> {
    Json(state.history.list(&scope.guild_id).await)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearHistoryResponse {
    pub cleared: usize,
}

/// DELETE /api/history - Drop this guild's roulette records
pub async fn clear_history(
    State(state): State<AppState>,
    ValidToken(scope): ValidToken,
) -> Json<ClearHistoryResponse> {
    let cleared = state.history.clear(&scope.guild_id).await;
    Json(ClearHistoryResponse { cleared })
}

/// Build the API router
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/validate-token", get(validate_token))
        .route("/api/guild", get(get_guild))
        .route("/api/guild/channels", get(list_voice_channels))
        .route(
            "/api/guild/channels/:channel_id/members",
            get(list_voice_members),
        )
        .route(
            "/api/guild/channels/:channel_id/roulette",
            post(run_roulette),
        )
        .route("/api/history", get(get_history).delete(clear_history))
        .with_state(state)
}
