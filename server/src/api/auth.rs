//! Token extraction and validation for API requests
//!
//! The credential travels as a `?token=` query parameter (the link the
//! slash command hands out) or an `x-access-token` header. Extraction
//! resolves the token to its scope before any handler runs; a request
//! without a live token never reaches guild data.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;

use crate::token::{AuthError, TokenScope};

use super::routes::{ApiErrorResponse, AppState};

/// Header carrying the access token when it is not in the query string.
pub const TOKEN_HEADER: &str = "x-access-token";

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Resolved scope of the request's access token.
pub struct ValidToken(pub TokenScope);

#[async_trait]
impl FromRequestParts<AppState> for ValidToken {
    type Rejection = ApiErrorResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let query_token = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|q| q.0.token);
        let header_token = parts
            .headers
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let value = query_token
            .or(header_token)
            .ok_or_else(|| ApiErrorResponse::from(AuthError::Missing))?;

        let scope = state
            .token_store
            .validate(&value)
            .await
            .map_err(ApiErrorResponse::from)?;

        Ok(ValidToken(scope))
    }
}
