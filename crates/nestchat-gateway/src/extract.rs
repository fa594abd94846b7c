// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request extractors: acting user, market, and lenient query/body parsing.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts},
    http::{request::Parts, StatusCode},
    Json,
};
use axum_extra::extract::{Query, QueryRejection};
use nestchat_core::types::UserId;
use nestchat_core::{NestchatError, Violation};
use nestchat_engine::ConversationService;

use crate::error::ApiError;
use crate::server::GatewayState;

pub const USER_HEADER: &str = "x-user-id";
pub const MARKET_HEADER: &str = "x-market";

/// The user the request acts for.
#[derive(Debug, Clone)]
pub struct Viewer(pub UserId);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Viewer(UserId::from(v)))
            .ok_or_else(|| ApiError::unauthorized("missing_user", "X-User-Id header is required"))
    }
}

/// The market's service selected by `X-Market`.
pub struct Market(pub Arc<ConversationService>);

impl FromRequestParts<GatewayState> for Market {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &GatewayState,
    ) -> Result<Self, Self::Rejection> {
        let requested = parts
            .headers
            .get(MARKET_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        Ok(Market(state.registry.get(requested)?))
    }
}

pub fn query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    result.map(|Query(value)| value).map_err(|rejection| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            Violation::new("invalid_query", rejection.to_string()),
        )
    })
}

pub fn json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    result.map(|Json(value)| value).map_err(|rejection| {
        ApiError::from(NestchatError::validation(
            "invalid_body",
            rejection.body_text(),
            None,
        ))
    })
}
