// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token authentication for the API routes.
//!
//! The gateway sits behind the platform's own session layer, so the token
//! identifies the calling service, not the end user. `X-User-Id` carries the
//! viewer. With no token configured every request is rejected.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::error::ApiError;

#[derive(Clone)]
pub struct AuthConfig {
    /// Expected bearer token. `None` rejects everything.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = auth.bearer_token.as_deref() else {
        tracing::error!("gateway has no bearer token configured, rejecting request");
        return Err(ApiError::unauthorized(
            "auth_not_configured",
            "gateway authentication is not configured",
        ));
    };

    match request.headers().typed_get::<Authorization<Bearer>>() {
        Some(Authorization(bearer)) if bearer.token() == expected => Ok(next.run(request).await),
        Some(_) => Err(ApiError::unauthorized("invalid_token", "bearer token rejected")),
        None => Err(ApiError::unauthorized(
            "missing_token",
            "Authorization: Bearer header required",
        )),
    }
}
