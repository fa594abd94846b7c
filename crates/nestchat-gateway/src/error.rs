// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error responses.
//!
//! Every failure renders as `{"errors": [{code, title, source?}]}` with the
//! status derived from the error variant.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nestchat_core::{NestchatError, Violation};
use serde::Serialize;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub errors: Vec<Violation>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    errors: &'a [Violation],
}

impl ApiError {
    pub fn new(status: StatusCode, violation: Violation) -> Self {
        Self {
            status,
            errors: vec![violation],
        }
    }

    pub fn unauthorized(code: &str, title: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, Violation::new(code, title))
    }
}

pub fn status_for(err: &NestchatError) -> StatusCode {
    match err {
        NestchatError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        NestchatError::NotFound { .. } => StatusCode::NOT_FOUND,
        NestchatError::Forbidden(_) => StatusCode::FORBIDDEN,
        NestchatError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        NestchatError::Conflict { .. } => StatusCode::CONFLICT,
        NestchatError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        NestchatError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        NestchatError::Storage { .. } | NestchatError::Config(_) | NestchatError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<NestchatError> for ApiError {
    fn from(err: NestchatError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!(error = %err, status = status.as_u16(), "request failed");
        } else {
            tracing::debug!(error = %err, status = status.as_u16(), "request rejected");
        }
        Self {
            status,
            errors: err.violations(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                errors: &self.errors,
            }),
        )
            .into_response()
    }
}
