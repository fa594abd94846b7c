// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Nestchat conversation engine.

use serde::Serialize;
use thiserror::Error;

/// A single violated field or rule, rendered as one entry of the JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Machine-readable code (e.g. `content_too_long`).
    pub code: String,
    /// Human-readable description.
    pub title: String,
    /// The offending input field, when the violation is tied to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Violation {
    pub fn new(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            source: None,
        }
    }

    pub fn at(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Policy violations that refuse a write with 403 semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ForbiddenReason {
    #[error("sender lacks premium membership")]
    NotPremium,
    #[error("recipient is not available for chat")]
    RecipientUnavailable,
    #[error("test accounts may only message other test accounts")]
    TestAccountMismatch,
    #[error("auto-rejection is only allowed when all previous messages were instant jobs")]
    AutoRejectionNotAllowed,
}

impl ForbiddenReason {
    /// Stable code used in the error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotPremium => "not_premium",
            Self::RecipientUnavailable => "recipient_unavailable",
            Self::TestAccountMismatch => "test_account_mismatch",
            Self::AutoRejectionNotAllowed => "auto_rejection_not_allowed",
        }
    }
}

/// The primary error type used across all Nestchat crates.
#[derive(Debug, Error)]
pub enum NestchatError {
    /// Malformed or missing input, one entry per violated field.
    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<Violation>),

    /// Unknown conversation, user, or message.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Policy refused the operation.
    #[error("forbidden: {0}")]
    Forbidden(ForbiddenReason),

    /// Sender exhausted their conversation-start allowance.
    #[error("rate limit exceeded: {message}")]
    RateLimited { message: String },

    /// Contention on a per-pair write. Retried internally.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Translation or notification dependency failure.
    #[error("upstream {service} failed: {source}")]
    Upstream {
        service: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors detected at runtime.
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl NestchatError {
    /// Shorthand for a single-violation validation error.
    pub fn validation(code: &str, title: impl Into<String>, source: Option<&str>) -> Self {
        let mut violation = Violation::new(code, title);
        violation.source = source.map(str::to_string);
        Self::Validation(vec![violation])
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Violations to render in an error body.
    pub fn violations(&self) -> Vec<Violation> {
        match self {
            Self::Validation(violations) => violations.clone(),
            Self::NotFound { entity, id } => {
                vec![Violation::new("not_found", format!("{entity} `{id}` does not exist"))]
            }
            Self::Forbidden(reason) => vec![Violation::new(reason.code(), reason.to_string())],
            Self::RateLimited { message } => vec![Violation::new("rate_limit_exceeded", message)],
            Self::Conflict { message } => vec![Violation::new("conflict", message)],
            Self::Upstream { service, .. } => vec![Violation::new(
                "upstream_failure",
                format!("{service} is unavailable"),
            )],
            Self::Timeout { .. } => vec![Violation::new("timeout", self.to_string())],
            Self::Storage { .. } | Self::Config(_) | Self::Internal(_) => {
                vec![Violation::new("internal_error", "internal server error")]
            }
        }
    }
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.title.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
