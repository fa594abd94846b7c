// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation.
//!
//! Collects every violation instead of failing fast.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::NestchatConfig;

pub fn validate_config(config: &NestchatConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.gateway.host.trim().is_empty() {
        errors.push(ConfigError::validation("gateway.host must not be empty"));
    }
    if config.gateway.request_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "gateway.request_timeout_secs must be at least 1",
        ));
    }

    if config.markets.is_empty() {
        errors.push(ConfigError::validation(
            "at least one [[markets]] entry is required",
        ));
    }
    let mut seen = HashSet::new();
    for (i, market) in config.markets.iter().enumerate() {
        if market.id.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "markets[{i}].id must not be empty"
            )));
        } else if !seen.insert(market.id.as_str()) {
            errors.push(ConfigError::validation(format!(
                "duplicate market id `{}`",
                market.id
            )));
        }
        if market.database_path.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "markets[{i}].database_path must not be empty"
            )));
        }
    }
    if !config.markets.is_empty() && config.market(&config.service.default_market).is_none() {
        errors.push(ConfigError::validation(format!(
            "service.default_market `{}` does not match any [[markets]] id",
            config.service.default_market
        )));
    }

    let pagination = &config.pagination;
    if pagination.max_page_size == 0 {
        errors.push(ConfigError::validation(
            "pagination.max_page_size must be at least 1",
        ));
    }
    if pagination.default_page_size == 0 || pagination.default_page_size > pagination.max_page_size
    {
        errors.push(ConfigError::validation(format!(
            "pagination.default_page_size must be between 1 and {}, got {}",
            pagination.max_page_size, pagination.default_page_size
        )));
    }

    let policy = &config.policy;
    for (key, value) in [
        ("unanswered_after_hours", policy.unanswered_after_hours),
        ("no_replies_after_hours", policy.no_replies_after_hours),
        ("ask_recommendation_after_days", policy.ask_recommendation_after_days),
        ("online_window_secs", policy.online_window_secs),
    ] {
        if value <= 0 {
            errors.push(ConfigError::validation(format!(
                "policy.{key} must be positive, got {value}"
            )));
        }
    }
    if policy.safety_trigger_count == 0 {
        errors.push(ConfigError::validation(
            "policy.safety_trigger_count must be at least 1",
        ));
    }
    if policy.successful_sender_changes == 0 {
        errors.push(ConfigError::validation(
            "policy.successful_sender_changes must be at least 1",
        ));
    }

    if let Some(url) = &config.notifications.webhook_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ConfigError::validation(format!(
                "notifications.webhook_url `{url}` must be an http(s) URL"
            )));
        }
    }

    if config.translations.fallback_locale.trim().is_empty() {
        errors.push(ConfigError::validation(
            "translations.fallback_locale must not be empty",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
