// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level Nestchat configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NestchatConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    /// REST gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// One entry per market. Each market owns its own store.
    #[serde(default = "default_markets")]
    pub markets: Vec<MarketConfig>,

    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Thresholds used by the engagement and safety policies.
    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub translations: TranslationConfig,
}

impl NestchatConfig {
    pub fn market(&self, id: &str) -> Option<&MarketConfig> {
        self.markets.iter().find(|m| m.id == id)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Market used when a request does not name one.
    #[serde(default = "default_market_id")]
    pub default_market: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            default_market: default_market_id(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_market_id() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret expected in `Authorization: Bearer`. `None` rejects
    /// every authenticated route.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Upper bound on a single request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3080
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// A market (tenant) with its own database.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MarketConfig {
    pub id: String,

    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// Inject safety tips into new conversations.
    #[serde(default = "default_safety_messages")]
    pub safety_messages: bool,

    #[serde(default = "default_locale")]
    pub default_locale: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            id: default_market_id(),
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            safety_messages: default_safety_messages(),
            default_locale: default_locale(),
        }
    }
}

fn default_markets() -> Vec<MarketConfig> {
    vec![MarketConfig::default()]
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("nestchat").join("nestchat.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("nestchat.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_safety_messages() -> bool {
    true
}

fn default_locale() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    /// System maximum; also caps unbounded requests.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_page_size() -> u64 {
    20
}

fn default_max_page_size() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// A partner message older than this, with no reply, counts as unanswered.
    #[serde(default = "default_unanswered_after_hours")]
    pub unanswered_after_hours: i64,

    #[serde(default = "default_no_replies_after_hours")]
    pub no_replies_after_hours: i64,

    #[serde(default = "default_ask_recommendation_after_days")]
    pub ask_recommendation_after_days: i64,

    #[serde(default = "default_online_window_secs")]
    pub online_window_secs: i64,

    /// Safety messages received before offering to switch them off.
    #[serde(default = "default_safety_ask_disable_after")]
    pub safety_ask_disable_after: u64,

    /// Sender's message count (to one recipient) that triggers safety tips.
    #[serde(default = "default_safety_trigger_count")]
    pub safety_trigger_count: u64,

    /// Sender changes that make a conversation successful.
    #[serde(default = "default_successful_sender_changes")]
    pub successful_sender_changes: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            unanswered_after_hours: default_unanswered_after_hours(),
            no_replies_after_hours: default_no_replies_after_hours(),
            ask_recommendation_after_days: default_ask_recommendation_after_days(),
            online_window_secs: default_online_window_secs(),
            safety_ask_disable_after: default_safety_ask_disable_after(),
            safety_trigger_count: default_safety_trigger_count(),
            successful_sender_changes: default_successful_sender_changes(),
        }
    }
}

fn default_unanswered_after_hours() -> i64 {
    24
}

fn default_no_replies_after_hours() -> i64 {
    62
}

fn default_ask_recommendation_after_days() -> i64 {
    4
}

fn default_online_window_secs() -> i64 {
    60
}

fn default_safety_ask_disable_after() -> u64 {
    3
}

fn default_safety_trigger_count() -> u64 {
    2
}

fn default_successful_sender_changes() -> usize {
    4
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationConfig {
    /// Push gateway endpoint. `None` logs notifications instead of sending them.
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default = "default_notification_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_ms: default_notification_timeout_ms(),
        }
    }
}

fn default_notification_timeout_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TranslationConfig {
    /// Locale consulted when the requested one lacks a key.
    #[serde(default = "default_locale")]
    pub fallback_locale: String,

    #[serde(default = "default_translation_timeout_ms")]
    pub timeout_ms: u64,

    /// locale -> key -> text.
    #[serde(default = "default_catalog")]
    pub catalog: HashMap<String, HashMap<String, String>>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            fallback_locale: default_locale(),
            timeout_ms: default_translation_timeout_ms(),
            catalog: default_catalog(),
        }
    }
}

fn default_translation_timeout_ms() -> u64 {
    1000
}

fn default_catalog() -> HashMap<String, HashMap<String, String>> {
    let en = HashMap::from([(
        "safety_tips".to_string(),
        "Stay safe: meet in a public place first, never pay in advance, \
         and keep your conversation on the platform."
            .to_string(),
    )]);
    HashMap::from([("en".to_string(), en)])
}
