// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixtures shared by this crate's unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nestchat_config::model::MarketConfig;
use nestchat_core::types::{
    AdapterType, Gender, HealthStatus, Message, MessageType, NewMessage, RateLimitState, Role, User,
    UserId,
};
use nestchat_core::{ChatStore, NestchatError, Notification, Notifier, PluginAdapter, Translator};
use nestchat_storage::SqliteStore;
use tempfile::TempDir;

pub(crate) fn user(id: &str, role: Role) -> User {
    User {
        id: UserId::from(id),
        url: format!("{id}-url"),
        first_name: id.to_string(),
        role,
        gender: Gender::Female,
        premium: true,
        rate_limit: RateLimitState::None,
        available_for_chat: true,
        test_account: false,
        disabled: false,
        locale: "en".to_string(),
        safety_messages_disabled: false,
        last_login: None,
    }
}

pub(crate) async fn store(dir: &TempDir, users: &[User]) -> Arc<SqliteStore> {
    let path = dir.path().join("market.db");
    let store = SqliteStore::new(MarketConfig {
        id: "test".into(),
        database_path: path.to_string_lossy().into_owned(),
        ..MarketConfig::default()
    });
    store.initialize().await.unwrap();
    for user in users {
        store.upsert_user(user).await.unwrap();
    }
    Arc::new(store)
}

pub(crate) async fn send(
    store: &SqliteStore,
    from: &User,
    to: &User,
    message_type: MessageType,
    at: DateTime<Utc>,
) -> Message {
    store
        .append_message(NewMessage::new(
            from.id.clone(),
            to.id.clone(),
            "hello",
            message_type,
            at,
        ))
        .await
        .unwrap()
}

/// Always fails.
pub(crate) struct BrokenTranslator;

#[async_trait]
impl PluginAdapter for BrokenTranslator {
    fn name(&self) -> &str {
        "broken"
    }
    fn version(&self) -> semver::Version {
        semver::Version::new(0, 0, 0)
    }
    fn adapter_type(&self) -> AdapterType {
        AdapterType::Translator
    }
    async fn health_check(&self) -> Result<HealthStatus, NestchatError> {
        Ok(HealthStatus::Unhealthy("broken".into()))
    }
    async fn shutdown(&self) -> Result<(), NestchatError> {
        Ok(())
    }
}

#[async_trait]
impl Translator for BrokenTranslator {
    async fn translate(&self, _locale: &str, key: &str) -> Result<String, NestchatError> {
        Err(NestchatError::Upstream {
            service: "translator",
            source: format!("cannot translate {key}").into(),
        })
    }
}

/// Keeps every notification it is handed.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub(crate) sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub(crate) fn rating_prompts(&self) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|n| matches!(n, Notification::RatingPrompt { .. }))
            .count()
    }
}

#[async_trait]
impl PluginAdapter for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }
    fn version(&self) -> semver::Version {
        semver::Version::new(0, 0, 0)
    }
    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notifier
    }
    async fn health_check(&self) -> Result<HealthStatus, NestchatError> {
        Ok(HealthStatus::Healthy)
    }
    async fn shutdown(&self) -> Result<(), NestchatError> {
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NestchatError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
