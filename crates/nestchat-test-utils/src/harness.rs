// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles one market: a temp SQLite store, a
//! [`ConversationService`] over it, and mock notifier and translator.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use nestchat_config::model::{MarketConfig, NestchatConfig};
use nestchat_core::types::{JobPostingInvitation, User, UserId};
use nestchat_core::{ChatStore, NestchatError};
use nestchat_engine::{ConversationService, SentMessage};
use nestchat_storage::SqliteStore;

use crate::mock_notifier::MockNotifier;
use crate::mock_translator::MockTranslator;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: NestchatConfig,
    users: Vec<User>,
    safety_messages: bool,
    translator: MockTranslator,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: NestchatConfig::default(),
            users: Vec::new(),
            safety_messages: true,
            translator: MockTranslator::new(),
        }
    }

    /// Replace the configuration. Market settings are taken from the
    /// builder, not from `config.markets`.
    pub fn with_config(mut self, config: NestchatConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_users(mut self, users: impl IntoIterator<Item = User>) -> Self {
        self.users.extend(users);
        self
    }

    pub fn with_safety_messages(mut self, enabled: bool) -> Self {
        self.safety_messages = enabled;
        self
    }

    pub fn with_translator(mut self, translator: MockTranslator) -> Self {
        self.translator = translator;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, NestchatError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| NestchatError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("market.db");

        let market = MarketConfig {
            id: "test".to_string(),
            database_path: db_path.to_string_lossy().into_owned(),
            safety_messages: self.safety_messages,
            ..MarketConfig::default()
        };
        let store = Arc::new(SqliteStore::new(market.clone()));
        store.initialize().await?;
        for user in &self.users {
            store.upsert_user(user).await?;
        }

        let mut config = self.config;
        config.service.default_market = market.id.clone();
        config.markets = vec![market.clone()];

        let notifier = Arc::new(MockNotifier::new());
        let translator = Arc::new(self.translator);
        let service = Arc::new(ConversationService::new(
            &config,
            market,
            store.clone(),
            translator.clone(),
            notifier.clone(),
        ));

        Ok(TestHarness {
            store,
            service,
            notifier,
            translator,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// SQLite store (temp DB, cleaned up on drop).
    pub store: Arc<SqliteStore>,
    pub service: Arc<ConversationService>,
    pub notifier: Arc<MockNotifier>,
    pub translator: Arc<MockTranslator>,
    /// Effective configuration, with the single `test` market.
    pub config: NestchatConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Adds or replaces a user row.
    pub async fn add_user(&self, user: &User) -> Result<(), NestchatError> {
        self.store.upsert_user(user).await
    }

    /// Sends `content` from `from` to `to` through the service.
    pub async fn send(
        &self,
        from: &User,
        to: &User,
        content: &str,
    ) -> Result<SentMessage, NestchatError> {
        self.service
            .send_message(&from.id, &to.url, content.to_string())
            .await
    }

    pub async fn add_job_posting(
        &self,
        id: &str,
        parent: &User,
        foster: &User,
        created_at: DateTime<Utc>,
    ) -> Result<(), NestchatError> {
        self.store
            .insert_job_posting(&JobPostingInvitation {
                id: id.to_string(),
                parent_id: parent.id.clone(),
                foster_id: foster.id.clone(),
                created_at,
            })
            .await
    }

    pub async fn add_recommendation(
        &self,
        author: &UserId,
        subject: &UserId,
    ) -> Result<(), NestchatError> {
        self.store
            .insert_recommendation(author, subject, Utc::now())
            .await
    }
}
