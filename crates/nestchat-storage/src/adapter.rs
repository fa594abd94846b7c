// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`ChatStore`] trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use nestchat_config::model::MarketConfig;
use nestchat_core::types::{
    Conversation, ConversationId, ConversationSummary, FeedFilter, JobPostingInvitation, Message,
    MessageFilter, MessageId, MessageType, NewMessage, ThreadStats, User, UserId, Window,
};
use nestchat_core::{AdapterType, ChatStore, HealthStatus, NestchatError, PluginAdapter};

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed store for one market.
///
/// The database is opened by [`ChatStore::initialize`]; every other call
/// fails with a storage error until then.
pub struct SqliteStore {
    config: MarketConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    pub fn new(config: MarketConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    pub fn market(&self) -> &str {
        &self.config.id
    }

    fn db(&self) -> Result<&Database, NestchatError> {
        self.db.get().ok_or_else(|| NestchatError::Storage {
            source: "store not initialized -- call initialize() first".into(),
        })
    }

    /// Syncs a user row in from the account system.
    pub async fn upsert_user(&self, user: &User) -> Result<(), NestchatError> {
        queries::users::upsert_user(self.db()?, user).await
    }

    /// Syncs a job posting in from the jobs system.
    pub async fn insert_job_posting(
        &self,
        invitation: &JobPostingInvitation,
    ) -> Result<(), NestchatError> {
        queries::external::insert_job_posting(self.db()?, invitation).await
    }

    /// Syncs a recommendation in from the reviews system.
    pub async fn insert_recommendation(
        &self,
        author: &UserId,
        subject: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), NestchatError> {
        queries::external::insert_recommendation(self.db()?, author, subject, at).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, NestchatError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), NestchatError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!(market = %self.config.id, "shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl ChatStore for SqliteStore {
    async fn initialize(&self) -> Result<(), NestchatError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| NestchatError::Storage {
            source: "store already initialized".into(),
        })?;
        debug!(
            market = %self.config.id,
            path = %self.config.database_path,
            "SQLite store initialized"
        );
        Ok(())
    }

    async fn close(&self) -> Result<(), NestchatError> {
        self.db()?.checkpoint().await?;
        debug!(market = %self.config.id, "WAL checkpoint complete");
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, NestchatError> {
        queries::users::get_user(self.db()?, id).await
    }

    async fn get_user_by_url(&self, url: &str) -> Result<Option<User>, NestchatError> {
        queries::users::get_user_by_url(self.db()?, url).await
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<User>, NestchatError> {
        queries::users::get_users(self.db()?, ids).await
    }

    async fn append_message(&self, message: NewMessage) -> Result<Message, NestchatError> {
        let mut created = queries::messages::insert_messages(self.db()?, vec![message]).await?;
        created.pop().ok_or_else(|| {
            NestchatError::Internal("insert returned no message".to_string())
        })
    }

    async fn append_messages(
        &self,
        messages: Vec<NewMessage>,
    ) -> Result<Vec<Message>, NestchatError> {
        queries::messages::insert_messages(self.db()?, messages).await
    }

    async fn get_message(&self, id: MessageId) -> Result<Option<Message>, NestchatError> {
        queries::messages::get_message(self.db()?, id).await
    }

    async fn count_messages(
        &self,
        viewer: &UserId,
        partner: &UserId,
        filter: &MessageFilter,
    ) -> Result<u64, NestchatError> {
        let window = Window { offset: 0, limit: 0 };
        let (_, total) =
            queries::messages::list_visible(self.db()?, viewer, partner, filter, window).await?;
        Ok(total)
    }

    async fn list_messages(
        &self,
        viewer: &UserId,
        partner: &UserId,
        filter: &MessageFilter,
        window: Window,
    ) -> Result<(Vec<Message>, u64), NestchatError> {
        queries::messages::list_visible(self.db()?, viewer, partner, filter, window).await
    }

    async fn thread_stats(
        &self,
        viewer: &UserId,
        partner: &UserId,
    ) -> Result<ThreadStats, NestchatError> {
        queries::messages::thread_stats(self.db()?, viewer, partner).await
    }

    async fn count_sent_messages(
        &self,
        sender: &UserId,
        receiver: &UserId,
        filter: &MessageFilter,
    ) -> Result<u64, NestchatError> {
        queries::messages::count_sent(self.db()?, sender, receiver, filter).await
    }

    async fn has_any_message(&self, a: &UserId, b: &UserId) -> Result<bool, NestchatError> {
        queries::messages::has_any(self.db()?, a, b).await
    }

    async fn sent_message_types(
        &self,
        sender: &UserId,
        receiver: &UserId,
    ) -> Result<Vec<MessageType>, NestchatError> {
        queries::messages::sent_types(self.db()?, sender, receiver).await
    }

    async fn recent_senders(
        &self,
        a: &UserId,
        b: &UserId,
        limit: u64,
    ) -> Result<Vec<UserId>, NestchatError> {
        queries::messages::recent_senders(self.db()?, a, b, limit).await
    }

    async fn count_participated_messages_of_type(
        &self,
        user: &UserId,
        message_type: MessageType,
    ) -> Result<u64, NestchatError> {
        queries::messages::count_participated_of_type(self.db()?, user, message_type).await
    }

    async fn soft_delete_conversation(
        &self,
        viewer: &UserId,
        partner: &UserId,
    ) -> Result<u64, NestchatError> {
        queries::messages::soft_delete_pair(self.db()?, viewer, partner).await
    }

    async fn get_or_create_conversation(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Conversation, NestchatError> {
        queries::conversations::get_or_create(self.db()?, a, b, Utc::now()).await
    }

    async fn find_conversation(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<Conversation>, NestchatError> {
        queries::conversations::find(self.db()?, a, b).await
    }

    async fn mark_conversation_successful(
        &self,
        id: ConversationId,
        at: DateTime<Utc>,
    ) -> Result<bool, NestchatError> {
        queries::conversations::mark_successful(self.db()?, id, at).await
    }

    async fn mark_read(
        &self,
        viewer: &UserId,
        partner: &UserId,
        last_read: MessageId,
    ) -> Result<(), NestchatError> {
        queries::conversations::mark_read(self.db()?, viewer, partner, last_read).await
    }

    async fn list_conversations(
        &self,
        viewer: &UserId,
        filter: &FeedFilter,
    ) -> Result<Vec<ConversationSummary>, NestchatError> {
        queries::conversations::list_summaries(self.db()?, viewer, filter).await
    }

    async fn job_posting_invitations(
        &self,
        viewer: &UserId,
    ) -> Result<Vec<JobPostingInvitation>, NestchatError> {
        queries::external::invitations_for(self.db()?, viewer).await
    }

    async fn count_recommendations(
        &self,
        author: &UserId,
        subject: &UserId,
    ) -> Result<u64, NestchatError> {
        queries::external::count_recommendations(self.db()?, author, subject).await
    }
}
