// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store interface for the message log and the conversation ledger.
//!
//! One store exists per market. The host process constructs it, calls
//! [`ChatStore::initialize`], and closes it on shutdown.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::NestchatError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Conversation, ConversationId, ConversationSummary, FeedFilter, JobPostingInvitation,
    Message, MessageFilter, MessageId, MessageType, NewMessage, ThreadStats, User, UserId,
    Window,
};

/// Persistence for users (read model), messages, and conversations.
///
/// Message listings are ordered by `created` descending, ties broken by id
/// descending. "Visible to viewer" excludes messages the viewer soft-deleted.
#[async_trait]
pub trait ChatStore: PluginAdapter {
    /// Opens connections and applies migrations.
    async fn initialize(&self) -> Result<(), NestchatError>;

    /// Flushes pending writes and releases connections.
    async fn close(&self) -> Result<(), NestchatError>;

    // --- Users ---

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, NestchatError>;

    async fn get_user_by_url(&self, url: &str) -> Result<Option<User>, NestchatError>;

    /// Users for the given ids; unknown ids are skipped.
    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<User>, NestchatError>;

    // --- Messages ---

    /// Validates and inserts one message. With
    /// [`ConversationBinding::GetOrCreate`](crate::types::ConversationBinding::GetOrCreate)
    /// the ledger row is created in the same transaction.
    async fn append_message(&self, message: NewMessage) -> Result<Message, NestchatError>;

    /// Inserts all messages in one transaction; nothing is written on failure.
    async fn append_messages(
        &self,
        messages: Vec<NewMessage>,
    ) -> Result<Vec<Message>, NestchatError>;

    async fn get_message(&self, id: MessageId) -> Result<Option<Message>, NestchatError>;

    /// Messages between the pair that are visible to `viewer`.
    async fn count_messages(
        &self,
        viewer: &UserId,
        partner: &UserId,
        filter: &MessageFilter,
    ) -> Result<u64, NestchatError>;

    /// A window of the visible messages plus the total matching count.
    async fn list_messages(
        &self,
        viewer: &UserId,
        partner: &UserId,
        filter: &MessageFilter,
        window: Window,
    ) -> Result<(Vec<Message>, u64), NestchatError>;

    /// Aggregates over the whole visible thread, unbounded by any page size.
    async fn thread_stats(
        &self,
        viewer: &UserId,
        partner: &UserId,
    ) -> Result<ThreadStats, NestchatError>;

    /// Messages sent in one direction, regardless of soft-delete flags.
    async fn count_sent_messages(
        &self,
        sender: &UserId,
        receiver: &UserId,
        filter: &MessageFilter,
    ) -> Result<u64, NestchatError>;

    /// Whether anything was ever sent between the pair, in either direction.
    async fn has_any_message(&self, a: &UserId, b: &UserId) -> Result<bool, NestchatError>;

    /// Types of every message `sender` sent to `receiver`.
    async fn sent_message_types(
        &self,
        sender: &UserId,
        receiver: &UserId,
    ) -> Result<Vec<MessageType>, NestchatError>;

    /// Senders of the pair's most recent messages, newest first.
    async fn recent_senders(
        &self,
        a: &UserId,
        b: &UserId,
        limit: u64,
    ) -> Result<Vec<UserId>, NestchatError>;

    /// Messages of one type in any conversation `user` takes part in.
    async fn count_participated_messages_of_type(
        &self,
        user: &UserId,
        message_type: MessageType,
    ) -> Result<u64, NestchatError>;

    /// Flags every message of the pair as deleted on `viewer`'s side.
    /// Returns the number of rows touched.
    async fn soft_delete_conversation(
        &self,
        viewer: &UserId,
        partner: &UserId,
    ) -> Result<u64, NestchatError>;

    // --- Conversation ledger ---

    /// Existing ledger row for the unordered pair, or a new one.
    async fn get_or_create_conversation(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Conversation, NestchatError>;

    async fn find_conversation(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<Conversation>, NestchatError>;

    /// Sets `successful_at` if it is still unset. Returns whether this call set it.
    async fn mark_conversation_successful(
        &self,
        id: ConversationId,
        at: DateTime<Utc>,
    ) -> Result<bool, NestchatError>;

    /// Moves the viewer's read marker forward to `last_read`.
    async fn mark_read(
        &self,
        viewer: &UserId,
        partner: &UserId,
        last_read: MessageId,
    ) -> Result<(), NestchatError>;

    /// Every aggregated conversation row for `viewer`, newest last message
    /// first. Callers page the result themselves.
    async fn list_conversations(
        &self,
        viewer: &UserId,
        filter: &FeedFilter,
    ) -> Result<Vec<ConversationSummary>, NestchatError>;

    // --- External read models ---

    /// Job-posting invitations the viewer takes part in.
    async fn job_posting_invitations(
        &self,
        viewer: &UserId,
    ) -> Result<Vec<JobPostingInvitation>, NestchatError>;

    /// Recommendations written by `author` about `subject`.
    async fn count_recommendations(
        &self,
        author: &UserId,
        subject: &UserId,
    ) -> Result<u64, NestchatError>;
}
