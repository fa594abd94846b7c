// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON shapes returned by the REST surface.
//!
//! Domain types stay wire-agnostic; everything the client sees is built here.

use chrono::{DateTime, Utc};
use nestchat_core::types::{
    ConversationId, ConversationSummary, Gender, Message, MessageId, MessageType, RateLimitPeriod,
    Role, User, UserId,
};
use nestchat_engine::analytics::{self, EngagementThresholds};
use nestchat_engine::FeedItem;
use serde::Serialize;

/// Top-level response body: `{"data": ..., "meta": ..., "included": [...]}`.
#[derive(Debug, Serialize)]
pub struct Document<D, M = ()> {
    pub data: D,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<M>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<PartnerView>,
}

impl<D, M> Document<D, M> {
    pub fn new(data: D) -> Self {
        Self {
            data,
            meta: None,
            included: Vec::new(),
        }
    }

    pub fn with_meta(mut self, meta: M) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_included(mut self, included: Vec<PartnerView>) -> Self {
        self.included = included;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerView {
    pub id: UserId,
    pub url: String,
    pub first_name: String,
    pub role: Role,
    pub gender: Gender,
}

impl From<&User> for PartnerView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            url: user.url.clone(),
            first_name: user.first_name.clone(),
            role: user.role,
            gender: user.gender,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: MessageId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_posting_id: Option<String>,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id.clone(),
            receiver_id: message.receiver_id.clone(),
            content: message.content.clone(),
            message_type: message.message_type,
            created_at: message.created_at,
            job_posting_id: message.job_posting_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ConversationId>,
    pub chat_partner_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessageView>,
    pub total_messages_count: u64,
    pub unread_messages_count: u64,
    pub unanswered: bool,
    pub successful: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPostingView {
    pub id: String,
    pub chat_partner_id: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessageView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FeedItemView {
    Conversation(ConversationView),
    JobPosting(JobPostingView),
}

impl FeedItemView {
    pub fn build(item: &FeedItem, now: DateTime<Utc>, thresholds: &EngagementThresholds) -> Self {
        match item {
            FeedItem::Conversation(summary) => {
                Self::Conversation(conversation_view(summary, now, thresholds))
            }
            FeedItem::JobPosting {
                invitation,
                counterpart_id,
                last_message,
            } => Self::JobPosting(JobPostingView {
                id: invitation.id.clone(),
                chat_partner_id: counterpart_id.clone(),
                created_at: invitation.created_at,
                last_message: last_message.as_ref().map(MessageView::from),
            }),
        }
    }
}

fn conversation_view(
    summary: &ConversationSummary,
    now: DateTime<Utc>,
    thresholds: &EngagementThresholds,
) -> ConversationView {
    ConversationView {
        id: summary.conversation_id,
        chat_partner_id: summary.partner.id.clone(),
        last_message: summary.last_message.as_ref().map(MessageView::from),
        total_messages_count: summary.total_messages,
        unread_messages_count: summary.unread_messages,
        unanswered: analytics::is_unanswered(summary, now, thresholds),
        successful: summary.successful_at.is_some(),
    }
}

/// Meta block of a 201 send response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_warning: Option<RateLimitPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_message: Option<MessageView>,
}

#[derive(Debug, Serialize)]
pub struct HealthView {
    pub status: &'static str,
    pub markets: Vec<MarketHealthView>,
}

#[derive(Debug, Serialize)]
pub struct MarketHealthView {
    pub market: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
