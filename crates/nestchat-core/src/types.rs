// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the store, the engine, and the gateway.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{NestchatError, Violation};

/// Upper bound on message content, in Unicode scalar values.
pub const MAX_CONTENT_CHARS: usize = 20_000;

/// Opaque user identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Unique identifier for a message. Monotonic within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a conversation ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Notifier,
    Translator,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Parent,
    Babysitter,
    Childminder,
}

impl Role {
    pub fn is_parent(&self) -> bool {
        matches!(self, Self::Parent)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum Gender {
    Female,
    Male,
    Unknown,
}

/// Window that a rate-limit warning refers to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum RateLimitPeriod {
    Day,
    Week,
}

/// Abuse / rate-limit state of a user with respect to starting conversations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "period", rename_all = "camelCase")]
pub enum RateLimitState {
    None,
    Warning(RateLimitPeriod),
    Exceeded,
}

impl RateLimitState {
    /// Column pair used by the store: `(state, period)`.
    pub fn to_columns(&self) -> (&'static str, Option<String>) {
        match self {
            Self::None => ("none", None),
            Self::Warning(period) => ("warning", Some(period.to_string())),
            Self::Exceeded => ("exceeded", None),
        }
    }

    /// Inverse of [`to_columns`](Self::to_columns). A warning without a
    /// readable period degrades to a daily warning.
    pub fn from_columns(state: &str, period: Option<&str>) -> Option<Self> {
        match state {
            "none" => Some(Self::None),
            "exceeded" => Some(Self::Exceeded),
            "warning" => {
                let period = period
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(RateLimitPeriod::Day);
                Some(Self::Warning(period))
            }
            _ => None,
        }
    }
}

/// Message kinds. Immutable after creation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    Regular,
    AskRecommendation,
    SafetyTips,
    InstantJob,
    AutoRejection,
    JobPostingReply,
    JobPostingRejection,
}

/// A platform user as seen by the conversation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    /// Public slug used to address the user as a chat partner.
    pub url: String,
    pub first_name: String,
    pub role: Role,
    pub gender: Gender,
    pub premium: bool,
    pub rate_limit: RateLimitState,
    pub available_for_chat: bool,
    pub test_account: bool,
    pub disabled: bool,
    pub locale: String,
    pub safety_messages_disabled: bool,
    pub last_login: Option<DateTime<Utc>>,
}

/// A stored directed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    /// `None` for rows written before the ledger was backfilled, and for
    /// auto-rejections that found no existing conversation.
    pub conversation_id: Option<ConversationId>,
    pub content: String,
    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
    pub sender_deleted: bool,
    pub receiver_deleted: bool,
    pub job_posting_id: Option<String>,
    /// True when this was the first message between the pair.
    pub initial: bool,
}

impl Message {
    /// The other participant from `viewer`'s perspective.
    pub fn partner_of(&self, viewer: &UserId) -> &UserId {
        if &self.sender_id == viewer {
            &self.receiver_id
        } else {
            &self.sender_id
        }
    }

    pub fn is_sent_by(&self, user: &UserId) -> bool {
        &self.sender_id == user
    }
}

/// How a new message attaches to the conversation ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationBinding {
    /// Find the pair's conversation, creating it atomically with the insert.
    GetOrCreate,
    /// Attach to a known conversation.
    Existing(ConversationId),
    /// Leave the ledger untouched.
    Unlinked,
}

/// Input for [`ChatStore::append_message`](crate::traits::ChatStore::append_message).
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
    pub job_posting_id: Option<String>,
    pub conversation: ConversationBinding,
}

impl NewMessage {
    pub fn new(
        sender_id: UserId,
        receiver_id: UserId,
        content: impl Into<String>,
        message_type: MessageType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sender_id,
            receiver_id,
            content: content.into(),
            message_type,
            created_at,
            job_posting_id: None,
            conversation: ConversationBinding::GetOrCreate,
        }
    }

    pub fn with_conversation(mut self, binding: ConversationBinding) -> Self {
        self.conversation = binding;
        self
    }

    pub fn with_job_posting(mut self, job_posting_id: impl Into<String>) -> Self {
        self.job_posting_id = Some(job_posting_id.into());
        self
    }

    /// Checks the content bound and the distinct-participants invariant.
    ///
    /// Content over [`MAX_CONTENT_CHARS`] is rejected, never truncated.
    pub fn validate(&self) -> Result<(), NestchatError> {
        let mut violations = Vec::new();
        if self.content.trim().is_empty() {
            violations.push(
                Violation::new("content_empty", "message content must not be empty")
                    .at("content"),
            );
        }
        let length = self.content.chars().count();
        if length > MAX_CONTENT_CHARS {
            violations.push(
                Violation::new(
                    "content_too_long",
                    format!(
                        "message content is {length} characters, the maximum is {MAX_CONTENT_CHARS}"
                    ),
                )
                .at("content"),
            );
        }
        if self.sender_id == self.receiver_id {
            violations.push(
                Violation::new("same_participants", "sender and receiver must differ")
                    .at("receiver"),
            );
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(NestchatError::Validation(violations))
        }
    }
}

/// Unordered user pair, normalized so that `low < high`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserPair {
    low: UserId,
    high: UserId,
}

impl UserPair {
    pub fn new(a: &UserId, b: &UserId) -> Self {
        if a <= b {
            Self {
                low: a.clone(),
                high: b.clone(),
            }
        } else {
            Self {
                low: b.clone(),
                high: a.clone(),
            }
        }
    }

    pub fn low(&self) -> &UserId {
        &self.low
    }

    pub fn high(&self) -> &UserId {
        &self.high
    }
}

/// Ledger row for a unique user pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub user1_id: UserId,
    pub user2_id: UserId,
    pub successful_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn involves(&self, user: &UserId) -> bool {
        &self.user1_id == user || &self.user2_id == user
    }
}

/// One row of a user's conversation list, aggregated from the message log.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSummary {
    pub conversation_id: Option<ConversationId>,
    pub partner: User,
    pub last_message: Option<Message>,
    /// Messages visible to the viewer.
    pub total_messages: u64,
    /// Of those, sent by the viewer.
    pub sent_messages: u64,
    pub unread_messages: u64,
    pub initiated_by_viewer: bool,
    pub partner_last_message_at: Option<DateTime<Utc>>,
    pub successful_at: Option<DateTime<Utc>>,
    /// Whether the viewer already sent an auto-rejection to the partner.
    pub auto_rejected_by_viewer: bool,
}

impl ConversationSummary {
    pub fn last_message_at(&self) -> Option<DateTime<Utc>> {
        self.last_message.as_ref().map(|m| m.created_at)
    }
}

/// Whole-thread aggregates over the messages visible to the viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadStats {
    pub latest_message_at: Option<DateTime<Utc>>,
    /// Partner messages, safety tips excluded.
    pub partner_replies: u64,
    pub ask_recommendation_sent: bool,
}

/// An outstanding job posting between a parent and a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPostingInvitation {
    pub id: String,
    pub parent_id: UserId,
    pub foster_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl JobPostingInvitation {
    /// The other side of the invitation, if `viewer` takes part in it.
    pub fn counterpart_of(&self, viewer: &UserId) -> Option<&UserId> {
        if &self.parent_id == viewer {
            Some(&self.foster_id)
        } else if &self.foster_id == viewer {
            Some(&self.parent_id)
        } else {
            None
        }
    }
}

/// Combinable predicates for listing and counting messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageFilter {
    pub created_before: Option<DateTime<Utc>>,
    pub created_after: Option<DateTime<Utc>>,
    pub hide_type: Option<MessageType>,
}

impl MessageFilter {
    pub fn hiding(message_type: MessageType) -> Self {
        Self {
            hide_type: Some(message_type),
            ..Self::default()
        }
    }

    /// Rejects an empty time window.
    pub fn validate(&self) -> Result<(), NestchatError> {
        let (Some(before), Some(after)) = (self.created_before, self.created_after) else {
            return Ok(());
        };
        if after >= before {
            return Err(NestchatError::validation(
                "invalid_time_window",
                "created-after must be earlier than created-before",
                Some("filter[created-after]"),
            ));
        }
        Ok(())
    }

    pub fn matches(&self, message: &Message) -> bool {
        self.created_before.is_none_or(|b| message.created_at < b)
            && self.created_after.is_none_or(|a| message.created_at > a)
            && self.hide_type != Some(message.message_type)
    }
}

/// Supported conversation-list filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FeedFilter {
    #[default]
    All,
    /// Conversations with at least one visible message of one of these types.
    WithMessageTypes(Vec<MessageType>),
}

/// Offset/limit bounds handed to the store. Produced by the pagination engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn draft(content: &str) -> NewMessage {
        NewMessage::new(
            UserId::from("a"),
            UserId::from("b"),
            content,
            MessageType::Regular,
            Utc::now(),
        )
    }

    #[test]
    fn content_at_limit_is_accepted() {
        assert!(draft(&"x".repeat(MAX_CONTENT_CHARS)).validate().is_ok());
    }

    #[test]
    fn content_over_limit_is_rejected() {
        let err = draft(&"x".repeat(MAX_CONTENT_CHARS + 1))
            .validate()
            .unwrap_err();
        match err {
            NestchatError::Validation(v) => assert_eq!(v[0].code, "content_too_long"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn limit_counts_characters_not_bytes() {
        // 20,000 two-byte characters is 40,000 bytes but still within bounds.
        assert!(draft(&"é".repeat(MAX_CONTENT_CHARS)).validate().is_ok());
    }

    #[test]
    fn blank_content_is_rejected() {
        assert!(draft("   ").validate().is_err());
    }

    #[test]
    fn self_message_is_rejected() {
        let mut msg = draft("hi");
        msg.receiver_id = msg.sender_id.clone();
        assert!(msg.validate().is_err());
    }

    #[test]
    fn message_type_uses_camel_case_wire_names() {
        assert_eq!(MessageType::AskRecommendation.to_string(), "askRecommendation");
        assert_eq!(
            MessageType::from_str("jobPostingRejection").unwrap(),
            MessageType::JobPostingRejection
        );
        let json = serde_json::to_string(&MessageType::SafetyTips).unwrap();
        assert_eq!(json, "\"safetyTips\"");
    }

    #[test]
    fn rate_limit_columns_roundtrip() {
        for state in [
            RateLimitState::None,
            RateLimitState::Warning(RateLimitPeriod::Week),
            RateLimitState::Exceeded,
        ] {
            let (s, p) = state.to_columns();
            assert_eq!(RateLimitState::from_columns(s, p.as_deref()), Some(state));
        }
        assert_eq!(RateLimitState::from_columns("bogus", None), None);
    }

    #[test]
    fn user_pair_is_unordered() {
        let a = UserId::from("alice");
        let b = UserId::from("bob");
        assert_eq!(UserPair::new(&a, &b), UserPair::new(&b, &a));
        assert_eq!(UserPair::new(&b, &a).low(), &a);
    }

    #[test]
    fn inverted_time_window_is_rejected() {
        let now = Utc::now();
        let filter = MessageFilter {
            created_before: Some(now),
            created_after: Some(now),
            hide_type: None,
        };
        assert!(filter.validate().is_err());
    }

    #[test]
    fn invitation_counterpart() {
        let inv = JobPostingInvitation {
            id: "jp-1".into(),
            parent_id: UserId::from("p"),
            foster_id: UserId::from("f"),
            created_at: Utc::now(),
        };
        assert_eq!(inv.counterpart_of(&UserId::from("p")), Some(&UserId::from("f")));
        assert_eq!(inv.counterpart_of(&UserId::from("f")), Some(&UserId::from("p")));
        assert_eq!(inv.counterpart_of(&UserId::from("x")), None);
    }
}
