// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engagement analytics.
//!
//! Pure functions over already-fetched rows. Missing inputs (no last
//! message, no login timestamp) degrade to `false` or zero, never to an error.

use chrono::{DateTime, Duration, Utc};
use nestchat_config::model::PolicyConfig;
use nestchat_core::types::{ConversationSummary, Role, ThreadStats, UserId};
use serde::Serialize;

/// Age thresholds from `[policy]`.
#[derive(Debug, Clone, Copy)]
pub struct EngagementThresholds {
    pub unanswered_after: Duration,
    pub no_replies_after: Duration,
    pub ask_recommendation_after: Duration,
    pub online_window: Duration,
}

impl EngagementThresholds {
    pub fn from_policy(policy: &PolicyConfig) -> Self {
        Self {
            unanswered_after: Duration::hours(policy.unanswered_after_hours),
            no_replies_after: Duration::hours(policy.no_replies_after_hours),
            ask_recommendation_after: Duration::days(policy.ask_recommendation_after_days),
            online_window: Duration::seconds(policy.online_window_secs),
        }
    }
}

impl Default for EngagementThresholds {
    fn default() -> Self {
        Self::from_policy(&PolicyConfig::default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRate {
    pub unanswered_count: u64,
    pub received_count: u64,
}

pub fn response_rate(
    conversations: &[ConversationSummary],
    now: DateTime<Utc>,
    thresholds: &EngagementThresholds,
) -> ResponseRate {
    let mut rate = ResponseRate::default();
    for conversation in conversations {
        if conversation.partner.disabled {
            continue;
        }
        if is_unanswered(conversation, now, thresholds) {
            rate.unanswered_count += 1;
        }
        if !conversation.initiated_by_viewer {
            rate.received_count += 1;
        }
    }
    rate
}

/// The viewer never wrote in this conversation and the partner's last
/// message is older than the unanswered threshold.
pub fn is_unanswered(
    conversation: &ConversationSummary,
    now: DateTime<Utc>,
    thresholds: &EngagementThresholds,
) -> bool {
    !conversation.partner.disabled
        && conversation.sent_messages == 0
        && conversation
            .partner_last_message_at
            .is_some_and(|at| now - at > thresholds.unanswered_after)
}

/// True for a non-parent whose every conversation is an unanswered
/// conversation start, with at least one of them older than the threshold.
pub fn no_replies_received(
    viewer_role: Role,
    conversations: &[ConversationSummary],
    now: DateTime<Utc>,
    thresholds: &EngagementThresholds,
) -> bool {
    if viewer_role.is_parent() || conversations.is_empty() {
        return false;
    }
    let all_unreplied = conversations
        .iter()
        .all(|c| c.initiated_by_viewer && c.total_messages == c.sent_messages);
    let any_old = conversations.iter().any(|c| {
        c.last_message_at()
            .is_some_and(|at| now - at > thresholds.no_replies_after)
    });
    all_unreplied && any_old
}

/// Whether to nudge the viewer to ask the partner for a recommendation.
///
/// `thread` must cover the whole visible thread, not one page of it.
pub fn ask_for_recommendation(
    thread: &ThreadStats,
    recommendations: u64,
    now: DateTime<Utc>,
    thresholds: &EngagementThresholds,
) -> bool {
    if recommendations > 0 || thread.ask_recommendation_sent {
        return false;
    }
    let Some(latest) = thread.latest_message_at else {
        return false;
    };
    thread.partner_replies > 1 && now - latest >= thresholds.ask_recommendation_after
}

pub fn chat_partner_online(
    last_login: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    thresholds: &EngagementThresholds,
) -> bool {
    last_login.is_some_and(|at| now - at <= thresholds.online_window)
}

pub fn total_unread_messages(conversations: &[ConversationSummary]) -> u64 {
    conversations.iter().map(|c| c.unread_messages).sum()
}

/// Partners who started a conversation the viewer never answered and who
/// have not been auto-rejected yet.
pub fn auto_rejectable_users(conversations: &[ConversationSummary]) -> Vec<UserId> {
    conversations
        .iter()
        .filter(|c| {
            !c.initiated_by_viewer
                && c.sent_messages == 0
                && !c.partner.disabled
                && !c.auto_rejected_by_viewer
        })
        .map(|c| c.partner.id.clone())
        .collect()
}
