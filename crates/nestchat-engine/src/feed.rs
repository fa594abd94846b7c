// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Merges the conversation list with job-posting invitations.
//!
//! Output: synthetic invitation items first (newest invitation first), then
//! the remaining conversations by last message, newest first, with
//! message-less conversations last. At most one item per counterpart.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use nestchat_core::types::{
    ConversationSummary, JobPostingInvitation, Message, Role, UserId,
};

#[derive(Debug, Clone, PartialEq)]
pub enum FeedItem {
    Conversation(ConversationSummary),
    /// An invitation newer than anything said in the matching conversation.
    JobPosting {
        invitation: JobPostingInvitation,
        counterpart_id: UserId,
        /// Carried over from the displaced conversation, if there was one.
        last_message: Option<Message>,
    },
}

impl FeedItem {
    pub fn counterpart_id(&self) -> &UserId {
        match self {
            Self::Conversation(summary) => &summary.partner.id,
            Self::JobPosting { counterpart_id, .. } => counterpart_id,
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        match self {
            Self::Conversation(summary) => summary.last_message.as_ref(),
            Self::JobPosting { last_message, .. } => last_message.as_ref(),
        }
    }
}

/// The invitation's other side as seen by a viewer of `role`.
fn counterpart<'a>(
    viewer: &UserId,
    role: Role,
    invitation: &'a JobPostingInvitation,
) -> Option<&'a UserId> {
    let (own_side, other_side) = if role.is_parent() {
        (&invitation.parent_id, &invitation.foster_id)
    } else {
        (&invitation.foster_id, &invitation.parent_id)
    };
    (own_side == viewer).then_some(other_side)
}

pub fn merge_feed(
    viewer: &UserId,
    viewer_role: Role,
    conversations: Vec<ConversationSummary>,
    invitations: Vec<JobPostingInvitation>,
) -> Vec<FeedItem> {
    let mut remaining = conversations;
    let mut synthetic = Vec::new();
    let mut seen: HashSet<UserId> = HashSet::new();

    let mut invitations = invitations;
    invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    for invitation in invitations {
        let Some(counterpart_id) = counterpart(viewer, viewer_role, &invitation).cloned() else {
            continue;
        };
        if !seen.insert(counterpart_id.clone()) {
            continue;
        }

        let matched = remaining
            .iter()
            .position(|c| c.partner.id == counterpart_id)
            .map(|pos| remaining.remove(pos));

        match matched {
            Some(conversation)
                if conversation
                    .last_message_at()
                    .is_some_and(|at| at >= invitation.created_at) =>
            {
                remaining.push(conversation);
            }
            Some(conversation) => synthetic.push(FeedItem::JobPosting {
                invitation,
                counterpart_id,
                last_message: conversation.last_message,
            }),
            None => synthetic.push(FeedItem::JobPosting {
                invitation,
                counterpart_id,
                last_message: None,
            }),
        }
    }

    // `None` sorts below every `Some`, so reversing puts message-less rows last.
    remaining.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));

    synthetic
        .into_iter()
        .chain(remaining.into_iter().map(FeedItem::Conversation))
        .collect()
}

fn sort_key(summary: &ConversationSummary) -> Option<(DateTime<Utc>, i64)> {
    summary
        .last_message
        .as_ref()
        .map(|m| (m.created_at, m.id.0))
}
