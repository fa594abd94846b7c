// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auto-rejection batches.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use nestchat_core::types::{
    ConversationBinding, ConversationId, Gender, MessageType, NewMessage, Role, User, UserId,
};
use nestchat_core::{ForbiddenReason, NestchatError, Violation};

/// Locale key the client renders for an auto-rejection.
pub fn rejection_content_key(role: Role, gender: Gender) -> String {
    format!("autoRejection.{role}.{gender}")
}

/// Non-empty, duplicate-free, and never the sender.
pub fn validate_recipients(sender: &UserId, ids: &[UserId]) -> Result<(), NestchatError> {
    if ids.is_empty() {
        return Err(NestchatError::validation(
            "user_ids_empty",
            "at least one user id is required",
            Some("userIds"),
        ));
    }
    let mut violations = Vec::new();
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            violations.push(
                Violation::new("user_ids_duplicate", format!("user id `{id}` is repeated"))
                    .at("userIds"),
            );
        }
        if id == sender {
            violations.push(
                Violation::new("same_participants", "cannot auto-reject yourself").at("userIds"),
            );
        }
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(NestchatError::Validation(violations))
    }
}

/// Single-recipient guard: everything the sender sent must be an instant job.
pub fn check_single_recipient(sent_types: &[MessageType]) -> Result<(), NestchatError> {
    if sent_types.iter().all(|t| *t == MessageType::InstantJob) {
        Ok(())
    } else {
        Err(NestchatError::Forbidden(
            ForbiddenReason::AutoRejectionNotAllowed,
        ))
    }
}

/// One draft per recipient, in input order. Recipients without a
/// conversation get an unlinked message.
pub fn build_batch(
    sender: &User,
    recipients: &[(UserId, Option<ConversationId>)],
    now: DateTime<Utc>,
) -> Vec<NewMessage> {
    let content = rejection_content_key(sender.role, sender.gender);
    recipients
        .iter()
        .map(|(recipient, conversation)| {
            let binding = match conversation {
                Some(id) => ConversationBinding::Existing(*id),
                None => ConversationBinding::Unlinked,
            };
            NewMessage::new(
                sender.id.clone(),
                recipient.clone(),
                content.clone(),
                MessageType::AutoRejection,
                now,
            )
            .with_conversation(binding)
        })
        .collect()
}
