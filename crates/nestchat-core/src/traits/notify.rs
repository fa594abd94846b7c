// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push-notification delivery.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::NestchatError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ConversationId, Message, UserId};

/// Events delivered to users outside the request path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Notification {
    /// A message arrived for `recipient`.
    #[serde(rename_all = "camelCase")]
    NewMessage { recipient: UserId, message: Message },
    /// A conversation just became successful; ask both sides for a rating.
    #[serde(rename_all = "camelCase")]
    RatingPrompt {
        conversation_id: ConversationId,
        user_ids: [UserId; 2],
    },
}

/// Delivers notifications. Callers bound every call with a timeout.
#[async_trait]
pub trait Notifier: PluginAdapter {
    async fn notify(&self, notification: &Notification) -> Result<(), NestchatError>;
}
