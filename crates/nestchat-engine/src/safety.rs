// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Safety-tips injection.
//!
//! Fires once per sender->recipient direction, on the send that brings the
//! sender's count (safety tips excluded) to the trigger count. Callers hold
//! the pair lock, so two concurrent sends cannot both observe the trigger.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use nestchat_core::types::{ConversationBinding, Message, MessageFilter, MessageType, NewMessage, User};
use nestchat_core::{ChatStore, NestchatError, Translator};
use tracing::{debug, warn};

/// Catalog key for the injected text.
pub const SAFETY_TIPS_KEY: &str = "safety_tips";

pub struct SafetyInjector {
    enabled: bool,
    trigger_count: u64,
    translator: Arc<dyn Translator>,
    timeout: Duration,
}

impl SafetyInjector {
    pub fn new(
        enabled: bool,
        trigger_count: u64,
        translator: Arc<dyn Translator>,
        timeout: Duration,
    ) -> Self {
        Self {
            enabled,
            trigger_count,
            translator,
            timeout,
        }
    }

    /// Appends a safety message after `trigger` when due.
    ///
    /// The message is authored as the sender and stamped one second after
    /// the trigger. A failed or slow translation skips the injection.
    pub async fn maybe_inject(
        &self,
        store: &dyn ChatStore,
        trigger: &Message,
        sender: &User,
        recipient: &User,
    ) -> Result<Option<Message>, NestchatError> {
        if !self.enabled || sender.safety_messages_disabled {
            return Ok(None);
        }

        let sent = store
            .count_sent_messages(
                &sender.id,
                &recipient.id,
                &MessageFilter::hiding(MessageType::SafetyTips),
            )
            .await?;
        if sent != self.trigger_count {
            return Ok(None);
        }

        let content = match tokio::time::timeout(
            self.timeout,
            self.translator.translate(&recipient.locale, SAFETY_TIPS_KEY),
        )
        .await
        {
            Ok(Ok(content)) => content,
            Ok(Err(e)) => {
                warn!(locale = %recipient.locale, error = %e, "safety tips translation failed");
                return Ok(None);
            }
            Err(_) => {
                warn!(locale = %recipient.locale, timeout = ?self.timeout, "safety tips translation timed out");
                return Ok(None);
            }
        };

        let binding = match trigger.conversation_id {
            Some(id) => ConversationBinding::Existing(id),
            None => ConversationBinding::GetOrCreate,
        };
        let draft = NewMessage::new(
            sender.id.clone(),
            recipient.id.clone(),
            content,
            MessageType::SafetyTips,
            trigger.created_at + TimeDelta::seconds(1),
        )
        .with_conversation(binding);

        let injected = store.append_message(draft).await?;
        debug!(
            sender = %sender.id,
            recipient = %recipient.id,
            message_id = %injected.id,
            "safety tips injected"
        );
        Ok(Some(injected))
    }
}

/// Whether to offer `user` to switch safety messages off.
pub async fn safety_tips_ask_disable(
    store: &dyn ChatStore,
    user: &User,
    threshold: u64,
) -> Result<bool, NestchatError> {
    if user.safety_messages_disabled {
        return Ok(false);
    }
    let received = store
        .count_participated_messages_of_type(&user.id, MessageType::SafetyTips)
        .await?;
    Ok(received >= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{send, store, user, BrokenTranslator};
    use crate::translate::CatalogTranslator;
    use chrono::Utc;
    use nestchat_config::model::TranslationConfig;
    use nestchat_core::types::Role;
    use tempfile::tempdir;

    fn injector(enabled: bool) -> SafetyInjector {
        SafetyInjector::new(
            enabled,
            2,
            Arc::new(CatalogTranslator::new(&TranslationConfig::default())),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn fires_on_second_message_only() {
        let dir = tempdir().unwrap();
        let (x, y) = (user("x", Role::Parent), user("y", Role::Babysitter));
        let store = store(&dir, &[x.clone(), y.clone()]).await;
        let injector = injector(true);
        let now = Utc::now();

        let first = send(&store, &x, &y, MessageType::Regular, now).await;
        assert!(injector.maybe_inject(store.as_ref(), &first, &x, &y).await.unwrap().is_none());

        let second = send(&store, &x, &y, MessageType::Regular, now).await;
        let injected = injector
            .maybe_inject(store.as_ref(), &second, &x, &y)
            .await
            .unwrap()
            .expect("safety message on second send");
        assert_eq!(injected.message_type, MessageType::SafetyTips);
        assert_eq!(injected.sender_id, x.id);
        assert_eq!(injected.created_at, second.created_at + TimeDelta::seconds(1));
        assert_eq!(injected.conversation_id, second.conversation_id);

        let third = send(&store, &x, &y, MessageType::Regular, now).await;
        assert!(injector.maybe_inject(store.as_ref(), &third, &x, &y).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn partner_messages_do_not_count() {
        let dir = tempdir().unwrap();
        let (x, y) = (user("x", Role::Parent), user("y", Role::Babysitter));
        let store = store(&dir, &[x.clone(), y.clone()]).await;
        let injector = injector(true);

        send(&store, &y, &x, MessageType::Regular, Utc::now()).await;
        let mine = send(&store, &x, &y, MessageType::Regular, Utc::now()).await;
        assert!(injector.maybe_inject(store.as_ref(), &mine, &x, &y).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn disabled_market_or_sender_skips() {
        let dir = tempdir().unwrap();
        let mut x = user("x", Role::Parent);
        let y = user("y", Role::Babysitter);
        let store = store(&dir, &[x.clone(), y.clone()]).await;
        send(&store, &x, &y, MessageType::Regular, Utc::now()).await;
        let second = send(&store, &x, &y, MessageType::Regular, Utc::now()).await;

        let off = injector(false);
        assert!(off.maybe_inject(store.as_ref(), &second, &x, &y).await.unwrap().is_none());

        x.safety_messages_disabled = true;
        let on = injector(true);
        assert!(on.maybe_inject(store.as_ref(), &second, &x, &y).await.unwrap().is_none());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn translation_failure_skips_with_warning() {
        let dir = tempdir().unwrap();
        let (x, y) = (user("x", Role::Parent), user("y", Role::Babysitter));
        let store = store(&dir, &[x.clone(), y.clone()]).await;
        let injector = SafetyInjector::new(true, 2, Arc::new(BrokenTranslator), Duration::from_secs(1));

        send(&store, &x, &y, MessageType::Regular, Utc::now()).await;
        let second = send(&store, &x, &y, MessageType::Regular, Utc::now()).await;
        assert!(injector.maybe_inject(store.as_ref(), &second, &x, &y).await.unwrap().is_none());
        assert!(logs_contain("safety tips translation failed"));
    }

    #[tokio::test]
    async fn ask_disable_after_threshold() {
        let dir = tempdir().unwrap();
        let x = user("x", Role::Parent);
        let (a, b, c) = (
            user("a", Role::Babysitter),
            user("b", Role::Babysitter),
            user("c", Role::Babysitter),
        );
        let store = store(&dir, &[x.clone(), a.clone(), b.clone(), c.clone()]).await;

        send(&store, &a, &x, MessageType::SafetyTips, Utc::now()).await;
        send(&store, &b, &x, MessageType::SafetyTips, Utc::now()).await;
        assert!(!safety_tips_ask_disable(store.as_ref(), &x, 3).await.unwrap());

        send(&store, &x, &c, MessageType::SafetyTips, Utc::now()).await;
        assert!(safety_tips_ask_disable(store.as_ref(), &x, 3).await.unwrap());

        let mut opted_out = x.clone();
        opted_out.safety_messages_disabled = true;
        assert!(!safety_tips_ask_disable(store.as_ref(), &opted_out, 3).await.unwrap());
    }
}
