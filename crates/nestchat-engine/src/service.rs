// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-market conversation service.
//!
//! Wires the store, the policies, and the side-effect adapters into the
//! operations the gateway exposes. Writes for one unordered pair are
//! serialized through [`PairLocks`]; reads take no locks.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use nestchat_config::model::{MarketConfig, NestchatConfig, PolicyConfig};
use nestchat_core::types::{
    Conversation, FeedFilter, HealthStatus, JobPostingInvitation, Message, MessageFilter,
    MessageId, MessageType, NewMessage, RateLimitPeriod, User, UserId,
};
use nestchat_core::{ChatStore, NestchatError, Notification, Notifier, Translator};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analytics::{self, EngagementThresholds, ResponseRate};
use crate::autoreject;
use crate::feed::{merge_feed, FeedItem};
use crate::locks::PairLocks;
use crate::notify::NotificationDispatcher;
use crate::pagination::{PageMeta, PageParams, Paginator};
use crate::policy::{can_send_initial_message, rate_limit_meta, RateLimitMeta};
use crate::safety::{safety_tips_ask_disable, SafetyInjector};
use crate::successful::is_successful;

/// Attempts after the first before a store conflict is given up on.
const CONFLICT_RETRIES: u32 = 3;

const CONFLICT_BACKOFF: Duration = Duration::from_millis(25);

/// Result of a successful send.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: Message,
    /// Appended right after `message` when the safety trigger fired.
    pub safety_message: Option<Message>,
    pub rate_limit_warning: Option<RateLimitPeriod>,
    /// Whether this send made the conversation successful.
    pub became_successful: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesMeta {
    #[serde(flatten)]
    pub page: PageMeta,
    pub ask_for_recommendation: bool,
    #[serde(flatten)]
    pub rate_limit: RateLimitMeta,
    pub safety_tips: bool,
    pub ask_disable_safety_messages: bool,
    pub chat_partner_online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_posting: Option<JobPostingInvitation>,
}

#[derive(Debug, Clone)]
pub struct MessagePage {
    pub partner: User,
    pub messages: Vec<Message>,
    pub meta: MessagesMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMeta {
    #[serde(flatten)]
    pub page: PageMeta,
    pub total_unread_messages_count: u64,
    pub response_rate: ResponseRate,
    pub no_replies_received: bool,
    pub auto_rejectable_users: Vec<UserId>,
}

#[derive(Debug, Clone)]
pub struct FeedPage {
    /// Empty when only the meta block was requested.
    pub items: Vec<FeedItem>,
    pub meta: FeedMeta,
}

/// Input for [`ConversationService::list_messages`].
#[derive(Debug, Clone, Default)]
pub struct MessageQuery {
    pub page: PageParams,
    pub filter: MessageFilter,
}

/// Input for [`ConversationService::list_conversations`].
#[derive(Debug, Clone, Default)]
pub struct FeedQuery {
    pub page: PageParams,
    pub filter: FeedFilter,
    pub meta_only: bool,
}

/// Orchestrates every conversation operation for one market.
pub struct ConversationService {
    market: MarketConfig,
    store: Arc<dyn ChatStore>,
    paginator: Paginator,
    thresholds: EngagementThresholds,
    policy: PolicyConfig,
    safety: SafetyInjector,
    notifications: NotificationDispatcher,
    locks: PairLocks,
}

impl ConversationService {
    pub fn new(
        config: &NestchatConfig,
        market: MarketConfig,
        store: Arc<dyn ChatStore>,
        translator: Arc<dyn Translator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let safety = SafetyInjector::new(
            market.safety_messages,
            config.policy.safety_trigger_count,
            translator,
            Duration::from_millis(config.translations.timeout_ms),
        );
        let notifications = NotificationDispatcher::new(
            notifier,
            Duration::from_millis(config.notifications.timeout_ms),
        );
        Self {
            market,
            store,
            paginator: Paginator::new(&config.pagination),
            thresholds: EngagementThresholds::from_policy(&config.policy),
            policy: config.policy.clone(),
            safety,
            notifications,
            locks: PairLocks::new(),
        }
    }

    pub fn market(&self) -> &str {
        &self.market.id
    }

    pub fn store(&self) -> &Arc<dyn ChatStore> {
        &self.store
    }

    pub fn thresholds(&self) -> &EngagementThresholds {
        &self.thresholds
    }

    async fn user(&self, id: &UserId) -> Result<User, NestchatError> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| NestchatError::not_found("user", id))
    }

    async fn partner(&self, url: &str) -> Result<User, NestchatError> {
        self.store
            .get_user_by_url(url)
            .await?
            .ok_or_else(|| NestchatError::not_found("chat partner", url))
    }

    /// Sends a regular message from `viewer` to the user behind `partner_url`.
    ///
    /// Gating, the insert, the successful recomputation, and safety
    /// injection all run under the pair lock. Notifications are dispatched
    /// after the lock is released and never fail the send.
    pub async fn send_message(
        &self,
        viewer: &UserId,
        partner_url: &str,
        content: String,
    ) -> Result<SentMessage, NestchatError> {
        let sender = self.user(viewer).await?;
        let recipient = self.partner(partner_url).await?;

        let draft = NewMessage::new(
            sender.id.clone(),
            recipient.id.clone(),
            content,
            MessageType::Regular,
            Utc::now(),
        );
        draft.validate()?;

        let guard = self.locks.lock(&sender.id, &recipient.id).await;

        let is_first = !self
            .store
            .has_any_message(&sender.id, &recipient.id)
            .await?;
        let rate_limit_warning =
            can_send_initial_message(&sender, &recipient, is_first).into_result()?;

        let message = retry_on_conflict(|| self.store.append_message(draft.clone())).await?;

        let became_successful = match self.update_successful(&message).await {
            Ok(Some(conversation)) => {
                self.notifications.spawn(Notification::RatingPrompt {
                    conversation_id: conversation.id,
                    user_ids: [conversation.user1_id, conversation.user2_id],
                });
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "successful recomputation failed");
                false
            }
        };

        let safety_message = match self
            .safety
            .maybe_inject(self.store.as_ref(), &message, &sender, &recipient)
            .await
        {
            Ok(injected) => injected,
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "safety injection failed");
                None
            }
        };

        drop(guard);

        info!(
            market = %self.market.id,
            sender = %sender.id,
            recipient = %recipient.id,
            message_id = %message.id,
            initial = message.initial,
            "message sent"
        );
        self.notifications.spawn(Notification::NewMessage {
            recipient: recipient.id,
            message: message.clone(),
        });

        Ok(SentMessage {
            message,
            safety_message,
            rate_limit_warning,
            became_successful,
        })
    }

    /// Marks the pair's conversation successful once enough sender changes
    /// have happened. Returns the conversation when this call set the flag.
    ///
    /// Senders are read newest first in growing windows, stopping as soon as
    /// the threshold is reached or history runs out.
    async fn update_successful(
        &self,
        message: &Message,
    ) -> Result<Option<Conversation>, NestchatError> {
        let Some(conversation) = self
            .store
            .find_conversation(&message.sender_id, &message.receiver_id)
            .await?
        else {
            return Ok(None);
        };
        if conversation.successful_at.is_some() {
            return Ok(None);
        }

        let threshold = self.policy.successful_sender_changes;
        let mut limit = (threshold as u64 + 1).saturating_mul(2);
        loop {
            let senders = self
                .store
                .recent_senders(&message.sender_id, &message.receiver_id, limit)
                .await?;
            if is_successful(&senders, threshold) {
                let set = self
                    .store
                    .mark_conversation_successful(conversation.id, message.created_at)
                    .await?;
                if set {
                    info!(conversation_id = %conversation.id, "conversation became successful");
                }
                return Ok(set.then_some(conversation));
            }
            if (senders.len() as u64) < limit {
                return Ok(None);
            }
            limit = limit.saturating_mul(2);
        }
    }

    /// Moves the viewer's read marker to `last_read`, which must belong to
    /// the pair.
    pub async fn mark_read(
        &self,
        viewer: &UserId,
        partner_url: &str,
        last_read: MessageId,
    ) -> Result<(), NestchatError> {
        let viewer = self.user(viewer).await?;
        let partner = self.partner(partner_url).await?;
        let message = self
            .store
            .get_message(last_read)
            .await?
            .filter(|m| belongs_to_pair(m, &viewer.id, &partner.id))
            .ok_or_else(|| NestchatError::not_found("message", last_read))?;

        self.store.mark_read(&viewer.id, &partner.id, message.id).await?;
        debug!(viewer = %viewer.id, partner = %partner.id, last_read = %message.id, "marked read");
        Ok(())
    }

    /// Hides the conversation from the viewer's side. The partner still sees it.
    pub async fn delete_conversation(
        &self,
        viewer: &UserId,
        partner_url: &str,
    ) -> Result<(), NestchatError> {
        let viewer = self.user(viewer).await?;
        let partner = self.partner(partner_url).await?;
        let touched = self
            .store
            .soft_delete_conversation(&viewer.id, &partner.id)
            .await?;
        if touched == 0 {
            return Err(NestchatError::not_found("conversation", partner_url));
        }
        info!(viewer = %viewer.id, partner = %partner.id, messages = touched, "conversation deleted");
        Ok(())
    }

    /// One page of the thread with the partner, newest first, plus meta.
    pub async fn list_messages(
        &self,
        viewer: &UserId,
        partner_url: &str,
        query: MessageQuery,
    ) -> Result<MessagePage, NestchatError> {
        query.filter.validate()?;
        let cursor = self.paginator.resolve_params(query.page)?;

        let viewer = self.user(viewer).await?;
        let partner = self.partner(partner_url).await?;

        let mut filter = query.filter;
        if viewer.role.is_parent() && filter.hide_type.is_none() {
            filter.hide_type = Some(MessageType::InstantJob);
        }

        let (messages, total) = self
            .store
            .list_messages(&viewer.id, &partner.id, &filter, self.paginator.window(cursor))
            .await?;

        let now = Utc::now();
        let thread = self.store.thread_stats(&viewer.id, &partner.id).await?;
        let recommendations = self
            .store
            .count_recommendations(&partner.id, &viewer.id)
            .await?;
        let has_history = self.store.has_any_message(&viewer.id, &partner.id).await?;
        let ask_disable =
            safety_tips_ask_disable(self.store.as_ref(), &viewer, self.policy.safety_ask_disable_after)
                .await?;
        let job_posting = self
            .store
            .job_posting_invitations(&viewer.id)
            .await?
            .into_iter()
            .filter(|inv| inv.counterpart_of(&viewer.id) == Some(&partner.id))
            .max_by_key(|inv| inv.created_at);

        let meta = MessagesMeta {
            page: self.paginator.meta(cursor, total),
            ask_for_recommendation: analytics::ask_for_recommendation(
                &thread,
                recommendations,
                now,
                &self.thresholds,
            ),
            rate_limit: rate_limit_meta(&viewer, has_history),
            safety_tips: self.market.safety_messages && !viewer.safety_messages_disabled,
            ask_disable_safety_messages: ask_disable,
            chat_partner_online: analytics::chat_partner_online(
                partner.last_login,
                now,
                &self.thresholds,
            ),
            job_posting,
        };

        Ok(MessagePage {
            partner,
            messages,
            meta,
        })
    }

    /// The viewer's feed: conversations merged with job-posting invitations.
    ///
    /// Aggregates are computed over the whole list; the page slice is taken
    /// after the merge.
    pub async fn list_conversations(
        &self,
        viewer: &UserId,
        query: FeedQuery,
    ) -> Result<FeedPage, NestchatError> {
        let cursor = self.paginator.resolve_params(query.page)?;
        let viewer = self.user(viewer).await?;

        let conversations = self
            .store
            .list_conversations(&viewer.id, &query.filter)
            .await?;

        let now = Utc::now();
        let total_unread_messages_count = analytics::total_unread_messages(&conversations);
        let response_rate = analytics::response_rate(&conversations, now, &self.thresholds);
        let no_replies_received =
            analytics::no_replies_received(viewer.role, &conversations, now, &self.thresholds);
        let auto_rejectable_users = analytics::auto_rejectable_users(&conversations);

        let invitations = match query.filter {
            FeedFilter::All => self.store.job_posting_invitations(&viewer.id).await?,
            FeedFilter::WithMessageTypes(_) => Vec::new(),
        };
        let merged = merge_feed(&viewer.id, viewer.role, conversations, invitations);
        let page = self.paginator.meta(cursor, merged.len() as u64);

        let items = if query.meta_only {
            Vec::new()
        } else {
            self.paginator.slice(cursor, merged)
        };

        Ok(FeedPage {
            items,
            meta: FeedMeta {
                page,
                total_unread_messages_count,
                response_rate,
                no_replies_received,
                auto_rejectable_users,
            },
        })
    }

    /// Re-sends the push notification for a message the viewer sent to the
    /// partner. Waits for delivery.
    pub async fn notify(
        &self,
        viewer: &UserId,
        partner_url: &str,
        message_id: MessageId,
    ) -> Result<(), NestchatError> {
        let partner = self.partner(partner_url).await?;
        let message = self
            .store
            .get_message(message_id)
            .await?
            .filter(|m| &m.sender_id == viewer && m.receiver_id == partner.id)
            .ok_or_else(|| NestchatError::not_found("message", message_id))?;

        self.notifications
            .dispatch(&Notification::NewMessage {
                recipient: partner.id,
                message,
            })
            .await
    }

    /// Sends an auto-rejection to each recipient in one write.
    ///
    /// Unknown recipients are skipped; if none resolve the call fails with
    /// `NotFound`. A single recipient is only allowed when everything the
    /// viewer sent them was an instant job.
    pub async fn auto_reject(
        &self,
        viewer: &UserId,
        recipient_ids: &[UserId],
    ) -> Result<Vec<Message>, NestchatError> {
        autoreject::validate_recipients(viewer, recipient_ids)?;
        let sender = self.user(viewer).await?;

        let recipients = self.store.get_users(recipient_ids).await?;
        if recipients.len() < recipient_ids.len() {
            let missing: Vec<&UserId> = recipient_ids
                .iter()
                .filter(|id| !recipients.iter().any(|u| &u.id == *id))
                .collect();
            warn!(sender = %sender.id, ?missing, "auto-rejection skips unknown recipients");
        }
        if recipients.is_empty() {
            return Err(NestchatError::not_found(
                "user",
                recipient_ids
                    .iter()
                    .map(UserId::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
            ));
        }

        if let [only] = recipient_ids {
            let sent = self.store.sent_message_types(&sender.id, only).await?;
            autoreject::check_single_recipient(&sent)?;
        }

        let mut targets = Vec::with_capacity(recipients.len());
        for recipient in &recipients {
            let conversation = self
                .store
                .find_conversation(&sender.id, &recipient.id)
                .await?
                .map(|c| c.id);
            targets.push((recipient.id.clone(), conversation));
        }

        let drafts = autoreject::build_batch(&sender, &targets, Utc::now());
        let messages = retry_on_conflict(|| self.store.append_messages(drafts.clone())).await?;
        info!(sender = %sender.id, count = messages.len(), "auto-rejections sent");
        Ok(messages)
    }

    pub async fn health(&self) -> HealthStatus {
        match self.store.health_check().await {
            Ok(status) => status,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        }
    }

    /// Closes the market's store.
    pub async fn shutdown(&self) -> Result<(), NestchatError> {
        self.store.close().await
    }
}

fn belongs_to_pair(message: &Message, a: &UserId, b: &UserId) -> bool {
    (&message.sender_id == a && &message.receiver_id == b)
        || (&message.sender_id == b && &message.receiver_id == a)
}

/// Re-runs `op` while the store reports contention. Exhausted retries
/// surface as a storage error, never as a conflict.
async fn retry_on_conflict<T, F, Fut>(mut op: F) -> Result<T, NestchatError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NestchatError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(NestchatError::Conflict { message }) => {
                if attempt >= CONFLICT_RETRIES {
                    return Err(NestchatError::Storage {
                        source: format!("store contention persisted: {message}").into(),
                    });
                }
                attempt += 1;
                debug!(attempt, %message, "retrying after store conflict");
                tokio::time::sleep(CONFLICT_BACKOFF * attempt).await;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{send, store, user, RecordingNotifier};
    use crate::translate::CatalogTranslator;
    use chrono::TimeDelta;
    use nestchat_core::types::{RateLimitState, Role};
    use nestchat_core::{ForbiddenReason, MAX_CONTENT_CHARS};
    use nestchat_storage::SqliteStore;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _dir: TempDir,
        store: Arc<SqliteStore>,
        notifier: Arc<RecordingNotifier>,
        service: Arc<ConversationService>,
    }

    async fn fixture(users: &[User]) -> Fixture {
        fixture_with(users, NestchatConfig::default()).await
    }

    async fn fixture_with(users: &[User], config: NestchatConfig) -> Fixture {
        let dir = tempdir().unwrap();
        let store = store(&dir, users).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let service = ConversationService::new(
            &config,
            MarketConfig {
                id: "test".into(),
                ..MarketConfig::default()
            },
            store.clone(),
            Arc::new(CatalogTranslator::new(&config.translations)),
            notifier.clone(),
        );
        Fixture {
            _dir: dir,
            store,
            notifier,
            service: Arc::new(service),
        }
    }

    fn pair() -> (User, User) {
        (user("x", Role::Parent), user("y", Role::Babysitter))
    }

    #[tokio::test]
    async fn first_send_creates_conversation_then_safety_then_success() {
        let (x, y) = pair();
        let f = fixture(&[x.clone(), y.clone()]).await;
        let svc = &f.service;

        let first = svc.send_message(&x.id, &y.url, "hi".into()).await.unwrap();
        assert!(first.message.initial);
        assert!(first.message.conversation_id.is_some());
        assert!(first.safety_message.is_none());

        let second = svc.send_message(&x.id, &y.url, "still there?".into()).await.unwrap();
        assert!(!second.message.initial);
        let safety = second.safety_message.expect("safety tips on second send");
        assert_eq!(safety.created_at, second.message.created_at + TimeDelta::seconds(1));
        assert_eq!(safety.conversation_id, first.message.conversation_id);

        let mut successes = 0;
        for (from, to) in [(&y, &x), (&x, &y), (&y, &x), (&x, &y), (&y, &x)] {
            let sent = svc.send_message(&from.id, &to.url, "turn".into()).await.unwrap();
            assert!(sent.safety_message.is_none() || from.id == y.id);
            if sent.became_successful {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);

        let conversation = f.store.find_conversation(&x.id, &y.id).await.unwrap().unwrap();
        assert!(conversation.successful_at.is_some());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(f.notifier.rating_prompts(), 1);
    }

    #[tokio::test]
    async fn non_premium_cannot_start_but_can_reply() {
        let (x, mut y) = pair();
        y.premium = false;
        let f = fixture(&[x.clone(), y.clone()]).await;

        let err = f.service.send_message(&y.id, &x.url, "hi".into()).await.unwrap_err();
        assert!(matches!(err, NestchatError::Forbidden(ForbiddenReason::NotPremium)));
        assert!(f.store.find_conversation(&x.id, &y.id).await.unwrap().is_none());

        f.service.send_message(&x.id, &y.url, "hi".into()).await.unwrap();
        f.service.send_message(&y.id, &x.url, "hello".into()).await.unwrap();
    }

    #[tokio::test]
    async fn rate_limit_states() {
        let (mut x, y) = pair();
        x.rate_limit = RateLimitState::Exceeded;
        let f = fixture(&[x.clone(), y.clone()]).await;
        let err = f.service.send_message(&x.id, &y.url, "hi".into()).await.unwrap_err();
        assert!(matches!(err, NestchatError::RateLimited { .. }));

        x.rate_limit = RateLimitState::Warning(RateLimitPeriod::Week);
        f.store.upsert_user(&x).await.unwrap();
        let sent = f.service.send_message(&x.id, &y.url, "hi".into()).await.unwrap();
        assert_eq!(sent.rate_limit_warning, Some(RateLimitPeriod::Week));
    }

    #[tokio::test]
    async fn content_boundary_is_rejected_not_truncated() {
        let (x, y) = pair();
        let f = fixture(&[x.clone(), y.clone()]).await;

        let ok = f
            .service
            .send_message(&x.id, &y.url, "a".repeat(MAX_CONTENT_CHARS))
            .await
            .unwrap();
        assert_eq!(ok.message.content.chars().count(), MAX_CONTENT_CHARS);

        let err = f
            .service
            .send_message(&x.id, &y.url, "a".repeat(MAX_CONTENT_CHARS + 1))
            .await
            .unwrap_err();
        assert_eq!(err.violations()[0].code, "content_too_long");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_sends_share_one_conversation() {
        let (x, y) = pair();
        let f = fixture(&[x.clone(), y.clone()]).await;

        let a = {
            let svc = f.service.clone();
            let (from, to) = (x.id.clone(), y.url.clone());
            tokio::spawn(async move { svc.send_message(&from, &to, "hi".into()).await })
        };
        let b = {
            let svc = f.service.clone();
            let (from, to) = (y.id.clone(), x.url.clone());
            tokio::spawn(async move { svc.send_message(&from, &to, "hey".into()).await })
        };
        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();

        assert_eq!(a.message.conversation_id, b.message.conversation_id);
        assert!(a.message.initial ^ b.message.initial);
    }

    #[tokio::test]
    async fn delete_hides_for_viewer_only() {
        let (x, y) = pair();
        let f = fixture(&[x.clone(), y.clone()]).await;

        let err = f.service.delete_conversation(&x.id, &y.url).await.unwrap_err();
        assert!(matches!(err, NestchatError::NotFound { .. }));

        f.service.send_message(&x.id, &y.url, "hi".into()).await.unwrap();
        f.service.delete_conversation(&x.id, &y.url).await.unwrap();

        let mine = f.service.list_conversations(&x.id, FeedQuery::default()).await.unwrap();
        assert!(mine.items.is_empty());
        let theirs = f.service.list_conversations(&y.id, FeedQuery::default()).await.unwrap();
        assert_eq!(theirs.items.len(), 1);
    }

    #[tokio::test]
    async fn mark_read_requires_pair_message() {
        let (x, y) = pair();
        let z = user("z", Role::Babysitter);
        let f = fixture(&[x.clone(), y.clone(), z.clone()]).await;

        let to_x = f.service.send_message(&y.id, &x.url, "hi".into()).await.unwrap();
        let other = f.service.send_message(&z.id, &x.url, "hi".into()).await.unwrap();

        let before = f.service.list_conversations(&x.id, FeedQuery::default()).await.unwrap();
        assert_eq!(before.meta.total_unread_messages_count, 2);

        f.service.mark_read(&x.id, &y.url, to_x.message.id).await.unwrap();
        let err = f.service.mark_read(&x.id, &y.url, other.message.id).await.unwrap_err();
        assert!(matches!(err, NestchatError::NotFound { entity: "message", .. }));

        let after = f.service.list_conversations(&x.id, FeedQuery::default()).await.unwrap();
        assert_eq!(after.meta.total_unread_messages_count, 1);
    }

    #[tokio::test]
    async fn parents_do_not_see_instant_jobs() {
        let (x, y) = pair();
        let f = fixture(&[x.clone(), y.clone()]).await;
        f.service.send_message(&x.id, &y.url, "hi".into()).await.unwrap();
        f.store
            .append_message(NewMessage::new(
                y.id.clone(),
                x.id.clone(),
                "instant",
                MessageType::InstantJob,
                Utc::now(),
            ))
            .await
            .unwrap();

        let parent_view = f
            .service
            .list_messages(&x.id, &y.url, MessageQuery::default())
            .await
            .unwrap();
        assert_eq!(parent_view.meta.page.total_count, 1);
        assert!(parent_view
            .messages
            .iter()
            .all(|m| m.message_type != MessageType::InstantJob));

        let sitter_view = f
            .service
            .list_messages(&y.id, &x.url, MessageQuery::default())
            .await
            .unwrap();
        assert_eq!(sitter_view.meta.page.total_count, 2);
        assert!(sitter_view.meta.safety_tips);
        assert!(!sitter_view.meta.ask_for_recommendation);
        assert_eq!(sitter_view.partner.id, x.id);
    }

    #[tokio::test]
    async fn message_meta_reports_job_posting_and_rate_limit() {
        let (x, mut y) = pair();
        y.rate_limit = RateLimitState::Warning(RateLimitPeriod::Day);
        let f = fixture(&[x.clone(), y.clone()]).await;
        f.store
            .insert_job_posting(&JobPostingInvitation {
                id: "jp-1".into(),
                parent_id: x.id.clone(),
                foster_id: y.id.clone(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let page = f
            .service
            .list_messages(&y.id, &x.url, MessageQuery::default())
            .await
            .unwrap();
        assert_eq!(page.meta.job_posting.as_ref().map(|j| j.id.as_str()), Some("jp-1"));
        assert_eq!(page.meta.rate_limit.rate_limit_warning, Some(RateLimitPeriod::Day));

        let json = serde_json::to_value(&page.meta).unwrap();
        assert_eq!(json["rateLimitWarning"], "day");
        assert_eq!(json["totalCount"], 0);
        assert!(json.get("rateLimitExceeded").is_none());
    }

    #[tokio::test]
    async fn feed_meta_only_and_invitations() {
        let (x, y) = pair();
        let z = user("z", Role::Babysitter);
        let f = fixture(&[x.clone(), y.clone(), z.clone()]).await;
        f.service.send_message(&y.id, &x.url, "hi".into()).await.unwrap();
        f.store
            .insert_job_posting(&JobPostingInvitation {
                id: "jp-z".into(),
                parent_id: x.id.clone(),
                foster_id: z.id.clone(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let feed = f.service.list_conversations(&x.id, FeedQuery::default()).await.unwrap();
        assert_eq!(feed.items.len(), 2);
        assert!(matches!(feed.items[0], FeedItem::JobPosting { .. }));
        assert_eq!(feed.meta.auto_rejectable_users, vec![y.id.clone()]);
        assert_eq!(feed.meta.page.total_count, 2);

        let meta_only = f
            .service
            .list_conversations(
                &x.id,
                FeedQuery {
                    meta_only: true,
                    ..FeedQuery::default()
                },
            )
            .await
            .unwrap();
        assert!(meta_only.items.is_empty());
        assert_eq!(meta_only.meta.total_unread_messages_count, 1);

        let filtered = f
            .service
            .list_conversations(
                &x.id,
                FeedQuery {
                    filter: FeedFilter::WithMessageTypes(vec![MessageType::Regular]),
                    ..FeedQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(filtered.items.len(), 1);
    }

    #[tokio::test]
    async fn auto_reject_guards() {
        let x = user("x", Role::Babysitter);
        let (p1, p2) = (user("p1", Role::Parent), user("p2", Role::Parent));
        let f = fixture(&[x.clone(), p1.clone(), p2.clone()]).await;

        f.service.send_message(&p1.id, &x.url, "hi".into()).await.unwrap();
        f.service.send_message(&x.id, &p1.url, "hello".into()).await.unwrap();

        let err = f.service.auto_reject(&x.id, &[p1.id.clone()]).await.unwrap_err();
        assert!(matches!(
            err,
            NestchatError::Forbidden(ForbiddenReason::AutoRejectionNotAllowed)
        ));

        let sent = f
            .service
            .auto_reject(&x.id, &[p2.id.clone(), p1.id.clone()])
            .await
            .unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].receiver_id, p2.id);
        assert_eq!(sent[1].receiver_id, p1.id);
        assert!(sent.iter().all(|m| m.message_type == MessageType::AutoRejection));
        assert!(sent[0].conversation_id.is_none());
        assert!(sent[1].conversation_id.is_some());
        assert_eq!(sent[0].content, "autoRejection.babysitter.female");

        let err = f
            .service
            .auto_reject(&x.id, &[UserId::from("ghost")])
            .await
            .unwrap_err();
        assert!(matches!(err, NestchatError::NotFound { .. }));
    }

    #[tokio::test]
    async fn notify_checks_direction() {
        let (x, y) = pair();
        let f = fixture(&[x.clone(), y.clone()]).await;
        let sent = f.service.send_message(&x.id, &y.url, "hi".into()).await.unwrap();

        f.service.notify(&x.id, &y.url, sent.message.id).await.unwrap();
        let err = f.service.notify(&y.id, &x.url, sent.message.id).await.unwrap_err();
        assert!(matches!(err, NestchatError::NotFound { .. }));
    }

    #[tokio::test]
    async fn unknown_partner_is_not_found() {
        let (x, _) = pair();
        let f = fixture(&[x.clone()]).await;
        let err = f.service.send_message(&x.id, "nobody", "hi".into()).await.unwrap_err();
        assert!(matches!(err, NestchatError::NotFound { entity: "chat partner", .. }));
    }

    #[tokio::test]
    async fn conflicts_are_retried_then_reported_as_storage() {
        let mut calls = 0;
        let result: Result<(), NestchatError> = retry_on_conflict(|| {
            calls += 1;
            async {
                Err(NestchatError::Conflict {
                    message: "busy".into(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(NestchatError::Storage { .. })));
        assert_eq!(calls, CONFLICT_RETRIES + 1);
    }

    fn tiny_pages() -> NestchatConfig {
        let mut config = NestchatConfig::default();
        config.pagination.default_page_size = 2;
        config.pagination.max_page_size = 2;
        config
    }

    #[tokio::test]
    async fn feed_counts_and_pages_beyond_the_size_cap() {
        let x = user("x", Role::Parent);
        let sitters: Vec<User> = ["a", "b", "c"]
            .iter()
            .map(|id| user(id, Role::Babysitter))
            .collect();
        let mut users = sitters.clone();
        users.push(x.clone());
        let f = fixture_with(&users, tiny_pages()).await;
        for sitter in &sitters {
            f.service.send_message(&sitter.id, &x.url, "hi".into()).await.unwrap();
        }

        let second = f
            .service
            .list_conversations(
                &x.id,
                FeedQuery {
                    page: PageParams {
                        number: Some(2),
                        size: Some(2),
                    },
                    ..FeedQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(second.meta.page.total_count, 3);
        assert_eq!(second.meta.page.total_pages, 2);
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.meta.total_unread_messages_count, 3);
        assert_eq!(second.meta.auto_rejectable_users.len(), 3);

        let unbounded = f.service.list_conversations(&x.id, FeedQuery::default()).await.unwrap();
        assert_eq!(unbounded.items.len(), 2);
        assert_eq!(unbounded.meta.page.total_count, 3);
        assert_eq!(unbounded.meta.page.total_pages, 1);
    }

    #[tokio::test]
    async fn earlier_ask_outside_the_page_cap_still_counts() {
        let x = user("x", Role::Parent);
        let (asked, fresh) = (user("y", Role::Babysitter), user("z", Role::Babysitter));
        let f = fixture_with(&[x.clone(), asked.clone(), fresh.clone()], tiny_pages()).await;
        let start = Utc::now() - TimeDelta::days(10);

        send(&f.store, &x, &asked, MessageType::AskRecommendation, start).await;
        for (i, partner) in [&asked, &fresh].into_iter().enumerate() {
            for day in 1..=3 {
                let at = start + TimeDelta::days(day) + TimeDelta::minutes(i as i64);
                send(&f.store, partner, &x, MessageType::Regular, at).await;
            }
        }

        let page = f
            .service
            .list_messages(&x.id, &asked.url, MessageQuery::default())
            .await
            .unwrap();
        assert_eq!(page.messages.len(), 2);
        assert!(!page.meta.ask_for_recommendation);

        let control = f
            .service
            .list_messages(&x.id, &fresh.url, MessageQuery::default())
            .await
            .unwrap();
        assert!(control.meta.ask_for_recommendation);
    }
}
