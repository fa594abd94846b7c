// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation policy engine.
//!
//! Pure policy modules (gating, analytics, feed merging, pagination,
//! successful detection) sit beside the adapters for side effects
//! (notifications, translations) and the [`ConversationService`] that
//! orchestrates them against a [`ChatStore`](nestchat_core::ChatStore).

pub mod analytics;
pub mod autoreject;
pub mod feed;
pub mod locks;
pub mod notify;
pub mod pagination;
pub mod policy;
pub mod safety;
pub mod service;
pub mod successful;
pub mod translate;

#[cfg(test)]
mod testing;

pub use feed::FeedItem;
pub use notify::{notifier_from_config, LogNotifier, NotificationDispatcher, WebhookNotifier};
pub use pagination::{Cursor, PageMeta, PageParams, Paginator};
pub use service::{
    ConversationService, FeedMeta, FeedPage, FeedQuery, MessagePage, MessageQuery, MessagesMeta,
    SentMessage,
};
pub use translate::CatalogTranslator;
