// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Nestchat conversation engine.
//!
//! This crate provides the error taxonomy, the domain types, and the adapter
//! traits (store, notifier, translator) that every other crate builds on.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ForbiddenReason, NestchatError, Violation};
pub use types::{
    AdapterType, ConversationId, HealthStatus, MessageId, MessageType, UserId, MAX_CONTENT_CHARS,
};

pub use traits::{ChatStore, Notification, Notifier, PluginAdapter, Translator};
