// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod notify;
pub mod storage;
pub mod translate;

pub use adapter::PluginAdapter;
pub use notify::{Notification, Notifier};
pub use storage::ChatStore;
pub use translate::Translator;
