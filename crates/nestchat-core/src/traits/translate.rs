// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Translation lookup for system-authored content.

use async_trait::async_trait;

use crate::error::NestchatError;
use crate::traits::adapter::PluginAdapter;

#[async_trait]
pub trait Translator: PluginAdapter {
    /// Localized text for `key`. Fails with `NotFound` when no catalog has it.
    async fn translate(&self, locale: &str, key: &str) -> Result<String, NestchatError>;
}
