// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock translator returning fixed text.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use nestchat_core::types::{AdapterType, HealthStatus};
use nestchat_core::{NestchatError, PluginAdapter, Translator};

/// Answers every key with `"[<locale>] <key>"` unless an override is set.
pub struct MockTranslator {
    overrides: HashMap<String, String>,
    failing: AtomicBool,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
            failing: AtomicBool::new(false),
        }
    }

    /// Fixed text for `key`, regardless of locale.
    pub fn with_text(mut self, key: &str, text: &str) -> Self {
        self.overrides.insert(key.to_string(), text.to_string());
        self
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Default for MockTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTranslator {
    fn name(&self) -> &str {
        "mock-translator"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Translator
    }

    async fn health_check(&self) -> Result<HealthStatus, NestchatError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), NestchatError> {
        Ok(())
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, locale: &str, key: &str) -> Result<String, NestchatError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NestchatError::Upstream {
                service: "translator",
                source: "mock translator set to fail".into(),
            });
        }
        Ok(self
            .overrides
            .get(key)
            .cloned()
            .unwrap_or_else(|| format!("[{locale}] {key}")))
    }
}
