// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notifier for deterministic testing.
//!
//! `MockNotifier` captures every notification it is handed. Background
//! dispatches land asynchronously, so tests wait with [`MockNotifier::wait_for`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use nestchat_core::types::{AdapterType, HealthStatus};
use nestchat_core::{NestchatError, Notification, Notifier, PluginAdapter};

pub struct MockNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    notify: Arc<Notify>,
    failing: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Makes every following `notify` call fail with an upstream error.
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    pub async fn rating_prompts(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|n| matches!(n, Notification::RatingPrompt { .. }))
            .cloned()
            .collect()
    }

    /// Waits until at least `count` notifications arrived or `timeout` passed.
    /// Returns what was captured either way.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Notification> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let mut notified = std::pin::pin!(self.notify.notified());
            notified.as_mut().enable();
            {
                let sent = self.sent.lock().await;
                if sent.len() >= count {
                    return sent.clone();
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                let sent = self.sent.lock().await.clone();
                tracing::warn!(
                    expected = count,
                    received = sent.len(),
                    "mock notifier timed out waiting for notifications"
                );
                return sent;
            }
        }
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockNotifier {
    fn name(&self) -> &str {
        "mock-notifier"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notifier
    }

    async fn health_check(&self) -> Result<HealthStatus, NestchatError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), NestchatError> {
        Ok(())
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NestchatError> {
        if self.failing.load(Ordering::SeqCst) {
            tracing::debug!(?notification, "mock notifier rejecting notification");
            return Err(NestchatError::Upstream {
                service: "notifier",
                source: "mock notifier set to fail".into(),
            });
        }
        self.sent.lock().await.push(notification.clone());
        self.notify.notify_waiters();
        Ok(())
    }
}
