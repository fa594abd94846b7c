// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification delivery: webhook and log notifiers plus a bounded dispatcher.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nestchat_config::model::NotificationConfig;
use nestchat_core::types::{AdapterType, HealthStatus};
use nestchat_core::{NestchatError, Notification, Notifier, PluginAdapter};
use tracing::{debug, info, warn, Instrument};

/// Posts every notification as JSON to a push gateway.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NestchatError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NestchatError::Upstream {
                service: "notifier",
                source: Box::new(e),
            })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
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
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NestchatError> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| NestchatError::Upstream {
                service: "notifier",
                source: Box::new(e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NestchatError::Upstream {
                service: "notifier",
                source: format!("push gateway returned {status}: {body}").into(),
            });
        }
        debug!(status = %status, "notification delivered");
        Ok(())
    }
}

/// Used when no webhook is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl PluginAdapter for LogNotifier {
    fn name(&self) -> &str {
        "log"
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
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NestchatError> {
        match notification {
            Notification::NewMessage { recipient, message } => {
                info!(recipient = %recipient, message_id = %message.id, "new message notification");
            }
            Notification::RatingPrompt {
                conversation_id,
                user_ids,
            } => {
                info!(
                    conversation_id = %conversation_id,
                    first = %user_ids[0],
                    second = %user_ids[1],
                    "rating prompt notification"
                );
            }
        }
        Ok(())
    }
}

/// Builds the notifier `[notifications]` asks for.
pub fn notifier_from_config(
    config: &NotificationConfig,
) -> Result<Arc<dyn Notifier>, NestchatError> {
    match &config.webhook_url {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(
            url.clone(),
            Duration::from_millis(config.timeout_ms),
        )?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}

/// Wraps a notifier with a timeout and a fire-and-forget mode.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, timeout: Duration) -> Self {
        Self { notifier, timeout }
    }

    /// Delivers and waits. Timeouts surface as upstream failures.
    pub async fn dispatch(&self, notification: &Notification) -> Result<(), NestchatError> {
        match tokio::time::timeout(self.timeout, self.notifier.notify(notification)).await {
            Ok(result) => result,
            Err(elapsed) => Err(NestchatError::Upstream {
                service: "notifier",
                source: Box::new(elapsed),
            }),
        }
    }

    /// Delivers in the background, inside the caller's span. Failures are
    /// logged, never returned.
    pub fn spawn(&self, notification: Notification) {
        let dispatcher = self.clone();
        tokio::spawn(
            async move {
                if let Err(e) = dispatcher.dispatch(&notification).await {
                    warn!(
                        notifier = dispatcher.notifier.name(),
                        error = %e,
                        "notification delivery failed"
                    );
                }
            }
            .in_current_span(),
        );
    }
}
