// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all pluggable collaborators implement.
//!
//! Each market owns one [`ChatStore`](crate::ChatStore); the notifier and the
//! translator are shared across markets. `GET /health` reports every market
//! store's [`PluginAdapter::health_check`], and process shutdown closes the
//! stores before the notifier is dropped.

use async_trait::async_trait;

use crate::error::NestchatError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, lifecycle, and health for every adapter (store, notifier, translator).
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, NestchatError>;

    /// Releases held resources. A store flushes its WAL here; a webhook
    /// notifier has nothing to release.
    async fn shutdown(&self) -> Result<(), NestchatError>;
}
