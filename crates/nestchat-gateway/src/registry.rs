// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One conversation service per configured market.
//!
//! Stores are opened when the registry is built and closed by
//! [`MarketRegistry::shutdown`]; nothing is opened lazily.

use std::collections::BTreeMap;
use std::sync::Arc;

use nestchat_config::NestchatConfig;
use nestchat_core::types::HealthStatus;
use nestchat_core::{ChatStore, NestchatError, Translator};
use nestchat_engine::{notifier_from_config, CatalogTranslator, ConversationService};
use nestchat_storage::SqliteStore;
use tracing::{info, warn};

pub struct MarketRegistry {
    default_market: String,
    markets: BTreeMap<String, Arc<ConversationService>>,
}

impl MarketRegistry {
    pub fn new(default_market: impl Into<String>) -> Self {
        Self {
            default_market: default_market.into(),
            markets: BTreeMap::new(),
        }
    }

    /// Opens every market's store and builds its service.
    pub async fn from_config(config: &NestchatConfig) -> Result<Self, NestchatError> {
        let translator: Arc<dyn Translator> =
            Arc::new(CatalogTranslator::new(&config.translations));
        let notifier = notifier_from_config(&config.notifications)?;

        let mut registry = Self::new(config.service.default_market.clone());
        for market in &config.markets {
            let store = SqliteStore::new(market.clone());
            store.initialize().await?;
            info!(market = %market.id, path = %market.database_path, "market store opened");
            registry.insert(Arc::new(ConversationService::new(
                config,
                market.clone(),
                Arc::new(store),
                translator.clone(),
                notifier.clone(),
            )));
        }
        Ok(registry)
    }

    pub fn insert(&mut self, service: Arc<ConversationService>) {
        self.markets.insert(service.market().to_string(), service);
    }

    /// The named market, or the default one when `market` is `None`.
    pub fn get(&self, market: Option<&str>) -> Result<Arc<ConversationService>, NestchatError> {
        let id = market.unwrap_or(&self.default_market);
        self.markets
            .get(id)
            .cloned()
            .ok_or_else(|| NestchatError::not_found("market", id))
    }

    pub fn market_ids(&self) -> impl Iterator<Item = &str> {
        self.markets.keys().map(String::as_str)
    }

    pub async fn health(&self) -> Vec<(String, HealthStatus)> {
        let mut report = Vec::with_capacity(self.markets.len());
        for (id, service) in &self.markets {
            report.push((id.clone(), service.health().await));
        }
        report
    }

    /// Closes every store. Failures are logged and do not stop the others.
    pub async fn shutdown(&self) {
        for (id, service) in &self.markets {
            if let Err(e) = service.shutdown().await {
                warn!(market = %id, error = %e, "failed to close market store");
            }
        }
    }
}
