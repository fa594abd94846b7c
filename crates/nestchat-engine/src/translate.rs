// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config-backed translation catalog.

use std::collections::HashMap;

use async_trait::async_trait;
use nestchat_config::model::TranslationConfig;
use nestchat_core::types::{AdapterType, HealthStatus};
use nestchat_core::{NestchatError, PluginAdapter, Translator};

/// Looks keys up in the requested locale, then its language (`de` for
/// `de-CH`), then the fallback locale.
#[derive(Debug, Clone)]
pub struct CatalogTranslator {
    fallback_locale: String,
    catalog: HashMap<String, HashMap<String, String>>,
}

impl CatalogTranslator {
    pub fn new(config: &TranslationConfig) -> Self {
        Self {
            fallback_locale: config.fallback_locale.clone(),
            catalog: config.catalog.clone(),
        }
    }

    fn lookup(&self, locale: &str, key: &str) -> Option<&str> {
        self.catalog
            .get(locale)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    fn candidates<'a>(&'a self, locale: &'a str) -> Vec<&'a str> {
        let mut locales = vec![locale];
        if let Some((language, _)) = locale.split_once(['-', '_']) {
            locales.push(language);
        }
        locales.push(self.fallback_locale.as_str());
        locales
    }
}

#[async_trait]
impl PluginAdapter for CatalogTranslator {
    fn name(&self) -> &str {
        "catalog"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Translator
    }

    async fn health_check(&self) -> Result<HealthStatus, NestchatError> {
        if self.catalog.contains_key(&self.fallback_locale) {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded(format!(
                "fallback locale `{}` has no catalog",
                self.fallback_locale
            )))
        }
    }

    async fn shutdown(&self) -> Result<(), NestchatError> {
        Ok(())
    }
}

#[async_trait]
impl Translator for CatalogTranslator {
    async fn translate(&self, locale: &str, key: &str) -> Result<String, NestchatError> {
        self.candidates(locale)
            .into_iter()
            .find_map(|candidate| self.lookup(candidate, key))
            .map(str::to_string)
            .ok_or_else(|| NestchatError::not_found("translation", format!("{locale}/{key}")))
    }
}
