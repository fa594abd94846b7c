// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `nestchat migrate`: bring every market database to the latest schema.

use nestchat_config::NestchatConfig;
use nestchat_core::{ChatStore, NestchatError};
use nestchat_storage::SqliteStore;
use tracing::info;

use crate::serve::init_tracing;

pub async fn run_migrate(config: &NestchatConfig) -> Result<(), NestchatError> {
    init_tracing(&config.service.log_level);
    migrate_markets(config).await
}

async fn migrate_markets(config: &NestchatConfig) -> Result<(), NestchatError> {
    for market in &config.markets {
        let store = SqliteStore::new(market.clone());
        store.initialize().await?;
        store.close().await?;
        info!(market = %market.id, path = %market.database_path, "market database migrated");
        println!("migrated market `{}` ({})", market.id, market.database_path);
    }
    Ok(())
}
