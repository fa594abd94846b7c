// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `nestchat serve`: open every market, run the gateway, close on signal.

use std::sync::Arc;

use nestchat_config::NestchatConfig;
use nestchat_core::NestchatError;
use nestchat_gateway::{start_server, AuthConfig, GatewayState, MarketRegistry};
use tracing::{info, warn};

use crate::shutdown;

pub async fn run_serve(config: NestchatConfig) -> Result<(), NestchatError> {
    init_tracing(&config.service.log_level);

    info!(markets = config.markets.len(), "starting nestchat serve");

    let registry = Arc::new(MarketRegistry::from_config(&config).await?);
    for market in registry.market_ids() {
        info!(market, "market ready");
    }

    let auth = AuthConfig {
        bearer_token: config.gateway.bearer_token.clone(),
    };
    if auth.bearer_token.is_none() {
        warn!("gateway.bearer_token is not set -- every API request will be rejected");
    }

    let cancel = shutdown::install_signal_handler();
    let state = GatewayState {
        registry: registry.clone(),
        auth,
    };
    let result = start_server(&config.gateway, state, cancel).await;

    registry.shutdown().await;
    info!("nestchat stopped");
    result
}

/// `nestchat=<level>,warn` unless `RUST_LOG` is set.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("nestchat={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
