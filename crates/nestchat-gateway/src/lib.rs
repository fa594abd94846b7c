// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST gateway for the conversation engine.
//!
//! Every authenticated route acts on behalf of the user named in
//! `X-User-Id`, against the market named in `X-Market` (the configured
//! default market otherwise).

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod registry;
pub mod server;
pub mod views;

pub use auth::AuthConfig;
pub use error::ApiError;
pub use registry::MarketRegistry;
pub use server::{router, start_server, GatewayState};
