// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::{self as axum_middleware, Next},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use nestchat_config::model::GatewayConfig;
use nestchat_core::NestchatError;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{auth_middleware, AuthConfig};
use crate::error::ApiError;
use crate::handlers;
use crate::registry::MarketRegistry;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub registry: Arc<MarketRegistry>,
    pub auth: AuthConfig,
}

/// Caps a request at `limit`, answering 504 past it.
async fn timeout_middleware(
    State(limit): State<Duration>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    tokio::time::timeout(limit, next.run(request))
        .await
        .map_err(|_| NestchatError::Timeout { duration: limit }.into())
}

/// Builds the full router.
///
/// - GET /health (public)
/// - GET /conversations
/// - POST /conversations/autorejection
/// - DELETE /conversations/{url}
/// - GET, POST /conversations/{url}/messages
/// - POST /conversations/{url}/notifications
pub fn router(state: GatewayState, request_timeout: Duration) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/conversations", get(handlers::list_conversations))
        .route(
            "/conversations/autorejection",
            post(handlers::post_auto_rejection),
        )
        .route("/conversations/{url}", delete(handlers::delete_conversation))
        .route(
            "/conversations/{url}/messages",
            get(handlers::list_messages).post(handlers::post_message),
        )
        .route(
            "/conversations/{url}/notifications",
            post(handlers::post_notification),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            request_timeout,
            timeout_middleware,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds the configured address and serves until `shutdown` is cancelled.
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), NestchatError> {
    let app = router(state, Duration::from_secs(config.request_timeout_secs));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| NestchatError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| NestchatError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
