// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the conversation REST API.

use std::str::FromStr;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::{Query, QueryRejection};
use chrono::{DateTime, Utc};
use nestchat_core::types::{FeedFilter, HealthStatus, MessageFilter, MessageId, MessageType, UserId};
use nestchat_core::{NestchatError, Violation};
use nestchat_engine::{FeedItem, FeedQuery, MessageQuery, PageParams};
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::{json, query, Market, Viewer};
use crate::server::GatewayState;
use crate::views::{
    Document, FeedItemView, HealthView, MarketHealthView, MessageView, PartnerView, SentMeta,
};

/// `include` value that embeds chat partners in the feed.
const INCLUDE_CHAT_PARTNER: &str = "chat-partner";

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    #[serde(rename = "page[number]")]
    pub page_number: Option<u64>,
    #[serde(rename = "page[size]")]
    pub page_size: Option<u64>,
    #[serde(rename = "filter[message-type][]", default)]
    pub message_types: Vec<String>,
    #[serde(rename = "meta-only")]
    pub meta_only: Option<String>,
    pub include: Option<String>,
}

impl FeedParams {
    fn page(&self) -> PageParams {
        PageParams {
            number: self.page_number,
            size: self.page_size,
        }
    }

    fn filter(&self) -> Result<FeedFilter, NestchatError> {
        if self.message_types.is_empty() {
            return Ok(FeedFilter::All);
        }
        let mut types = Vec::with_capacity(self.message_types.len());
        let mut violations = Vec::new();
        for raw in &self.message_types {
            match MessageType::from_str(raw) {
                Ok(t) => types.push(t),
                Err(_) => violations.push(
                    Violation::new("invalid_message_type", format!("unknown message type `{raw}`"))
                        .at("filter[message-type]"),
                ),
            }
        }
        if violations.is_empty() {
            Ok(FeedFilter::WithMessageTypes(types))
        } else {
            Err(NestchatError::Validation(violations))
        }
    }

    /// A bare `meta-only` flag counts as set.
    fn meta_only(&self) -> bool {
        matches!(self.meta_only.as_deref(), Some("" | "true" | "1"))
    }

    fn includes_chat_partner(&self) -> bool {
        self.include
            .as_deref()
            .is_some_and(|v| v.split(',').any(|part| part.trim() == INCLUDE_CHAT_PARTNER))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageParams {
    #[serde(rename = "page[number]")]
    pub page_number: Option<u64>,
    #[serde(rename = "page[size]")]
    pub page_size: Option<u64>,
    #[serde(rename = "filter[created-before]")]
    pub created_before: Option<String>,
    #[serde(rename = "filter[created-after]")]
    pub created_after: Option<String>,
}

impl MessageParams {
    fn page(&self) -> PageParams {
        PageParams {
            number: self.page_number,
            size: self.page_size,
        }
    }

    fn filter(&self) -> Result<MessageFilter, NestchatError> {
        Ok(MessageFilter {
            created_before: parse_timestamp(
                self.created_before.as_deref(),
                "filter[created-before]",
            )?,
            created_after: parse_timestamp(self.created_after.as_deref(), "filter[created-after]")?,
            hide_type: None,
        })
    }
}

fn parse_timestamp(
    raw: Option<&str>,
    source: &str,
) -> Result<Option<DateTime<Utc>>, NestchatError> {
    raw.map(|value| {
        DateTime::parse_from_rfc3339(value)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| {
                NestchatError::validation(
                    "invalid_timestamp",
                    format!("`{value}` is not an RFC 3339 timestamp"),
                    Some(source),
                )
            })
    })
    .transpose()
}

/// Body of `POST /conversations/{url}/messages`: a new message or a read marker.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MessagesBody {
    Send {
        content: String,
    },
    MarkRead {
        #[serde(rename = "lastReadMessageId")]
        last_read_message_id: MessageId,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoRejectionBody {
    pub user_ids: Vec<UserId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationBody {
    pub message_id: MessageId,
}

/// GET /conversations
pub async fn list_conversations(
    Market(service): Market,
    Viewer(viewer): Viewer,
    params: Result<Query<FeedParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let params = query(params)?;
    let feed = service
        .list_conversations(
            &viewer,
            FeedQuery {
                page: params.page(),
                filter: params.filter()?,
                meta_only: params.meta_only(),
            },
        )
        .await?;

    let now = Utc::now();
    let data: Vec<FeedItemView> = feed
        .items
        .iter()
        .map(|item| FeedItemView::build(item, now, service.thresholds()))
        .collect();

    let mut included = Vec::new();
    if params.includes_chat_partner() {
        let mut missing = Vec::new();
        for item in &feed.items {
            match item {
                FeedItem::Conversation(summary) => included.push(PartnerView::from(&summary.partner)),
                FeedItem::JobPosting { counterpart_id, .. } => missing.push(counterpart_id.clone()),
            }
        }
        if !missing.is_empty() {
            let users = service.store().get_users(&missing).await?;
            included.extend(users.iter().map(PartnerView::from));
        }
    }

    Ok(Json(Document::new(data).with_meta(feed.meta).with_included(included)).into_response())
}

/// DELETE /conversations/{url}
pub async fn delete_conversation(
    Market(service): Market,
    Viewer(viewer): Viewer,
    Path(partner_url): Path<String>,
) -> Result<StatusCode, ApiError> {
    service.delete_conversation(&viewer, &partner_url).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /conversations/{url}/messages
pub async fn list_messages(
    Market(service): Market,
    Viewer(viewer): Viewer,
    Path(partner_url): Path<String>,
    params: Result<Query<MessageParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let params = query(params)?;
    let page = service
        .list_messages(
            &viewer,
            &partner_url,
            MessageQuery {
                page: params.page(),
                filter: params.filter()?,
            },
        )
        .await?;

    let data: Vec<MessageView> = page.messages.iter().map(MessageView::from).collect();
    Ok(Json(
        Document::new(data)
            .with_meta(page.meta)
            .with_included(vec![PartnerView::from(&page.partner)]),
    )
    .into_response())
}

/// POST /conversations/{url}/messages
///
/// `{content}` sends a message (201); `{lastReadMessageId}` moves the read
/// marker (204).
pub async fn post_message(
    Market(service): Market,
    Viewer(viewer): Viewer,
    Path(partner_url): Path<String>,
    body: Result<Json<MessagesBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    match json(body)? {
        MessagesBody::Send { content } => {
            let sent = service.send_message(&viewer, &partner_url, content).await?;
            let meta = SentMeta {
                rate_limit_warning: sent.rate_limit_warning,
                safety_message: sent.safety_message.as_ref().map(MessageView::from),
            };
            let body = Document::new(MessageView::from(&sent.message)).with_meta(meta);
            Ok((StatusCode::CREATED, Json(body)).into_response())
        }
        MessagesBody::MarkRead {
            last_read_message_id,
        } => {
            service
                .mark_read(&viewer, &partner_url, last_read_message_id)
                .await?;
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}

/// POST /conversations/autorejection
pub async fn post_auto_rejection(
    Market(service): Market,
    Viewer(viewer): Viewer,
    body: Result<Json<AutoRejectionBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = json(body)?;
    let created = service.auto_reject(&viewer, &body.user_ids).await?;
    let data: Vec<MessageView> = created.iter().map(MessageView::from).collect();
    Ok((StatusCode::CREATED, Json(Document::<_, ()>::new(data))).into_response())
}

/// POST /conversations/{url}/notifications
pub async fn post_notification(
    Market(service): Market,
    Viewer(viewer): Viewer,
    Path(partner_url): Path<String>,
    body: Result<Json<NotificationBody>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let body = json(body)?;
    service
        .notify(&viewer, &partner_url, body.message_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /health
///
/// Unauthenticated. 503 when any market store is unhealthy.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let mut overall = StatusCode::OK;
    let mut markets = Vec::new();
    for (market, health) in state.registry.health().await {
        let (status, detail) = match health {
            HealthStatus::Healthy => ("healthy", None),
            HealthStatus::Degraded(detail) => ("degraded", Some(detail)),
            HealthStatus::Unhealthy(detail) => {
                overall = StatusCode::SERVICE_UNAVAILABLE;
                ("unhealthy", Some(detail))
            }
        };
        markets.push(MarketHealthView {
            market,
            status,
            detail,
        });
    }
    let status = if overall.is_success() { "ok" } else { "unavailable" };
    (overall, Json(HealthView { status, markets })).into_response()
}
