// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST surface tests: real router, harness-backed market, no sockets.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use nestchat_core::types::User;
use nestchat_core::Notification;
use nestchat_gateway::{router, AuthConfig, GatewayState, MarketRegistry};
use nestchat_test_utils::fixtures::{babysitter, parent};
use nestchat_test_utils::TestHarness;
use serde_json::{json, Value};
use tower::ServiceExt;

const TOKEN: &str = "test-token";

struct Api {
    app: Router,
    harness: TestHarness,
}

impl Api {
    async fn new(users: Vec<User>) -> Self {
        let harness = TestHarness::builder()
            .with_users(users)
            .build()
            .await
            .unwrap();
        let mut registry = MarketRegistry::new("test");
        registry.insert(harness.service.clone());
        let state = GatewayState {
            registry: Arc::new(registry),
            auth: AuthConfig {
                bearer_token: Some(TOKEN.into()),
            },
        };
        Self {
            app: router(state, Duration::from_secs(5)),
            harness,
        }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        user: Option<&User>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {TOKEN}"));
        if let Some(user) = user {
            request = request.header("x-user-id", user.id.as_str());
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn send(&self, from: &User, to: &User, content: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            &format!("/conversations/{}/messages", to.url),
            Some(from),
            Some(json!({ "content": content })),
        )
        .await
    }
}

#[tokio::test]
async fn send_then_list_messages() {
    let (p, s) = (parent("p"), babysitter("s"));
    let api = Api::new(vec![p.clone(), s.clone()]).await;

    let (status, body) = api.send(&p, &s, "Hi, are you free on Friday?").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["type"], "regular");
    assert_eq!(body["data"]["senderId"], "p");

    let (status, body) = api
        .call(Method::GET, "/conversations/p-url/messages", Some(&s), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["meta"]["totalCount"], 1);
    assert_eq!(body["meta"]["askForRecommendation"], false);
    assert_eq!(body["included"][0]["url"], "p-url");
}

#[tokio::test]
async fn second_message_reports_safety_tips() {
    let (p, s) = (parent("p"), babysitter("s"));
    let api = Api::new(vec![p.clone(), s.clone()]).await;

    api.send(&p, &s, "one").await;
    let (status, body) = api.send(&p, &s, "two").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["meta"]["safetyMessage"]["type"], "safetyTips");
}

#[tokio::test]
async fn missing_user_header_is_unauthorized() {
    let api = Api::new(vec![]).await;
    let (status, body) = api.call(Method::GET, "/conversations", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errors"][0]["code"], "missing_user");
}

#[tokio::test]
async fn unknown_market_is_not_found() {
    let p = parent("p");
    let api = Api::new(vec![p.clone()]).await;
    let request = Request::get("/conversations")
        .header("authorization", format!("Bearer {TOKEN}"))
        .header("x-user-id", "p")
        .header("x-market", "elsewhere")
        .body(Body::empty())
        .unwrap();
    let response = api.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_content_is_unprocessable() {
    let (p, s) = (parent("p"), babysitter("s"));
    let api = Api::new(vec![p.clone(), s.clone()]).await;

    let (status, body) = api.send(&p, &s, &"x".repeat(20_001)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["code"], "content_too_long");
    assert_eq!(body["errors"][0]["source"], "content");
}

#[tokio::test]
async fn non_premium_first_message_is_forbidden() {
    let p = nestchat_test_utils::UserBuilder::new("p", nestchat_core::types::Role::Parent)
        .premium(false)
        .build();
    let s = babysitter("s");
    let api = Api::new(vec![p.clone(), s.clone()]).await;

    let (status, body) = api.send(&p, &s, "hello").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errors"][0]["code"], "not_premium");
}

#[tokio::test]
async fn mark_read_clears_unread_count() {
    let (p, s) = (parent("p"), babysitter("s"));
    let api = Api::new(vec![p.clone(), s.clone()]).await;

    let (_, sent) = api.send(&p, &s, "hello").await;
    let id = sent["data"]["id"].as_i64().unwrap();

    let (_, feed) = api.call(Method::GET, "/conversations", Some(&s), None).await;
    assert_eq!(feed["meta"]["totalUnreadMessagesCount"], 1);

    let (status, _) = api
        .call(
            Method::POST,
            "/conversations/p-url/messages",
            Some(&s),
            Some(json!({ "lastReadMessageId": id })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, feed) = api.call(Method::GET, "/conversations", Some(&s), None).await;
    assert_eq!(feed["meta"]["totalUnreadMessagesCount"], 0);
}

#[tokio::test]
async fn feed_lists_conversations_with_partners() {
    let (p, s) = (parent("p"), babysitter("s"));
    let api = Api::new(vec![p.clone(), s.clone()]).await;
    api.send(&p, &s, "hello").await;

    let (status, body) = api
        .call(
            Method::GET,
            "/conversations?include=chat-partner&page[size]=10&page[number]=1",
            Some(&p),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["type"], "conversation");
    assert_eq!(body["data"][0]["chatPartnerId"], "s");
    assert_eq!(body["included"][0]["id"], "s");
    assert_eq!(body["meta"]["totalPages"], 1);
    assert_eq!(body["meta"]["responseRate"]["receivedCount"], 0);
}

#[tokio::test]
async fn feed_meta_only_and_type_filter() {
    let (p, s) = (parent("p"), babysitter("s"));
    let api = Api::new(vec![p.clone(), s.clone()]).await;
    api.send(&p, &s, "hello").await;

    let (status, body) = api
        .call(Method::GET, "/conversations?meta-only=true", Some(&p), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["meta"]["totalCount"], 1);

    let (status, body) = api
        .call(
            Method::GET,
            "/conversations?filter[message-type][]=autoRejection",
            Some(&p),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (status, body) = api
        .call(
            Method::GET,
            "/conversations?filter[message-type][]=gossip",
            Some(&p),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["code"], "invalid_message_type");
}

#[tokio::test]
async fn invalid_page_size_is_unprocessable() {
    let p = parent("p");
    let api = Api::new(vec![p.clone()]).await;
    let (status, body) = api
        .call(Method::GET, "/conversations?page[size]=0", Some(&p), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["source"], "page[size]");
}

#[tokio::test]
async fn bad_created_before_names_the_parameter() {
    let (p, s) = (parent("p"), babysitter("s"));
    let api = Api::new(vec![p.clone(), s.clone()]).await;
    let (status, body) = api
        .call(
            Method::GET,
            "/conversations/s-url/messages?filter[created-before]=soon",
            Some(&p),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["source"], "filter[created-before]");
}

#[tokio::test]
async fn delete_hides_conversation_for_caller_only() {
    let (p, s) = (parent("p"), babysitter("s"));
    let api = Api::new(vec![p.clone(), s.clone()]).await;
    api.send(&p, &s, "hello").await;

    let (status, _) = api
        .call(Method::DELETE, "/conversations/s-url", Some(&p), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, mine) = api.call(Method::GET, "/conversations", Some(&p), None).await;
    assert_eq!(mine["data"], json!([]));
    let (_, theirs) = api.call(Method::GET, "/conversations", Some(&s), None).await;
    assert_eq!(theirs["data"].as_array().unwrap().len(), 1);

    let (status, _) = api
        .call(Method::DELETE, "/conversations/s-url", Some(&p), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn auto_rejection_creates_messages() {
    let (p, s) = (parent("p"), babysitter("s"));
    let api = Api::new(vec![p.clone(), s.clone()]).await;
    api.send(&s, &p, "I would love to help").await;

    let (status, body) = api
        .call(
            Method::POST,
            "/conversations/autorejection",
            Some(&p),
            Some(json!({ "userIds": ["s"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"][0]["type"], "autoRejection");
    assert_eq!(body["data"][0]["receiverId"], "s");

    let (status, _) = api
        .call(
            Method::POST,
            "/conversations/autorejection",
            Some(&p),
            Some(json!({ "userIds": ["ghost"] })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn explicit_notification_is_awaited() {
    let (p, s) = (parent("p"), babysitter("s"));
    let api = Api::new(vec![p.clone(), s.clone()]).await;
    let (_, sent) = api.send(&p, &s, "hello").await;
    let id = sent["data"]["id"].as_i64().unwrap();
    // Let the fire-and-forget notification from the send land first.
    api.harness.notifier.wait_for(1, Duration::from_secs(2)).await;

    let (status, _) = api
        .call(
            Method::POST,
            "/conversations/s-url/notifications",
            Some(&p),
            Some(json!({ "messageId": id })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let sent = api.harness.notifier.sent().await;
    assert_eq!(sent.len(), 2);
    assert!(matches!(sent[1], Notification::NewMessage { .. }));

    api.harness.notifier.fail(true);
    let (status, body) = api
        .call(
            Method::POST,
            "/conversations/s-url/notifications",
            Some(&p),
            Some(json!({ "messageId": id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["errors"][0]["code"], "upstream_failure");

    let (status, _) = api
        .call(
            Method::POST,
            "/conversations/p-url/notifications",
            Some(&s),
            Some(json!({ "messageId": id })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_body_is_unprocessable() {
    let (p, s) = (parent("p"), babysitter("s"));
    let api = Api::new(vec![p.clone(), s.clone()]).await;
    let (status, body) = api
        .call(
            Method::POST,
            "/conversations/s-url/messages",
            Some(&p),
            Some(json!({ "text": "wrong field" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["code"], "invalid_body");
}
