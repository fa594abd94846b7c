// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation ledger, read markers, and the aggregated conversation list.

use chrono::{DateTime, Utc};
use nestchat_core::types::{
    Conversation, ConversationId, ConversationSummary, FeedFilter, MessageId, UserId, UserPair,
};
use nestchat_core::NestchatError;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::rows::{
    conversation_from_row, format_ts, message_from_row, parse_ts, user_from_row,
    CONVERSATION_COLUMNS, MESSAGE_COLUMNS, USER_COLUMNS,
};

fn find_in(conn: &Connection, pair: &UserPair) -> rusqlite::Result<Option<Conversation>> {
    conn.query_row(
        &format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE user1_id = ?1 AND user2_id = ?2"
        ),
        params![pair.low().as_str(), pair.high().as_str()],
        conversation_from_row,
    )
    .optional()
}

/// Insert-or-fetch on the unique `(user1_id, user2_id)` key. Must run on the
/// writer thread, inside the caller's transaction when there is one.
pub(crate) fn get_or_create_in(
    conn: &Connection,
    a: &UserId,
    b: &UserId,
    now: &str,
) -> rusqlite::Result<Conversation> {
    let pair = UserPair::new(a, b);
    conn.execute(
        "INSERT INTO conversations (user1_id, user2_id, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT (user1_id, user2_id) DO NOTHING",
        params![pair.low().as_str(), pair.high().as_str(), now],
    )?;
    find_in(conn, &pair)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub async fn get_or_create(
    db: &Database,
    a: &UserId,
    b: &UserId,
    now: DateTime<Utc>,
) -> Result<Conversation, NestchatError> {
    let (a, b) = (a.clone(), b.clone());
    let now = format_ts(&now);
    db.connection()
        .call(move |conn| get_or_create_in(conn, &a, &b, &now))
        .await
        .map_err(map_tr_err)
}

pub async fn find(
    db: &Database,
    a: &UserId,
    b: &UserId,
) -> Result<Option<Conversation>, NestchatError> {
    let pair = UserPair::new(a, b);
    db.connection()
        .call(move |conn| find_in(conn, &pair))
        .await
        .map_err(map_tr_err)
}

/// Sets `successful_at` unless already set. Returns whether this call set it.
pub async fn mark_successful(
    db: &Database,
    id: ConversationId,
    at: DateTime<Utc>,
) -> Result<bool, NestchatError> {
    let at = format_ts(&at);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET successful_at = ?1
                 WHERE id = ?2 AND successful_at IS NULL",
                params![at, id.0],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Moves the viewer's marker to `last_read`, never backwards.
pub async fn mark_read(
    db: &Database,
    viewer: &UserId,
    partner: &UserId,
    last_read: MessageId,
) -> Result<(), NestchatError> {
    let (viewer, partner) = (viewer.clone(), partner.clone());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversation_reads (user_id, partner_id, last_read_message_id)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (user_id, partner_id) DO UPDATE
                 SET last_read_message_id =
                     MAX(last_read_message_id, excluded.last_read_message_id)",
                params![viewer.as_str(), partner.as_str(), last_read.0],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// One aggregated row per partner with at least one message visible to `?1`.
const THREADS_SQL: &str = "
WITH visible AS (
    SELECT id, sender_id, message_type, created_at,
           CASE WHEN sender_id = ?1 THEN receiver_id ELSE sender_id END AS partner_id
    FROM messages
    WHERE (sender_id = ?1 AND sender_deleted = 0)
       OR (receiver_id = ?1 AND receiver_deleted = 0)
),
threads AS (
    SELECT partner_id,
           COUNT(*) AS total,
           SUM(sender_id = ?1) AS sent,
           MAX(created_at) AS last_at,
           MAX(CASE WHEN sender_id <> ?1 THEN created_at END) AS partner_last_at
    FROM visible
    GROUP BY partner_id
    {having}
)
SELECT t.partner_id,
       t.total,
       t.sent,
       t.partner_last_at,
       (SELECT v.id FROM visible v WHERE v.partner_id = t.partner_id
        ORDER BY v.created_at DESC, v.id DESC LIMIT 1) AS last_id,
       (SELECT COUNT(*) FROM visible v
        WHERE v.partner_id = t.partner_id AND v.sender_id <> ?1
          AND v.id > COALESCE((SELECT r.last_read_message_id FROM conversation_reads r
                               WHERE r.user_id = ?1 AND r.partner_id = t.partner_id), 0)
       ) AS unread,
       (SELECT m.sender_id = ?1 FROM messages m
        WHERE (m.sender_id = ?1 AND m.receiver_id = t.partner_id)
           OR (m.sender_id = t.partner_id AND m.receiver_id = ?1)
        ORDER BY m.created_at ASC, m.id ASC LIMIT 1) AS initiated,
       EXISTS (SELECT 1 FROM messages m
               WHERE m.sender_id = ?1 AND m.receiver_id = t.partner_id
                 AND m.message_type = 'autoRejection') AS auto_rejected,
       c.id,
       c.successful_at
FROM threads t
LEFT JOIN conversations c
       ON c.user1_id = MIN(?1, t.partner_id) AND c.user2_id = MAX(?1, t.partner_id)
ORDER BY t.last_at DESC, last_id DESC";

struct ThreadRow {
    partner_id: String,
    total: i64,
    sent: i64,
    partner_last_at: Option<String>,
    last_id: i64,
    unread: i64,
    initiated: Option<bool>,
    auto_rejected: bool,
    conversation_id: Option<i64>,
    successful_at: Option<String>,
}

/// Every aggregated conversation row for `viewer`, newest last message first.
pub async fn list_summaries(
    db: &Database,
    viewer: &UserId,
    filter: &FeedFilter,
) -> Result<Vec<ConversationSummary>, NestchatError> {
    let mut values = vec![Value::Text(viewer.0.clone())];
    let having = match filter {
        FeedFilter::WithMessageTypes(types) if !types.is_empty() => {
            let slots: Vec<String> = types
                .iter()
                .map(|t| {
                    values.push(Value::Text(t.to_string()));
                    format!("?{}", values.len())
                })
                .collect();
            format!("HAVING SUM(message_type IN ({})) > 0", slots.join(", "))
        }
        _ => String::new(),
    };
    let sql = THREADS_SQL.replace("{having}", &having);

    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let threads = stmt
                .query_map(params_from_iter(values.iter()), |row| {
                    Ok(ThreadRow {
                        partner_id: row.get(0)?,
                        total: row.get(1)?,
                        sent: row.get(2)?,
                        partner_last_at: row.get(3)?,
                        last_id: row.get(4)?,
                        unread: row.get(5)?,
                        initiated: row.get(6)?,
                        auto_rejected: row.get(7)?,
                        conversation_id: row.get(8)?,
                        successful_at: row.get(9)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut summaries = Vec::with_capacity(threads.len());
            for thread in threads {
                let partner = conn
                    .query_row(
                        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                        params![thread.partner_id],
                        user_from_row,
                    )
                    .optional()?;
                // Messages may outlive the account row of their partner.
                let Some(partner) = partner else { continue };
                let last_message = conn
                    .query_row(
                        &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                        params![thread.last_id],
                        message_from_row,
                    )
                    .optional()?;
                summaries.push(ConversationSummary {
                    conversation_id: thread.conversation_id.map(ConversationId),
                    partner,
                    last_message,
                    total_messages: thread.total as u64,
                    sent_messages: thread.sent as u64,
                    unread_messages: thread.unread as u64,
                    initiated_by_viewer: thread.initiated.unwrap_or(false),
                    partner_last_message_at: thread
                        .partner_last_at
                        .as_deref()
                        .map(|raw| parse_ts(3, raw))
                        .transpose()?,
                    successful_at: thread
                        .successful_at
                        .as_deref()
                        .map(|raw| parse_ts(9, raw))
                        .transpose()?,
                    auto_rejected_by_viewer: thread.auto_rejected,
                });
            }
            Ok(summaries)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::messages::{insert_messages, soft_delete_pair};
    use crate::queries::users::upsert_user;
    use chrono::{Duration, TimeZone};
    use nestchat_core::types::{Gender, MessageType, NewMessage, RateLimitState, Role, User};
    use tempfile::{tempdir, TempDir};

    fn user(id: &str) -> User {
        User {
            id: UserId::from(id),
            url: id.to_string(),
            first_name: id.to_string(),
            role: Role::Babysitter,
            gender: Gender::Female,
            premium: true,
            rate_limit: RateLimitState::None,
            available_for_chat: true,
            test_account: false,
            disabled: false,
            locale: "en".into(),
            safety_messages_disabled: false,
            last_login: None,
        }
    }

    async fn setup(ids: &[&str]) -> (Database, TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("c.db").to_str().unwrap(), true)
            .await
            .unwrap();
        for id in ids {
            upsert_user(&db, &user(id)).await.unwrap();
        }
        (db, dir)
    }

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minute)
    }

    async fn send(db: &Database, from: &str, to: &str, minute: i64, kind: MessageType) {
        let draft = NewMessage::new(UserId::from(from), UserId::from(to), "hi", kind, at(minute));
        insert_messages(db, vec![draft]).await.unwrap();
    }

    #[tokio::test]
    async fn pair_is_unique_regardless_of_order() {
        let (db, _dir) = setup(&["a", "b"]).await;
        let (a, b) = (UserId::from("a"), UserId::from("b"));
        let first = get_or_create(&db, &a, &b, at(0)).await.unwrap();
        let second = get_or_create(&db, &b, &a, at(1)).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.user1_id, a);
        assert_eq!(second.created_at, at(0));
    }

    #[tokio::test]
    async fn concurrent_creates_yield_one_row() {
        let (db, _dir) = setup(&["a", "b"]).await;
        let db = std::sync::Arc::new(db);
        let mut handles = Vec::new();
        for i in 0..8 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                let (x, y) = if i % 2 == 0 { ("a", "b") } else { ("b", "a") };
                get_or_create(&db, &UserId::from(x), &UserId::from(y), at(i))
                    .await
                    .unwrap()
                    .id
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn successful_is_set_once() {
        let (db, _dir) = setup(&["a", "b"]).await;
        let conv = get_or_create(&db, &UserId::from("a"), &UserId::from("b"), at(0))
            .await
            .unwrap();
        assert!(mark_successful(&db, conv.id, at(1)).await.unwrap());
        assert!(!mark_successful(&db, conv.id, at(2)).await.unwrap());
        let stored = find(&db, &UserId::from("b"), &UserId::from("a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.successful_at, Some(at(1)));
    }

    #[tokio::test]
    async fn summaries_aggregate_per_partner() {
        let (db, _dir) = setup(&["v", "p", "q"]).await;
        send(&db, "p", "v", 0, MessageType::Regular).await;
        send(&db, "v", "p", 1, MessageType::Regular).await;
        send(&db, "p", "v", 2, MessageType::Regular).await;
        send(&db, "v", "q", 3, MessageType::InstantJob).await;

        let rows = list_summaries(&db, &UserId::from("v"), &FeedFilter::All)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        // q has the newest message.
        assert_eq!(rows[0].partner.id, UserId::from("q"));
        assert!(rows[0].initiated_by_viewer);
        assert_eq!(rows[0].unread_messages, 0);

        let p = &rows[1];
        assert_eq!(p.total_messages, 3);
        assert_eq!(p.sent_messages, 1);
        assert_eq!(p.unread_messages, 2);
        assert!(!p.initiated_by_viewer);
        assert_eq!(p.partner_last_message_at, Some(at(2)));
        assert!(p.conversation_id.is_some());
    }

    #[tokio::test]
    async fn read_marker_only_moves_forward() {
        let (db, _dir) = setup(&["v", "p"]).await;
        send(&db, "p", "v", 0, MessageType::Regular).await;
        send(&db, "p", "v", 1, MessageType::Regular).await;
        let (v, p) = (UserId::from("v"), UserId::from("p"));

        mark_read(&db, &v, &p, MessageId(2)).await.unwrap();
        mark_read(&db, &v, &p, MessageId(1)).await.unwrap();
        let rows = list_summaries(&db, &v, &FeedFilter::All).await.unwrap();
        assert_eq!(rows[0].unread_messages, 0);
    }

    #[tokio::test]
    async fn message_type_filter_and_soft_delete() {
        let (db, _dir) = setup(&["v", "p", "q"]).await;
        send(&db, "v", "p", 0, MessageType::InstantJob).await;
        send(&db, "v", "q", 1, MessageType::Regular).await;
        let v = UserId::from("v");

        let filter = FeedFilter::WithMessageTypes(vec![MessageType::InstantJob]);
        let rows = list_summaries(&db, &v, &filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].partner.id, UserId::from("p"));

        soft_delete_pair(&db, &v, &UserId::from("p")).await.unwrap();
        let rows = list_summaries(&db, &v, &FeedFilter::All).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].partner.id, UserId::from("q"));
        // The partner still sees the thread.
        let theirs = list_summaries(&db, &UserId::from("p"), &FeedFilter::All)
            .await
            .unwrap();
        assert_eq!(theirs.len(), 1);
    }

    #[tokio::test]
    async fn auto_rejection_is_flagged() {
        let (db, _dir) = setup(&["v", "p"]).await;
        send(&db, "p", "v", 0, MessageType::Regular).await;
        send(&db, "v", "p", 1, MessageType::AutoRejection).await;
        let rows = list_summaries(&db, &UserId::from("v"), &FeedFilter::All)
            .await
            .unwrap();
        assert!(rows[0].auto_rejected_by_viewer);
    }
}
