// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log: appends, filtered listings, per-direction counts.
//!
//! Listings order by `created_at DESC, id DESC`. "Visible" means not
//! soft-deleted on the viewer's side.

use nestchat_core::types::{
    ConversationBinding, Message, MessageFilter, MessageId, MessageType, NewMessage, ThreadStats,
    UserId, Window,
};
use nestchat_core::NestchatError;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::queries::conversations::get_or_create_in;
use crate::rows::{format_ts, message_from_row, parse_ts, MESSAGE_COLUMNS};

const VISIBLE_TO_VIEWER: &str = "((sender_id = ? AND receiver_id = ? AND sender_deleted = 0) \
     OR (sender_id = ? AND receiver_id = ? AND receiver_deleted = 0))";

const BETWEEN_PAIR: &str =
    "((sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?))";

fn pair_values(a: &UserId, b: &UserId) -> Vec<Value> {
    [a, b, b, a]
        .into_iter()
        .map(|id| Value::Text(id.0.clone()))
        .collect()
}

/// Appends the filter's predicates to `sql`, pushing their bound values.
fn push_filter(sql: &mut String, values: &mut Vec<Value>, filter: &MessageFilter) {
    if let Some(before) = &filter.created_before {
        sql.push_str(" AND created_at < ?");
        values.push(Value::Text(format_ts(before)));
    }
    if let Some(after) = &filter.created_after {
        sql.push_str(" AND created_at > ?");
        values.push(Value::Text(format_ts(after)));
    }
    if let Some(hidden) = filter.hide_type {
        sql.push_str(" AND message_type <> ?");
        values.push(Value::Text(hidden.to_string()));
    }
}

fn to_limit(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

pub(crate) fn pair_has_messages(
    conn: &Connection,
    a: &UserId,
    b: &UserId,
) -> rusqlite::Result<bool> {
    conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM messages WHERE {BETWEEN_PAIR})"),
        params_from_iter(pair_values(a, b)),
        |row| row.get(0),
    )
}

fn user_exists(conn: &Connection, id: &UserId) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
        params![id.as_str()],
        |row| row.get(0),
    )
}

/// Inserts one draft inside an open transaction.
///
/// The outer error aborts the transaction; the inner one is a domain failure
/// the caller reports after rolling back.
fn insert_one(
    conn: &Connection,
    draft: &NewMessage,
) -> rusqlite::Result<Result<Message, NestchatError>> {
    for id in [&draft.sender_id, &draft.receiver_id] {
        if !user_exists(conn, id)? {
            return Ok(Err(NestchatError::not_found("user", id)));
        }
    }

    let created_at = format_ts(&draft.created_at);
    let initial = !pair_has_messages(conn, &draft.sender_id, &draft.receiver_id)?;
    let conversation_id = match draft.conversation {
        ConversationBinding::GetOrCreate => Some(
            get_or_create_in(conn, &draft.sender_id, &draft.receiver_id, &created_at)?.id,
        ),
        ConversationBinding::Existing(id) => {
            let known: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM conversations WHERE id = ?1)",
                params![id.0],
                |row| row.get(0),
            )?;
            if !known {
                return Ok(Err(NestchatError::not_found("conversation", id)));
            }
            Some(id)
        }
        ConversationBinding::Unlinked => None,
    };

    conn.execute(
        "INSERT INTO messages (sender_id, receiver_id, conversation_id, content, message_type,
                               created_at, job_posting_id, is_initial)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            draft.sender_id.as_str(),
            draft.receiver_id.as_str(),
            conversation_id.map(|c| c.0),
            draft.content,
            draft.message_type.to_string(),
            created_at,
            draft.job_posting_id,
            initial,
        ],
    )?;

    Ok(Ok(Message {
        id: MessageId(conn.last_insert_rowid()),
        sender_id: draft.sender_id.clone(),
        receiver_id: draft.receiver_id.clone(),
        conversation_id,
        content: draft.content.clone(),
        message_type: draft.message_type,
        created_at: parse_ts(0, &created_at)?,
        sender_deleted: false,
        receiver_deleted: false,
        job_posting_id: draft.job_posting_id.clone(),
        initial,
    }))
}

/// Inserts every draft in one transaction. Nothing is written if any draft
/// fails validation or references an unknown user or conversation.
pub async fn insert_messages(
    db: &Database,
    drafts: Vec<NewMessage>,
) -> Result<Vec<Message>, NestchatError> {
    for draft in &drafts {
        draft.validate()?;
    }
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut created = Vec::with_capacity(drafts.len());
            for draft in &drafts {
                match insert_one(&tx, draft)? {
                    Ok(message) => created.push(message),
                    Err(e) => return Ok(Err(e)),
                }
            }
            tx.commit()?;
            Ok(Ok(created))
        })
        .await
        .map_err(map_tr_err)?
}

pub async fn get_message(db: &Database, id: MessageId) -> Result<Option<Message>, NestchatError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id.0],
                message_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Visible messages between the pair, windowed, plus the filtered total.
pub async fn list_visible(
    db: &Database,
    viewer: &UserId,
    partner: &UserId,
    filter: &MessageFilter,
    window: Window,
) -> Result<(Vec<Message>, u64), NestchatError> {
    let mut predicate = format!("WHERE {VISIBLE_TO_VIEWER}");
    let mut values = pair_values(viewer, partner);
    push_filter(&mut predicate, &mut values, filter);

    db.connection()
        .call(move |conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM messages {predicate}"),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )?;

            let messages = match window {
                Window { limit: 0, .. } => Vec::new(),
                window => {
                    let sql = format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages {predicate}
                         ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
                    );
                    let mut bound = values.clone();
                    bound.push(Value::Integer(to_limit(window.limit)));
                    bound.push(Value::Integer(to_limit(window.offset)));
                    let mut stmt = conn.prepare(&sql)?;
                    stmt.query_map(params_from_iter(bound.iter()), message_from_row)?
                        .collect::<Result<Vec<_>, _>>()?
                }
            };
            Ok((messages, total as u64))
        })
        .await
        .map_err(map_tr_err)
}

/// Aggregates over every visible message of the pair in one pass.
pub async fn thread_stats(
    db: &Database,
    viewer: &UserId,
    partner: &UserId,
) -> Result<ThreadStats, NestchatError> {
    let sql = format!(
        "SELECT MAX(created_at),
                COALESCE(SUM(sender_id = ? AND message_type <> ?), 0),
                COALESCE(MAX(message_type = ?), 0)
         FROM messages WHERE {VISIBLE_TO_VIEWER}"
    );
    let mut values = vec![
        Value::Text(partner.0.clone()),
        Value::Text(MessageType::SafetyTips.to_string()),
        Value::Text(MessageType::AskRecommendation.to_string()),
    ];
    values.extend(pair_values(viewer, partner));

    db.connection()
        .call(move |conn| {
            let (latest, replies, asked): (Option<String>, i64, bool) =
                conn.query_row(&sql, params_from_iter(values.iter()), |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?;
            Ok(ThreadStats {
                latest_message_at: latest.as_deref().map(|raw| parse_ts(0, raw)).transpose()?,
                partner_replies: replies as u64,
                ask_recommendation_sent: asked,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Messages sent in one direction, soft-delete flags ignored.
pub async fn count_sent(
    db: &Database,
    sender: &UserId,
    receiver: &UserId,
    filter: &MessageFilter,
) -> Result<u64, NestchatError> {
    let mut sql = "SELECT COUNT(*) FROM messages WHERE sender_id = ? AND receiver_id = ?".to_string();
    let mut values = vec![
        Value::Text(sender.0.clone()),
        Value::Text(receiver.0.clone()),
    ];
    push_filter(&mut sql, &mut values, filter);
    db.connection()
        .call(move |conn| {
            let count: i64 =
                conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn has_any(db: &Database, a: &UserId, b: &UserId) -> Result<bool, NestchatError> {
    let (a, b) = (a.clone(), b.clone());
    db.connection()
        .call(move |conn| pair_has_messages(conn, &a, &b))
        .await
        .map_err(map_tr_err)
}

pub async fn sent_types(
    db: &Database,
    sender: &UserId,
    receiver: &UserId,
) -> Result<Vec<MessageType>, NestchatError> {
    let (sender, receiver) = (sender.clone(), receiver.clone());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT message_type FROM messages WHERE sender_id = ?1 AND receiver_id = ?2
                 ORDER BY created_at DESC, id DESC",
            )?;
            let raw = stmt
                .query_map(params![sender.as_str(), receiver.as_str()], |row| {
                    row.get::<_, String>(0)
                })?
                .collect::<Result<Vec<_>, _>>()?;
            raw.iter()
                .enumerate()
                .map(|(i, t)| {
                    t.parse::<MessageType>().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            i,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Senders of the pair's newest `limit` messages, newest first.
pub async fn recent_senders(
    db: &Database,
    a: &UserId,
    b: &UserId,
    limit: u64,
) -> Result<Vec<UserId>, NestchatError> {
    let mut values = pair_values(a, b);
    values.push(Value::Integer(to_limit(limit)));
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT sender_id FROM messages WHERE {BETWEEN_PAIR}
                 ORDER BY created_at DESC, id DESC LIMIT ?"
            ))?;
            let senders = stmt
                .query_map(params_from_iter(values.iter()), |row| {
                    row.get::<_, String>(0).map(UserId)
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(senders)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_participated_of_type(
    db: &Database,
    user: &UserId,
    message_type: MessageType,
) -> Result<u64, NestchatError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages
                 WHERE (sender_id = ?1 OR receiver_id = ?1) AND message_type = ?2",
                params![user.as_str(), message_type.to_string()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Flags the pair's messages as deleted on the viewer's side.
pub async fn soft_delete_pair(
    db: &Database,
    viewer: &UserId,
    partner: &UserId,
) -> Result<u64, NestchatError> {
    let (viewer, partner) = (viewer.clone(), partner.clone());
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let sent = tx.execute(
                "UPDATE messages SET sender_deleted = 1
                 WHERE sender_id = ?1 AND receiver_id = ?2 AND sender_deleted = 0",
                params![viewer.as_str(), partner.as_str()],
            )?;
            let received = tx.execute(
                "UPDATE messages SET receiver_deleted = 1
                 WHERE sender_id = ?2 AND receiver_id = ?1 AND receiver_deleted = 0",
                params![viewer.as_str(), partner.as_str()],
            )?;
            tx.commit()?;
            Ok((sent + received) as u64)
        })
        .await
        .map_err(map_tr_err)
}
