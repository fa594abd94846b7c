// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Column codecs shared by the query modules.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

use nestchat_core::types::{
    Conversation, ConversationId, Message, MessageId, MessageType, RateLimitState, User, UserId,
};

/// Timestamps are stored as fixed-width UTC strings so that text ordering
/// matches time ordering.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn conversion_err<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| parse_ts(idx, &raw))
        .transpose()
}

fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_err(idx, e))
}

pub(crate) const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, conversation_id, content, \
     message_type, created_at, sender_deleted, receiver_deleted, job_posting_id, is_initial";

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    let created: String = row.get(6)?;
    Ok(Message {
        id: MessageId(row.get(0)?),
        sender_id: UserId(row.get(1)?),
        receiver_id: UserId(row.get(2)?),
        conversation_id: row.get::<_, Option<i64>>(3)?.map(ConversationId),
        content: row.get(4)?,
        message_type: parsed::<MessageType>(row, 5)?,
        created_at: parse_ts(6, &created)?,
        sender_deleted: row.get(7)?,
        receiver_deleted: row.get(8)?,
        job_posting_id: row.get(9)?,
        initial: row.get(10)?,
    })
}

pub(crate) const USER_COLUMNS: &str = "id, url, first_name, role, gender, premium, rate_limit, \
     rate_limit_period, available_for_chat, test_account, disabled, locale, \
     safety_messages_disabled, last_login";

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let state: String = row.get(6)?;
    let period: Option<String> = row.get(7)?;
    let rate_limit = RateLimitState::from_columns(&state, period.as_deref()).ok_or_else(|| {
        conversion_err(
            6,
            std::io::Error::other(format!("unknown rate limit state `{state}`")),
        )
    })?;
    Ok(User {
        id: UserId(row.get(0)?),
        url: row.get(1)?,
        first_name: row.get(2)?,
        role: parsed(row, 3)?,
        gender: parsed(row, 4)?,
        premium: row.get(5)?,
        rate_limit,
        available_for_chat: row.get(8)?,
        test_account: row.get(9)?,
        disabled: row.get(10)?,
        locale: row.get(11)?,
        safety_messages_disabled: row.get(12)?,
        last_login: opt_ts(row, 13)?,
    })
}

pub(crate) const CONVERSATION_COLUMNS: &str =
    "id, user1_id, user2_id, successful_at, created_at";

pub(crate) fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    let created: String = row.get(4)?;
    Ok(Conversation {
        id: ConversationId(row.get(0)?),
        user1_id: UserId(row.get(1)?),
        user2_id: UserId(row.get(2)?),
        successful_at: opt_ts(row, 3)?,
        created_at: parse_ts(4, &created)?,
    })
}

/// `?, ?, ?` for an `IN (...)` list of `n` items.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
