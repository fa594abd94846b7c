// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User read model.

use nestchat_core::types::{User, UserId};
use nestchat_core::NestchatError;
use rusqlite::{params, params_from_iter, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::rows::{format_ts, placeholders, user_from_row, USER_COLUMNS};

/// Inserts or replaces a user row. Users are owned by the account system;
/// this is how that system (and test fixtures) sync them in.
pub async fn upsert_user(db: &Database, user: &User) -> Result<(), NestchatError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| {
            let (state, period) = user.rate_limit.to_columns();
            conn.execute(
                &format!(
                    "INSERT OR REPLACE INTO users ({USER_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
                ),
                params![
                    user.id.as_str(),
                    user.url,
                    user.first_name,
                    user.role.to_string(),
                    user.gender.to_string(),
                    user.premium,
                    state,
                    period,
                    user.available_for_chat,
                    user.test_account,
                    user.disabled,
                    user.locale,
                    user.safety_messages_disabled,
                    user.last_login.as_ref().map(format_ts),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_user(db: &Database, id: &UserId) -> Result<Option<User>, NestchatError> {
    let id = id.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.as_str()],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_user_by_url(db: &Database, url: &str) -> Result<Option<User>, NestchatError> {
    let url = url.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE url = ?1"),
                params![url],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Users in the order of `ids`; unknown ids are skipped.
pub async fn get_users(db: &Database, ids: &[UserId]) -> Result<Vec<User>, NestchatError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users WHERE id IN ({})",
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let found = stmt
                .query_map(params_from_iter(ids.iter().map(UserId::as_str)), user_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ids
                .iter()
                .filter_map(|id| found.iter().find(|u| &u.id == id).cloned())
                .collect())
        })
        .await
        .map_err(map_tr_err)
}
