// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read models synced in from other systems: job postings and recommendations.

use chrono::{DateTime, Utc};
use nestchat_core::types::{JobPostingInvitation, UserId};
use nestchat_core::NestchatError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::rows::{format_ts, parse_ts};

pub async fn insert_job_posting(
    db: &Database,
    invitation: &JobPostingInvitation,
) -> Result<(), NestchatError> {
    let invitation = invitation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO job_postings (id, parent_id, foster_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    invitation.id,
                    invitation.parent_id.as_str(),
                    invitation.foster_id.as_str(),
                    format_ts(&invitation.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Invitations the viewer takes part in, newest first.
pub async fn invitations_for(
    db: &Database,
    viewer: &UserId,
) -> Result<Vec<JobPostingInvitation>, NestchatError> {
    let viewer = viewer.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, parent_id, foster_id, created_at FROM job_postings
                 WHERE parent_id = ?1 OR foster_id = ?1
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map(params![viewer.as_str()], |row| {
                    let created: String = row.get(3)?;
                    Ok(JobPostingInvitation {
                        id: row.get(0)?,
                        parent_id: UserId(row.get(1)?),
                        foster_id: UserId(row.get(2)?),
                        created_at: parse_ts(3, &created)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn insert_recommendation(
    db: &Database,
    author: &UserId,
    subject: &UserId,
    at: DateTime<Utc>,
) -> Result<(), NestchatError> {
    let (author, subject) = (author.clone(), subject.clone());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO recommendations (author_id, subject_id, created_at)
                 VALUES (?1, ?2, ?3)",
                params![author.as_str(), subject.as_str(), format_ts(&at)],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_recommendations(
    db: &Database,
    author: &UserId,
    subject: &UserId,
) -> Result<u64, NestchatError> {
    let (author, subject) = (author.clone(), subject.clone());
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM recommendations WHERE author_id = ?1 AND subject_id = ?2",
                params![author.as_str(), subject.as_str()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
        .map_err(map_tr_err)
}
