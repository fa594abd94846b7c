// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations (refinery).

use nestchat_core::NestchatError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations. Applied versions live in `refinery_schema_history`.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), NestchatError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(|e| NestchatError::Storage {
            source: Box::new(e),
        })?;
    Ok(())
}
