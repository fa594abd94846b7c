// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite message store and conversation ledger.
//!
//! WAL-mode SQLite with embedded migrations and the single-writer model of
//! `tokio-rusqlite`: every statement runs on one background thread, so a
//! transaction issued through [`Database::connection`] is atomic with respect
//! to every other write against the same market.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;
mod rows;

pub use adapter::SqliteStore;
pub use database::Database;
