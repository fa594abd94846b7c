// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each function runs on the database's writer thread.

pub mod conversations;
pub mod external;
pub mod messages;
pub mod users;
