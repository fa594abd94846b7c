// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Nestchat integration tests.
//!
//! Provides mock adapters, user fixtures, and a harness that wires a temp
//! SQLite store into a [`ConversationService`](nestchat_engine::ConversationService).
//!
//! # Components
//!
//! - [`TestHarness`] - one market with a temp database and mock side effects
//! - [`MockNotifier`] - captures notifications, optionally failing
//! - [`MockTranslator`] - fixed translations, optionally failing
//! - [`fixtures`] - user builders

pub mod fixtures;
pub mod harness;
pub mod mock_notifier;
pub mod mock_translator;

pub use fixtures::UserBuilder;
pub use harness::TestHarness;
pub use mock_notifier::MockNotifier;
pub use mock_translator::MockTranslator;
