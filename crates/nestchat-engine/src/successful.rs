// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! "Successful conversation" detection.
//!
//! Senders are read newest first. Consecutive messages by the same sender
//! collapse into one turn; every boundary between turns is a sender change.

use nestchat_core::types::UserId;

/// Sender changes in `senders` (newest first), counting no further than `stop_at`.
pub fn sender_changes<'a, I>(senders: I, stop_at: usize) -> usize
where
    I: IntoIterator<Item = &'a UserId>,
{
    let mut changes = 0;
    let mut previous: Option<&UserId> = None;
    for sender in senders {
        if previous.is_some_and(|p| p != sender) {
            changes += 1;
            if changes >= stop_at {
                break;
            }
        }
        previous = Some(sender);
    }
    changes
}

pub fn is_successful<'a, I>(senders: I, threshold: usize) -> bool
where
    I: IntoIterator<Item = &'a UserId>,
{
    sender_changes(senders, threshold) >= threshold
}
