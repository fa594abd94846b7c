// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-pair write serialization.
//!
//! Holding a pair's guard makes "first message + conversation creation" and
//! the successful recomputation atomic for that unordered pair, while
//! unrelated pairs proceed in parallel.

use std::sync::Arc;

use dashmap::DashMap;
use nestchat_core::types::{UserId, UserPair};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Idle entries are dropped once the map grows past this size.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Default)]
pub struct PairLocks {
    locks: DashMap<UserPair, Arc<Mutex<()>>>,
}

impl PairLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the unordered pair `{a, b}`.
    pub async fn lock(&self, a: &UserId, b: &UserId) -> OwnedMutexGuard<()> {
        if self.locks.len() > PRUNE_THRESHOLD {
            self.prune();
        }
        let mutex = self
            .locks
            .entry(UserPair::new(a, b))
            .or_default()
            .value()
            .clone();
        mutex.lock_owned().await
    }

    /// Removes locks nobody holds or waits on.
    pub fn prune(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
