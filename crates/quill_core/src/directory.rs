/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::net_metrics::NetMetrics;
use quill_protocol::{MimeiId, User};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory directory of resolved user records, session-owned and
/// retained for the process lifetime. Insertion is a single locked
/// entry-or-insert, so concurrent first lookups of the same id cannot
/// produce duplicates. No eviction.
pub struct UserDirectory {
    users: RwLock<HashMap<MimeiId, User>>,
    metrics: Arc<NetMetrics>,
}

impl UserDirectory {
    pub fn new(metrics: Arc<NetMetrics>) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    pub fn get(&self, id: &MimeiId) -> Option<User> {
        let found = self.users.read().unwrap().get(id).cloned();
        if found.is_some() {
            self.metrics.directory_hit();
        } else {
            self.metrics.directory_miss();
        }
        found
    }

    /// Caches `user` unless a record for the id already exists, and
    /// returns the canonical cached record either way.
    pub fn insert(&self, user: User) -> User {
        let mut g = self.users.write().unwrap();
        g.entry(user.mid.clone()).or_insert(user).clone()
    }

    /// Mutates a cached record in place (profile edits, count
    /// reconciliation). Returns false when the id is not cached.
    pub fn update<F>(&self, id: &MimeiId, f: F) -> bool
    where
        F: FnOnce(&mut User),
    {
        let mut g = self.users.write().unwrap();
        match g.get_mut(id) {
            Some(u) => {
                f(u);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.users.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
