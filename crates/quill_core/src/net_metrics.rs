/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Process-wide counters for the remote-access layer. All fetch paths
/// are best-effort, so these are the only place failures stay visible.
#[derive(Default)]
pub struct NetMetrics {
    pub rpc_calls: AtomicU64,
    pub entry_calls: AtomicU64,
    pub http_errors: AtomicU64,
    pub http_timeouts: AtomicU64,
    pub directory_hits: AtomicU64,
    pub directory_misses: AtomicU64,
    pub probe_failures: AtomicU64,
    last_error: Mutex<Option<String>>,
    last_error_ms: AtomicU64,
}

impl NetMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rpc_call(&self) {
        self.rpc_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn entry_call(&self) {
        self.entry_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn http_error(&self) {
        self.http_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn http_timeout(&self) {
        self.http_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn directory_hit(&self) {
        self.directory_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn directory_miss(&self) {
        self.directory_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn probe_failure(&self) {
        self.probe_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_last_error(&self, err: String) {
        let mut g = self.last_error.lock().unwrap();
        *g = Some(err);
        self.last_error_ms.store(now_ms(), Ordering::Relaxed);
    }

    pub fn snapshot_json(&self) -> serde_json::Value {
        let last_error = self.last_error.lock().unwrap().clone();
        serde_json::json!({
            "ts_ms": now_ms(),
            "calls": {
                "rpc": self.rpc_calls.load(Ordering::Relaxed),
                "entry": self.entry_calls.load(Ordering::Relaxed),
            },
            "directory": {
                "hits": self.directory_hits.load(Ordering::Relaxed),
                "misses": self.directory_misses.load(Ordering::Relaxed),
            },
            "errors": {
                "http_errors": self.http_errors.load(Ordering::Relaxed),
                "http_timeouts": self.http_timeouts.load(Ordering::Relaxed),
                "probe_failures": self.probe_failures.load(Ordering::Relaxed),
                "last_error": last_error,
                "last_error_ms": self.last_error_ms.load(Ordering::Relaxed),
            },
        })
    }
}
