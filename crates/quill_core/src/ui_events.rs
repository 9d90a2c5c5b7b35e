/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use serde::Serialize;

fn now_ms_u64() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Change notification handed to the UI shell alongside the feed
/// watch channel.
#[derive(Clone, Debug, Serialize)]
pub struct UiEvent {
    pub kind: String,
    pub ts_ms: u64,
    pub tweet_id: Option<String>,
}

impl UiEvent {
    pub fn new(kind: &str, tweet_id: Option<String>) -> Self {
        Self {
            kind: kind.to_string(),
            ts_ms: now_ms_u64(),
            tweet_id,
        }
    }
}
