/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::entry::{methods, EntryClient};
use crate::graph::GraphResolver;
use anyhow::{Context, Result};
use quill_protocol::{ChatMessage, ChatSession, MimeiId, User};
use sha2::Digest as _;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Stable id for the conversation between two users, independent of
/// who opened it.
pub fn session_key(a: &MimeiId, b: &MimeiId) -> String {
    let (lo, hi) = if a.as_str() <= b.as_str() { (a, b) } else { (b, a) };
    let mut hasher = sha2::Sha256::new();
    hasher.update(lo.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(hi.as_str().as_bytes());
    format!("urn:quill:chat:dm:{}", hex::encode(hasher.finalize()))
}

/// Reduces a flat message history into per-counterpart session
/// summaries: newest message per counterpart, unread when the latest
/// inbound message is past the viewer's read watermark. Sessions come
/// back newest first.
pub fn fold_sessions(
    viewer: &MimeiId,
    messages: &[ChatMessage],
    last_read: &HashMap<MimeiId, i64>,
) -> Vec<ChatSession> {
    let mut latest: HashMap<MimeiId, ChatMessage> = HashMap::new();
    for msg in messages {
        let counterpart = if &msg.author_id == viewer {
            msg.receipt_id.clone()
        } else {
            msg.author_id.clone()
        };
        match latest.get(&counterpart) {
            Some(cur) if cur.timestamp >= msg.timestamp => {}
            _ => {
                latest.insert(counterpart, msg.clone());
            }
        }
    }
    let mut sessions: Vec<ChatSession> = latest
        .into_iter()
        .map(|(counterpart, msg)| {
            let watermark = last_read.get(&counterpart).copied().unwrap_or(0);
            let has_news = &msg.author_id != viewer && msg.timestamp > watermark;
            ChatSession {
                timestamp: msg.timestamp,
                user_id: counterpart,
                last_message: msg,
                has_news,
            }
        })
        .collect();
    sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sessions
}

/// Best-effort message transport over the entry endpoint. No delivery
/// guarantees beyond what one HTTP round trip gives.
pub struct ChatClient {
    entry: Arc<EntryClient>,
    graph: Arc<GraphResolver>,
}

impl ChatClient {
    pub fn new(entry: Arc<EntryClient>, graph: Arc<GraphResolver>) -> Self {
        Self { entry, graph }
    }

    /// Composes and posts a message to the recipient's node. Returns
    /// the sent record, or `None` when the recipient is unreachable
    /// or the post failed.
    pub async fn send_message(
        &self,
        viewer: &User,
        to: &MimeiId,
        content: String,
        attachment: Option<MimeiId>,
    ) -> Result<Option<ChatMessage>> {
        let Some(recipient) = self.graph.resolve_user(to).await? else {
            warn!("chat recipient {to} has no reachable provider");
            return Ok(None);
        };
        let ts = now_ms();
        let msg = ChatMessage {
            id: format!("{ts}-{:08x}", rand::random::<u32>()),
            author_id: viewer.mid.clone(),
            receipt_id: to.clone(),
            timestamp: ts,
            content: Some(content),
            attachment,
        };
        let body = serde_json::to_string(&msg).context("serialize chat message")?;
        match self
            .entry
            .call(
                &recipient.base_url,
                methods::SEND_MESSAGE,
                &[("userid", viewer.mid.to_string()), ("msg", body)],
                false,
            )
            .await
        {
            Ok(_) => Ok(Some(msg)),
            Err(e) => {
                warn!("send message to {to}: {e:#}");
                Ok(None)
            }
        }
    }

    /// Pulls messages exchanged with one counterpart since a
    /// watermark. Records that fail to decode are skipped.
    pub async fn fetch_messages(
        &self,
        viewer: &User,
        counterpart: &MimeiId,
        since_ms: i64,
    ) -> Result<Vec<ChatMessage>> {
        let Some(peer) = self.graph.resolve_user(counterpart).await? else {
            return Ok(Vec::new());
        };
        let v = self
            .entry
            .call(
                &peer.base_url,
                methods::FETCH_MESSAGES,
                &[
                    ("userid", viewer.mid.to_string()),
                    ("peerid", counterpart.to_string()),
                    ("since", since_ms.to_string()),
                ],
                true,
            )
            .await?;
        let items = v.as_array().cloned().unwrap_or_default();
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match ChatMessage::from_value(item) {
                Ok(m) => out.push(m),
                Err(e) => warn!("skipping malformed chat message: {e}"),
            }
        }
        Ok(out)
    }
}
