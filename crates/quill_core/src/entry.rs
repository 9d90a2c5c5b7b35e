/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::http_retry::send_with_retry;
use crate::net_metrics::NetMetrics;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Method names accepted by the `{base}/entry` query-string endpoint.
pub mod methods {
    pub const GET_PROVIDERS: &str = "get_providers";
    pub const GET_TWEET: &str = "get_tweet";
    pub const GET_TWEETS: &str = "get_tweets";
    pub const UPLOAD_TWEET: &str = "upload_tweet";
    pub const DELETE_TWEET: &str = "delete_tweet";
    pub const TOGGLE_FOLLOWING: &str = "toggle_following";
    pub const TOGGLE_FOLLOWER: &str = "toggle_follower";
    pub const TOGGLE_RETWEET: &str = "toggle_retweet";
    pub const ADD_COMMENT: &str = "add_comment";
    pub const LIKED_COUNT: &str = "liked_count";
    pub const BOOKMARK: &str = "bookmark";
    pub const SET_AUTHOR_CORE_DATA: &str = "set_author_core_data";
    pub const OPEN_TEMP_FILE: &str = "open_temp_file";
    pub const GET_USER_CORE_DATA: &str = "get_user_core_data";
    pub const INIT_USER_MID: &str = "init_user_mid";
    pub const SEND_MESSAGE: &str = "send_message";
    pub const FETCH_MESSAGES: &str = "fetch_messages";
}

/// One GET against one node's entry endpoint. `retry` selects the
/// backoff wrapper; probes and toggles pass `false`.
#[async_trait]
pub trait EntryTransport: Send + Sync {
    async fn entry(
        &self,
        base_url: &str,
        method: &str,
        params: &[(String, String)],
        retry: bool,
    ) -> Result<Value>;
}

pub fn build_entry_url(
    base_url: &str,
    app_id: &str,
    method: &str,
    params: &[(String, String)],
) -> String {
    let mut url = format!(
        "{}/entry?aid={}&ver=last&entry={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(app_id),
        urlencoding::encode(method),
    );
    for (k, v) in params {
        url.push('&');
        url.push_str(k);
        url.push('=');
        url.push_str(&urlencoding::encode(v));
    }
    url
}

pub struct HttpEntryTransport {
    http: reqwest::Client,
    app_id: String,
    metrics: Arc<NetMetrics>,
}

impl HttpEntryTransport {
    pub fn new(http: reqwest::Client, app_id: String, metrics: Arc<NetMetrics>) -> Self {
        Self {
            http,
            app_id,
            metrics,
        }
    }
}

#[async_trait]
impl EntryTransport for HttpEntryTransport {
    async fn entry(
        &self,
        base_url: &str,
        method: &str,
        params: &[(String, String)],
        retry: bool,
    ) -> Result<Value> {
        self.metrics.entry_call();
        let url = build_entry_url(base_url, &self.app_id, method, params);
        let resp = if retry {
            send_with_retry(|| self.http.get(&url), 3, &self.metrics).await?
        } else {
            match self.http.get(&url).send().await {
                Ok(r) => r,
                Err(e) => {
                    if e.is_timeout() {
                        self.metrics.http_timeout();
                    } else {
                        self.metrics.http_error();
                    }
                    return Err(e).with_context(|| format!("entry {method}"));
                }
            }
        };
        let status = resp.status();
        if !status.is_success() {
            self.metrics.http_error();
            bail!("entry {method}: http {status}");
        }
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).with_context(|| format!("entry {method}: malformed json"))
    }
}

/// Thin convenience layer so callers pass `&str` keys.
pub struct EntryClient {
    transport: Arc<dyn EntryTransport>,
}

impl EntryClient {
    pub fn new(transport: Arc<dyn EntryTransport>) -> Self {
        Self { transport }
    }

    pub async fn call(
        &self,
        base_url: &str,
        method: &str,
        params: &[(&str, String)],
        retry: bool,
    ) -> Result<Value> {
        let params: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.transport.entry(base_url, method, &params, retry).await
    }
}
