/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::chat::ChatClient;
use crate::directory::UserDirectory;
use crate::entry::{EntryClient, HttpEntryTransport};
use crate::feed::Feed;
use crate::graph::{GraphResolver, LoginOutcome};
use crate::media::MediaUploader;
use crate::net_metrics::NetMetrics;
use crate::rpc::{HttpRpcTransport, RpcClient};
use crate::settings::{keys, Settings};
use crate::tweets::TweetResolver;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use quill_protocol::{media_url, MimeiId, User};
use std::path::PathBuf;
use std::sync::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Clone, serde::Deserialize)]
pub struct SessionConfig {
    /// The app's own node.
    #[serde(alias = "app_url")]
    pub base_url: String,
    pub app_id: String,
    #[serde(default)]
    pub key_phrase: Option<String>,
    #[serde(default)]
    pub data_dir: Option<String>,
    /// HTTP client timeout for outbound requests (seconds).
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8010".to_string(),
            app_id: "quill-dev".to_string(),
            key_phrase: None,
            data_dir: None,
            http_timeout_secs: None,
        }
    }
}

pub fn default_data_dir() -> Result<PathBuf> {
    if let Ok(v) = std::env::var("QUILL_DATA_DIR") {
        return Ok(PathBuf::from(v));
    }
    let proj = ProjectDirs::from("net", "quill", "Quill")
        .context("unable to determine platform data dir")?;
    Ok(proj.data_local_dir().to_path_buf())
}

/// One logged-in client context. Owns the HTTP client, the user
/// directory, credentials and the settings store; every collaborator
/// hangs off it. There is no process-global network state.
pub struct Session {
    pub config: SessionConfig,
    pub metrics: Arc<NetMetrics>,
    pub directory: Arc<UserDirectory>,
    pub settings: Settings,
    pub graph: Arc<GraphResolver>,
    pub tweets: Arc<TweetResolver>,
    pub feed: Arc<Feed>,
    pub chat: ChatClient,
    pub uploader: MediaUploader,
    viewer: RwLock<Option<User>>,
}

impl Session {
    pub fn new(mut config: SessionConfig) -> Result<Arc<Self>> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        let data_dir = match &config.data_dir {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?.join("app"),
        };
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("create data dir: {}", data_dir.display()))?;
        let settings = Settings::open(data_dir.join("quill.db"))?;
        settings.set(keys::APP_BASE_URL, &config.base_url)?;
        settings.set(keys::APP_ID, &config.app_id)?;

        let timeout = config.http_timeout_secs.unwrap_or(30).clamp(5, 120);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .context("build http client")?;

        let metrics = Arc::new(NetMetrics::new());
        let entry = Arc::new(EntryClient::new(Arc::new(HttpEntryTransport::new(
            http.clone(),
            config.app_id.clone(),
            Arc::clone(&metrics),
        ))));
        let rpc = Arc::new(RpcClient::new(Arc::new(HttpRpcTransport::new(
            http,
            Arc::clone(&metrics),
        ))));
        let directory = Arc::new(UserDirectory::new(Arc::clone(&metrics)));
        let graph = Arc::new(GraphResolver::new(
            Arc::clone(&entry),
            Arc::clone(&rpc),
            Arc::clone(&directory),
            Arc::clone(&metrics),
            config.base_url.clone(),
        ));
        let tweets = Arc::new(TweetResolver::new(
            Arc::clone(&rpc),
            Arc::clone(&entry),
            Arc::clone(&graph),
        ));
        let feed = Arc::new(Feed::new(Arc::clone(&tweets), Arc::clone(&graph)));
        let chat = ChatClient::new(Arc::clone(&entry), Arc::clone(&graph));
        let uploader = MediaUploader::new(entry, rpc);

        Ok(Arc::new(Self {
            config,
            metrics,
            directory,
            settings,
            graph,
            tweets,
            feed,
            chat,
            uploader,
            viewer: RwLock::new(None),
        }))
    }

    /// Logs in with the configured key phrase, falling back to the
    /// persisted one. On success the account and its profile fields
    /// are persisted for the next start.
    pub async fn login(&self) -> LoginOutcome {
        let phrase = self
            .config
            .key_phrase
            .clone()
            .or_else(|| self.settings.key_phrase().ok().flatten());
        let Some(phrase) = phrase else {
            return LoginOutcome::Failure("no key phrase configured".to_string());
        };
        let outcome = self.graph.login(&phrase).await;
        if let LoginOutcome::Success(user) = &outcome {
            if let Err(e) = self.persist_account(user, &phrase) {
                warn!("persisting account: {e:#}");
            }
            *self.viewer.write().unwrap() = Some(user.clone());
        }
        outcome
    }

    fn persist_account(&self, user: &User, phrase: &str) -> Result<()> {
        self.settings.set_current_user(&user.mid)?;
        self.settings.set(keys::KEY_PHRASE, phrase)?;
        if let Some(v) = user.username.as_deref() {
            self.settings.set(keys::CACHED_USERNAME, v)?;
        }
        if let Some(v) = user.name.as_deref() {
            self.settings.set(keys::CACHED_NAME, v)?;
        }
        if let Some(v) = user.profile.as_deref() {
            self.settings.set(keys::CACHED_PROFILE, v)?;
        }
        Ok(())
    }

    pub fn viewer(&self) -> Option<User> {
        self.viewer.read().unwrap().clone()
    }

    pub fn media_url(&self, id: &MimeiId) -> String {
        media_url(&self.config.base_url, id)
    }
}
