/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::directory::UserDirectory;
use crate::entry::{methods, EntryClient};
use crate::net_metrics::NetMetrics;
use crate::rpc::RpcClient;
use anyhow::{Context, Result};
use quill_protocol::{MimeiId, User};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

const FOLLOWINGS_FIELD: &str = "followings";
const FOLLOWERS_FIELD: &str = "fans";

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Success(User),
    /// Surfaced to the login screen as a flag; never an error.
    Failure(String),
}

/// Resolves users to reachable nodes and walks the follow graph.
pub struct GraphResolver {
    entry: Arc<EntryClient>,
    rpc: Arc<RpcClient>,
    directory: Arc<UserDirectory>,
    metrics: Arc<NetMetrics>,
    /// The app's own node, used for provider lookup and login.
    home_base: String,
}

impl GraphResolver {
    pub fn new(
        entry: Arc<EntryClient>,
        rpc: Arc<RpcClient>,
        directory: Arc<UserDirectory>,
        metrics: Arc<NetMetrics>,
        home_base: String,
    ) -> Self {
        Self {
            entry,
            rpc,
            directory,
            metrics,
            home_base: home_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    /// Returns the user with a validated, reachable base address, or
    /// `None` when no candidate provider answers. Candidates are tried
    /// in server order, first responder wins, one attempt each.
    pub async fn resolve_user(&self, id: &MimeiId) -> Result<Option<User>> {
        if let Some(u) = self.directory.get(id) {
            return Ok(Some(u));
        }
        let providers = self.get_providers(id).await?;
        for addr in &providers {
            let base = normalize_base(addr);
            match self.probe(&base, id).await {
                Ok(mut user) => {
                    user.base_url = base;
                    return Ok(Some(self.directory.insert(user)));
                }
                Err(e) => {
                    self.metrics.probe_failure();
                    warn!("provider {base} for {id} did not answer: {e:#}");
                }
            }
        }
        Ok(None)
    }

    /// Lightweight reachability probe: fetch core profile data from
    /// one candidate address, single attempt.
    async fn probe(&self, base: &str, id: &MimeiId) -> Result<User> {
        let v = self
            .entry
            .call(
                base,
                methods::GET_USER_CORE_DATA,
                &[("userid", id.to_string())],
                false,
            )
            .await?;
        Ok(User::from_value(v)?)
    }

    pub async fn get_providers(&self, id: &MimeiId) -> Result<Vec<String>> {
        let v = self
            .entry
            .call(
                &self.home_base,
                methods::GET_PROVIDERS,
                &[("userid", id.to_string())],
                true,
            )
            .await?;
        let items = v.as_array().cloned().unwrap_or_default();
        Ok(items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }

    pub async fn get_followings(&self, user: &User) -> Result<Vec<MimeiId>> {
        self.id_list(user, FOLLOWINGS_FIELD).await
    }

    pub async fn get_followers(&self, user: &User) -> Result<Vec<MimeiId>> {
        self.id_list(user, FOLLOWERS_FIELD).await
    }

    /// Id lists live as hash fields on the user's own Mimei object.
    async fn id_list(&self, user: &User, field: &str) -> Result<Vec<MimeiId>> {
        let handle = self.rpc.mm_open(&user.base_url, &user.mid, false).await?;
        let v = self
            .rpc
            .hget(&user.base_url, handle, field)
            .await?
            .unwrap_or(Value::Null);
        let items = v.as_array().cloned().unwrap_or_default();
        let mut out = Vec::with_capacity(items.len());
        for item in &items {
            let Some(s) = item.as_str() else { continue };
            match MimeiId::parse(s) {
                Ok(id) => out.push(id),
                Err(e) => warn!("skipping bad id in {field} of {}: {e}", user.mid),
            }
        }
        Ok(out)
    }

    /// Flips whether `viewer` follows `target` on the viewer's own
    /// node. Returns the server-reported new state, or `None` when the
    /// call failed and local state must stay untouched.
    pub async fn toggle_following(&self, viewer: &User, target: &MimeiId) -> Option<bool> {
        let v = match self
            .entry
            .call(
                &viewer.base_url,
                methods::TOGGLE_FOLLOWING,
                &[
                    ("userid", viewer.mid.to_string()),
                    ("followingid", target.to_string()),
                ],
                false,
            )
            .await
        {
            Ok(v) => v,
            Err(e) => {
                warn!("toggle_following {target}: {e:#}");
                return None;
            }
        };
        let is_following = v.get("isFollowing").and_then(Value::as_bool)?;
        if let Some(count) = v.get("count").and_then(Value::as_u64) {
            self.directory
                .update(&viewer.mid, |u| u.following_count = count as u32);
        }
        Some(is_following)
    }

    /// Registers/unregisters `fan` on `owner`'s node fan list.
    pub async fn toggle_follower(&self, owner: &User, fan: &MimeiId) -> Option<bool> {
        let v = match self
            .entry
            .call(
                &owner.base_url,
                methods::TOGGLE_FOLLOWER,
                &[
                    ("userid", owner.mid.to_string()),
                    ("fanid", fan.to_string()),
                ],
                false,
            )
            .await
        {
            Ok(v) => v,
            Err(e) => {
                warn!("toggle_follower {fan}: {e:#}");
                return None;
            }
        };
        let is_follower = v.get("isFollower").and_then(Value::as_bool)?;
        if let Some(count) = v.get("count").and_then(Value::as_u64) {
            self.directory
                .update(&owner.mid, |u| u.follower_count = count as u32);
        }
        Some(is_follower)
    }

    /// Resolves (or mints) the account id for a key phrase, then
    /// resolves the account itself. All failures fold into the
    /// explicit failure flag shown on the login screen.
    pub async fn login(&self, key_phrase: &str) -> LoginOutcome {
        let v = match self
            .entry
            .call(
                &self.home_base,
                methods::INIT_USER_MID,
                &[("phrase", key_phrase.to_string())],
                false,
            )
            .await
        {
            Ok(v) => v,
            Err(e) => return LoginOutcome::Failure(format!("{e:#}")),
        };
        let id_str = v
            .get("userid")
            .and_then(Value::as_str)
            .or_else(|| v.as_str());
        let Some(id_str) = id_str else {
            return LoginOutcome::Failure("server returned no user id".to_string());
        };
        let id = match MimeiId::parse(id_str) {
            Ok(id) => id,
            Err(e) => return LoginOutcome::Failure(e.to_string()),
        };
        match self.resolve_user(&id).await {
            Ok(Some(mut user)) => {
                user.key_phrase = Some(key_phrase.to_string());
                info!("logged in as {}", user.mid);
                LoginOutcome::Success(user)
            }
            Ok(None) => LoginOutcome::Failure(format!("no reachable provider for {id}")),
            Err(e) => LoginOutcome::Failure(format!("{e:#}")),
        }
    }

    /// Pushes profile edits to the user's node and mirrors them into
    /// the directory on success.
    pub async fn set_author_core_data(&self, user: &User) -> Result<()> {
        let body = serde_json::to_string(user).context("serialize user")?;
        self.entry
            .call(
                &user.base_url,
                methods::SET_AUTHOR_CORE_DATA,
                &[("userid", user.mid.to_string()), ("user", body)],
                false,
            )
            .await?;
        let edited = user.clone();
        self.directory.update(&user.mid, move |u| *u = edited);
        Ok(())
    }
}

/// Provider addresses arrive as bare `ip:port`.
pub(crate) fn normalize_base(addr: &str) -> String {
    let addr = addr.trim().trim_end_matches('/');
    if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.to_string()
    } else {
        format!("http://{addr}")
    }
}
