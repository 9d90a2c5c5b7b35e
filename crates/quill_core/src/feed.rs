/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::graph::GraphResolver;
use crate::tweets::{Accumulator, TweetResolver};
use crate::ui_events::UiEvent;
use anyhow::Result;
use quill_protocol::{MimeiId, Tweet, User};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tracing::warn;

/// The viewer's assembled timeline, exposed to the UI shell as a
/// watch channel. Per-author fetches merge in completion order; no
/// cross-author ordering is promised.
pub struct Feed {
    resolver: Arc<TweetResolver>,
    graph: Arc<GraphResolver>,
    state: Arc<FeedState>,
}

struct FeedState {
    tx: watch::Sender<Vec<Tweet>>,
    events: broadcast::Sender<UiEvent>,
}

impl FeedState {
    /// Whole-state replacement keeps concurrent merges from
    /// corrupting the vector; interleaving order stays unspecified.
    fn merge(&self, new_tweets: Vec<Tweet>) {
        if new_tweets.is_empty() {
            return;
        }
        self.tx.send_modify(|state| {
            for t in new_tweets {
                match state
                    .iter_mut()
                    .find(|x| x.mid.is_some() && x.mid == t.mid)
                {
                    Some(slot) => *slot = t,
                    None => state.push(t),
                }
            }
        });
        self.emit("feed_merged", None);
    }

    fn emit(&self, kind: &str, tweet_id: Option<String>) {
        let _ = self.events.send(UiEvent::new(kind, tweet_id));
    }
}

impl Feed {
    pub fn new(resolver: Arc<TweetResolver>, graph: Arc<GraphResolver>) -> Self {
        let (tx, _) = watch::channel(Vec::new());
        let (events, _) = broadcast::channel(64);
        Self {
            resolver,
            graph,
            state: Arc::new(FeedState { tx, events }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Tweet>> {
        self.state.tx.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<UiEvent> {
        self.state.events.subscribe()
    }

    pub fn snapshot(&self) -> Vec<Tweet> {
        self.state.tx.borrow().clone()
    }

    /// Launches one independent fetch task per followed id (the
    /// viewer included) and merges each result as it completes.
    /// Each task is seeded with the feed tweets already attributed to
    /// its author, so nothing already shown is refetched. Resolves
    /// once every task has settled; returns how many were launched.
    pub async fn refresh(
        &self,
        viewer: &User,
        start_ms: i64,
        end_ms: Option<i64>,
    ) -> Result<usize> {
        let mut followed = self.graph.get_followings(viewer).await?;
        if !followed.contains(&viewer.mid) {
            followed.push(viewer.mid.clone());
        }
        let mut seen = HashSet::new();
        followed.retain(|id| seen.insert(id.clone()));

        let current = self.snapshot();
        let mut join = JoinSet::new();
        for author in followed.iter().cloned() {
            let seed: Vec<Tweet> = current
                .iter()
                .filter(|t| t.author_id == author)
                .cloned()
                .collect();
            let resolver = Arc::clone(&self.resolver);
            let state = Arc::clone(&self.state);
            let viewer_id = viewer.mid.clone();
            join.spawn(async move {
                let acc = Accumulator::with_tweets(seed);
                if let Err(e) = resolver
                    .fetch_tweets(&viewer_id, &author, &acc, start_ms, end_ms)
                    .await
                {
                    warn!("feed fetch for {author}: {e:#}");
                }
                state.merge(acc.snapshot().await);
            });
        }
        let launched = followed.len();
        while join.join_next().await.is_some() {}
        Ok(launched)
    }

    /// Fire-and-forget variant for UI event handlers.
    pub fn spawn_refresh(&self, viewer: User, start_ms: i64, end_ms: Option<i64>) {
        let resolver = Arc::clone(&self.resolver);
        let graph = Arc::clone(&self.graph);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let feed = Feed {
                resolver,
                graph,
                state,
            };
            if let Err(e) = feed.refresh(&viewer, start_ms, end_ms).await {
                warn!("feed refresh: {e:#}");
            }
        });
    }

    /// Prepends a freshly composed tweet.
    pub fn add_top(&self, tweet: Tweet) {
        let id = tweet.mid.as_ref().map(|m| m.to_string());
        self.state.tx.send_modify(|state| state.insert(0, tweet));
        self.state.emit("tweet_added", id);
    }

    pub fn remove(&self, id: &MimeiId) {
        self.state
            .tx
            .send_modify(|state| state.retain(|t| t.mid.as_ref() != Some(id)));
        self.state.emit("tweet_removed", Some(id.to_string()));
    }

    /// Swaps a tweet in place after a toggle response arrives.
    /// Returns false when the id is no longer in the feed.
    pub fn replace(&self, tweet: Tweet) -> bool {
        let Some(id) = tweet.mid.clone() else {
            return false;
        };
        let mut replaced = false;
        self.state.tx.send_modify(|state| {
            if let Some(slot) = state.iter_mut().find(|t| t.mid.as_ref() == Some(&id)) {
                *slot = tweet;
                replaced = true;
            }
        });
        if replaced {
            self.state.emit("tweet_replaced", Some(id.to_string()));
        }
        replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::UserDirectory;
    use crate::entry::{methods, EntryClient};
    use crate::net_metrics::NetMetrics;
    use crate::rpc::{calls, RpcClient};
    use crate::testutil::{mid, param, tweet, tweet_value, user, FakeEntry, FakeRpc};
    use anyhow::bail;
    use serde_json::Value;

    /// Three followed authors (a, b, c) each holding one tweet on
    /// node n1, viewer v with an empty index. mm_open hands out the
    /// author's first char as the handle so zrevrange can tell
    /// authors apart.
    fn fleet() -> (Arc<FakeEntry>, Arc<FakeRpc>) {
        let entry = Arc::new(FakeEntry::new(|_, method, params| match method {
            methods::GET_TWEET => {
                let want = param(params, "tweetid").unwrap().to_string();
                let c = want.chars().next().unwrap();
                let author = match c {
                    '1' => 'a',
                    '2' => 'b',
                    '3' => 'c',
                    other => bail!("unexpected tweet id {other}"),
                };
                Ok(tweet_value(&tweet(Some(c), author, 100)))
            }
            other => bail!("unexpected entry {other}"),
        }));
        let rpc = Arc::new(FakeRpc::new(|_, call, args| match call {
            calls::MM_OPEN => {
                let mid_str = args[0].as_str().unwrap();
                Ok(serde_json::json!(mid_str.chars().next().unwrap() as i64))
            }
            calls::H_GET => Ok(serde_json::json!([
                mid('a').to_string(),
                mid('b').to_string(),
                mid('c').to_string(),
            ])),
            calls::Z_REV_RANGE => {
                let handle = args[0].as_i64().unwrap();
                let entries = match char::from_u32(handle as u32).unwrap() {
                    'a' => vec![serde_json::json!({"member": mid('1').to_string(), "score": 100})],
                    'b' => vec![serde_json::json!({"member": mid('2').to_string(), "score": 100})],
                    'c' => vec![serde_json::json!({"member": mid('3').to_string(), "score": 100})],
                    _ => Vec::new(),
                };
                Ok(Value::Array(entries))
            }
            other => bail!("unexpected rpc {other}"),
        }));
        (entry, rpc)
    }

    fn feed_with(entry: Arc<FakeEntry>, rpc: Arc<FakeRpc>) -> Feed {
        let metrics = Arc::new(NetMetrics::new());
        let directory = Arc::new(UserDirectory::new(Arc::clone(&metrics)));
        for c in ['a', 'b', 'c', 'v'] {
            directory.insert(user(c, "http://n1"));
        }
        let graph = Arc::new(GraphResolver::new(
            Arc::new(EntryClient::new(Arc::clone(&entry) as _)),
            Arc::new(RpcClient::new(Arc::clone(&rpc) as _)),
            directory,
            metrics,
            "http://home:8010".to_string(),
        ));
        let resolver = Arc::new(TweetResolver::new(
            Arc::new(RpcClient::new(rpc)),
            Arc::new(EntryClient::new(entry)),
            Arc::clone(&graph),
        ));
        Feed::new(resolver, graph)
    }

    #[tokio::test]
    async fn refresh_launches_one_task_per_followed_id() {
        let (entry, rpc) = fleet();
        let feed = feed_with(Arc::clone(&entry), rpc);
        let viewer = user('v', "http://n1");
        // Followings a, b, c plus the viewer itself.
        let launched = feed.refresh(&viewer, 200, None).await.unwrap();
        assert_eq!(launched, 4);

        let state = feed.snapshot();
        let ids: HashSet<_> = state.iter().map(|t| t.mid.clone().unwrap()).collect();
        assert_eq!(ids, HashSet::from([mid('1'), mid('2'), mid('3')]));
    }

    #[tokio::test]
    async fn second_refresh_reuses_seeded_tweets() {
        let (entry, rpc) = fleet();
        let feed = feed_with(Arc::clone(&entry), rpc);
        let viewer = user('v', "http://n1");
        feed.refresh(&viewer, 200, None).await.unwrap();
        assert_eq!(entry.calls(methods::GET_TWEET), 3);
        feed.refresh(&viewer, 200, None).await.unwrap();
        // Every id was seeded back into its author's accumulator.
        assert_eq!(entry.calls(methods::GET_TWEET), 3);
        assert_eq!(feed.snapshot().len(), 3);
    }

    #[tokio::test]
    async fn watchers_observe_merges() {
        let (entry, rpc) = fleet();
        let feed = feed_with(entry, rpc);
        let mut rx = feed.subscribe();
        let viewer = user('v', "http://n1");
        feed.refresh(&viewer, 200, None).await.unwrap();
        rx.changed().await.unwrap();
        assert!(!rx.borrow().is_empty());
    }

    #[tokio::test]
    async fn mutators_edit_state_in_place() {
        let (entry, rpc) = fleet();
        let feed = feed_with(entry, rpc);

        feed.add_top(tweet(Some('1'), 'a', 50));
        feed.add_top(tweet(Some('2'), 'b', 60));
        assert_eq!(feed.snapshot()[0].mid, Some(mid('2')));

        let mut newer = tweet(Some('1'), 'a', 50);
        newer.like_count = 7;
        assert!(feed.replace(newer));
        let state = feed.snapshot();
        let t1 = state.iter().find(|t| t.mid == Some(mid('1'))).unwrap();
        assert_eq!(t1.like_count, 7);

        feed.remove(&mid('2'));
        assert_eq!(feed.snapshot().len(), 1);

        let phantom = tweet(Some('9'), 'a', 70);
        assert!(!feed.replace(phantom));
    }
}
