/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::entry::{methods, EntryClient};
use crate::graph::GraphResolver;
use crate::rpc::RpcClient;
use anyhow::{Context, Result};
use futures_util::future::{BoxFuture, FutureExt};
use quill_protocol::model::favorites;
use quill_protocol::{MimeiId, Tweet, User};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Sorted-set key of the per-author tweet index; score is the tweet
/// timestamp in milliseconds.
const TWEET_INDEX_KEY: &str = "tweets";

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Shared collection of resolved tweets. Doubles as the
/// de-duplication set: an id present here is never fetched again.
/// Concurrent per-author fetch tasks append to one accumulator.
pub struct Accumulator {
    inner: Mutex<Inner>,
}

struct Inner {
    order: Vec<Tweet>,
    seen: HashSet<MimeiId>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::with_tweets(Vec::new())
    }

    pub fn with_tweets(tweets: Vec<Tweet>) -> Self {
        let seen = tweets.iter().filter_map(|t| t.mid.clone()).collect();
        Self {
            inner: Mutex::new(Inner {
                order: tweets,
                seen,
            }),
        }
    }

    pub async fn contains(&self, id: &MimeiId) -> bool {
        self.inner.lock().await.seen.contains(id)
    }

    pub async fn get(&self, id: &MimeiId) -> Option<Tweet> {
        self.inner
            .lock()
            .await
            .order
            .iter()
            .find(|t| t.mid.as_ref() == Some(id))
            .cloned()
    }

    /// Appends unless the tweet has no id yet or is already present.
    pub async fn push(&self, tweet: Tweet) -> bool {
        let Some(id) = tweet.mid.clone() else {
            return false;
        };
        let mut g = self.inner.lock().await;
        if !g.seen.insert(id) {
            return false;
        }
        g.order.push(tweet);
        true
    }

    pub async fn snapshot(&self) -> Vec<Tweet> {
        self.inner.lock().await.order.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.order.is_empty()
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetches tweets per author and time window, hydrating retweet and
/// comment chains down to concrete records.
pub struct TweetResolver {
    rpc: Arc<RpcClient>,
    entry: Arc<EntryClient>,
    graph: Arc<GraphResolver>,
}

impl TweetResolver {
    pub fn new(rpc: Arc<RpcClient>, entry: Arc<EntryClient>, graph: Arc<GraphResolver>) -> Self {
        Self { rpc, entry, graph }
    }

    /// Appends all tweets by `author_id` with timestamp in
    /// `(end_ms, start_ms]` into `acc`, newest first as served by the
    /// index. Ids already accumulated are not fetched again. An
    /// unreachable author is a skip, not an error.
    pub async fn fetch_tweets(
        &self,
        viewer: &MimeiId,
        author_id: &MimeiId,
        acc: &Accumulator,
        start_ms: i64,
        end_ms: Option<i64>,
    ) -> Result<()> {
        let Some(author) = self.graph.resolve_user(author_id).await? else {
            warn!("author {author_id} has no reachable provider, skipping");
            return Ok(());
        };
        let handle = self
            .rpc
            .mm_open(&author.base_url, &author.mid, false)
            .await?;
        let index = self
            .rpc
            .zrevrange(&author.base_url, handle, TWEET_INDEX_KEY, 0, -1)
            .await?;
        for e in index {
            if e.score > start_ms {
                continue;
            }
            if let Some(end) = end_ms {
                if e.score <= end {
                    continue;
                }
            }
            let id = match MimeiId::parse(&e.member) {
                Ok(id) => id,
                Err(err) => {
                    warn!("bad id in tweet index of {author_id}: {err}");
                    continue;
                }
            };
            if acc.contains(&id).await {
                continue;
            }
            let mut visited = HashSet::new();
            visited.insert(id.clone());
            match self.get_tweet(&author.base_url, &id, viewer).await {
                Ok(Some(mut t)) => {
                    t.author = Some(author.clone());
                    if let Err(e) = self.resolve_original(&mut t, viewer, acc, &mut visited).await
                    {
                        warn!("original chain of {id}: {e:#}");
                    }
                    acc.push(t).await;
                }
                Ok(None) => {}
                Err(e) => warn!("tweet {id}: {e:#}"),
            }
        }
        Ok(())
    }

    /// Hydrates `tweet.original_tweet`: reuse an accumulated record
    /// when possible, otherwise fetch from the original author's node
    /// and recurse. `visited` is the hard cycle guard; a repeated id
    /// ends the chain with a warning instead of looping.
    fn resolve_original<'a>(
        &'a self,
        tweet: &'a mut Tweet,
        viewer: &'a MimeiId,
        acc: &'a Accumulator,
        visited: &'a mut HashSet<MimeiId>,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let (Some(oid), Some(oaid)) = (
                tweet.original_tweet_id.clone(),
                tweet.original_author_id.clone(),
            ) else {
                return Ok(());
            };
            if let Some(orig) = acc.get(&oid).await {
                tweet.original_author = orig.author.clone();
                tweet.original_tweet = Some(Box::new(orig));
                return Ok(());
            }
            if !visited.insert(oid.clone()) {
                warn!("cycle in original-tweet chain at {oid}");
                return Ok(());
            }
            let Some(oauthor) = self.graph.resolve_user(&oaid).await? else {
                return Ok(());
            };
            let Some(mut orig) = self.get_tweet(&oauthor.base_url, &oid, viewer).await? else {
                return Ok(());
            };
            orig.author = Some(oauthor.clone());
            self.resolve_original(&mut orig, viewer, acc, visited)
                .await?;
            acc.push(orig.clone()).await;
            tweet.original_author = Some(oauthor);
            tweet.original_tweet = Some(Box::new(orig));
            Ok(())
        }
        .boxed()
    }

    /// Batch fetch for profile pages: one round trip, records that
    /// fail to decode are dropped.
    pub async fn get_tweets(
        &self,
        base: &str,
        ids: &[MimeiId],
        viewer: &MimeiId,
    ) -> Result<Vec<Tweet>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids
            .iter()
            .map(MimeiId::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let v = self
            .entry
            .call(
                base,
                methods::GET_TWEETS,
                &[("tweetids", joined), ("userid", viewer.to_string())],
                true,
            )
            .await?;
        let items = v.as_array().cloned().unwrap_or_default();
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match Tweet::from_value(item) {
                Ok(t) => out.push(t),
                Err(e) => warn!("skipping malformed tweet in batch: {e}"),
            }
        }
        Ok(out)
    }

    pub async fn get_tweet(
        &self,
        base: &str,
        id: &MimeiId,
        viewer: &MimeiId,
    ) -> Result<Option<Tweet>> {
        let v = self
            .entry
            .call(
                base,
                methods::GET_TWEET,
                &[("tweetid", id.to_string()), ("userid", viewer.to_string())],
                true,
            )
            .await?;
        if v.is_null() {
            return Ok(None);
        }
        Ok(Some(Tweet::from_value(v)?))
    }

    /// Uploads a locally composed tweet to the viewer's node. On
    /// success the server-assigned id replaces the local `None`.
    pub async fn upload_tweet(&self, viewer: &User, tweet: &mut Tweet) -> Result<bool> {
        let body = serde_json::to_string(tweet).context("serialize tweet")?;
        let v = match self
            .entry
            .call(
                &viewer.base_url,
                methods::UPLOAD_TWEET,
                &[("userid", viewer.mid.to_string()), ("tweet", body)],
                false,
            )
            .await
        {
            Ok(v) => v,
            Err(e) => {
                warn!("upload tweet: {e:#}");
                return Ok(false);
            }
        };
        let id_str = v
            .get("tweetid")
            .and_then(Value::as_str)
            .or_else(|| v.as_str());
        let Some(id_str) = id_str else {
            warn!("upload tweet: server returned no id");
            return Ok(false);
        };
        match MimeiId::parse(id_str) {
            Ok(id) => {
                tweet.mid = Some(id);
                Ok(true)
            }
            Err(e) => {
                warn!("upload tweet: {e}");
                Ok(false)
            }
        }
    }

    pub async fn delete_tweet(&self, viewer: &User, id: &MimeiId) -> Result<bool> {
        match self
            .entry
            .call(
                &viewer.base_url,
                methods::DELETE_TWEET,
                &[("userid", viewer.mid.to_string()), ("tweetid", id.to_string())],
                false,
            )
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("delete tweet {id}: {e:#}");
                Ok(false)
            }
        }
    }

    /// Uploads the comment (a tweet linked to its parent), then
    /// registers it on the parent author's node. The parent's comment
    /// count is replaced from the response.
    pub async fn add_comment(
        &self,
        viewer: &User,
        parent: &mut Tweet,
        content: String,
    ) -> Result<Option<Tweet>> {
        let Some(mut comment) = Tweet::comment_on(parent, viewer.mid.clone(), content, now_ms())
        else {
            warn!("cannot comment on a tweet that has no id yet");
            return Ok(None);
        };
        if !self.upload_tweet(viewer, &mut comment).await? {
            return Ok(None);
        }
        let Some(author) = self.graph.resolve_user(&parent.author_id).await? else {
            return Ok(None);
        };
        let comment_id = comment.mid.clone().expect("uploaded comment has id");
        let parent_id = parent.mid.clone().expect("parent checked above");
        let v = match self
            .entry
            .call(
                &author.base_url,
                methods::ADD_COMMENT,
                &[
                    ("tweetid", parent_id.to_string()),
                    ("commentid", comment_id.to_string()),
                    ("userid", viewer.mid.to_string()),
                ],
                false,
            )
            .await
        {
            Ok(v) => v,
            Err(e) => {
                warn!("add comment to {parent_id}: {e:#}");
                return Ok(None);
            }
        };
        if let Some(count) = v.get("count").and_then(Value::as_u64) {
            parent.comment_count = count as u32;
        }
        comment.author = self.graph.directory().get(&viewer.mid);
        Ok(Some(comment))
    }

    /// Server-authoritative toggle: the local flag and count are
    /// replaced from the response, never computed locally. A failed
    /// call leaves the tweet untouched and returns false.
    pub async fn toggle_like(&self, viewer: &User, tweet: &mut Tweet) -> Result<bool> {
        self.toggle_flag(
            viewer,
            tweet,
            methods::LIKED_COUNT,
            "hasLiked",
            favorites::LIKE,
        )
        .await
    }

    pub async fn toggle_bookmark(&self, viewer: &User, tweet: &mut Tweet) -> Result<bool> {
        self.toggle_flag(
            viewer,
            tweet,
            methods::BOOKMARK,
            "hasBookmarked",
            favorites::BOOKMARK,
        )
        .await
    }

    async fn toggle_flag(
        &self,
        viewer: &User,
        tweet: &mut Tweet,
        method: &str,
        flag_field: &str,
        slot: usize,
    ) -> Result<bool> {
        let Some(id) = tweet.mid.clone() else {
            warn!("{method} on a tweet that has no id yet");
            return Ok(false);
        };
        let Some(author) = self.graph.resolve_user(&tweet.author_id).await? else {
            return Ok(false);
        };
        let v = match self
            .entry
            .call(
                &author.base_url,
                method,
                &[("tweetid", id.to_string()), ("userid", viewer.mid.to_string())],
                false,
            )
            .await
        {
            Ok(v) => v,
            Err(e) => {
                warn!("{method} {id}: {e:#}");
                return Ok(false);
            }
        };
        let Some(state) = v.get(flag_field).and_then(Value::as_bool) else {
            warn!("{method} {id}: response missing {flag_field}");
            return Ok(false);
        };
        let Some(count) = v.get("count").and_then(Value::as_u64) else {
            warn!("{method} {id}: response missing count");
            return Ok(false);
        };
        tweet.favorites[slot] = state;
        match slot {
            favorites::LIKE => tweet.like_count = count as u32,
            favorites::BOOKMARK => tweet.bookmark_count = count as u32,
            _ => tweet.retweet_count = count as u32,
        }
        Ok(true)
    }

    /// Retweeting uploads a zero-content tweet referencing the
    /// original, then toggles with the new id attached; un-retweeting
    /// lets the server look up and delete its retweet record. Returns
    /// the new retweet record when one was created.
    pub async fn toggle_retweet(&self, viewer: &User, tweet: &mut Tweet) -> Result<Option<Tweet>> {
        let Some(id) = tweet.mid.clone() else {
            warn!("retweet of a tweet that has no id yet");
            return Ok(None);
        };
        let Some(author) = self.graph.resolve_user(&tweet.author_id).await? else {
            return Ok(None);
        };

        let mut params = vec![
            ("tweetid", id.to_string()),
            ("userid", viewer.mid.to_string()),
        ];
        let mut uploaded: Option<Tweet> = None;
        if !tweet.favorites[favorites::RETWEET] {
            let Some(mut retweet) = Tweet::retweet_of(tweet, viewer.mid.clone(), now_ms()) else {
                return Ok(None);
            };
            if !self.upload_tweet(viewer, &mut retweet).await? {
                return Ok(None);
            }
            let rid = retweet.mid.clone().expect("uploaded retweet has id");
            params.push(("retweetid", rid.to_string()));
            uploaded = Some(retweet);
        }

        let v = match self
            .entry
            .call(&author.base_url, methods::TOGGLE_RETWEET, &params, false)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                warn!("toggle retweet {id}: {e:#}");
                return Ok(None);
            }
        };
        let Some(state) = v.get("hasRetweeted").and_then(Value::as_bool) else {
            warn!("toggle retweet {id}: response missing hasRetweeted");
            return Ok(None);
        };
        tweet.favorites[favorites::RETWEET] = state;
        if let Some(count) = v.get("count").and_then(Value::as_u64) {
            tweet.retweet_count = count as u32;
        }
        Ok(uploaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::UserDirectory;
    use crate::entry::EntryClient;
    use crate::net_metrics::NetMetrics;
    use crate::testutil::{mid, param, tweet, tweet_value, user, FakeEntry, FakeRpc};
    use anyhow::bail;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        entry: Arc<FakeEntry>,
        resolver: TweetResolver,
    }

    /// Builds a resolver with authors 'a'..'d' pre-cached on node n1,
    /// so tests script only tweet traffic.
    fn fixture(
        rpc: Arc<FakeRpc>,
        entry: Arc<FakeEntry>,
    ) -> Fixture {
        let metrics = Arc::new(NetMetrics::new());
        let directory = Arc::new(UserDirectory::new(Arc::clone(&metrics)));
        for c in ['a', 'b', 'c', 'd'] {
            directory.insert(user(c, "http://n1"));
        }
        let graph = Arc::new(GraphResolver::new(
            Arc::new(EntryClient::new(Arc::clone(&entry) as _)),
            Arc::new(RpcClient::new(Arc::clone(&rpc) as _)),
            directory,
            metrics,
            "http://home:8010".to_string(),
        ));
        let resolver = TweetResolver::new(
            Arc::new(RpcClient::new(rpc)),
            Arc::new(EntryClient::new(Arc::clone(&entry) as _)),
            graph,
        );
        Fixture { entry, resolver }
    }

    fn index_rpc(entries: Vec<(char, i64)>) -> Arc<FakeRpc> {
        Arc::new(FakeRpc::new(move |_, call, _| match call {
            crate::rpc::calls::MM_OPEN => Ok(serde_json::json!(1)),
            crate::rpc::calls::Z_REV_RANGE => {
                let mut sorted = entries.clone();
                sorted.sort_by(|a, b| b.1.cmp(&a.1));
                Ok(Value::Array(
                    sorted
                        .iter()
                        .map(|(c, ts)| {
                            serde_json::json!({"member": mid(*c).to_string(), "score": ts})
                        })
                        .collect(),
                ))
            }
            other => bail!("unexpected rpc {other}"),
        }))
    }

    fn tweets_by_id(tweets: Vec<Tweet>) -> Arc<FakeEntry> {
        Arc::new(FakeEntry::new(move |_, method, params| match method {
            methods::GET_TWEET => {
                let want = param(params, "tweetid").unwrap();
                match tweets.iter().find(|t| t.mid.as_ref().unwrap().as_str() == want) {
                    Some(t) => Ok(tweet_value(t)),
                    None => Ok(Value::Null),
                }
            }
            other => bail!("unexpected entry {other}"),
        }))
    }

    #[tokio::test]
    async fn window_filter_keeps_scores_in_half_open_interval() {
        // T1@100, T2@90; window start=150, end=95 -> only T1.
        let rpc = index_rpc(vec![('s', 100), ('r', 90)]);
        let entry = tweets_by_id(vec![tweet(Some('s'), 'a', 100), tweet(Some('r'), 'a', 90)]);
        let f = fixture(rpc, entry);
        let acc = Accumulator::new();
        f.resolver
            .fetch_tweets(&mid('v'), &mid('a'), &acc, 150, Some(95))
            .await
            .unwrap();
        let got = acc.snapshot().await;
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].mid, Some(mid('s')));
        assert_eq!(f.entry.calls(methods::GET_TWEET), 1);
    }

    #[tokio::test]
    async fn accumulated_ids_are_never_refetched() {
        let rpc = index_rpc(vec![('s', 100)]);
        let entry = tweets_by_id(vec![tweet(Some('s'), 'a', 100)]);
        let f = fixture(rpc, entry);
        let acc = Accumulator::with_tweets(vec![tweet(Some('s'), 'a', 100)]);
        f.resolver
            .fetch_tweets(&mid('v'), &mid('a'), &acc, 200, None)
            .await
            .unwrap();
        assert_eq!(f.entry.calls(methods::GET_TWEET), 0);
        assert_eq!(acc.len().await, 1);
    }

    #[tokio::test]
    async fn retweet_chain_of_depth_three_resolves_three_tweets() {
        let mut t1 = tweet(Some('1'), 'a', 100);
        t1.original_tweet_id = Some(mid('2'));
        t1.original_author_id = Some(mid('b'));
        let mut t2 = tweet(Some('2'), 'b', 80);
        t2.original_tweet_id = Some(mid('3'));
        t2.original_author_id = Some(mid('c'));
        let t3 = tweet(Some('3'), 'c', 60);

        let rpc = index_rpc(vec![('1', 100)]);
        let entry = tweets_by_id(vec![t1, t2, t3]);
        let f = fixture(rpc, entry);
        let acc = Accumulator::new();
        f.resolver
            .fetch_tweets(&mid('v'), &mid('a'), &acc, 200, None)
            .await
            .unwrap();

        assert_eq!(acc.len().await, 3);
        let outer = acc.get(&mid('1')).await.unwrap();
        let inner = outer.original_tweet.as_ref().unwrap();
        assert_eq!(inner.mid, Some(mid('2')));
        let innermost = inner.original_tweet.as_ref().unwrap();
        assert_eq!(innermost.mid, Some(mid('3')));
        assert!(innermost.original_tweet.is_none());
        assert_eq!(f.entry.calls(methods::GET_TWEET), 3);
    }

    #[tokio::test]
    async fn cyclic_original_references_terminate() {
        let mut t1 = tweet(Some('1'), 'a', 100);
        t1.original_tweet_id = Some(mid('2'));
        t1.original_author_id = Some(mid('b'));
        let mut t2 = tweet(Some('2'), 'b', 80);
        t2.original_tweet_id = Some(mid('1'));
        t2.original_author_id = Some(mid('a'));

        let rpc = index_rpc(vec![('1', 100)]);
        let entry = tweets_by_id(vec![t1, t2]);
        let f = fixture(rpc, entry);
        let acc = Accumulator::new();
        f.resolver
            .fetch_tweets(&mid('v'), &mid('a'), &acc, 200, None)
            .await
            .unwrap();

        assert_eq!(acc.len().await, 2);
        assert_eq!(f.entry.calls(methods::GET_TWEET), 2);
    }

    #[tokio::test]
    async fn unreachable_author_is_skipped_without_error() {
        let rpc = Arc::new(FakeRpc::new(|_, call, _| bail!("unexpected rpc {call}")));
        let entry = Arc::new(FakeEntry::new(|_, method, _| match method {
            methods::GET_PROVIDERS => Ok(serde_json::json!([])),
            other => bail!("unexpected entry {other}"),
        }));
        let f = fixture(rpc, entry);
        let acc = Accumulator::new();
        // 'z' is not in the directory and has no providers.
        f.resolver
            .fetch_tweets(&mid('v'), &mid('z'), &acc, 200, None)
            .await
            .unwrap();
        assert_eq!(acc.len().await, 0);
    }

    #[tokio::test]
    async fn double_toggle_like_tracks_server_state() {
        let flips = Arc::new(AtomicUsize::new(0));
        let flips_in = Arc::clone(&flips);
        let entry = Arc::new(FakeEntry::new(move |_, method, _| match method {
            methods::LIKED_COUNT => {
                let n = flips_in.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Ok(serde_json::json!({"hasLiked": true, "count": 5}))
                } else {
                    Ok(serde_json::json!({"hasLiked": false, "count": 4}))
                }
            }
            other => bail!("unexpected entry {other}"),
        }));
        let rpc = Arc::new(FakeRpc::new(|_, call, _| bail!("unexpected rpc {call}")));
        let f = fixture(rpc, entry);

        let viewer = user('v', "http://n1");
        let mut t = tweet(Some('t'), 'a', 10);
        assert!(f.resolver.toggle_like(&viewer, &mut t).await.unwrap());
        assert!(t.favorites[favorites::LIKE]);
        assert_eq!(t.like_count, 5);
        assert!(f.resolver.toggle_like(&viewer, &mut t).await.unwrap());
        assert!(!t.favorites[favorites::LIKE]);
        assert_eq!(t.like_count, 4);
    }

    #[tokio::test]
    async fn failed_toggle_leaves_tweet_unchanged() {
        let entry = Arc::new(FakeEntry::new(|_, method, _| match method {
            methods::LIKED_COUNT => bail!("http 502"),
            other => bail!("unexpected entry {other}"),
        }));
        let rpc = Arc::new(FakeRpc::new(|_, call, _| bail!("unexpected rpc {call}")));
        let f = fixture(rpc, entry);
        let viewer = user('v', "http://n1");
        let mut t = tweet(Some('t'), 'a', 10);
        t.like_count = 9;
        assert!(!f.resolver.toggle_like(&viewer, &mut t).await.unwrap());
        assert_eq!(t.like_count, 9);
        assert!(!t.favorites[favorites::LIKE]);
    }

    #[tokio::test]
    async fn retweeting_uploads_then_toggles_with_the_new_id() {
        let entry = Arc::new(FakeEntry::new(|_, method, params| match method {
            methods::UPLOAD_TWEET => {
                Ok(serde_json::json!({"tweetid": "9".repeat(27)}))
            }
            methods::TOGGLE_RETWEET => {
                assert_eq!(param(params, "retweetid"), Some("9".repeat(27)).as_deref());
                Ok(serde_json::json!({"hasRetweeted": true, "count": 3}))
            }
            other => bail!("unexpected entry {other}"),
        }));
        let rpc = Arc::new(FakeRpc::new(|_, call, _| bail!("unexpected rpc {call}")));
        let f = fixture(rpc, entry);

        let viewer = user('v', "http://n1");
        let mut t = tweet(Some('t'), 'a', 10);
        let rt = f
            .resolver
            .toggle_retweet(&viewer, &mut t)
            .await
            .unwrap()
            .expect("retweet record created");
        assert_eq!(rt.original_tweet_id, Some(mid('t')));
        assert!(rt.content.is_none());
        assert!(t.favorites[favorites::RETWEET]);
        assert_eq!(t.retweet_count, 3);
        assert_eq!(f.entry.calls(methods::UPLOAD_TWEET), 1);
    }

    #[tokio::test]
    async fn unretweeting_skips_the_upload() {
        let entry = Arc::new(FakeEntry::new(|_, method, params| match method {
            methods::TOGGLE_RETWEET => {
                assert!(param(params, "retweetid").is_none());
                Ok(serde_json::json!({"hasRetweeted": false, "count": 2}))
            }
            other => bail!("unexpected entry {other}"),
        }));
        let rpc = Arc::new(FakeRpc::new(|_, call, _| bail!("unexpected rpc {call}")));
        let f = fixture(rpc, entry);

        let viewer = user('v', "http://n1");
        let mut t = tweet(Some('t'), 'a', 10);
        t.favorites[favorites::RETWEET] = true;
        t.retweet_count = 3;
        let rt = f.resolver.toggle_retweet(&viewer, &mut t).await.unwrap();
        assert!(rt.is_none());
        assert!(!t.favorites[favorites::RETWEET]);
        assert_eq!(t.retweet_count, 2);
        assert_eq!(f.entry.calls(methods::UPLOAD_TWEET), 0);
    }

    #[tokio::test]
    async fn batch_fetch_drops_malformed_records() {
        let entry = Arc::new(FakeEntry::new(|_, method, params| match method {
            methods::GET_TWEETS => {
                let ids = param(params, "tweetids").unwrap();
                assert_eq!(ids.split(',').count(), 2);
                Ok(serde_json::json!([
                    tweet_value(&tweet(Some('1'), 'a', 10)),
                    { "mid": "2".repeat(27) },
                ]))
            }
            other => bail!("unexpected entry {other}"),
        }));
        let rpc = Arc::new(FakeRpc::new(|_, call, _| bail!("unexpected rpc {call}")));
        let f = fixture(rpc, entry);
        let got = f
            .resolver
            .get_tweets("http://n1", &[mid('1'), mid('2')], &mid('v'))
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].mid, Some(mid('1')));
    }

    #[tokio::test]
    async fn upload_assigns_the_server_id() {
        let entry = Arc::new(FakeEntry::new(|_, method, params| match method {
            methods::UPLOAD_TWEET => {
                // The tweet travels as URL-encodable JSON.
                let body = param(params, "tweet").unwrap();
                let v: Value = serde_json::from_str(body).unwrap();
                assert!(v.get("authorId").is_some());
                Ok(serde_json::json!({"tweetid": "8".repeat(27)}))
            }
            other => bail!("unexpected entry {other}"),
        }));
        let rpc = Arc::new(FakeRpc::new(|_, call, _| bail!("unexpected rpc {call}")));
        let f = fixture(rpc, entry);

        let viewer = user('v', "http://n1");
        let mut t = Tweet::new(mid('v'), Some("fresh".into()), 123);
        assert!(f.resolver.upload_tweet(&viewer, &mut t).await.unwrap());
        assert_eq!(t.mid, Some(mid('8')));
    }
}
