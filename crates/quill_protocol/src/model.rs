/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::id::MimeiId;
use crate::DecodeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Slot indexes into [`Tweet::favorites`], the viewer-specific flag
/// vector reconciled from toggle-endpoint responses.
pub mod favorites {
    pub const LIKE: usize = 0;
    pub const BOOKMARK: usize = 1;
    pub const RETWEET: usize = 2;
    pub const COUNT: usize = 3;
}

/// Identity record for an account on the Mimei network.
///
/// `base_url` is the most recently probed provider address at which
/// this user's node answered; all per-user reads go there.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub mid: MimeiId,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar: Option<MimeiId>,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub tweet_count: u32,
    #[serde(default)]
    pub following_count: u32,
    #[serde(default)]
    pub follower_count: u32,
    #[serde(default)]
    pub bookmarked_count: u32,
    #[serde(default)]
    pub commented_count: u32,
    #[serde(default)]
    pub liked_count: u32,
    /// Tweet ids this user has liked / bookmarked / replied to.
    #[serde(default)]
    pub liked_tweets: Vec<MimeiId>,
    #[serde(default)]
    pub bookmarked_tweets: Vec<MimeiId>,
    #[serde(default)]
    pub replied_tweets: Vec<MimeiId>,
    /// Credential material, present only on the owning account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_phrase: Option<String>,
}

impl User {
    pub fn new(mid: MimeiId, base_url: impl Into<String>) -> Self {
        User {
            mid,
            base_url: base_url.into(),
            name: None,
            username: None,
            avatar: None,
            profile: None,
            timestamp: 0,
            tweet_count: 0,
            following_count: 0,
            follower_count: 0,
            bookmarked_count: 0,
            commented_count: 0,
            liked_count: 0,
            liked_tweets: Vec::new(),
            bookmarked_tweets: Vec::new(),
            replied_tweets: Vec::new(),
            password: None,
            key_phrase: None,
        }
    }

    pub fn from_value(v: Value) -> Result<Self, DecodeError> {
        serde_json::from_value(v).map_err(|e| DecodeError::Shape {
            what: "User",
            detail: e.to_string(),
        })
    }
}

/// Content record. `mid` stays unset until the first successful
/// upload assigns a permanent id. The `author` / `original_*` fields
/// are display-only hydration and never cross the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    #[serde(default)]
    pub mid: Option<MimeiId>,
    pub author_id: MimeiId,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub original_tweet_id: Option<MimeiId>,
    #[serde(default)]
    pub original_author_id: Option<MimeiId>,
    /// Viewer-specific like/bookmark/retweet flags, indexed by
    /// [`favorites`]. Replaced wholesale from toggle responses.
    #[serde(default)]
    pub favorites: [bool; favorites::COUNT],
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub bookmark_count: u32,
    #[serde(default)]
    pub retweet_count: u32,
    #[serde(default)]
    pub comment_count: u32,
    #[serde(default)]
    pub attachments: Vec<MimeiId>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(skip)]
    pub author: Option<User>,
    #[serde(skip)]
    pub original_author: Option<User>,
    #[serde(skip)]
    pub original_tweet: Option<Box<Tweet>>,
}

impl Tweet {
    pub fn new(author_id: MimeiId, content: Option<String>, timestamp: i64) -> Self {
        Tweet {
            mid: None,
            author_id,
            content,
            timestamp,
            original_tweet_id: None,
            original_author_id: None,
            favorites: [false; favorites::COUNT],
            like_count: 0,
            bookmark_count: 0,
            retweet_count: 0,
            comment_count: 0,
            attachments: Vec::new(),
            is_private: false,
            author: None,
            original_author: None,
            original_tweet: None,
        }
    }

    /// Zero-content record referencing `original`, uploaded before the
    /// retweet toggle round trip.
    pub fn retweet_of(original: &Tweet, retweeter: MimeiId, timestamp: i64) -> Option<Self> {
        let original_id = original.mid.clone()?;
        let mut t = Tweet::new(retweeter, None, timestamp);
        t.original_tweet_id = Some(original_id);
        t.original_author_id = Some(original.author_id.clone());
        Some(t)
    }

    /// A comment is a regular tweet linked to its parent through the
    /// original-tweet reference.
    pub fn comment_on(parent: &Tweet, commenter: MimeiId, content: String, timestamp: i64) -> Option<Self> {
        let parent_id = parent.mid.clone()?;
        let mut t = Tweet::new(commenter, Some(content), timestamp);
        t.original_tweet_id = Some(parent_id);
        t.original_author_id = Some(parent.author_id.clone());
        Some(t)
    }

    pub fn from_value(v: Value) -> Result<Self, DecodeError> {
        serde_json::from_value(v).map_err(|e| DecodeError::Shape {
            what: "Tweet",
            detail: e.to_string(),
        })
    }
}

/// One member of a sorted-set range response. Score is the tweet
/// timestamp in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub member: String,
    pub score: i64,
}

impl ScoredEntry {
    pub fn from_value(v: &Value) -> Result<Self, DecodeError> {
        let member = v
            .get("member")
            .and_then(Value::as_str)
            .ok_or(DecodeError::Missing {
                what: "ScoredEntry",
                field: "member",
            })?
            .to_string();
        let score = v
            .get("score")
            .and_then(|s| s.as_i64().or_else(|| s.as_f64().map(|f| f as i64)))
            .ok_or(DecodeError::Missing {
                what: "ScoredEntry",
                field: "score",
            })?;
        Ok(ScoredEntry { member, score })
    }
}

/// Direct message record. Ids are derived from the send timestamp by
/// the composing client, not assigned by a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub author_id: MimeiId,
    pub receipt_id: MimeiId,
    pub timestamp: i64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub attachment: Option<MimeiId>,
}

impl ChatMessage {
    pub fn from_value(v: Value) -> Result<Self, DecodeError> {
        serde_json::from_value(v).map_err(|e| DecodeError::Shape {
            what: "ChatMessage",
            detail: e.to_string(),
        })
    }
}

/// Per-counterpart conversation summary referencing the latest
/// message exchanged with that user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub timestamp: i64,
    pub user_id: MimeiId,
    pub last_message: ChatMessage,
    #[serde(default)]
    pub has_news: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mid(c: char) -> MimeiId {
        MimeiId::parse(&c.to_string().repeat(27)).unwrap()
    }

    #[test]
    fn tweet_decodes_from_sparse_server_json() {
        let v = serde_json::json!({
            "mid": "t".repeat(27),
            "authorId": "a".repeat(27),
            "content": "hello",
            "timestamp": 1000,
        });
        let t = Tweet::from_value(v).unwrap();
        assert_eq!(t.content.as_deref(), Some("hello"));
        assert_eq!(t.like_count, 0);
        assert_eq!(t.favorites, [false; favorites::COUNT]);
        assert!(t.author.is_none());
    }

    #[test]
    fn tweet_decode_error_names_the_bad_field() {
        let v = serde_json::json!({ "authorId": "way-too-short" });
        match Tweet::from_value(v) {
            Err(DecodeError::Shape { what, detail }) => {
                assert_eq!(what, "Tweet");
                assert!(detail.contains("27 or 64"), "detail: {detail}");
            }
            other => panic!("expected Shape error, got {other:?}"),
        }
    }

    #[test]
    fn transient_fields_never_serialize() {
        let mut t = Tweet::new(mid('a'), Some("x".into()), 5);
        t.author = Some(User::new(mid('a'), "http://n1"));
        let v = serde_json::to_value(&t).unwrap();
        assert!(v.get("author").is_none());
        assert!(v.get("originalTweet").is_none());
    }

    #[test]
    fn retweet_of_references_the_original() {
        let mut orig = Tweet::new(mid('a'), Some("src".into()), 10);
        assert!(Tweet::retweet_of(&orig, mid('b'), 20).is_none());
        orig.mid = Some(mid('t'));
        let rt = Tweet::retweet_of(&orig, mid('b'), 20).unwrap();
        assert!(rt.content.is_none());
        assert_eq!(rt.original_tweet_id, orig.mid);
        assert_eq!(rt.original_author_id, Some(mid('a')));
    }

    #[test]
    fn scored_entry_accepts_integer_and_float_scores() {
        let a = ScoredEntry::from_value(&serde_json::json!({"member": "m1", "score": 90})).unwrap();
        assert_eq!(a.score, 90);
        let b =
            ScoredEntry::from_value(&serde_json::json!({"member": "m2", "score": 100.0})).unwrap();
        assert_eq!(b.score, 100);
        match ScoredEntry::from_value(&serde_json::json!({"member": "m3"})) {
            Err(DecodeError::Missing { field, .. }) => assert_eq!(field, "score"),
            other => panic!("expected Missing, got {other:?}"),
        }
    }

    #[test]
    fn user_roundtrips_with_camel_case_keys() {
        let u = User::new(mid('u'), "http://10.0.0.2:4000");
        let v = serde_json::to_value(&u).unwrap();
        assert!(v.get("baseUrl").is_some());
        assert!(v.get("password").is_none());
        let back = User::from_value(v).unwrap();
        assert_eq!(back.mid, u.mid);
    }
}
